//! Running every analysis on a grammar, and parsing words with the result.

use crate::{
    derivation::{DerivationTree, ParseOutcome},
    finite::AutomatonError,
    first_sets::{FirstSets, FollowSets},
    grammar::{Grammar, GrammarDefError, TerminalID},
    lalr,
    ll1::LL1Table,
    lr0,
    lr1::{self, LR1Automaton},
    normalize::Normalization,
    parse_table::ParseTable,
    regex::{self, Regex},
    regular::{self, RegularAutomaton},
    util::display_fn,
};
use std::fmt;

/// The stages run by [`Analysis::analyze`]. Every stage is enabled by default.
#[derive(Debug, Clone)]
pub struct Config {
    ll1: bool,
    slr1: bool,
    lr1: bool,
    lalr1: bool,
    regular: bool,
    normalize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            ll1: true,
            slr1: true,
            lr1: true,
            lalr1: true,
            regular: true,
            normalize: true,
        }
    }

    pub fn skip_ll1(&mut self) -> &mut Self {
        self.ll1 = false;
        self
    }

    pub fn skip_slr1(&mut self) -> &mut Self {
        self.slr1 = false;
        self
    }

    pub fn skip_lr1(&mut self) -> &mut Self {
        self.lr1 = false;
        self
    }

    pub fn skip_lalr1(&mut self) -> &mut Self {
        self.lalr1 = false;
        self
    }

    /// Skip building the automaton and the regular expression of regular
    /// grammars. The grammar is still classified.
    pub fn skip_regular(&mut self) -> &mut Self {
        self.regular = false;
        self
    }

    pub fn skip_normalize(&mut self) -> &mut Self {
        self.normalize = false;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("malformed grammar: {}", _0)]
    Grammar(#[from] GrammarDefError),

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

#[derive(Debug, Clone)]
pub struct RegularAnalysis {
    pub automaton: RegularAutomaton,
    /// `None` if the language is empty.
    pub regex: Option<Regex>,
}

/// An input line, split into tokens and matched against the terminals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Recognized { text: String, tokens: Vec<TerminalID> },
    /// `token` is the first token that names no terminal.
    Unrecognized { text: String, token: String },
}

impl Word {
    pub fn text(&self) -> &str {
        match self {
            Self::Recognized { text, .. } | Self::Unrecognized { text, .. } => text,
        }
    }
}

/// The parser selected for deriving words.
#[derive(Debug, Clone, Copy)]
pub enum Parser<'a> {
    Predictive(&'a LL1Table),
    ShiftReduce(&'a ParseTable),
}

impl Parser<'_> {
    pub fn parse(&self, word: &[TerminalID]) -> ParseOutcome {
        match self {
            Self::Predictive(table) => table.parse(word),
            Self::ShiftReduce(table) => table.parse(word),
        }
    }

    /// The grammar whose rules appear in the derivations.
    pub fn grammar(&self) -> &Grammar {
        match self {
            Self::Predictive(table) => table.grammar(),
            Self::ShiftReduce(table) => table.grammar(),
        }
    }
}

impl fmt::Display for Parser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predictive(..) => f.write_str("LL(1)"),
            Self::ShiftReduce(table) => fmt::Display::fmt(&table.kind(), f),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WordResult {
    pub word: Word,
    pub outcome: ParseOutcome,
    pub tree: Option<DerivationTree>,
}

impl WordResult {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## {}", self.word.text())?;
            match (&self.word, self.outcome.derivation()) {
                (Word::Unrecognized { token, .. }, _) => {
                    writeln!(f, "unknown token `{}'", token)
                }
                (_, None) => writeln!(f, "not recognized"),
                (_, Some(derivation)) => {
                    writeln!(f, "{}", derivation.display(g))?;
                    if let Some(tree) = &self.tree {
                        write!(f, "{}", tree.display(g))?;
                    }
                    Ok(())
                }
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub grammar: Grammar,
    pub first_sets: FirstSets,
    pub follow_sets: FollowSets,
    pub ll1: Option<LL1Table>,
    pub slr1: Option<ParseTable>,
    pub lr1_automaton: Option<LR1Automaton>,
    pub lr1: Option<ParseTable>,
    pub lalr1: Option<ParseTable>,
    pub is_regular: bool,
    pub regular: Option<RegularAnalysis>,
    pub normalization: Option<Normalization>,
}

impl Analysis {
    /// Parse `text` as a grammar and run every stage enabled in `config`.
    pub fn analyze(text: &str, config: &Config) -> Result<Self, AnalysisError> {
        let grammar = Grammar::from_str(text)?;
        Self::of_grammar(grammar, config)
    }

    pub fn of_grammar(grammar: Grammar, config: &Config) -> Result<Self, AnalysisError> {
        let _span = tracing::trace_span!("analyze").entered();

        let first_sets = FirstSets::compute(&grammar);
        let follow_sets = FollowSets::compute(&grammar, &first_sets);

        let ll1 = config
            .ll1
            .then(|| LL1Table::generate(&grammar, &first_sets, &follow_sets));
        let slr1 = config.slr1.then(|| lr0::slr1(&grammar));

        let (mut lr1_automaton, mut lr1, mut lalr1) = (None, None, None);
        if config.lr1 || config.lalr1 {
            // LALR(1) states are merged from the LR(1) ones.
            let augmented = grammar.augmented();
            let first = FirstSets::compute(&augmented);
            let automaton = LR1Automaton::generate(&augmented, &first);
            if config.lr1 {
                lr1 = Some(lr1::table(augmented.clone(), &automaton));
            }
            if config.lalr1 {
                lalr1 = Some(lalr::table(augmented, &automaton));
            }
            lr1_automaton = Some(automaton);
        }

        let is_regular = regular::is_regular(&grammar);
        let regular = if config.regular && is_regular {
            let automaton = regular::automaton(&grammar)?;
            let regex = regex::from_dfa(&automaton.dfa);
            Some(RegularAnalysis { automaton, regex })
        } else {
            None
        };

        let normalization = config.normalize.then(|| Normalization::run(&grammar));

        Ok(Self {
            grammar,
            first_sets,
            follow_sets,
            ll1,
            slr1,
            lr1_automaton,
            lr1,
            lalr1,
            is_regular,
            regular,
            normalization,
        })
    }

    /// Split `text` into one word per non-blank line and every word into
    /// whitespace-separated tokens naming terminals.
    pub fn tokenize(&self, text: &str) -> Vec<Word> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let mut tokens = vec![];
                for token in line.split_whitespace() {
                    match self.grammar.terminal_by_name(token) {
                        Some(t) => tokens.push(t),
                        None => {
                            return Word::Unrecognized {
                                text: line.to_owned(),
                                token: token.to_owned(),
                            }
                        }
                    }
                }
                Word::Recognized {
                    text: line.to_owned(),
                    tokens,
                }
            })
            .collect()
    }

    /// The parser used by [`Analysis::derive`]: the first deterministic one
    /// among LALR(1), LR(1), SLR(1) and LL(1).
    pub fn parser(&self) -> Option<Parser<'_>> {
        [&self.lalr1, &self.lr1, &self.slr1]
            .into_iter()
            .flatten()
            .find(|table| table.is_deterministic())
            .map(Parser::ShiftReduce)
            .or_else(|| {
                self.ll1
                    .as_ref()
                    .filter(|table| table.is_ll1())
                    .map(Parser::Predictive)
            })
    }

    /// Parse every word. Returns `None` if no deterministic parser is available.
    pub fn derive(&self, words: &[Word]) -> Option<Vec<WordResult>> {
        let parser = self.parser()?;
        let _span = tracing::trace_span!("derive", %parser).entered();

        let results = words
            .iter()
            .map(|word| {
                let outcome = match word {
                    Word::Recognized { tokens, .. } => parser.parse(tokens),
                    Word::Unrecognized { .. } => ParseOutcome::NotRecognized,
                };
                let tree = outcome
                    .derivation()
                    .and_then(|derivation| DerivationTree::build(parser.grammar(), derivation));
                WordResult {
                    word: word.clone(),
                    outcome,
                    tree,
                }
            })
            .collect();
        Some(results)
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        let g = &self.grammar;
        display_fn(move |f| {
            writeln!(f, "# Grammar")?;
            write!(f, "{}", g)?;

            writeln!(f, "\n# FIRST")?;
            for (n, first) in self.first_sets.nonterminals() {
                writeln!(f, "- {}: {}", g.nonterminals[&n], first.display(g))?;
            }
            writeln!(f, "\n# FOLLOW")?;
            for (n, follow) in self.follow_sets.iter() {
                writeln!(f, "- {}: {}", g.nonterminals[&n], follow.display(g))?;
            }

            writeln!(f, "\n# Parsers")?;
            if let Some(table) = &self.ll1 {
                match table.conflict() {
                    None => writeln!(f, "- LL(1): yes")?,
                    Some(conflict) => writeln!(f, "- LL(1): no, {}", conflict.display(g))?,
                }
            }
            for table in [&self.slr1, &self.lr1, &self.lalr1].into_iter().flatten() {
                let states = table.states().count();
                match table.conflicts().count() {
                    0 => writeln!(f, "- {}: yes ({} states)", table.kind(), states)?,
                    n => writeln!(f, "- {}: no ({} states, {} conflicts)", table.kind(), states, n)?,
                }
            }

            writeln!(f, "\n# Regular")?;
            match (&self.regular, self.is_regular) {
                (_, false) => writeln!(f, "no")?,
                (None, true) => writeln!(f, "yes")?,
                (Some(regular), true) => {
                    writeln!(f, "yes ({} DFA states)", regular.automaton.dfa.states())?;
                    match &regular.regex {
                        Some(regex) => writeln!(f, "regex: {}", regex.display(g))?,
                        None => writeln!(f, "regex: (empty language)")?,
                    }
                }
            }

            if let Some(normalization) = &self.normalization {
                writeln!(f, "\n# Normalization")?;
                writeln!(f, "## without left recursion")?;
                write!(f, "{}", normalization.without_left_recursion)?;
                writeln!(f, "## without common prefix")?;
                write!(f, "{}", normalization.without_common_prefix)?;
                writeln!(f, "## almost CNF")?;
                write!(f, "{}", normalization.almost_cnf)?;
            }
            Ok(())
        })
    }
}
