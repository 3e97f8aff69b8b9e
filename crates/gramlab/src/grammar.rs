//! Grammar types.

use crate::{
    types::Map,
    util::{display_fn, write_joined},
};
use std::{fmt, fs, io, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    /// Name of [`TerminalID::EOI`]; grammar text cannot use it as a symbol.
    pub const EOI_NAME: &'static str = "$";

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// Reserved symbol used as the start symbol of augmented grammars.
    pub const START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// Reserved rule `S' -> S` of augmented grammars.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    pub fn is_epsilon(&self) -> bool {
        self.right.is_empty()
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "{} -> {}",
                g.nonterminals[&self.left],
                g.display_sentence(&self.right)
            )
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
}

/// Renders the grammar in the textual form read by [`Grammar::from_str`].
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nonterminal in self.nonterminals.values() {
            let mut rules = self.rules_of(nonterminal.id()).peekable();
            if rules.peek().is_none() {
                continue;
            }
            write!(f, "{} -> ", nonterminal)?;
            write_joined(f, " | ", rules.map(|rule| self.display_sentence(rule.right())))?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    /// Parse a grammar of the form `A -> a B | epsilon`, one head per line.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        Grammar::define(|g| define_grammar_from_text(g, source))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: TerminalID::EOI_NAME.into(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    /// Build a new grammar sharing the symbols of this one but with the rules
    /// emitted by `f`. Symbol identifiers and the start symbol are preserved,
    /// rules are numbered afresh.
    pub fn rebuild<F>(&self, f: F) -> Grammar
    where
        F: FnOnce(&mut GrammarDef),
    {
        let mut def = GrammarDef {
            terminals: self.terminals.clone(),
            nonterminals: self.nonterminals.clone(),
            rules: Map::default(),
            start: Some(self.start_symbol),
            next_terminal_id: next_raw(self.terminals.keys().map(|t| t.raw), TerminalID::OFFSET),
            next_nonterminal_id: next_raw(
                self.nonterminals.keys().map(|n| n.raw),
                NonterminalID::OFFSET,
            ),
            next_rule_id: RuleID::OFFSET,
        };
        f(&mut def);
        let start = def.start.unwrap_or(self.start_symbol);
        def.finish(start)
    }

    /// Return a copy of this grammar with a fresh start symbol `S'` and the
    /// extra rule `S' -> S`.
    pub fn augmented(&self) -> Grammar {
        if self.is_augmented() {
            return self.clone();
        }

        let base = &self.nonterminals[&self.start_symbol].name;
        let mut name = format!("{}'", base);
        while self.symbol_by_name(&name).is_some() {
            name.push('\'');
        }

        let mut nonterminals = Map::default();
        nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name,
            },
        );
        nonterminals.extend(self.nonterminals.iter().map(|(id, n)| (*id, n.clone())));

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(self.start_symbol)],
            },
        );
        rules.extend(self.rules.iter().map(|(id, r)| (*id, r.clone())));

        Grammar {
            terminals: self.terminals.clone(),
            nonterminals,
            rules,
            start_symbol: NonterminalID::START,
        }
    }

    pub fn is_augmented(&self) -> bool {
        self.start_symbol == NonterminalID::START
    }

    /// Iterate over the rules whose left-hand side is `left`, in definition order.
    pub fn rules_of(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left == left)
    }

    /// Look up a user-visible terminal by name. The end-of-input marker is never returned.
    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.id != TerminalID::EOI && t.name == name)
            .map(|t| t.id)
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolID> {
        self.nonterminals
            .values()
            .find(|n| n.name == name)
            .map(|n| SymbolID::N(n.id))
            .or_else(|| self.terminal_by_name(name).map(SymbolID::T))
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => &self.terminals[&t].name,
            SymbolID::N(n) => &self.nonterminals[&n].name,
        }
    }

    /// Display a sentence, using `epsilon` for the empty one.
    pub fn display_sentence<'g>(&'g self, sentence: &'g [SymbolID]) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            if sentence.is_empty() {
                return f.write_str("epsilon");
            }
            write_joined(f, " ", sentence.iter().map(|s| self.symbol_name(*s)))
        })
    }
}

fn next_raw(raws: impl Iterator<Item = u16>, offset: u16) -> u16 {
    raws.max().map_or(offset, |raw| (raw + 1).max(offset))
}

fn define_grammar_from_text(g: &mut GrammarDef, source: &str) -> Result<(), GrammarDefError> {
    let mut productions = vec![];
    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let (head, bodies) = match line.split("->").collect::<Vec<_>>()[..] {
            [head, bodies] => (head.trim(), bodies),
            [_] => return Err(GrammarDefError::MissingArrow { line: line_no }),
            _ => return Err(GrammarDefError::ExtraArrow { line: line_no }),
        };
        if head == TerminalID::EOI_NAME {
            return Err(GrammarDefError::ReservedSymbol {
                line: line_no,
                name: head.to_owned(),
            });
        }
        if head.chars().count() != 1 {
            return Err(GrammarDefError::MalformedHead {
                line: line_no,
                head: head.to_owned(),
            });
        }
        if bodies.split_whitespace().any(|name| name == TerminalID::EOI_NAME) {
            return Err(GrammarDefError::ReservedSymbol {
                line: line_no,
                name: TerminalID::EOI_NAME.to_owned(),
            });
        }
        productions.push((head, bodies));
    }

    if productions.is_empty() {
        return Err(GrammarDefError::Empty);
    }

    // Every head is a nonterminal, whether or not it is declared before use.
    let mut nonterminals: Map<&str, NonterminalID> = Map::default();
    for (head, _) in &productions {
        if !nonterminals.contains_key(head) {
            let id = g.nonterminal(head)?;
            nonterminals.insert(head, id);
        }
    }

    let mut terminals: Map<&str, TerminalID> = Map::default();
    for (head, bodies) in &productions {
        let left = nonterminals[head];
        for body in bodies.split('|') {
            let mut right = vec![];
            for name in body.split_whitespace().filter(|name| *name != "epsilon") {
                let symbol = match nonterminals.get(name) {
                    Some(n) => SymbolID::N(*n),
                    None => match terminals.get(name) {
                        Some(t) => SymbolID::T(*t),
                        None => {
                            let id = g.terminal(name)?;
                            terminals.insert(name, id);
                            SymbolID::T(id)
                        }
                    },
                };
                right.push(symbol);
            }
            g.rule(left, right)?;
        }
    }

    if let Some(start) = nonterminals.values().next() {
        g.start_symbol(*start);
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        if self.is_declared(name) {
            return Err(GrammarDefError::DuplicateSymbol { name: name.into() });
        }

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id += 1;
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        if self.is_declared(name) {
            return Err(GrammarDefError::DuplicateSymbol { name: name.into() });
        }
        Ok(self.insert_nonterminal(name.to_owned()))
    }

    /// Declare a nonterminal named after `base` with as many `'` appended as
    /// needed to make the name unused.
    pub fn fresh_nonterminal(&mut self, base: &str) -> NonterminalID {
        let mut name = format!("{}'", base);
        while self.is_declared(&name) {
            name.push('\'');
        }
        self.insert_nonterminal(name)
    }

    fn insert_nonterminal(&mut self, name: String) -> NonterminalID {
        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;
        self.nonterminals.insert(id, Nonterminal { id, name });
        id
    }

    fn is_declared(&self, name: &str) -> bool {
        self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name)
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> Option<&str> {
        self.nonterminals.get(&id).map(|n| n.name())
    }

    /// Specify a production rule into this grammer.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();
        if let Some(rule) = self.find_rule(left, &right) {
            let mut display = self.nonterminals[&rule.left].name.clone();
            display.push_str(" ->");
            for symbol in rule.right() {
                display.push(' ');
                display.push_str(match symbol {
                    SymbolID::T(t) => &self.terminals[t].name,
                    SymbolID::N(n) => &self.nonterminals[n].name,
                });
            }
            return Err(GrammarDefError::DuplicateRule { rule: display });
        }
        Ok(self.insert_rule(left, right))
    }

    /// Like [`GrammarDef::rule`], but returns the existing rule when a
    /// structurally equal one has already been specified.
    pub fn ensure_rule<I>(&mut self, left: NonterminalID, right: I) -> RuleID
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();
        match self.find_rule(left, &right) {
            Some(rule) => rule.id,
            None => self.insert_rule(left, right),
        }
    }

    fn find_rule(&self, left: NonterminalID, right: &[SymbolID]) -> Option<&Rule> {
        self.rules
            .values()
            .find(|rule| rule.left == left && rule.right == right)
    }

    fn insert_rule(&mut self, left: NonterminalID, right: Vec<SymbolID>) -> RuleID {
        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(id, Rule { id, left, right });
        id
    }

    /// Drop the symbols rejected by `keep`, along with every rule mentioning them.
    /// The end-of-input marker and the start symbol are always kept.
    pub fn retain_symbols<F>(&mut self, mut keep: F)
    where
        F: FnMut(SymbolID) -> bool,
    {
        let start = self.start;
        self.terminals
            .retain(|id, _| *id == TerminalID::EOI || keep(SymbolID::T(*id)));
        self.nonterminals
            .retain(|id, _| Some(*id) == start || keep(SymbolID::N(*id)));

        let terminals = &self.terminals;
        let nonterminals = &self.nonterminals;
        let declared = |symbol: &SymbolID| match symbol {
            SymbolID::T(t) => terminals.contains_key(t),
            SymbolID::N(n) => nonterminals.contains_key(n),
        };
        self.rules.retain(|_, rule| {
            nonterminals.contains_key(&rule.left) && rule.right.iter().all(declared)
        });
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) {
        self.start.replace(symbol);
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // Fall back to the first declared nonterminal.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .next()
                .copied()
                .ok_or(GrammarDefError::Empty)?,
        };
        Ok(self.finish(start))
    }

    fn finish(self, start: NonterminalID) -> Grammar {
        Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            start_symbol: start,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("line {line}: missing `->' in production")]
    MissingArrow { line: usize },

    #[error("line {line}: more than one `->' in production")]
    ExtraArrow { line: usize },

    #[error("line {line}: `{name}' is reserved for the end of input")]
    ReservedSymbol { line: usize, name: String },

    #[error("line {line}: malformed head `{head}', expected a single-character nonterminal")]
    MalformedHead { line: usize, head: String },

    #[error("duplicate production rule `{rule}'")]
    DuplicateRule { rule: String },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("empty grammar")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARITH: &str = "\
E -> T X
X -> + T X | - T X | epsilon
T -> F Y
Y -> * F Y | / F Y | epsilon
F -> ( E ) | i
";

    #[test]
    fn parse_text_grammar() {
        let g = Grammar::from_str(ARITH).unwrap();
        eprintln!("{}", g);

        let names: Vec<_> = g.nonterminals.values().map(|n| n.name()).collect();
        assert_eq!(names, ["E", "X", "T", "Y", "F"]);

        let names: Vec<_> = g.terminals.values().map(|t| t.name()).collect();
        assert_eq!(names, ["$", "+", "-", "*", "/", "(", ")", "i"]);

        assert_eq!(g.rules.len(), 10);
        assert_eq!(g.nonterminals[&g.start_symbol].name(), "E");

        let x = g.nonterminals.values().find(|n| n.name() == "X").unwrap().id();
        let bodies: Vec<_> = g.rules_of(x).map(|r| r.right().len()).collect();
        assert_eq!(bodies, [3, 3, 0]);
    }

    #[test]
    fn display_is_parsable() {
        let g = Grammar::from_str(ARITH).unwrap();
        let text = g.to_string();
        let g2 = Grammar::from_str(&text).unwrap();
        assert_eq!(text, g2.to_string());
    }

    #[test]
    fn malformed_grammars() {
        assert!(matches!(
            Grammar::from_str("E T X"),
            Err(GrammarDefError::MissingArrow { line: 1 })
        ));
        assert!(matches!(
            Grammar::from_str("E -> a\nEx -> b"),
            Err(GrammarDefError::MalformedHead { line: 2, .. })
        ));
        assert!(matches!(
            Grammar::from_str(" -> b"),
            Err(GrammarDefError::MalformedHead { line: 1, .. })
        ));
        assert!(matches!(
            Grammar::from_str("E -> a | a"),
            Err(GrammarDefError::DuplicateRule { .. })
        ));
        assert!(matches!(
            Grammar::from_str("E -> a -> b"),
            Err(GrammarDefError::ExtraArrow { line: 1 })
        ));
        assert!(matches!(
            Grammar::from_str("E -> a\nT -> b -> c | d"),
            Err(GrammarDefError::ExtraArrow { line: 2 })
        ));
        assert!(matches!(
            Grammar::from_str("\n  \n"),
            Err(GrammarDefError::Empty)
        ));
    }

    #[test]
    fn end_of_input_is_reserved() {
        let err = Grammar::from_str("E -> a E | $").unwrap_err();
        assert!(matches!(
            err,
            GrammarDefError::ReservedSymbol { line: 1, ref name } if name == "$"
        ));
        assert_eq!(err.to_string(), "line 1: `$' is reserved for the end of input");
        assert!(matches!(
            Grammar::from_str("E -> a\n$ -> b"),
            Err(GrammarDefError::ReservedSymbol { line: 2, .. })
        ));
        assert!(Grammar::from_str("E -> a $b | b$").is_ok());
    }

    #[test]
    fn augmentation_preserves_rules() {
        let g = Grammar::from_str("S -> a S | b").unwrap();
        let aug = g.augmented();
        assert!(aug.is_augmented());
        assert_eq!(aug.nonterminals[&NonterminalID::START].name(), "S'");
        assert_eq!(aug.rules.len(), g.rules.len() + 1);
        assert_eq!(
            aug.rules[&RuleID::ACCEPT].right(),
            [SymbolID::N(g.start_symbol)]
        );
        for (id, rule) in &g.rules {
            assert_eq!(aug.rules[id].right(), rule.right());
        }
        assert_eq!(aug.augmented().rules.len(), aug.rules.len());
    }

    #[test]
    fn rebuild_keeps_symbols() {
        let g = Grammar::from_str("S -> a S | b").unwrap();
        let s = g.start_symbol;
        let g2 = g.rebuild(|def| {
            let s2 = def.fresh_nonterminal("S");
            def.ensure_rule(s, [SymbolID::N(s2)]);
            def.ensure_rule(s2, []);
            def.ensure_rule(s2, []);
        });
        assert_eq!(g2.terminals.len(), g.terminals.len());
        assert_eq!(g2.nonterminals.len(), 2);
        assert_eq!(g2.rules.len(), 2);
        assert_eq!(g2.to_string(), "S -> S'\nS' -> epsilon\n");
    }
}
