//! LL(1) parsing table and the predictive parser driven by it.

use crate::{
    derivation::{Derivation, Handedness, ParseOutcome},
    first_sets::{FirstSets, FollowSets},
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    parse_table::Slot,
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// The first cell of the table that received two different rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LL1Conflict {
    pub nonterminal: NonterminalID,
    pub symbol: TerminalID,
    /// The rule that was registered first.
    pub first: RuleID,
    /// The rule whose registration collided with `first`.
    pub second: RuleID,
    /// A sentential form containing `nonterminal`, found by chaining back
    /// through the entries registered before the conflict.
    pub context: Vec<SymbolID>,
}

impl LL1Conflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "conflict at ({}, {}) between `{}' and `{}', in `{}'",
                g.nonterminals[&self.nonterminal],
                g.terminals[&self.symbol],
                g.rules[&self.first].display(g),
                g.rules[&self.second].display(g),
                g.display_sentence(&self.context),
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct LL1Table {
    grammar: Grammar,
    entries: Map<(NonterminalID, TerminalID), Slot<RuleID>>,
    conflict: Option<LL1Conflict>,
}

impl LL1Table {
    /// Fill the predictive table of `g`.
    ///
    /// Construction stops at the first cell that would hold two different
    /// rules; the table built so far is kept along with the conflict.
    pub fn generate(g: &Grammar, first: &FirstSets, follow: &FollowSets) -> Self {
        let _span = tracing::trace_span!("ll1").entered();

        let mut table = Self {
            grammar: g.clone(),
            entries: Map::default(),
            conflict: None,
        };

        for rule in g.rules.values() {
            let left = rule.left();
            let first_alpha = first.local_first(rule.right());

            let mut lookaheads: Vec<TerminalID> = first_alpha.iter().collect();
            if first_alpha.contains_epsilon() {
                lookaheads.extend(follow.get(left).into_iter().flat_map(|s| s.iter()));
            }

            for symbol in lookaheads {
                let slot = table.entries.entry((left, symbol)).or_default();
                if slot.register(rule.id()) {
                    continue;
                }
                let existing = slot.first().copied().unwrap_or(rule.id());
                let conflict = LL1Conflict {
                    nonterminal: left,
                    symbol,
                    first: existing,
                    second: rule.id(),
                    context: table.back_chain(left),
                };
                tracing::debug!("{}", conflict.display(g));
                table.conflict = Some(conflict);
                return table;
            }
        }

        tracing::debug!(entries = table.entries.len(), "LL(1) table filled");
        table
    }

    /// Walk from `n` towards the start symbol through the registered rules
    /// whose bodies mention the current nonterminal.
    fn back_chain(&self, n: NonterminalID) -> Vec<SymbolID> {
        let g = &self.grammar;
        let mut form = vec![SymbolID::N(n)];
        let mut current = n;
        let mut visited: Set<NonterminalID> = Set::default();
        visited.insert(n);

        while current != g.start_symbol {
            let found = self.entries.values().filter_map(Slot::first).find_map(|id| {
                let rule = &g.rules[id];
                if visited.contains(&rule.left()) {
                    return None;
                }
                let i = rule.right().iter().position(|s| *s == SymbolID::N(current))?;
                Some((rule, i))
            });
            let (rule, i) = match found {
                Some(found) => found,
                None => break,
            };

            let mut expanded = rule.right()[..i].to_vec();
            expanded.append(&mut form);
            expanded.extend_from_slice(&rule.right()[i + 1..]);
            form = expanded;

            current = rule.left();
            visited.insert(current);
        }

        form
    }

    pub fn is_ll1(&self) -> bool {
        self.conflict.is_none()
    }

    pub fn conflict(&self) -> Option<&LL1Conflict> {
        self.conflict.as_ref()
    }

    pub fn get(&self, n: NonterminalID, lookahead: TerminalID) -> Option<RuleID> {
        self.entries.get(&(n, lookahead)).and_then(Slot::first).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (NonterminalID, TerminalID, &Slot<RuleID>)> + '_ {
        self.entries.iter().map(|((n, t), slot)| (*n, *t, slot))
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Run the predictive parser on `word`, which must not contain the
    /// end-of-input marker.
    pub fn parse(&self, word: &[TerminalID]) -> ParseOutcome {
        let mut stack = vec![SymbolID::N(self.grammar.start_symbol)];
        let mut cursor = 0;
        let mut rules = vec![];

        while let Some(top) = stack.pop() {
            let lookahead = word.get(cursor).copied().unwrap_or(TerminalID::EOI);
            match top {
                SymbolID::T(t) if t == lookahead && t != TerminalID::EOI => cursor += 1,
                SymbolID::T(..) => return ParseOutcome::NotRecognized,
                SymbolID::N(n) => {
                    let rule = match self.get(n, lookahead) {
                        Some(rule) => rule,
                        None => return ParseOutcome::NotRecognized,
                    };
                    rules.push(rule);
                    stack.extend(self.grammar.rules[&rule].right().iter().rev());
                }
            }
        }

        if cursor != word.len() {
            return ParseOutcome::NotRecognized;
        }
        ParseOutcome::Derived(Derivation {
            order: Handedness::Leftmost,
            rules,
        })
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        let g = &self.grammar;
        display_fn(move |f| {
            for (n, t, slot) in self.entries() {
                write!(f, "- ({}, {}) => ", g.nonterminals[&n], g.terminals[&t])?;
                for (i, rule) in slot.as_slice().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", g.rules[rule].display(g))?;
                }
                writeln!(f)?;
            }
            if let Some(conflict) = &self.conflict {
                writeln!(f, "{}", conflict.display(g))?;
            }
            Ok(())
        })
    }
}

/// Build the LL(1) table of `g`.
pub fn ll1(g: &Grammar) -> LL1Table {
    let first = FirstSets::compute(g);
    let follow = FollowSets::compute(g, &first);
    LL1Table::generate(g, &first, &follow)
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

    fn tokens(g: &Grammar, word: &str) -> Vec<TerminalID> {
        word.split_whitespace()
            .map(|t| g.terminal_by_name(t).unwrap())
            .collect()
    }

    #[test]
    fn arithmetic_is_ll1() {
        let g = Grammar::from_str(ARITH).unwrap();
        let table = ll1(&g);
        eprintln!("{}", table.display());
        assert!(table.is_ll1());

        let outcome = table.parse(&tokens(&g, "i + i - i"));
        let derivation = outcome.derivation().unwrap();
        assert_eq!(derivation.order, Handedness::Leftmost);
        assert_eq!(g.rules[&derivation.rules[0]].display(&g).to_string(), "E -> T X");
        assert_eq!(
            derivation.display(&g).to_string(),
            "E -> T X; T -> F Y; F -> i; Y -> epsilon; X -> + T X; T -> F Y; F -> i; \
             Y -> epsilon; X -> - T X; T -> F Y; F -> i; Y -> epsilon; X -> epsilon"
        );
    }

    #[test]
    fn rejects_bad_words() {
        let g = Grammar::from_str(ARITH).unwrap();
        let table = ll1(&g);
        assert_eq!(table.parse(&tokens(&g, "i +")), ParseOutcome::NotRecognized);
        assert_eq!(table.parse(&tokens(&g, "( i")), ParseOutcome::NotRecognized);
        assert_eq!(table.parse(&tokens(&g, "i i")), ParseOutcome::NotRecognized);
        assert_eq!(table.parse(&[]), ParseOutcome::NotRecognized);
    }

    #[test]
    fn first_conflict_is_traced() {
        let g = Grammar::from_str("S -> x A y\nA -> b | b c").unwrap();
        let table = ll1(&g);
        assert!(!table.is_ll1());

        let conflict = table.conflict().unwrap();
        assert_eq!(g.nonterminals[&conflict.nonterminal].name(), "A");
        assert_eq!(g.terminals[&conflict.symbol].name(), "b");
        assert_eq!(g.rules[&conflict.first].display(&g).to_string(), "A -> b");
        assert_eq!(g.rules[&conflict.second].display(&g).to_string(), "A -> b c");
        assert_eq!(g.display_sentence(&conflict.context).to_string(), "x A y");
    }

    #[test]
    fn construction_is_deterministic() {
        let g = Grammar::from_str("E -> E + T | T\nT -> i").unwrap();
        let t1 = ll1(&g);
        let t2 = ll1(&g);
        assert!(!t1.is_ll1());
        assert_eq!(t1.conflict(), t2.conflict());
        assert_eq!(t1.display().to_string(), t2.display().to_string());
    }
}
