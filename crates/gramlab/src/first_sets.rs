//! Calculation of FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    symbol_set::TerminalSet,
    types::{Map, Set},
};

#[derive(Debug, Clone)]
pub struct FirstSets {
    symbols: Map<SymbolID, TerminalSet>,
    rules: Map<RuleID, TerminalSet>,
}

impl FirstSets {
    /// Iterate [`FirstSets::step`] until nothing changes.
    pub fn compute(grammar: &Grammar) -> Self {
        let _span = tracing::trace_span!("first_sets").entered();

        let mut symbols = Map::default();
        // FIRST(t) = {t}
        for id in grammar.terminals.keys() {
            symbols.insert(SymbolID::T(*id), Some(*id).into_iter().collect());
        }
        // FIRST(X) = {} until proven otherwise
        for id in grammar.nonterminals.keys() {
            symbols.insert(SymbolID::N(*id), TerminalSet::new());
        }
        let mut first = Self {
            symbols,
            rules: Map::default(),
        };

        let mut passes = 1;
        while first.step(grammar) {
            passes += 1;
        }
        tracing::trace!(passes, "FIRST sets converged");

        first
    }

    /// Run a single pass over every rule. Returns whether any set grew.
    pub fn step(&mut self, grammar: &Grammar) -> bool {
        let mut changed = false;
        for rule in grammar.rules.values() {
            let local = self.local_first(rule.right());
            changed |= self.rules.entry(rule.id()).or_default().update(&local);
            changed |= self
                .symbols
                .entry(SymbolID::N(rule.left()))
                .or_default()
                .update(&local);
        }
        changed
    }

    /// `FIRST(Y1 Y2 ... Yn)`, carrying epsilon iff every `Yi` is nullable.
    pub fn local_first(&self, sentence: &[SymbolID]) -> TerminalSet {
        let mut res = TerminalSet::new();
        for symbol in sentence {
            let first = match self.symbols.get(symbol) {
                Some(first) => first,
                None => return res,
            };
            res.update_terminals(first);
            if !first.contains_epsilon() {
                return res;
            }
        }
        res.set_epsilon();
        res
    }

    pub fn get(&self, symbol: SymbolID) -> Option<&TerminalSet> {
        self.symbols.get(&symbol)
    }

    /// The FIRST set of the body of `rule`.
    pub fn of_rule(&self, rule: RuleID) -> Option<&TerminalSet> {
        self.rules.get(&rule)
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.symbols.iter().filter_map(|(symbol, first)| match symbol {
            SymbolID::N(n) => Some((*n, first)),
            SymbolID::T(..) => None,
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleID, &TerminalSet)> + '_ {
        self.rules.iter().map(|(id, first)| (*id, first))
    }
}

#[derive(Debug, Clone)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn compute(grammar: &Grammar, first: &FirstSets) -> Self {
        let _span = tracing::trace_span!("follow_sets").entered();

        let mut map: Map<NonterminalID, TerminalSet> = grammar
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::new()))
            .collect();
        map.entry(grammar.start_symbol)
            .or_default()
            .insert(TerminalID::EOI);
        let mut follow = Self { map };

        let mut passes = 1;
        while follow.step(grammar, first) {
            passes += 1;
        }
        tracing::trace!(passes, "FOLLOW sets converged");

        follow
    }

    /// Run a single pass over every rule. Returns whether any set grew.
    pub fn step(&mut self, grammar: &Grammar, first: &FirstSets) -> bool {
        let mut changed = false;
        for rule in grammar.rules.values() {
            for (i, symbol) in rule.right().iter().enumerate() {
                let n = match symbol {
                    SymbolID::N(n) => *n,
                    SymbolID::T(..) => continue,
                };
                let suffix = first.local_first(&rule.right()[i + 1..]);
                let mut addition = TerminalSet::new();
                addition.update_terminals(&suffix);
                if suffix.contains_epsilon() {
                    if let Some(left) = self.map.get(&rule.left()) {
                        addition.update_terminals(left);
                    }
                }
                changed |= self.map.entry(n).or_default().update_terminals(&addition);
            }
        }
        changed
    }

    pub fn get(&self, symbol: NonterminalID) -> Option<&TerminalSet> {
        self.map.get(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.map.iter().map(|(id, follow)| (*id, follow))
    }
}

/// Calculate the set of nullable nonterminals in this grammar.
pub fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    // Rules with an empty body are nullable right away.
    let mut nulls: Set<NonterminalID> = grammar
        .rules
        .values()
        .filter_map(|rule| rule.is_epsilon().then_some(rule.left()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules.values() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule.right().iter().all(|symbol| match symbol {
                SymbolID::N(n) => nulls.contains(n),
                SymbolID::T(..) => false,
            });
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
            }
        }
    }

    nulls
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

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        let mut names: Vec<_> = set.iter().map(|t| g.terminals[&t].name().to_owned()).collect();
        if set.contains_epsilon() {
            names.push("epsilon".into());
        }
        names.sort();
        names
    }

    fn nonterminal(g: &Grammar, name: &str) -> NonterminalID {
        match g.symbol_by_name(name) {
            Some(SymbolID::N(n)) => n,
            _ => panic!("unknown nonterminal {}", name),
        }
    }

    #[test]
    fn arithmetic_first_and_follow() {
        let g = Grammar::from_str(ARITH).unwrap();
        let first = FirstSets::compute(&g);
        let follow = FollowSets::compute(&g, &first);

        let first_of = |name: &str| names(&g, first.get(SymbolID::N(nonterminal(&g, name))).unwrap());
        assert_eq!(first_of("E"), ["(", "i"]);
        assert_eq!(first_of("X"), ["+", "-", "epsilon"]);
        assert_eq!(first_of("Y"), ["*", "/", "epsilon"]);

        let follow_of = |name: &str| names(&g, follow.get(nonterminal(&g, name)).unwrap());
        assert_eq!(follow_of("E"), ["$", ")"]);
        assert_eq!(follow_of("X"), ["$", ")"]);
        assert_eq!(follow_of("T"), ["$", ")", "+", "-"]);
        assert_eq!(follow_of("F"), ["$", ")", "*", "+", "-", "/"]);

        let bodies: Vec<_> = first
            .rules()
            .map(|(rule, first)| (g.rules[&rule].display(&g).to_string(), names(&g, first)))
            .collect();
        assert!(bodies.contains(&("X -> epsilon".into(), vec!["epsilon".into()])));
        assert!(bodies.contains(&("F -> ( E )".into(), vec!["(".into()])));
        assert!(bodies.contains(&("T -> F Y".into(), vec!["(".into(), "i".into()])));
    }

    #[test]
    fn fixpoints_are_idempotent() {
        let g = Grammar::from_str(ARITH).unwrap();
        let mut first = FirstSets::compute(&g);
        let mut follow = FollowSets::compute(&g, &first);
        assert!(!first.step(&g));
        assert!(!follow.step(&g, &first));
    }

    #[test]
    fn local_first_of_partially_nullable_sentence() {
        let g = Grammar::from_str("S -> A b\nA -> a | epsilon").unwrap();
        let first = FirstSets::compute(&g);
        let s = nonterminal(&g, "S");
        let a = nonterminal(&g, "A");
        assert_eq!(names(&g, first.get(SymbolID::N(s)).unwrap()), ["a", "b"]);
        assert_eq!(
            names(&g, &first.local_first(&[SymbolID::N(a), SymbolID::N(a)])),
            ["a", "epsilon"]
        );
        assert!(first.local_first(&[]).contains_epsilon());

        let nulls = nulls_set(&g);
        assert!(nulls.contains(&a));
        assert!(!nulls.contains(&s));
    }
}
