//! Grammar transformations. Every pass reads a grammar and returns a new one.

use crate::{
    first_sets::nulls_set,
    grammar::{Grammar, GrammarDef, NonterminalID, SymbolID},
    types::{Map, Set},
};
use std::collections::VecDeque;

fn copy_rules(def: &mut GrammarDef, g: &Grammar) {
    for rule in g.rules.values() {
        def.ensure_rule(rule.left(), rule.right().iter().copied());
    }
}

fn is_unit(right: &[SymbolID]) -> bool {
    matches!(right, [SymbolID::N(..)])
}

/// Remove immediate left recursion.
///
/// `A -> A a1 | .. | A an | b1 | .. | bm` becomes `A -> b1 A' | .. | bm A'`
/// and `A' -> a1 A' | .. | an A' | epsilon`. Rules `A -> A` are dropped.
pub fn without_left_recursion(g: &Grammar) -> Grammar {
    let _span = tracing::trace_span!("without_left_recursion").entered();

    g.rebuild(|def| {
        for (&n, nonterminal) in &g.nonterminals {
            let this = SymbolID::N(n);
            let mut recursive = vec![];
            let mut others = vec![];
            for rule in g.rules_of(n) {
                match rule.right() {
                    [head] if *head == this => continue,
                    [head, rest @ ..] if *head == this => recursive.push(rest),
                    right => others.push(right),
                }
            }

            if recursive.is_empty() {
                for right in others {
                    def.ensure_rule(n, right.iter().copied());
                }
                continue;
            }

            let tail = def.fresh_nonterminal(nonterminal.name());
            let tail_symbol = SymbolID::N(tail);
            for beta in others {
                def.ensure_rule(n, beta.iter().copied().chain(Some(tail_symbol)));
            }
            for alpha in recursive {
                def.ensure_rule(tail, alpha.iter().copied().chain(Some(tail_symbol)));
            }
            def.ensure_rule(tail, []);
            tracing::trace!(nonterminal = nonterminal.name(), "removed left recursion");
        }
    })
}

/// Left-factor rules sharing their first symbol.
///
/// `A -> x b1 | x b2` becomes `A -> x A'` and `A' -> b1 | b2`. The fresh
/// nonterminals are factored again until no two rules of a nonterminal
/// start with the same symbol.
pub fn without_common_prefix(g: &Grammar) -> Grammar {
    let _span = tracing::trace_span!("without_common_prefix").entered();

    g.rebuild(|def| {
        let mut pending: VecDeque<(NonterminalID, Vec<Vec<SymbolID>>)> = g
            .nonterminals
            .keys()
            .map(|&n| (n, g.rules_of(n).map(|r| r.right().to_vec()).collect()))
            .collect();

        while let Some((n, bodies)) = pending.pop_front() {
            let mut groups: Map<Option<SymbolID>, Vec<Vec<SymbolID>>> = Map::default();
            for body in bodies {
                groups.entry(body.first().copied()).or_default().push(body);
            }

            for (prefix, group) in groups {
                match prefix {
                    Some(prefix) if group.len() > 1 => {
                        let base = def.nonterminal_name(n).unwrap_or_default().to_owned();
                        let tail = def.fresh_nonterminal(&base);
                        def.ensure_rule(n, [prefix, SymbolID::N(tail)]);
                        let suffixes = group.into_iter().map(|body| body[1..].to_vec()).collect();
                        pending.push_back((tail, suffixes));
                    }
                    _ => {
                        for body in group {
                            def.ensure_rule(n, body);
                        }
                    }
                }
            }
        }
    })
}

/// Remove the nonterminals deriving no terminal string, then every symbol
/// unreachable from the start symbol.
pub fn without_useless_symbols(g: &Grammar) -> Grammar {
    let _span = tracing::trace_span!("without_useless_symbols").entered();

    let mut generating: Set<NonterminalID> = Set::default();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in g.rules.values() {
            if generating.contains(&rule.left()) {
                continue;
            }
            let generates = rule.right().iter().all(|symbol| match symbol {
                SymbolID::T(..) => true,
                SymbolID::N(n) => generating.contains(n),
            });
            if generates {
                generating.insert(rule.left());
                changed = true;
            }
        }
    }

    let is_generating = |symbol: &SymbolID| match symbol {
        SymbolID::T(..) => true,
        SymbolID::N(n) => generating.contains(n),
    };
    let mut reachable: Set<SymbolID> = Set::default();
    let mut queue = VecDeque::new();
    if generating.contains(&g.start_symbol) {
        reachable.insert(SymbolID::N(g.start_symbol));
        queue.push_back(g.start_symbol);
    }
    while let Some(n) = queue.pop_front() {
        for rule in g.rules_of(n) {
            if !rule.right().iter().all(is_generating) {
                continue;
            }
            for symbol in rule.right() {
                if reachable.insert(*symbol) {
                    if let SymbolID::N(next) = symbol {
                        queue.push_back(*next);
                    }
                }
            }
        }
    }

    g.rebuild(|def| {
        copy_rules(def, g);
        def.retain_symbols(|symbol| reachable.contains(&symbol) && is_generating(&symbol));
    })
}

/// Remove the epsilon rules. Every rule is replaced by each variant that
/// keeps or drops its nullable occurrences, except the empty one.
///
/// Also returns whether the language contains the empty word.
pub fn without_epsilon_productions(g: &Grammar) -> (Grammar, bool) {
    let _span = tracing::trace_span!("without_epsilon_productions").entered();

    let nulls = nulls_set(g);
    let accepts_empty_word = nulls.contains(&g.start_symbol);

    let g = g.rebuild(|def| {
        for rule in g.rules.values() {
            let mut variants: Vec<Vec<SymbolID>> = vec![vec![]];
            for symbol in rule.right() {
                let nullable = matches!(symbol, SymbolID::N(n) if nulls.contains(n));
                if nullable {
                    let dropped = variants.clone();
                    for variant in &mut variants {
                        variant.push(*symbol);
                    }
                    variants.extend(dropped);
                } else {
                    for variant in &mut variants {
                        variant.push(*symbol);
                    }
                }
            }

            for variant in variants {
                if variant.is_empty() || variant == [SymbolID::N(rule.left())] {
                    continue;
                }
                def.ensure_rule(rule.left(), variant);
            }
        }
    });

    (g, accepts_empty_word)
}

/// Replace the unit rules `A -> B` by the non-unit rules of every
/// nonterminal reachable from `A` through unit rules.
pub fn without_unit_productions(g: &Grammar) -> Grammar {
    let _span = tracing::trace_span!("without_unit_productions").entered();

    let mut reach: Map<NonterminalID, Set<NonterminalID>> = Map::default();
    for rule in g.rules.values() {
        if let [SymbolID::N(m)] = rule.right() {
            if *m != rule.left() {
                reach.entry(rule.left()).or_default().insert(*m);
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        let sources: Vec<NonterminalID> = reach.keys().copied().collect();
        for n in sources {
            let direct: Vec<NonterminalID> = reach[&n].iter().copied().collect();
            let mut added = vec![];
            for m in direct {
                if let Some(next) = reach.get(&m) {
                    added.extend(next.iter().copied().filter(|k| *k != n));
                }
            }
            if let Some(targets) = reach.get_mut(&n) {
                for k in added {
                    changed |= targets.insert(k);
                }
            }
        }
    }

    g.rebuild(|def| {
        for &n in g.nonterminals.keys() {
            let reached = reach.get(&n).into_iter().flatten().copied();
            for source in Some(n).into_iter().chain(reached) {
                for rule in g.rules_of(source).filter(|r| !is_unit(r.right())) {
                    def.ensure_rule(n, rule.right().iter().copied());
                }
            }
        }
    })
}

/// Useless symbols, epsilon rules and unit rules removed, in that order.
///
/// When the language contains the empty word, a fresh start symbol with
/// `S' -> S | epsilon` is added. Also returns whether that happened.
pub fn almost_cnf(g: &Grammar) -> (Grammar, bool) {
    let g = without_useless_symbols(g);
    let (g, accepts_empty_word) = without_epsilon_productions(&g);
    let g = without_unit_productions(&g);
    if accepts_empty_word {
        (with_empty_start(&g), true)
    } else {
        (g, false)
    }
}

fn with_empty_start(g: &Grammar) -> Grammar {
    let start = g.start_symbol;
    g.rebuild(|def| {
        copy_rules(def, g);
        let base = def.nonterminal_name(start).unwrap_or_default().to_owned();
        let fresh = def.fresh_nonterminal(&base);
        def.ensure_rule(fresh, [SymbolID::N(start)]);
        def.ensure_rule(fresh, []);
        def.start_symbol(fresh);
    })
}

/// The results of every normalization pass, applied in sequence.
#[derive(Debug, Clone)]
pub struct Normalization {
    pub without_left_recursion: Grammar,
    pub without_common_prefix: Grammar,
    pub without_useless_symbols: Grammar,
    pub without_epsilon_productions: Grammar,
    pub almost_cnf: Grammar,
    pub accepts_empty_word: bool,
}

impl Normalization {
    pub fn run(g: &Grammar) -> Self {
        let _span = tracing::trace_span!("normalize").entered();

        let without_left_recursion = self::without_left_recursion(g);
        let without_common_prefix = self::without_common_prefix(&without_left_recursion);
        let without_useless_symbols = self::without_useless_symbols(&without_common_prefix);
        let (without_epsilon_productions, accepts_empty_word) =
            self::without_epsilon_productions(&without_useless_symbols);
        let mut almost_cnf = without_unit_productions(&without_epsilon_productions);
        if accepts_empty_word {
            almost_cnf = with_empty_start(&almost_cnf);
        }

        tracing::debug!(
            rules = almost_cnf.rules.len(),
            accepts_empty_word,
            "normalization finished"
        );
        Self {
            without_left_recursion,
            without_common_prefix,
            without_useless_symbols,
            without_epsilon_productions,
            almost_cnf,
            accepts_empty_word,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_recursion() {
        let g = Grammar::from_str("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | i").unwrap();
        let g2 = without_left_recursion(&g);
        assert_eq!(
            g2.to_string(),
            "E -> T E'\nT -> F T'\nF -> ( E ) | i\nE' -> + T E' | epsilon\nT' -> * F T' | epsilon\n"
        );
        for rule in g2.rules.values() {
            assert_ne!(rule.right().first(), Some(&SymbolID::N(rule.left())));
        }
    }

    #[test]
    fn common_prefix() {
        let g = Grammar::from_str("S -> a b | a c | d").unwrap();
        assert_eq!(without_common_prefix(&g).to_string(), "S -> a S' | d\nS' -> b | c\n");

        let g = Grammar::from_str("S -> a b c | a b d | a").unwrap();
        assert_eq!(
            without_common_prefix(&g).to_string(),
            "S -> a S'\nS' -> b S'' | epsilon\nS'' -> c | d\n"
        );
    }

    #[test]
    fn useless_symbols() {
        let g = Grammar::from_str("S -> A B | a\nA -> a\nB -> B b\nC -> c").unwrap();
        let g2 = without_useless_symbols(&g);
        assert_eq!(g2.to_string(), "S -> a\n");
        assert_eq!(g2.nonterminals.len(), 1);
        assert_eq!(g2.terminal_by_name("b"), None);
        assert_eq!(g2.terminal_by_name("c"), None);
    }

    #[test]
    fn epsilon_productions() {
        let g = Grammar::from_str("S -> A b A\nA -> a | epsilon").unwrap();
        let (g2, empty) = without_epsilon_productions(&g);
        assert!(!empty);
        assert_eq!(g2.to_string(), "S -> A b A | b A | A b | b\nA -> a\n");

        let g = Grammar::from_str("S -> a S b | epsilon").unwrap();
        let (g2, empty) = without_epsilon_productions(&g);
        assert!(empty);
        assert_eq!(g2.to_string(), "S -> a S b | a b\n");
    }

    #[test]
    fn entirely_nullable_body() {
        let g = Grammar::from_str("S -> A A\nA -> a | epsilon").unwrap();
        let (g2, empty) = without_epsilon_productions(&g);
        assert!(empty);
        assert_eq!(g2.to_string(), "S -> A A | A\nA -> a\n");
    }

    #[test]
    fn unit_productions() {
        let g = Grammar::from_str("S -> A | a\nA -> B | b\nB -> c").unwrap();
        let g2 = without_unit_productions(&g);
        assert_eq!(g2.to_string(), "S -> a | b | c\nA -> b | c\nB -> c\n");
    }

    #[test]
    fn unit_cycle() {
        let g = Grammar::from_str("S -> A | a\nA -> S | b").unwrap();
        let g2 = without_unit_productions(&g);
        assert_eq!(g2.to_string(), "S -> a | b\nA -> b | a\n");
    }

    #[test]
    fn almost_cnf_with_empty_word() {
        let g = Grammar::from_str("S -> a S b | epsilon").unwrap();
        let (g2, empty) = almost_cnf(&g);
        assert!(empty);
        assert_eq!(g2.nonterminals[&g2.start_symbol].name(), "S'");
        assert_eq!(g2.to_string(), "S -> a S b | a b\nS' -> S | epsilon\n");
    }

    #[test]
    fn pipeline_keeps_intermediates() {
        let g = Grammar::from_str("E -> E + T | T\nT -> i | i T").unwrap();
        let n = Normalization::run(&g);
        assert_eq!(n.without_left_recursion.to_string(), "E -> T E'\nT -> i | i T\nE' -> + T E' | epsilon\n");
        assert_eq!(
            n.without_common_prefix.to_string(),
            "E -> T E'\nT -> i T'\nE' -> + T E' | epsilon\nT' -> epsilon | T\n"
        );
        assert!(!n.accepts_empty_word);
        assert!(n.almost_cnf.rules.values().all(|r| !r.is_epsilon()));
    }
}
