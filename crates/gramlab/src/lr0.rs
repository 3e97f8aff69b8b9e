//! LR(0) automaton and the SLR(1) parse table.

use crate::{
    automaton::{NodeID, StateGraph},
    first_sets::{FirstSets, FollowSets},
    grammar::{Grammar, RuleID, SymbolID},
    item::{LRItemCore, LRItemSet},
    parse_table::{ParseState, ParseTable, StateID, TableKind},
    types::Map,
};
use std::collections::{BTreeSet, VecDeque};

/// The epsilon-NFA whose states are the LR(0) items of the augmented grammar `g`.
///
/// Each item has an edge labelled with its next symbol to the advanced item,
/// and epsilon edges to the initial items of that symbol when it is a nonterminal.
pub fn item_automaton(g: &Grammar) -> StateGraph<SymbolID, LRItemCore> {
    let start = LRItemCore::new(RuleID::ACCEPT);
    let mut nfa = StateGraph::new(start, true);
    let mut visited: Map<LRItemCore, NodeID> = Map::default();
    visited.insert(start, nfa.root());
    let mut pending = VecDeque::from([start]);

    let mut intern = |nfa: &mut StateGraph<SymbolID, LRItemCore>,
                      pending: &mut VecDeque<LRItemCore>,
                      item: LRItemCore| {
        *visited.entry(item).or_insert_with(|| {
            pending.push_back(item);
            nfa.add_node(item, true)
        })
    };

    while let Some(item) = pending.pop_front() {
        let from = intern(&mut nfa, &mut pending, item);
        let symbol = match item.next_symbol(g) {
            Some(symbol) => symbol,
            None => continue,
        };

        let to = intern(&mut nfa, &mut pending, item.next());
        nfa.add_transition(from, symbol, to);

        if let SymbolID::N(n) = symbol {
            for rule in g.rules_of(n) {
                let to = intern(&mut nfa, &mut pending, LRItemCore::new(rule.id()));
                nfa.add_epsilon(from, to);
            }
        }
    }

    nfa
}

/// The canonical collection of LR(0) item sets of the augmented grammar `g`.
pub fn lr0_states(g: &Grammar) -> Vec<ParseState> {
    let _span = tracing::trace_span!("lr0").entered();

    let nfa = item_automaton(g);
    let dfa = nfa.to_deterministic();

    dfa.nodes()
        .map(|(_, node)| {
            let items: LRItemSet = node
                .tag()
                .iter()
                .map(|id| (*nfa.node(*id).tag(), BTreeSet::new()))
                .collect();
            let transitions = node
                .transitions()
                .filter_map(|(symbol, targets)| {
                    let target = targets.first()?;
                    Some((*symbol, StateID::from_index(target.index())))
                })
                .collect();
            ParseState { items, transitions }
        })
        .collect()
}

/// Build the SLR(1) table of `g`. Reductions are placed on FOLLOW sets.
pub fn slr1(g: &Grammar) -> ParseTable {
    let _span = tracing::trace_span!("slr1").entered();

    let g = g.augmented();
    let first = FirstSets::compute(&g);
    let follow = FollowSets::compute(&g, &first);
    let states = lr0_states(&g);
    ParseTable::build(TableKind::SLR1, g, states, Some(&follow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::ParseOutcome;

    fn tokens(g: &Grammar, word: &str) -> Vec<crate::grammar::TerminalID> {
        word.split_whitespace()
            .map(|t| g.terminal_by_name(t).unwrap())
            .collect()
    }

    #[test]
    fn expression_grammar_is_slr1() {
        let g = Grammar::from_str("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | i").unwrap();
        let table = slr1(&g);
        eprintln!("{}", table.display());

        assert!(table.is_deterministic());
        assert_eq!(table.states().count(), 12);

        let outcome = table.parse(&tokens(&g, "i + i * i"));
        let derivation = outcome.derivation().unwrap();
        assert_eq!(
            derivation.display(&g).to_string(),
            "E -> E + T; T -> T * F; F -> i; T -> F; F -> i; E -> T; T -> F; F -> i"
        );
        assert_eq!(table.parse(&tokens(&g, "i + * i")), ParseOutcome::NotRecognized);
        assert_eq!(table.parse(&tokens(&g, "( i")), ParseOutcome::NotRecognized);
        assert_eq!(table.parse(&[]), ParseOutcome::NotRecognized);
    }

    #[test]
    fn assignment_grammar_is_not_slr1() {
        let g = Grammar::from_str("S -> L = R | R\nL -> * R | i\nR -> L").unwrap();
        let table = slr1(&g);
        assert!(!table.is_deterministic());
        assert_eq!(table.conflicts().count(), 1);
    }

    #[test]
    fn lr0_collection() {
        let g = Grammar::from_str("S -> ( S ) | a").unwrap().augmented();
        let states = lr0_states(&g);
        assert_eq!(states.len(), 6);
        assert_eq!(states[0].items.len(), 3);
        assert!(states[0].items.keys().any(|item| item.rule == RuleID::ACCEPT));
    }
}
