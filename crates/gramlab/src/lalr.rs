//! LALR(1) tables, obtained by merging LR(1) states with the same centers.

use crate::{
    first_sets::FirstSets,
    grammar::Grammar,
    item::LRItemCore,
    lr1::LR1Automaton,
    parse_table::{ParseState, ParseTable, StateID, TableKind},
    types::Map,
};
use std::collections::BTreeSet;

/// Merge the states of `lr1` whose item sets have identical centers.
///
/// Classes are numbered in discovery order and the first state of each class
/// represents it. Lookaheads are unioned and transitions are rewired to the
/// representatives.
pub fn merge_cores(lr1: &LR1Automaton) -> Vec<ParseState> {
    let _span = tracing::trace_span!("merge_cores").entered();

    let mut classes: Map<BTreeSet<LRItemCore>, StateID> = Map::default();
    let mut representative: Vec<StateID> = Vec::with_capacity(lr1.len());
    for (_, state) in lr1.states() {
        let center: BTreeSet<LRItemCore> = state.items.keys().copied().collect();
        let next = StateID::from_index(classes.len());
        representative.push(*classes.entry(center).or_insert(next));
    }

    let mut merged: Vec<ParseState> = Vec::with_capacity(classes.len());
    for (id, state) in lr1.states() {
        let target = representative[id.index()];
        if target.index() == merged.len() {
            merged.push(ParseState {
                items: Default::default(),
                transitions: Map::default(),
            });
        }
        let into = &mut merged[target.index()];
        for (core, lookaheads) in &state.items {
            into.items
                .entry(*core)
                .or_default()
                .extend(lookaheads.iter().copied());
        }
        for (symbol, next) in &state.transitions {
            into.transitions
                .insert(*symbol, representative[next.index()]);
        }
    }

    tracing::debug!(from = lr1.len(), to = merged.len(), "merged LR(1) states");
    merged
}

/// Build the LALR(1) table of `g`.
pub fn lalr1(g: &Grammar) -> ParseTable {
    let g = g.augmented();
    let first = FirstSets::compute(&g);
    let automaton = LR1Automaton::generate(&g, &first);
    table(g, &automaton)
}

/// Fill the LALR(1) table of the augmented grammar `g` from its LR(1) automaton.
pub fn table(g: Grammar, automaton: &LR1Automaton) -> ParseTable {
    ParseTable::build(TableKind::LALR1, g, merge_cores(automaton), None)
}
