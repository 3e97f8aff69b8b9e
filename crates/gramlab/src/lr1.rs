//! The implementation of canonical LR(1) automaton.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    item::{LRItemCore, LRItemSet},
    parse_table::{ParseState, ParseTable, StateID, TableKind},
    types::Map,
    util::display_fn,
};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

#[derive(Debug, Clone)]
pub struct LR1State {
    /// The items the state was created from.
    pub kernel: LRItemSet,
    /// The closure of the kernel.
    pub items: LRItemSet,
    pub transitions: Map<SymbolID, StateID>,
}

#[derive(Debug, Clone)]
pub struct LR1Automaton {
    states: Vec<LR1State>,
}

impl LR1Automaton {
    /// Build the canonical collection of LR(1) item sets of the augmented grammar `g`.
    pub fn generate(g: &Grammar, first: &FirstSets) -> Self {
        let _span = tracing::trace_span!("lr1").entered();

        let mut gen = Generator {
            grammar: g,
            first,
            states: vec![],
            kernels: Map::default(),
            pending: VecDeque::new(),
        };

        // [S' -> . S, $]
        let mut kernel = LRItemSet::new();
        kernel.insert(
            LRItemCore::new(RuleID::ACCEPT),
            Some(TerminalID::EOI).into_iter().collect(),
        );
        gen.intern(kernel);
        gen.populate_states();

        tracing::debug!(states = gen.states.len(), "LR(1) automaton generated");
        Self { states: gen.states }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &LR1State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::from_index(i), state))
    }

    pub fn state(&self, id: StateID) -> &LR1State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub(crate) fn parse_states(&self) -> Vec<ParseState> {
        self.states
            .iter()
            .map(|state| ParseState {
                items: state.items.clone(),
                transitions: state.transitions.clone(),
            })
            .collect()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                for item in crate::item::items(&state.items) {
                    let mark = if state.kernel.contains_key(&item.core) { "*" } else { "-" };
                    writeln!(f, "{} {}", mark, item.display(g))?;
                }
                for (symbol, next) in &state.transitions {
                    writeln!(f, "  {} => {:?}", g.symbol_name(*symbol), next)?;
                }
            }
            Ok(())
        })
    }
}

struct Generator<'g> {
    grammar: &'g Grammar,
    first: &'g FirstSets,
    states: Vec<LR1State>,
    kernels: Map<LRItemSet, StateID>,
    pending: VecDeque<StateID>,
}

impl Generator<'_> {
    /// Return the state for `kernel`, creating it with its closure if it is new.
    fn intern(&mut self, kernel: LRItemSet) -> StateID {
        if let Some(id) = self.kernels.get(&kernel) {
            return *id;
        }
        let id = StateID::from_index(self.states.len());
        let mut items = kernel.clone();
        closure(self.grammar, self.first, &mut items);
        self.states.push(LR1State {
            kernel: kernel.clone(),
            items,
            transitions: Map::default(),
        });
        self.kernels.insert(kernel, id);
        self.pending.push_back(id);
        id
    }

    fn populate_states(&mut self) {
        while let Some(id) = self.pending.pop_front() {
            let transitions = extract_transitions(self.grammar, &self.states[id.index()].items);
            for (symbol, kernel) in transitions {
                let next = self.intern(kernel);
                self.states[id.index()].transitions.insert(symbol, next);
            }
        }
    }
}

/// Expand `items` with every item `[Y -> . gamma, x]` such that some item
/// `[X -> alpha . Y beta, l]` is present and `x` is in `FIRST(beta l)`.
pub fn closure(g: &Grammar, first: &FirstSets, items: &mut LRItemSet) {
    let mut changed = true;
    while changed {
        changed = false;

        let mut added: Map<LRItemCore, BTreeSet<TerminalID>> = Map::default();
        for (core, lookaheads) in &*items {
            let y = match core.next_symbol(g) {
                Some(SymbolID::N(y)) => y,
                _ => continue,
            };

            let mut x = BTreeSet::new();
            for preview in core.previews(g, lookaheads.iter().copied()) {
                x.extend(first.local_first(&preview).iter());
            }

            for rule in g.rules_of(y) {
                added
                    .entry(LRItemCore::new(rule.id()))
                    .or_default()
                    .extend(x.iter().copied());
            }
        }

        for (core, lookaheads) in added {
            let slot = items.entry(core).or_insert_with(|| {
                changed = true;
                BTreeSet::new()
            });
            for l in lookaheads {
                changed |= slot.insert(l);
            }
        }
    }
}

/// The kernel reached from `items` over `symbol`, not yet closed.
pub fn goto(g: &Grammar, items: &LRItemSet, symbol: SymbolID) -> LRItemSet {
    items
        .iter()
        .filter(|(core, _)| core.next_symbol(g) == Some(symbol))
        .map(|(core, lookaheads)| (core.next(), lookaheads.clone()))
        .collect()
}

/// Group the advanced items of `items` by the symbol they move over.
fn extract_transitions(g: &Grammar, items: &LRItemSet) -> Map<SymbolID, LRItemSet> {
    let mut kernels: Map<SymbolID, LRItemSet> = Map::default();
    for (core, lookaheads) in items {
        let label = match core.next_symbol(g) {
            Some(label) => label,
            None => continue,
        };
        kernels
            .entry(label)
            .or_default()
            .entry(core.next())
            .or_default()
            .extend(lookaheads.iter().copied());
    }
    kernels
}

/// Build the canonical LR(1) table of `g`.
pub fn lr1(g: &Grammar) -> ParseTable {
    let g = g.augmented();
    let first = FirstSets::compute(&g);
    let automaton = LR1Automaton::generate(&g, &first);
    table(g, &automaton)
}

/// Fill the LR(1) table of the augmented grammar `g` from its automaton.
pub fn table(g: Grammar, automaton: &LR1Automaton) -> ParseTable {
    ParseTable::build(TableKind::LR1, g, automaton.parse_states(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_of_initial_state() {
        let g = Grammar::from_str("S -> C C\nC -> c C | d").unwrap().augmented();
        let first = FirstSets::compute(&g);
        let automaton = LR1Automaton::generate(&g, &first);
        eprintln!("{}", automaton.display(&g));

        let start = automaton.state(StateID::START);
        assert_eq!(start.kernel.len(), 1);
        assert_eq!(start.items.len(), 4);

        let c = g.terminal_by_name("c").unwrap();
        let d = g.terminal_by_name("d").unwrap();
        for (core, lookaheads) in &start.items {
            let rule = &g.rules[&core.rule];
            if g.nonterminals[&rule.left()].name() == "C" {
                assert_eq!(*lookaheads, [c, d].into_iter().collect::<BTreeSet<_>>());
            }
        }

        // the dragon book's 10 states
        assert_eq!(automaton.len(), 10);
    }

    #[test]
    fn goto_advances_marker() {
        let g = Grammar::from_str("S -> C C\nC -> c C | d").unwrap().augmented();
        let first = FirstSets::compute(&g);
        let automaton = LR1Automaton::generate(&g, &first);
        let start = automaton.state(StateID::START);

        let c = g.symbol_by_name("c").unwrap();
        let kernel = goto(&g, &start.items, c);
        assert_eq!(kernel.len(), 1);
        assert!(kernel.keys().all(|core| core.marker == 1));

        let next = start.transitions[&c];
        assert_eq!(automaton.state(next).kernel, kernel);
    }

    #[test]
    fn distinguishes_lookaheads() {
        let g = Grammar::from_str(
            "S -> a A d | b B d | a B e | b A e\nA -> c\nB -> c",
        )
        .unwrap();
        let table = lr1(&g);
        assert!(table.is_deterministic());
    }
}
