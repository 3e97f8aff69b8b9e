//! Finite automata over terminals with integer-indexed states.

use crate::{
    grammar::TerminalID,
    regex::Regex,
    types::{Map, Set},
};
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("invalid DFA: state {state} has more than one transition on terminal #{}", .symbol.into_raw())]
    Nondeterministic { state: usize, symbol: TerminalID },

    #[error("invalid DFA: state {state} is out of range (the automaton has {states} states)")]
    StateOutOfRange { state: usize, states: usize },

    #[error("the grammar is not regular")]
    NotRegular,
}

/// A nondeterministic automaton with epsilon edges.
#[derive(Debug, Clone)]
pub struct Nfa {
    states: usize,
    start: usize,
    finals: BTreeSet<usize>,
    transitions: Map<(usize, TerminalID), BTreeSet<usize>>,
    epsilons: Map<usize, BTreeSet<usize>>,
    vocabulary: Set<TerminalID>,
}

impl Nfa {
    pub fn new(states: usize, start: usize) -> Self {
        Self {
            states,
            start,
            finals: BTreeSet::new(),
            transitions: Map::default(),
            epsilons: Map::default(),
            vocabulary: Set::default(),
        }
    }

    pub fn add_transition(&mut self, from: usize, symbol: TerminalID, to: usize) {
        self.vocabulary.insert(symbol);
        self.transitions.entry((from, symbol)).or_default().insert(to);
    }

    pub fn add_epsilon(&mut self, from: usize, to: usize) {
        self.epsilons.entry(from).or_default().insert(to);
    }

    pub fn set_final(&mut self, state: usize) {
        self.finals.insert(state);
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn finals(&self) -> &BTreeSet<usize> {
        &self.finals
    }

    /// Terminals labelling some edge, in order of first use.
    pub fn vocabulary(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.vocabulary.iter().copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (usize, TerminalID, &BTreeSet<usize>)> + '_ {
        self.transitions
            .iter()
            .map(|((from, symbol), to)| (*from, *symbol, to))
    }

    fn epsilon_closure(&self, seeds: BTreeSet<usize>) -> BTreeSet<usize> {
        let mut closure = BTreeSet::new();
        let mut pending: VecDeque<usize> = seeds.into_iter().collect();
        while let Some(state) = pending.pop_front() {
            if closure.insert(state) {
                if let Some(next) = self.epsilons.get(&state) {
                    pending.extend(next.iter().copied());
                }
            }
        }
        closure
    }

    fn move_by(&self, states: &BTreeSet<usize>, symbol: TerminalID) -> BTreeSet<usize> {
        states
            .iter()
            .filter_map(|state| self.transitions.get(&(*state, symbol)))
            .flatten()
            .copied()
            .collect()
    }

    /// Subset construction.
    pub fn to_dfa(&self) -> Result<Dfa, AutomatonError> {
        let _span = tracing::trace_span!("nfa_to_dfa").entered();

        let start = self.epsilon_closure(Some(self.start).into_iter().collect());
        let mut subsets = vec![start.clone()];
        let mut visited: Map<BTreeSet<usize>, usize> = Map::default();
        visited.insert(start, 0);
        let mut pending = VecDeque::from([0]);
        let mut transitions = vec![];

        while let Some(current) = pending.pop_front() {
            for symbol in self.vocabulary() {
                let closure = self.epsilon_closure(self.move_by(&subsets[current], symbol));
                if closure.is_empty() {
                    continue;
                }
                let next = match visited.get(&closure) {
                    Some(next) => *next,
                    None => {
                        let next = subsets.len();
                        subsets.push(closure.clone());
                        visited.insert(closure, next);
                        pending.push_back(next);
                        next
                    }
                };
                transitions.push(((current, symbol), next));
            }
        }

        let finals = subsets
            .iter()
            .enumerate()
            .filter(|(_, subset)| subset.iter().any(|s| self.finals.contains(s)))
            .map(|(i, _)| i);
        Dfa::new(subsets.len(), 0, finals, transitions)
    }

    pub fn recognize(&self, word: &[TerminalID]) -> bool {
        let mut current = self.epsilon_closure(Some(self.start).into_iter().collect());
        for symbol in word {
            current = self.epsilon_closure(self.move_by(&current, *symbol));
        }
        current.iter().any(|s| self.finals.contains(s))
    }
}

/// A deterministic automaton. Parallel edges between two states are also
/// kept merged into a single regex label, which state elimination starts from.
#[derive(Debug, Clone)]
pub struct Dfa {
    states: usize,
    start: usize,
    finals: BTreeSet<usize>,
    transitions: Map<(usize, TerminalID), usize>,
    incoming: Vec<Map<usize, Regex>>,
    outgoing: Vec<Map<usize, Regex>>,
}

impl Dfa {
    pub fn new<F, T>(states: usize, start: usize, finals: F, transitions: T) -> Result<Self, AutomatonError>
    where
        F: IntoIterator<Item = usize>,
        T: IntoIterator<Item = ((usize, TerminalID), usize)>,
    {
        let check = |state: usize| {
            if state < states {
                Ok(state)
            } else {
                Err(AutomatonError::StateOutOfRange { state, states })
            }
        };

        let mut dfa = Self {
            states,
            start: check(start)?,
            finals: finals.into_iter().map(check).collect::<Result<_, _>>()?,
            transitions: Map::default(),
            incoming: vec![Map::default(); states],
            outgoing: vec![Map::default(); states],
        };

        for ((from, symbol), to) in transitions {
            check(from)?;
            check(to)?;
            match dfa.transitions.get(&(from, symbol)) {
                Some(existing) if *existing == to => continue,
                Some(..) => {
                    return Err(AutomatonError::Nondeterministic {
                        state: from,
                        symbol,
                    })
                }
                None => (),
            }
            dfa.transitions.insert((from, symbol), to);

            let label = match dfa.outgoing[from].get(&to) {
                Some(existing) => existing.clone().union(Regex::Symbol(symbol)),
                None => Regex::Symbol(symbol),
            };
            dfa.outgoing[from].insert(to, label.clone());
            dfa.incoming[to].insert(from, label);
        }

        Ok(dfa)
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn finals(&self) -> &BTreeSet<usize> {
        &self.finals
    }

    pub fn transition(&self, state: usize, symbol: TerminalID) -> Option<usize> {
        self.transitions.get(&(state, symbol)).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (usize, TerminalID, usize)> + '_ {
        self.transitions
            .iter()
            .map(|((from, symbol), to)| (*from, *symbol, *to))
    }

    /// Merged labels of the edges entering `state`, keyed by source.
    pub fn incoming(&self, state: usize) -> &Map<usize, Regex> {
        &self.incoming[state]
    }

    /// Merged labels of the edges leaving `state`, keyed by destination.
    pub fn outgoing(&self, state: usize) -> &Map<usize, Regex> {
        &self.outgoing[state]
    }

    pub fn recognize(&self, word: &[TerminalID]) -> bool {
        let mut current = self.start;
        for symbol in word {
            match self.transition(current, *symbol) {
                Some(next) => current = next,
                None => return false,
            }
        }
        self.finals.contains(&current)
    }
}
