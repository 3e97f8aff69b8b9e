//! Automata with epsilon transitions, stored as an arena of tagged states.

use crate::types::{Map, Set};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
    hash::Hash,
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeID {
    raw: u32,
}
impl NodeID {
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}
impl fmt::Debug for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.raw)
    }
}
impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug, Clone)]
pub struct Node<S, T> {
    transitions: Map<S, Vec<NodeID>>,
    epsilons: Set<NodeID>,
    is_final: bool,
    tag: T,
}
impl<S, T> Node<S, T>
where
    S: Eq + Hash,
{
    pub fn transitions(&self) -> impl Iterator<Item = (&S, &[NodeID])> + '_ {
        self.transitions.iter().map(|(s, targets)| (s, &targets[..]))
    }

    pub fn targets(&self, symbol: &S) -> &[NodeID] {
        match self.transitions.get(symbol) {
            Some(targets) => targets,
            None => &[],
        }
    }

    pub fn epsilons(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.epsilons.iter().copied()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }
}

/// An automaton over symbols `S` whose states carry a tag `T`.
///
/// The graph is deterministic when no state has epsilon edges and every
/// symbol leads to at most one state.
#[derive(Debug, Clone)]
pub struct StateGraph<S, T> {
    nodes: Vec<Node<S, T>>,
}

impl<S, T> StateGraph<S, T>
where
    S: Clone + Eq + Hash,
{
    /// Create a graph consisting only of the root state.
    pub fn new(root: T, is_final: bool) -> Self {
        let mut graph = Self { nodes: vec![] };
        graph.add_node(root, is_final);
        graph
    }

    pub fn add_node(&mut self, tag: T, is_final: bool) -> NodeID {
        let id = NodeID {
            raw: self.nodes.len() as u32,
        };
        self.nodes.push(Node {
            transitions: Map::default(),
            epsilons: Set::default(),
            is_final,
            tag,
        });
        id
    }

    pub fn add_transition(&mut self, from: NodeID, symbol: S, to: NodeID) {
        let targets = self.nodes[from.index()].transitions.entry(symbol).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    pub fn add_epsilon(&mut self, from: NodeID, to: NodeID) {
        self.nodes[from.index()].epsilons.insert(to);
    }

    pub fn set_final(&mut self, id: NodeID, is_final: bool) {
        self.nodes[id.index()].is_final = is_final;
    }

    pub fn root(&self) -> NodeID {
        NodeID { raw: 0 }
    }

    pub fn node(&self, id: NodeID) -> &Node<S, T> {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeID, &Node<S, T>)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeID { raw: i as u32 }, node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_deterministic(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.epsilons.is_empty() && node.transitions.values().all(|targets| targets.len() <= 1)
        })
    }

    /// All states reachable from `seeds` through epsilon edges alone, seeds included.
    pub fn epsilon_closure<I>(&self, seeds: I) -> BTreeSet<NodeID>
    where
        I: IntoIterator<Item = NodeID>,
    {
        let mut closure = BTreeSet::new();
        let mut pending: VecDeque<NodeID> = seeds.into_iter().collect();
        while let Some(id) = pending.pop_front() {
            if closure.insert(id) {
                pending.extend(self.node(id).epsilons());
            }
        }
        closure
    }

    /// The states reachable from `states` by one `symbol` edge.
    pub fn move_by(&self, states: &BTreeSet<NodeID>, symbol: &S) -> BTreeSet<NodeID> {
        states
            .iter()
            .flat_map(|id| self.node(*id).targets(symbol).iter().copied())
            .collect()
    }

    /// Subset construction. Each state of the result is tagged with the set
    /// of states of `self` it stands for.
    pub fn to_deterministic(&self) -> StateGraph<S, BTreeSet<NodeID>> {
        let _span = tracing::trace_span!("to_deterministic").entered();

        let start = self.epsilon_closure([self.root()]);
        let start_is_final = self.any_final(&start);
        let mut dfa = StateGraph::new(start.clone(), start_is_final);

        let mut visited: Map<BTreeSet<NodeID>, NodeID> = Map::default();
        visited.insert(start, dfa.root());
        let mut pending = VecDeque::from([dfa.root()]);

        while let Some(current) = pending.pop_front() {
            let subset = dfa.node(current).tag().clone();

            let mut symbols: Set<S> = Set::default();
            for id in &subset {
                symbols.extend(self.node(*id).transitions.keys().cloned());
            }

            for symbol in symbols {
                let closure = self.epsilon_closure(self.move_by(&subset, &symbol));
                if closure.is_empty() {
                    continue;
                }
                let next = match visited.get(&closure) {
                    Some(id) => *id,
                    None => {
                        let is_final = self.any_final(&closure);
                        let id = dfa.add_node(closure.clone(), is_final);
                        visited.insert(closure, id);
                        pending.push_back(id);
                        id
                    }
                };
                dfa.add_transition(current, symbol, next);
            }
        }

        tracing::debug!(
            from = self.len(),
            to = dfa.len(),
            "subset construction finished"
        );
        dfa
    }

    fn any_final(&self, states: &BTreeSet<NodeID>) -> bool {
        states.iter().any(|id| self.node(*id).is_final)
    }

    /// Simulate the automaton on `word` and report whether it ends in a final state.
    pub fn recognize(&self, word: &[S]) -> bool {
        let mut current = self.epsilon_closure([self.root()]);
        for symbol in word {
            current = self.epsilon_closure(self.move_by(&current, symbol));
            if current.is_empty() {
                return false;
            }
        }
        self.any_final(&current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // (a|b)* a b, as the textbook NFA.
    fn textbook() -> StateGraph<char, u32> {
        let mut g = StateGraph::new(0, false);
        let s: Vec<_> = (1..=10).map(|i| g.add_node(i, i == 10)).collect();
        let n = |i: usize| if i == 0 { g.root() } else { s[i - 1] };
        let (n0, n1, n2, n3, n4, n5, n6, n7, n8, n9, n10) =
            (n(0), n(1), n(2), n(3), n(4), n(5), n(6), n(7), n(8), n(9), n(10));
        g.add_epsilon(n0, n1);
        g.add_epsilon(n0, n7);
        g.add_epsilon(n1, n2);
        g.add_epsilon(n1, n4);
        g.add_transition(n2, 'a', n3);
        g.add_transition(n4, 'b', n5);
        g.add_epsilon(n3, n6);
        g.add_epsilon(n5, n6);
        g.add_epsilon(n6, n1);
        g.add_epsilon(n6, n7);
        g.add_transition(n7, 'a', n8);
        g.add_transition(n8, 'b', n9);
        g.add_epsilon(n9, n10);
        g
    }

    #[test]
    fn closure_of_root() {
        let g = textbook();
        let closure: Vec<_> = g
            .epsilon_closure([g.root()])
            .into_iter()
            .map(|id| *g.node(id).tag())
            .collect();
        assert_eq!(closure, [0, 1, 2, 4, 7]);
    }

    #[test]
    fn subset_construction() {
        let g = textbook();
        assert!(!g.is_deterministic());

        let dfa = g.to_deterministic();
        assert!(dfa.is_deterministic());
        assert_eq!(dfa.len(), 4);

        for word in ["ab", "aab", "babab", "abab"] {
            let word: Vec<char> = word.chars().collect();
            assert!(g.recognize(&word));
            assert!(dfa.recognize(&word));
        }
        for word in ["", "a", "ba", "abb", "abc"] {
            let word: Vec<char> = word.chars().collect();
            assert!(!g.recognize(&word));
            assert!(!dfa.recognize(&word));
        }
    }
}
