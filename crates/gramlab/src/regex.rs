//! Regular expressions over terminals and their synthesis from a DFA.

use crate::{
    automaton::{NodeID, StateGraph},
    finite::Dfa,
    grammar::{Grammar, TerminalID},
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Regex {
    /// The empty word.
    Epsilon,
    Symbol(TerminalID),
    Concat(Vec<Regex>),
    Union(Vec<Regex>),
    Star(Box<Regex>),
}

impl Regex {
    /// Concatenate `parts`, flattening nested concatenations and dropping epsilons.
    pub fn concat<I>(parts: I) -> Regex
    where
        I: IntoIterator<Item = Regex>,
    {
        let mut items = vec![];
        for part in parts {
            match part {
                Regex::Epsilon => (),
                Regex::Concat(inner) => items.extend(inner),
                part => items.push(part),
            }
        }
        match items.len() {
            0 => Regex::Epsilon,
            1 => items.pop().unwrap_or(Regex::Epsilon),
            _ => Regex::Concat(items),
        }
    }

    /// `self | other`, flattening nested unions and dropping duplicates.
    pub fn union(self, other: Regex) -> Regex {
        let mut alternatives = vec![];
        let mut push = |r: Regex| {
            if !alternatives.contains(&r) {
                alternatives.push(r);
            }
        };
        for r in [self, other] {
            match r {
                Regex::Union(inner) => inner.into_iter().for_each(&mut push),
                r => push(r),
            }
        }
        match alternatives.len() {
            1 => alternatives.pop().unwrap_or(Regex::Epsilon),
            _ => Regex::Union(alternatives),
        }
    }

    pub fn star(self) -> Regex {
        match self {
            Regex::Epsilon => Regex::Epsilon,
            r @ Regex::Star(..) => r,
            r => Regex::Star(Box::new(r)),
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| self.fmt_with(f, g))
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, g: &Grammar) -> fmt::Result {
        match self {
            Regex::Epsilon => f.write_str("ε"),
            Regex::Symbol(t) => f.write_str(g.terminals[t].name()),
            Regex::Concat(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    if matches!(part, Regex::Union(..)) {
                        f.write_str("(")?;
                        part.fmt_with(f, g)?;
                        f.write_str(")")?;
                    } else {
                        part.fmt_with(f, g)?;
                    }
                }
                Ok(())
            }
            Regex::Union(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    alternative.fmt_with(f, g)?;
                }
                Ok(())
            }
            Regex::Star(inner) => {
                if matches!(**inner, Regex::Symbol(..)) {
                    inner.fmt_with(f, g)?;
                } else {
                    f.write_str("(")?;
                    inner.fmt_with(f, g)?;
                    f.write_str(")")?;
                }
                f.write_str("*")
            }
        }
    }

    /// Compile into an epsilon-NFA by Thompson's construction.
    pub fn to_automaton(&self) -> StateGraph<TerminalID, ()> {
        let mut graph = StateGraph::new((), false);
        let (entry, exit) = self.build(&mut graph);
        let root = graph.root();
        graph.add_epsilon(root, entry);
        graph.set_final(exit, true);
        graph
    }

    fn build(&self, graph: &mut StateGraph<TerminalID, ()>) -> (NodeID, NodeID) {
        let entry = graph.add_node((), false);
        let exit = graph.add_node((), false);
        match self {
            Regex::Epsilon => graph.add_epsilon(entry, exit),
            Regex::Symbol(t) => graph.add_transition(entry, *t, exit),
            Regex::Concat(parts) => {
                let mut last = entry;
                for part in parts {
                    let (e, x) = part.build(graph);
                    graph.add_epsilon(last, e);
                    last = x;
                }
                graph.add_epsilon(last, exit);
            }
            Regex::Union(alternatives) => {
                for alternative in alternatives {
                    let (e, x) = alternative.build(graph);
                    graph.add_epsilon(entry, e);
                    graph.add_epsilon(x, exit);
                }
            }
            Regex::Star(inner) => {
                let (e, x) = inner.build(graph);
                graph.add_epsilon(entry, e);
                graph.add_epsilon(entry, exit);
                graph.add_epsilon(x, e);
                graph.add_epsilon(x, exit);
            }
        }
        (entry, exit)
    }

    pub fn matches(&self, word: &[TerminalID]) -> bool {
        self.to_automaton().recognize(word)
    }
}

/// Synthesize a regular expression for the language of `dfa` by state elimination.
///
/// Returns `None` when no final state is reachable from the start state.
pub fn from_dfa(dfa: &Dfa) -> Option<Regex> {
    let _span = tracing::trace_span!("regex_from_dfa").entered();

    let order = discovery_order(dfa);
    let mut result: Option<Regex> = None;
    for &target in dfa.finals() {
        if let Some(regex) = regex_to_final(dfa, &order, target) {
            result = Some(match result {
                Some(acc) => acc.union(regex),
                None => regex,
            });
        }
    }
    result
}

/// Reachable states in depth-first order from the start state.
fn discovery_order(dfa: &Dfa) -> Vec<usize> {
    let mut visited = vec![false; dfa.states()];
    let mut order = vec![];
    let mut stack = vec![dfa.start()];
    while let Some(state) = stack.pop() {
        if std::mem::replace(&mut visited[state], true) {
            continue;
        }
        order.push(state);
        let mut successors: Vec<usize> = dfa.outgoing(state).keys().copied().collect();
        successors.reverse();
        stack.extend(successors.into_iter().filter(|s| !visited[*s]));
    }
    order
}

fn regex_to_final(dfa: &Dfa, order: &[usize], target: usize) -> Option<Regex> {
    let start = dfa.start();
    let mut edges = Eliminator {
        incoming: (0..dfa.states()).map(|s| dfa.incoming(s).clone()).collect(),
        outgoing: (0..dfa.states()).map(|s| dfa.outgoing(s).clone()).collect(),
    };
    for &state in order {
        if state != start && state != target {
            edges.eliminate(state);
        }
    }

    let r_ss = edges.label(start, start);
    if start == target {
        return Some(r_ss.map_or(Regex::Epsilon, Regex::star));
    }
    let r_sf = edges.label(start, target)?;
    let r_ff_star = edges.label(target, target).map(Regex::star);
    let r_fs = edges.label(target, start);

    // (Rss | Rsf Rff* Rfs)* Rsf Rff*
    let mut cycle = r_ss;
    if let Some(r_fs) = r_fs {
        let back = Regex::concat([Some(r_sf.clone()), r_ff_star.clone(), Some(r_fs)].into_iter().flatten());
        cycle = Some(match cycle {
            Some(c) => c.union(back),
            None => back,
        });
    }
    Some(Regex::concat(
        [cycle.map(Regex::star), Some(r_sf), r_ff_star]
            .into_iter()
            .flatten(),
    ))
}

struct Eliminator {
    incoming: Vec<Map<usize, Regex>>,
    outgoing: Vec<Map<usize, Regex>>,
}

impl Eliminator {
    fn label(&self, from: usize, to: usize) -> Option<Regex> {
        self.outgoing[from].get(&to).cloned()
    }

    /// Remove `state`, rerouting every path through it. The label `p -> r`
    /// gains `out(p, q) loop(q)* out(q, r)`.
    fn eliminate(&mut self, state: usize) {
        let self_loop = self.label(state, state).map(Regex::star);
        let predecessors: Vec<(usize, Regex)> = self.incoming[state]
            .iter()
            .filter(|(p, _)| **p != state)
            .map(|(p, r)| (*p, r.clone()))
            .collect();
        let successors: Vec<(usize, Regex)> = self.outgoing[state]
            .iter()
            .filter(|(s, _)| **s != state)
            .map(|(s, r)| (*s, r.clone()))
            .collect();

        for (p, into) in &predecessors {
            for (s, out) in &successors {
                let label = Regex::concat(
                    [Some(into.clone()), self_loop.clone(), Some(out.clone())]
                        .into_iter()
                        .flatten(),
                );
                self.connect(*p, *s, label);
            }
        }

        for (p, _) in &predecessors {
            self.outgoing[*p].shift_remove(&state);
        }
        for (s, _) in &successors {
            self.incoming[*s].shift_remove(&state);
        }
        self.incoming[state].clear();
        self.outgoing[state].clear();
    }

    fn connect(&mut self, from: usize, to: usize, label: Regex) {
        let merged = match self.outgoing[from].get(&to) {
            Some(existing) => existing.clone().union(label),
            None => label,
        };
        self.outgoing[from].insert(to, merged.clone());
        self.incoming[to].insert(from, merged);
    }
}
