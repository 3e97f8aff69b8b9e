//! Labelled graphs of automata, for rendering with Graphviz.

use crate::{
    automaton::StateGraph,
    finite::Dfa,
    grammar::Grammar,
    item,
    parse_table::{Action, ParseTable},
    util::display_fn,
};
use std::{fmt, hash::Hash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: usize,
    pub label: String,
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatonGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub start: usize,
}

impl AutomatonGraph {
    /// The LR automaton behind `table`. Nodes are labelled with their items,
    /// and the states accepting on end of input are final.
    pub fn from_parse_table(table: &ParseTable) -> Self {
        let g = table.grammar();
        let mut nodes = vec![];
        let mut edges = vec![];
        for (id, state) in table.states() {
            let mut label = format!("{}", id);
            for item in item::items(&state.items) {
                label.push('\n');
                label.push_str(&item.display(g).to_string());
            }
            let is_final = table
                .actions()
                .any(|(s, _, slot)| s == id && slot.as_slice().contains(&Action::Accept));
            nodes.push(GraphNode {
                id: id.index(),
                label,
                is_final,
            });
            for (symbol, next) in &state.transitions {
                edges.push(GraphEdge {
                    from: id.index(),
                    to: next.index(),
                    label: g.symbol_name(*symbol).to_owned(),
                });
            }
        }
        Self {
            nodes,
            edges,
            start: 0,
        }
    }

    /// Edges are labelled with the merged regex of their parallel transitions.
    pub fn from_dfa(dfa: &Dfa, g: &Grammar) -> Self {
        let nodes = (0..dfa.states())
            .map(|id| GraphNode {
                id,
                label: id.to_string(),
                is_final: dfa.finals().contains(&id),
            })
            .collect();
        let edges = (0..dfa.states())
            .flat_map(|from| {
                dfa.outgoing(from).iter().map(move |(to, regex)| GraphEdge {
                    from,
                    to: *to,
                    label: regex.display(g).to_string(),
                })
            })
            .collect();
        Self {
            nodes,
            edges,
            start: dfa.start(),
        }
    }

    /// Epsilon edges are labelled `ε`.
    pub fn from_state_graph<S, T, FS, FT>(graph: &StateGraph<S, T>, symbol_label: FS, tag_label: FT) -> Self
    where
        S: Clone + Eq + Hash,
        FS: Fn(&S) -> String,
        FT: Fn(&T) -> String,
    {
        let mut nodes = vec![];
        let mut edges = vec![];
        for (id, node) in graph.nodes() {
            nodes.push(GraphNode {
                id: id.index(),
                label: tag_label(node.tag()),
                is_final: node.is_final(),
            });
            for (symbol, targets) in node.transitions() {
                for target in targets {
                    edges.push(GraphEdge {
                        from: id.index(),
                        to: target.index(),
                        label: symbol_label(symbol),
                    });
                }
            }
            for target in node.epsilons() {
                edges.push(GraphEdge {
                    from: id.index(),
                    to: target.index(),
                    label: "ε".into(),
                });
            }
        }
        Self {
            nodes,
            edges,
            start: graph.root().index(),
        }
    }

    /// Render in the DOT language.
    pub fn to_dot(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            writeln!(f, "digraph automaton {{")?;
            writeln!(f, "  rankdir=LR;")?;
            writeln!(f, "  node [shape=box];")?;
            writeln!(f, "  start [shape=point];")?;
            for node in &self.nodes {
                let style = if node.is_final { ", style=bold, peripheries=2" } else { "" };
                writeln!(f, "  n{} [label=\"{}\"{}];", node.id, escape(&node.label), style)?;
            }
            writeln!(f, "  start -> n{} [style=dashed];", self.start)?;
            for edge in &self.edges {
                writeln!(
                    f,
                    "  n{} -> n{} [label=\"{}\"];",
                    edge.from,
                    edge.to,
                    escape(&edge.label)
                )?;
            }
            writeln!(f, "}}")
        })
    }
}

fn escape(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\l"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lr0, regular};

    #[test]
    fn dot_of_slr_table() {
        let g = Grammar::from_str("S -> ( S ) | a").unwrap();
        let table = lr0::slr1(&g);
        let graph = AutomatonGraph::from_parse_table(&table);
        assert_eq!(graph.nodes.len(), 6);
        assert_eq!(graph.nodes.iter().filter(|n| n.is_final).count(), 1);

        let dot = graph.to_dot().to_string();
        assert!(dot.starts_with("digraph automaton {\n  rankdir=LR;\n"));
        assert!(dot.contains("start -> n0 [style=dashed];"));
        assert!(dot.contains("[label=\"(\"]"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn dot_of_regular_automaton() {
        let g = Grammar::from_str("S -> a S | b").unwrap();
        let automaton = regular::automaton(&g).unwrap();
        let graph = AutomatonGraph::from_dfa(&automaton.dfa, &g);
        assert_eq!(graph.nodes.len(), automaton.dfa.states());
        assert!(graph.edges.iter().any(|e| e.label == "a" && e.from == e.to));
        assert!(graph.to_dot().to_string().contains("style=bold"));
    }

    #[test]
    fn dot_of_item_automaton() {
        let g = Grammar::from_str("S -> ( S ) | a").unwrap().augmented();
        let nfa = lr0::item_automaton(&g);
        let graph = AutomatonGraph::from_state_graph(
            &nfa,
            |symbol| g.symbol_name(*symbol).to_owned(),
            |item| item.display(&g).to_string(),
        );
        assert_eq!(graph.nodes.len(), nfa.len());
        assert!(graph.edges.iter().any(|e| e.label == "ε"));
        assert!(escape("a \"b\"\nc").contains("\\\"b\\\"\\l"));
    }
}
