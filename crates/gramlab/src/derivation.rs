//! Derivations produced by the parsers, and the trees built from them.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Handedness {
    /// Expand the leftmost nonterminal first (predictive parsers).
    Leftmost,
    /// Expand the rightmost nonterminal first (shift-reduce parsers).
    Rightmost,
}

/// The sequence of rules applied to derive a word from the start symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub order: Handedness,
    pub rules: Vec<RuleID>,
}

impl Derivation {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, rule) in self.rules.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{}", g.rules[rule].display(g))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Derived(Derivation),
    NotRecognized,
}

impl ParseOutcome {
    pub fn derivation(&self) -> Option<&Derivation> {
        match self {
            Self::Derived(derivation) => Some(derivation),
            Self::NotRecognized => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Derived(..))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationTree {
    pub symbol: SymbolID,
    pub children: Vec<DerivationTree>,
}

impl DerivationTree {
    /// Rebuild the parse tree from a derivation.
    ///
    /// Returns `None` if the derivation ends before every nonterminal has been
    /// expanded, or mentions a rule unknown to `g`.
    pub fn build(g: &Grammar, derivation: &Derivation) -> Option<Self> {
        let mut cursor = derivation.rules.iter();
        Self::build_node(g, derivation.order, &mut cursor)
    }

    fn build_node(
        g: &Grammar,
        order: Handedness,
        cursor: &mut std::slice::Iter<'_, RuleID>,
    ) -> Option<Self> {
        let rule = g.rules.get(cursor.next()?)?;

        let mut body = rule.right().to_vec();
        if order == Handedness::Rightmost {
            body.reverse();
        }

        let mut children = Vec::with_capacity(body.len());
        for symbol in body {
            children.push(match symbol {
                SymbolID::T(..) => Self::leaf(symbol),
                SymbolID::N(..) => Self::build_node(g, order, cursor)?,
            });
        }
        if order == Handedness::Rightmost {
            children.reverse();
        }

        Some(Self {
            symbol: SymbolID::N(rule.left()),
            children,
        })
    }

    fn leaf(symbol: SymbolID) -> Self {
        Self {
            symbol,
            children: vec![],
        }
    }

    /// The terminals at the leaves, from left to right.
    pub fn leaves(&self) -> Vec<SymbolID> {
        let mut leaves = vec![];
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node.symbol {
                SymbolID::T(..) => leaves.push(node.symbol),
                SymbolID::N(..) => stack.extend(node.children.iter().rev()),
            }
        }
        leaves
    }

    /// Render as an indented outline, one node per line.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| self.fmt_outline(f, g, 0))
    }

    fn fmt_outline(&self, f: &mut fmt::Formatter<'_>, g: &Grammar, depth: usize) -> fmt::Result {
        let name = g.symbol_name(self.symbol);
        writeln!(f, "{:indent$}{}", "", name, indent = depth * 2)?;
        if matches!(self.symbol, SymbolID::N(..)) && self.children.is_empty() {
            writeln!(f, "{:indent$}epsilon", "", indent = (depth + 1) * 2)?;
        }
        for child in &self.children {
            child.fmt_outline(f, g, depth + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(g: &Grammar, text: &str) -> RuleID {
        g.rules
            .values()
            .find(|r| r.display(g).to_string() == text)
            .map(|r| r.id())
            .unwrap()
    }

    #[test]
    fn leftmost_and_rightmost_agree() {
        let g = Grammar::from_str("S -> A B\nA -> a\nB -> b | epsilon").unwrap();
        let (s, a, b) = (rule(&g, "S -> A B"), rule(&g, "A -> a"), rule(&g, "B -> b"));

        let leftmost = Derivation {
            order: Handedness::Leftmost,
            rules: vec![s, a, b],
        };
        let rightmost = Derivation {
            order: Handedness::Rightmost,
            rules: vec![s, b, a],
        };
        let t1 = DerivationTree::build(&g, &leftmost).unwrap();
        let t2 = DerivationTree::build(&g, &rightmost).unwrap();
        assert_eq!(t1, t2);

        let leaves: Vec<_> = t1.leaves().into_iter().map(|s| g.symbol_name(s)).collect();
        assert_eq!(leaves, ["a", "b"]);
        assert_eq!(t1.display(&g).to_string(), "S\n  A\n    a\n  B\n    b\n");
    }

    #[test]
    fn epsilon_leaves() {
        let g = Grammar::from_str("S -> A B\nA -> a\nB -> b | epsilon").unwrap();
        let derivation = Derivation {
            order: Handedness::Leftmost,
            rules: vec![rule(&g, "S -> A B"), rule(&g, "A -> a"), rule(&g, "B -> epsilon")],
        };
        let tree = DerivationTree::build(&g, &derivation).unwrap();
        assert_eq!(tree.display(&g).to_string(), "S\n  A\n    a\n  B\n    epsilon\n");
    }

    #[test]
    fn truncated_derivation() {
        let g = Grammar::from_str("S -> A B\nA -> a\nB -> b").unwrap();
        let derivation = Derivation {
            order: Handedness::Leftmost,
            rules: vec![rule(&g, "S -> A B"), rule(&g, "A -> a")],
        };
        assert_eq!(DerivationTree::build(&g, &derivation), None);
    }
}
