//! LR items.

use crate::{
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    util::display_fn,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

// X -> Y1 Y2 ... Yn with a marker placed somewhere in the body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItemCore {
    pub rule: RuleID,
    pub marker: usize,
}

impl LRItemCore {
    /// The item with the marker at the beginning of `rule`.
    pub const fn new(rule: RuleID) -> Self {
        Self { rule, marker: 0 }
    }

    /// The symbol right after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rules[&self.rule].right().get(self.marker).copied()
    }

    /// Move the marker over the next symbol.
    pub fn next(&self) -> Self {
        Self {
            marker: self.marker + 1,
            ..*self
        }
    }

    pub fn is_reduce(&self, g: &Grammar) -> bool {
        self.marker >= g.rules[&self.rule].right().len()
    }

    /// The symbols following the next symbol.
    pub fn suffix<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        let right = g.rules[&self.rule].right();
        right.get(self.marker + 1..).unwrap_or(&[])
    }

    /// `beta x` for every lookahead `x`, where `beta` is [`LRItemCore::suffix`].
    pub fn previews<'a, I>(&self, g: &'a Grammar, lookaheads: I) -> impl Iterator<Item = Vec<SymbolID>> + 'a
    where
        I: IntoIterator<Item = TerminalID> + 'a,
        I::IntoIter: 'a,
    {
        let suffix = self.suffix(g);
        lookaheads.into_iter().map(move |x| {
            let mut preview = suffix.to_vec();
            preview.push(SymbolID::T(x));
            preview
        })
    }

    // `X -> Y1 . Y2`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = &g.rules[&self.rule];
            write!(f, "{} ->", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker >= rule.right().len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// An LR(1) item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub core: LRItemCore,
    pub lookaheads: BTreeSet<TerminalID>,
}

impl LRItem {
    /// The LR(0) part of this item.
    pub fn center(&self) -> LRItemCore {
        self.core
    }

    pub fn previews<'a>(&'a self, g: &'a Grammar) -> impl Iterator<Item = Vec<SymbolID>> + 'a {
        self.core.previews(g, self.lookaheads.iter().copied())
    }

    // `X -> Y1 . Y2, a/b`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{}", self.core.display(g))?;
            if !self.lookaheads.is_empty() {
                f.write_str(", ")?;
                for (i, lookahead) in self.lookaheads.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{}", g.terminals[lookahead])?;
                }
            }
            Ok(())
        })
    }
}

/// A set of LR(1) items, compressed by center.
//  - key: the LR(0) core
//  - value: the lookaheads attached to it
pub type LRItemSet = BTreeMap<LRItemCore, BTreeSet<TerminalID>>;

/// Iterate over an item set as individual items.
pub fn items(set: &LRItemSet) -> impl Iterator<Item = LRItem> + '_ {
    set.iter().map(|(core, lookaheads)| LRItem {
        core: *core,
        lookaheads: lookaheads.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_over_a_rule() {
        let g = Grammar::from_str("S -> a S b | c").unwrap();
        let rule = g.rules.values().next().unwrap().id();

        let item = LRItemCore::new(rule);
        assert_eq!(item.display(&g).to_string(), "S -> . a S b");
        assert_eq!(item.next_symbol(&g), g.symbol_by_name("a"));
        assert!(!item.is_reduce(&g));

        let item = item.next();
        assert_eq!(item.display(&g).to_string(), "S -> a . S b");
        assert_eq!(item.suffix(&g), [g.symbol_by_name("b").unwrap()]);

        let eoi = TerminalID::EOI;
        let previews: Vec<_> = item.previews(&g, [eoi]).collect();
        assert_eq!(previews, [vec![g.symbol_by_name("b").unwrap(), SymbolID::T(eoi)]]);

        let item = item.next().next();
        assert!(item.is_reduce(&g));
        assert_eq!(item.next_symbol(&g), None);
        assert!(item.suffix(&g).is_empty());
        assert_eq!(item.display(&g).to_string(), "S -> a S b .");

        let lr1 = LRItem {
            core: item,
            lookaheads: [eoi].into_iter().collect(),
        };
        assert_eq!(lr1.center(), item);
        assert_eq!(lr1.display(&g).to_string(), "S -> a S b ., $");
    }
}
