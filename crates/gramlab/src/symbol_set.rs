//! Sets of terminal symbols carrying an epsilon marker.

use crate::{
    grammar::{Grammar, TerminalID},
    util::{display_fn, write_joined},
};
use bit_set::BitSet;
use std::fmt;

/// A growable set of terminals. Every mutating operation reports whether the
/// set changed, which is what the fixpoint loops terminate on.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct TerminalSet {
    inner: BitSet,
    epsilon: bool,
}

impl TerminalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set `{epsilon}`.
    pub fn epsilon() -> Self {
        Self {
            inner: BitSet::new(),
            epsilon: true,
        }
    }

    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw() as usize)
    }

    pub fn contains_epsilon(&self) -> bool {
        self.epsilon
    }

    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw() as usize)
    }

    pub fn set_epsilon(&mut self) -> bool {
        !std::mem::replace(&mut self.epsilon, true)
    }

    /// Union `other` into this set, epsilon marker included.
    pub fn update(&mut self, other: &Self) -> bool {
        let mut changed = self.update_terminals(other);
        if other.epsilon {
            changed |= self.set_epsilon();
        }
        changed
    }

    /// Union the terminals of `other` into this set, ignoring its epsilon marker.
    pub fn update_terminals(&mut self, other: &Self) -> bool {
        if other.inner.is_subset(&self.inner) {
            return false;
        }
        self.inner.union_with(&other.inner);
        true
    }

    /// Returns `true` if neither terminals nor epsilon are contained.
    pub fn is_empty(&self) -> bool {
        !self.epsilon && self.inner.is_empty()
    }

    /// The number of terminals, not counting epsilon.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .filter_map(|raw| u16::try_from(raw).ok().map(TerminalID::from_raw))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            let terminals = self.iter().map(|t| g.terminals[&t].name());
            let epsilon = self.epsilon.then_some("epsilon");
            write_joined(f, ", ", terminals.chain(epsilon))?;
            f.write_str("}")
        })
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<T: IntoIterator<Item = TerminalID>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
