//! Shift-reduce parse tables and the driver shared by SLR(1), LR(1) and LALR(1).

use crate::{
    derivation::{Derivation, Handedness, ParseOutcome},
    first_sets::FollowSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    item::{self, LRItemSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl StateID {
    pub const START: Self = Self(0);

    pub const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A table cell, which remembers every value registered into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Empty,
    Single(T),
    Conflict(Vec<T>),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T: PartialEq> Slot<T> {
    /// Put `value` into this cell. Returns `false` if the cell now holds more
    /// than one distinct value.
    pub fn register(&mut self, value: T) -> bool {
        let (next, consistent) = match std::mem::take(self) {
            Slot::Empty => (Slot::Single(value), true),
            Slot::Single(existing) if existing == value => (Slot::Single(existing), true),
            Slot::Single(existing) => (Slot::Conflict(vec![existing, value]), false),
            Slot::Conflict(mut values) => {
                if !values.contains(&value) {
                    values.push(value);
                }
                (Slot::Conflict(values), false)
            }
        };
        *self = next;
        consistent
    }
}

impl<T> Slot<T> {
    /// The first registered value.
    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Slot::Empty => &[],
            Slot::Single(value) => std::slice::from_ref(value),
            Slot::Conflict(values) => values,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Slot::Conflict(..))
    }
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Action::Shift(n) => write!(f, "shift({:?})", n),
            Action::Reduce(r) => write!(f, "reduce({})", g.rules[r].display(g)),
            Action::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TableKind {
    SLR1,
    LR1,
    LALR1,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SLR1 => f.write_str("SLR(1)"),
            Self::LR1 => f.write_str("LR(1)"),
            Self::LALR1 => f.write_str("LALR(1)"),
        }
    }
}

/// A state of an LR automaton. Items of LR(0) automata have no lookaheads.
#[derive(Debug, Clone)]
pub struct ParseState {
    pub items: LRItemSet,
    pub transitions: Map<SymbolID, StateID>,
}

impl ParseState {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for item in item::items(&self.items) {
                writeln!(f, "- {}", item.display(g))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParseTable {
    kind: TableKind,
    grammar: Grammar,
    states: Vec<ParseState>,
    actions: Map<(StateID, TerminalID), Slot<Action>>,
    gotos: Map<(StateID, NonterminalID), Slot<StateID>>,
    consistent: bool,
}

impl ParseTable {
    /// Fill the table from the states of an LR automaton over the augmented
    /// grammar `grammar`. With `follow`, reductions are placed on the FOLLOW
    /// set of the reduced nonterminal (SLR), otherwise on the item lookaheads.
    pub(crate) fn build(
        kind: TableKind,
        grammar: Grammar,
        states: Vec<ParseState>,
        follow: Option<&FollowSets>,
    ) -> Self {
        let _span = tracing::trace_span!("fill_table", %kind).entered();

        let mut actions: Map<(StateID, TerminalID), Slot<Action>> = Map::default();
        let mut gotos: Map<(StateID, NonterminalID), Slot<StateID>> = Map::default();
        let mut consistent = true;

        for (i, state) in states.iter().enumerate() {
            let id = StateID::from_index(i);
            for (core, lookaheads) in &state.items {
                match core.next_symbol(&grammar) {
                    Some(symbol @ SymbolID::T(t)) => {
                        if let Some(next) = state.transitions.get(&symbol) {
                            consistent &= actions
                                .entry((id, t))
                                .or_default()
                                .register(Action::Shift(*next));
                        }
                    }
                    Some(symbol @ SymbolID::N(n)) => {
                        if let Some(next) = state.transitions.get(&symbol) {
                            consistent &= gotos.entry((id, n)).or_default().register(*next);
                        }
                    }
                    None if core.rule == RuleID::ACCEPT => {
                        consistent &= actions
                            .entry((id, TerminalID::EOI))
                            .or_default()
                            .register(Action::Accept);
                    }
                    None => {
                        let left = grammar.rules[&core.rule].left();
                        let lookaheads: Vec<TerminalID> = match follow {
                            Some(follow) => follow.get(left).into_iter().flat_map(|s| s.iter()).collect(),
                            None => lookaheads.iter().copied().collect(),
                        };
                        for lookahead in lookaheads {
                            consistent &= actions
                                .entry((id, lookahead))
                                .or_default()
                                .register(Action::Reduce(core.rule));
                        }
                    }
                }
            }
        }

        let table = Self {
            kind,
            grammar,
            states,
            actions,
            gotos,
            consistent,
        };
        tracing::debug!(
            states = table.states.len(),
            conflicts = table.conflicts().count(),
            "{} table filled",
            kind
        );
        table
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// The augmented grammar the table was built for.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Returns `true` if no cell received two distinct entries.
    pub fn is_deterministic(&self) -> bool {
        self.consistent
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &ParseState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::from_index(i), state))
    }

    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<&Action> {
        self.actions.get(&(state, lookahead)).and_then(Slot::first)
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.gotos.get(&(state, symbol)).and_then(Slot::first).copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = (StateID, TerminalID, &Slot<Action>)> + '_ {
        self.actions
            .iter()
            .map(|((state, lookahead), slot)| (*state, *lookahead, slot))
    }

    pub fn gotos(&self) -> impl Iterator<Item = (StateID, NonterminalID, &Slot<StateID>)> + '_ {
        self.gotos
            .iter()
            .map(|((state, symbol), slot)| (*state, *symbol, slot))
    }

    /// The action cells holding more than one entry.
    pub fn conflicts(&self) -> impl Iterator<Item = (StateID, TerminalID, &[Action])> + '_ {
        self.actions()
            .filter(|(_, _, slot)| slot.is_conflict())
            .map(|(state, lookahead, slot)| (state, lookahead, slot.as_slice()))
    }

    /// Run the shift-reduce driver on `word`, which must not contain the
    /// end-of-input marker. The first entry of a conflicting cell is used.
    pub fn parse(&self, word: &[TerminalID]) -> ParseOutcome {
        let mut stack = vec![StateID::START];
        let mut cursor = 0;
        let mut rules = vec![];

        loop {
            let state = match stack.last() {
                Some(state) => *state,
                None => return ParseOutcome::NotRecognized,
            };
            let lookahead = word.get(cursor).copied().unwrap_or(TerminalID::EOI);

            match self.action(state, lookahead) {
                Some(Action::Shift(next)) => {
                    stack.push(*next);
                    cursor += 1;
                }
                Some(Action::Reduce(rule)) => {
                    let reduced = &self.grammar.rules[rule];
                    let len = reduced.right().len();
                    if len >= stack.len() {
                        return ParseOutcome::NotRecognized;
                    }
                    stack.truncate(stack.len() - len);
                    let top = stack[stack.len() - 1];
                    match self.goto(top, reduced.left()) {
                        Some(next) => stack.push(next),
                        None => return ParseOutcome::NotRecognized,
                    }
                    rules.push(*rule);
                }
                Some(Action::Accept) => {
                    rules.reverse();
                    return ParseOutcome::Derived(Derivation {
                        order: Handedness::Rightmost,
                        rules,
                    });
                }
                None => return ParseOutcome::NotRecognized,
            }
        }
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        let g = &self.grammar;
        display_fn(move |f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## items")?;
                write!(f, "{}", state.display(g))?;

                writeln!(f, "## actions")?;
                for (_, lookahead, slot) in self.actions().filter(|(s, _, _)| *s == id) {
                    write!(f, "- {} => ", g.terminals[&lookahead])?;
                    for (i, action) in slot.as_slice().iter().enumerate() {
                        if i > 0 {
                            f.write_str(" | ")?;
                        }
                        write!(f, "{}", action.display(g))?;
                    }
                    if slot.is_conflict() {
                        f.write_str("  (conflict)")?;
                    }
                    writeln!(f)?;
                }

                writeln!(f, "## gotos")?;
                for (_, symbol, slot) in self.gotos().filter(|(s, _, _)| *s == id) {
                    write!(f, "- {} => ", g.nonterminals[&symbol])?;
                    for (i, goto) in slot.as_slice().iter().enumerate() {
                        if i > 0 {
                            f.write_str(" | ")?;
                        }
                        write!(f, "goto({:?})", goto)?;
                    }
                    writeln!(f)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_registration() {
        let mut slot = Slot::default();
        assert_eq!(slot.first(), None);
        assert!(slot.register(1));
        assert!(slot.register(1));
        assert_eq!(slot, Slot::Single(1));
        assert!(!slot.register(2));
        assert!(!slot.register(1));
        assert_eq!(slot, Slot::Conflict(vec![1, 2]));
        assert_eq!(slot.first(), Some(&1));
        assert!(slot.is_conflict());
    }
}
