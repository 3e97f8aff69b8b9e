//! Analysis of context-free grammars: FIRST/FOLLOW sets, LL(1) and LR parsing
//! tables, regular grammars and their expressions, and normal forms.

pub mod analysis;
pub mod automaton;
pub mod derivation;
pub mod finite;
pub mod first_sets;
pub mod grammar;
pub mod graph;
pub mod item;
pub mod lalr;
pub mod ll1;
pub mod lr0;
pub mod lr1;
pub mod normalize;
pub mod parse_table;
pub mod regex;
pub mod regular;
pub mod symbol_set;
pub mod types;
pub mod util;

pub use crate::{
    analysis::{Analysis, Config},
    grammar::Grammar,
};
