//! Right-linear grammars and their finite automata.

use crate::{
    finite::{AutomatonError, Dfa, Nfa},
    grammar::{Grammar, NonterminalID, SymbolID},
    types::Map,
};

/// Returns `true` if every rule has the form `A -> a`, `A -> a B` or
/// `S -> epsilon`, and the start symbol `S` does not occur in a body when it
/// derives epsilon.
pub fn is_regular(g: &Grammar) -> bool {
    let mut derives_epsilon = false;
    let mut start_in_body = false;

    for rule in g.rules.values() {
        match rule.right() {
            [] if rule.left() == g.start_symbol => derives_epsilon = true,
            [] => return false,
            [SymbolID::T(..)] => {}
            [SymbolID::T(..), SymbolID::N(n)] => {
                if *n == g.start_symbol {
                    start_in_body = true;
                }
            }
            _ => return false,
        }
    }

    !(derives_epsilon && start_in_body)
}

/// The automaton of a regular grammar.
///
/// State 0 is the start symbol, the other nonterminals follow in order, and
/// an extra final state is appended when some rule has the form `A -> a`.
#[derive(Debug, Clone)]
pub struct RegularAutomaton {
    pub nfa: Nfa,
    pub dfa: Dfa,
    /// The nonterminal of each NFA state. The extra final state has none.
    pub states: Vec<Option<NonterminalID>>,
}

pub fn automaton(g: &Grammar) -> Result<RegularAutomaton, AutomatonError> {
    let _span = tracing::trace_span!("regular_automaton").entered();

    if !is_regular(g) {
        return Err(AutomatonError::NotRegular);
    }

    let mut states: Vec<Option<NonterminalID>> = vec![Some(g.start_symbol)];
    states.extend(
        g.nonterminals
            .keys()
            .filter(|n| **n != g.start_symbol)
            .map(|n| Some(*n)),
    );
    let index: Map<NonterminalID, usize> = states
        .iter()
        .enumerate()
        .filter_map(|(i, n)| Some(((*n)?, i)))
        .collect();

    let accepting = states.len();
    if g.rules.values().any(|rule| rule.right().len() == 1) {
        states.push(None);
    }

    let mut nfa = Nfa::new(states.len(), 0);
    for rule in g.rules.values() {
        let from = index[&rule.left()];
        match rule.right() {
            [] => nfa.set_final(from),
            [SymbolID::T(t)] => {
                nfa.add_transition(from, *t, accepting);
                nfa.set_final(accepting);
            }
            [SymbolID::T(t), SymbolID::N(n)] => nfa.add_transition(from, *t, index[n]),
            _ => return Err(AutomatonError::NotRegular),
        }
    }

    let dfa = nfa.to_dfa()?;
    tracing::debug!(nfa = nfa.states(), dfa = dfa.states(), "regular automaton built");
    Ok(RegularAutomaton { nfa, dfa, states })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grammar::TerminalID, regex};

    fn words(alphabet: &[TerminalID], max_len: usize) -> Vec<Vec<TerminalID>> {
        let mut all = vec![vec![]];
        let mut last = vec![vec![]];
        for _ in 0..max_len {
            let mut next = vec![];
            for word in &last {
                for t in alphabet {
                    let mut w: Vec<TerminalID> = word.clone();
                    w.push(*t);
                    next.push(w);
                }
            }
            all.extend(next.iter().cloned());
            last = next;
        }
        all
    }

    fn tokens(g: &Grammar, word: &str) -> Vec<TerminalID> {
        word.split_whitespace()
            .map(|t| g.terminal_by_name(t).unwrap())
            .collect()
    }

    #[test]
    fn classification() {
        assert!(is_regular(&Grammar::from_str("S -> a S | b A\nA -> b A | b").unwrap()));
        assert!(is_regular(&Grammar::from_str("S -> a A | epsilon\nA -> b A | b").unwrap()));
        assert!(!is_regular(&Grammar::from_str("S -> a S | epsilon").unwrap()));
        assert!(!is_regular(&Grammar::from_str("S -> S a | a").unwrap()));
        assert!(!is_regular(&Grammar::from_str("S -> a b S | a").unwrap()));
        assert!(!is_regular(&Grammar::from_str("S -> a b").unwrap()));
        assert!(!is_regular(&Grammar::from_str("S -> a A\nA -> epsilon").unwrap()));

        let g = Grammar::from_str("S -> ( S ) | a").unwrap();
        assert!(matches!(automaton(&g), Err(AutomatonError::NotRegular)));
    }

    #[test]
    fn automaton_accepts_language() {
        let g = Grammar::from_str("S -> a S | b A\nA -> b A | b").unwrap();
        let automaton = automaton(&g).unwrap();
        assert_eq!(automaton.nfa.states(), 3);
        assert_eq!(automaton.states[2], None);

        let dfa = &automaton.dfa;
        assert!(dfa.recognize(&tokens(&g, "a b b")));
        assert!(dfa.recognize(&tokens(&g, "b b b")));
        assert!(!dfa.recognize(&tokens(&g, "a b")));
        assert!(!dfa.recognize(&tokens(&g, "b a b")));
        assert!(!dfa.recognize(&[]));
    }

    #[test]
    fn epsilon_start() {
        let g = Grammar::from_str("S -> a A | epsilon\nA -> b A | b").unwrap();
        let automaton = automaton(&g).unwrap();
        assert!(automaton.dfa.recognize(&[]));
        assert!(automaton.dfa.recognize(&tokens(&g, "a b b")));
        assert!(!automaton.dfa.recognize(&tokens(&g, "a")));
    }

    #[test]
    fn regex_round_trip() {
        for text in [
            "S -> a S | b A\nA -> b A | b",
            "S -> a A | epsilon\nA -> b A | b",
            "S -> a A | b\nA -> a S | b A | a",
        ] {
            let g = Grammar::from_str(text).unwrap();
            let automaton = automaton(&g).unwrap();
            let regex = regex::from_dfa(&automaton.dfa).unwrap();
            eprintln!("{}", regex.display(&g));

            let alphabet: Vec<TerminalID> = automaton.nfa.vocabulary().collect();
            for word in words(&alphabet, 6) {
                assert_eq!(
                    regex.matches(&word),
                    automaton.dfa.recognize(&word),
                    "{} on {:?}",
                    text,
                    word
                );
            }
        }
    }
}
