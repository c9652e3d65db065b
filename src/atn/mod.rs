//! Augmented transition network graph model
//!
//! This module holds the in-memory form of a grammar automaton:
//! - [`Atn`]: the arena of states plus rule, mode and decision tables
//! - [`AtnState`] / [`StateKind`]: states and their kind-specific links
//! - [`Transition`]: typed edges between states
//! - [`IntervalSet`]: label sets for set transitions and look-ahead
//! - [`LexerAction`]: commands run when a lexer rule matches
//!
//! # Arena Layout
//!
//! States live in one `Vec` and refer to each other by index, so a state's
//! number is always its position in [`Atn::states`]. The graph is cyclic
//! (loops, recursion) which makes indices simpler than shared pointers.
//!
//! # Look-ahead
//!
//! [`Atn::next_tokens`] computes the LL(1) set of a state within its rule, with
//! [`EPSILON`] standing for "the end of the rule is reachable".
//! [`Atn::expected_tokens`] continues through a stack of follow states.

pub mod action;
pub mod interval;
pub mod state;
pub mod transition;

pub use action::{LexerAction, LexerActionType};
pub use interval::{Interval, IntervalSet};
pub use state::{AtnState, BlockFlavor, DecisionInfo, StateKind, StateType};
pub use transition::{RuleTransition, Transition, TransitionKind};

use rustc_hash::FxHashSet;
use std::fmt;

/// Token type of the end-of-input token
pub const EOF: i32 = -1;
/// Marker in look-ahead sets for "rule end reachable"
pub const EPSILON: i32 = -2;
pub const INVALID_TOKEN_TYPE: i32 = 0;
pub const MIN_USER_TOKEN_TYPE: i32 = 1;
pub const MIN_CHAR: i32 = 0;
pub const MAX_CHAR: i32 = 0x10FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    Lexer = 0,
    Parser = 1,
}

impl GrammarKind {
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(GrammarKind::Lexer),
            1 => Some(GrammarKind::Parser),
            _ => None,
        }
    }

    pub fn tag(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarKind::Lexer => write!(f, "lexer"),
            GrammarKind::Parser => write!(f, "parser"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atn {
    pub kind: GrammarKind,
    pub max_token_type: i32,
    pub states: Vec<AtnState>,
    /// Decision states, indexed by decision number
    pub decision_to_state: Vec<usize>,
    pub rule_to_start_state: Vec<usize>,
    pub rule_to_stop_state: Vec<usize>,
    /// Token type per lexer rule, or the bypass token per parser rule
    pub rule_to_token_type: Vec<i32>,
    pub mode_to_start_state: Vec<usize>,
    pub lexer_actions: Vec<LexerAction>,
}

impl Atn {
    pub fn new(kind: GrammarKind, max_token_type: i32) -> Self {
        Atn {
            kind,
            max_token_type,
            states: Vec::new(),
            decision_to_state: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    /// Append a state and return its number
    pub fn add_state(&mut self, kind: StateKind, rule_index: Option<usize>) -> usize {
        let number = self.states.len();
        self.states.push(AtnState::new(number, kind, rule_index));
        number
    }

    pub fn state(&self, number: usize) -> &AtnState {
        &self.states[number]
    }

    pub fn state_mut(&mut self, number: usize) -> &mut AtnState {
        &mut self.states[number]
    }

    /// Register `state` as the next decision
    ///
    /// Returns the decision number, or `None` when the state is not a decision
    /// kind or is already numbered.
    pub fn define_decision_state(&mut self, state: usize) -> Option<usize> {
        let decision = self.decision_to_state.len();
        let info = self.states.get_mut(state)?.kind.decision_mut()?;
        if info.decision.is_some() {
            return None;
        }
        info.decision = Some(decision);
        self.decision_to_state.push(state);
        Some(decision)
    }

    pub fn number_of_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rule_to_start_state.len()
    }

    pub fn is_precedence_rule(&self, rule: usize) -> bool {
        self.rule_to_start_state
            .get(rule)
            .and_then(|&start| self.states.get(start))
            .is_some_and(|state| {
                matches!(
                    state.kind,
                    StateKind::RuleStart {
                        precedence_rule: true,
                        ..
                    }
                )
            })
    }

    pub fn is_left_factored(&self, rule: usize) -> bool {
        self.rule_to_start_state
            .get(rule)
            .and_then(|&start| self.states.get(start))
            .is_some_and(|state| {
                matches!(
                    state.kind,
                    StateKind::RuleStart {
                        left_factored: true,
                        ..
                    }
                )
            })
    }

    /// Tokens that can follow `state` within its rule
    ///
    /// Contains [`EPSILON`] when the rule's end is reachable without consuming
    /// a token.
    pub fn next_tokens(&self, state: usize) -> IntervalSet {
        let mut look = IntervalSet::new();
        let mut busy = FxHashSet::default();
        let mut called = FxHashSet::default();
        let mut follow = Vec::new();
        self.look(state, &mut follow, &mut busy, &mut called, &mut look);
        look
    }

    /// Tokens acceptable at `state` given the follow states of the enclosing
    /// invocations (outermost first)
    ///
    /// [`EOF`] is included when every invocation can complete.
    pub fn expected_tokens(&self, state: usize, follow_states: &[usize]) -> IntervalSet {
        let mut following = self.next_tokens(state);
        if !following.contains(EPSILON) {
            return following;
        }

        let mut expected = IntervalSet::new();
        expected.add_set(&following);
        expected.remove(EPSILON);
        for &follow in follow_states.iter().rev() {
            if !following.contains(EPSILON) {
                break;
            }
            following = self.next_tokens(follow);
            expected.add_set(&following);
            expected.remove(EPSILON);
        }
        if following.contains(EPSILON) {
            expected.add(EOF);
        }
        expected
    }

    fn look(
        &self,
        state: usize,
        follow: &mut Vec<usize>,
        busy: &mut FxHashSet<(usize, Vec<usize>)>,
        called: &mut FxHashSet<usize>,
        look: &mut IntervalSet,
    ) {
        if !busy.insert((state, follow.clone())) {
            return;
        }

        let current = &self.states[state];
        if current.is_rule_stop() {
            let Some(return_state) = follow.pop() else {
                look.add(EPSILON);
                return;
            };
            let finished = current.rule_index;
            if let Some(rule) = finished {
                called.remove(&rule);
            }
            self.look(return_state, follow, busy, called, look);
            if let Some(rule) = finished {
                called.insert(rule);
            }
            follow.push(return_state);
            return;
        }

        for transition in current.transitions() {
            match transition {
                Transition::Rule(rule) => {
                    if !called.insert(rule.rule_index) {
                        continue;
                    }
                    follow.push(rule.follow_state);
                    self.look(rule.target, follow, busy, called, look);
                    follow.pop();
                    called.remove(&rule.rule_index);
                }
                Transition::Epsilon { target, .. }
                | Transition::Predicate { target, .. }
                | Transition::Precedence { target, .. }
                | Transition::Action { target, .. } => {
                    self.look(*target, follow, busy, called, look);
                }
                other => {
                    if let Some(set) = other.match_set(MIN_USER_TOKEN_TYPE, self.max_token_type) {
                        look.add_set(&set);
                    }
                }
            }
        }
    }
}
