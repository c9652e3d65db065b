//! Transitions between ATN states
//!
//! Every [`Transition`] owns the index of its target state. Epsilon-like
//! transitions (epsilon, rule, predicate, precedence, action) consume no input;
//! the remaining kinds match one symbol.

use super::interval::IntervalSet;
use std::fmt;

/// Serialized transition type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Epsilon = 1,
    Range = 2,
    Rule = 3,
    Predicate = 4,
    Atom = 5,
    Action = 6,
    Set = 7,
    NotSet = 8,
    Wildcard = 9,
    Precedence = 10,
}

impl TransitionKind {
    pub fn from_tag(tag: u16) -> Option<Self> {
        Some(match tag {
            1 => TransitionKind::Epsilon,
            2 => TransitionKind::Range,
            3 => TransitionKind::Rule,
            4 => TransitionKind::Predicate,
            5 => TransitionKind::Atom,
            6 => TransitionKind::Action,
            7 => TransitionKind::Set,
            8 => TransitionKind::NotSet,
            9 => TransitionKind::Wildcard,
            10 => TransitionKind::Precedence,
            _ => return None,
        })
    }

    pub fn tag(self) -> u16 {
        self as u16
    }
}

/// A rule invocation edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleTransition {
    /// Start state of the called rule
    pub target: usize,
    pub rule_index: usize,
    pub precedence: i32,
    /// State the caller continues from once the called rule completes
    pub follow_state: usize,
    /// Set when only epsilon edges lead from the follow state to rule completion
    pub tail_call: bool,
    /// Same as `tail_call`, computed over the optimized edge lists
    pub optimized_tail_call: bool,
}

impl RuleTransition {
    pub fn new(target: usize, rule_index: usize, precedence: i32, follow_state: usize) -> Self {
        RuleTransition {
            target,
            rule_index,
            precedence,
            follow_state,
            tail_call: false,
            optimized_tail_call: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transition {
    Epsilon {
        target: usize,
        /// Rule index when this edge returns from the outermost invocation of a precedence rule
        outermost_precedence_return: Option<usize>,
    },
    Range {
        target: usize,
        start: i32,
        end: i32,
    },
    Rule(RuleTransition),
    Predicate {
        target: usize,
        rule_index: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },
    Atom {
        target: usize,
        label: i32,
    },
    Action {
        target: usize,
        rule_index: usize,
        action_index: Option<usize>,
        ctx_dependent: bool,
    },
    Set {
        target: usize,
        set: IntervalSet,
    },
    NotSet {
        target: usize,
        set: IntervalSet,
    },
    Wildcard {
        target: usize,
    },
    Precedence {
        target: usize,
        precedence: i32,
    },
}

impl Transition {
    pub fn epsilon(target: usize) -> Self {
        Transition::Epsilon {
            target,
            outermost_precedence_return: None,
        }
    }

    pub fn atom(target: usize, label: i32) -> Self {
        Transition::Atom { target, label }
    }

    pub fn range(target: usize, start: i32, end: i32) -> Self {
        Transition::Range { target, start, end }
    }

    pub fn set(target: usize, set: IntervalSet) -> Self {
        Transition::Set { target, set }
    }

    /// A call of the rule starting at `rule_start`, returning to `follow_state`
    pub fn rule(rule_start: usize, rule_index: usize, precedence: i32, follow_state: usize) -> Self {
        Transition::Rule(RuleTransition::new(
            rule_start,
            rule_index,
            precedence,
            follow_state,
        ))
    }

    pub fn kind(&self) -> TransitionKind {
        match self {
            Transition::Epsilon { .. } => TransitionKind::Epsilon,
            Transition::Range { .. } => TransitionKind::Range,
            Transition::Rule(_) => TransitionKind::Rule,
            Transition::Predicate { .. } => TransitionKind::Predicate,
            Transition::Atom { .. } => TransitionKind::Atom,
            Transition::Action { .. } => TransitionKind::Action,
            Transition::Set { .. } => TransitionKind::Set,
            Transition::NotSet { .. } => TransitionKind::NotSet,
            Transition::Wildcard { .. } => TransitionKind::Wildcard,
            Transition::Precedence { .. } => TransitionKind::Precedence,
        }
    }

    pub fn target(&self) -> usize {
        match self {
            Transition::Rule(rule) => rule.target,
            Transition::Epsilon { target, .. }
            | Transition::Range { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Action { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Precedence { target, .. } => *target,
        }
    }

    pub fn set_target(&mut self, new_target: usize) {
        match self {
            Transition::Rule(rule) => rule.target = new_target,
            Transition::Epsilon { target, .. }
            | Transition::Range { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Action { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Precedence { target, .. } => *target = new_target,
        }
    }

    /// Copy of this transition pointing somewhere else
    pub fn retargeted(&self, target: usize) -> Self {
        let mut copy = self.clone();
        copy.set_target(target);
        copy
    }

    /// True for the kinds that consume no input
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule(_)
                | Transition::Predicate { .. }
                | Transition::Precedence { .. }
                | Transition::Action { .. }
        )
    }

    /// True for a plain epsilon edge without an outermost-precedence marker
    pub fn is_plain_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon {
                outermost_precedence_return: None,
                ..
            }
        )
    }

    /// Transitions that either match a symbol or invoke a rule
    pub fn is_matchable_or_call(&self) -> bool {
        matches!(
            self,
            Transition::Rule(_)
                | Transition::Atom { .. }
                | Transition::Range { .. }
                | Transition::Set { .. }
                | Transition::NotSet { .. }
                | Transition::Wildcard { .. }
        )
    }

    /// Label of an atom, range or set transition
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Transition::Range { start, end, .. } => Some(IntervalSet::of_range(*start, *end)),
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => Some(set.clone()),
            _ => None,
        }
    }

    /// Symbols this transition accepts within `min..=max`
    ///
    /// Not-set and wildcard labels only make sense against a vocabulary, so
    /// they are resolved here. Returns `None` for epsilon-like kinds.
    pub fn match_set(&self, min: i32, max: i32) -> Option<IntervalSet> {
        match self {
            Transition::NotSet { set, .. } => Some(set.complement(min, max)),
            Transition::Wildcard { .. } => Some(IntervalSet::of_range(min, max)),
            other => other.label(),
        }
    }

    /// Whether `symbol` is accepted, with `min..=max` as the vocabulary
    pub fn matches(&self, symbol: i32, min: i32, max: i32) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { start, end, .. } => *start <= symbol && symbol <= *end,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                symbol >= min && symbol <= max && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => symbol >= min && symbol <= max,
            _ => false,
        }
    }

    pub fn as_rule(&self) -> Option<&RuleTransition> {
        match self {
            Transition::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_rule_mut(&mut self) -> Option<&mut RuleTransition> {
        match self {
            Transition::Rule(rule) => Some(rule),
            _ => None,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Epsilon { target, .. } => write!(f, "ε -> {}", target),
            Transition::Range { target, start, end } => {
                write!(f, "{}..{} -> {}", start, end, target)
            }
            Transition::Rule(rule) => write!(
                f,
                "call rule {} (prec {}) -> {}, follow {}",
                rule.rule_index, rule.precedence, rule.target, rule.follow_state
            ),
            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                ..
            } => write!(f, "pred {}:{} -> {}", rule_index, pred_index, target),
            Transition::Atom { target, label } => write!(f, "{} -> {}", label, target),
            Transition::Action {
                target,
                rule_index,
                action_index,
                ..
            } => match action_index {
                Some(index) => write!(f, "action {}:{} -> {}", rule_index, index, target),
                None => write!(f, "action {} -> {}", rule_index, target),
            },
            Transition::Set { target, set } => write!(f, "{} -> {}", set, target),
            Transition::NotSet { target, set } => write!(f, "~{} -> {}", set, target),
            Transition::Wildcard { target } => write!(f, ". -> {}", target),
            Transition::Precedence { target, precedence } => {
                write!(f, "{} >= _p -> {}", precedence, target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Transition::epsilon(1), true)]
    #[case(Transition::rule(4, 1, 0, 2), true)]
    #[case(Transition::Precedence { target: 1, precedence: 2 }, true)]
    #[case(Transition::Action { target: 1, rule_index: 0, action_index: None, ctx_dependent: false }, true)]
    #[case(Transition::atom(1, 5), false)]
    #[case(Transition::Wildcard { target: 1 }, false)]
    fn test_epsilon_like_kinds(#[case] transition: Transition, #[case] epsilon: bool) {
        assert_eq!(transition.is_epsilon(), epsilon);
    }

    #[test]
    fn test_not_set_matches_within_vocabulary() {
        let transition = Transition::NotSet {
            target: 3,
            set: IntervalSet::of_range(2, 3),
        };
        assert!(transition.matches(1, 1, 5));
        assert!(!transition.matches(2, 1, 5));
        assert!(!transition.matches(-1, 1, 5));
        assert!(!transition.matches(6, 1, 5));
        assert_eq!(
            transition.match_set(1, 5),
            Some([1, 4, 5].into_iter().collect())
        );
    }

    #[test]
    fn test_retarget_keeps_label() {
        let moved = Transition::atom(1, 7).retargeted(9);
        assert_eq!(moved, Transition::atom(9, 7));
        assert_eq!(moved.kind(), TransitionKind::Atom);
    }
}
