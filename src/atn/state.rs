//! ATN states
//!
//! An [`AtnState`] carries the fields every state shares (number, rule index,
//! raw and optimized edge lists, epsilon-only flag) and a [`StateKind`] with
//! the kind-specific cross-links. Cross-links are arena indices that the loader
//! fills in during its second pass.

use super::transition::Transition;
use tracing::warn;

/// Serialized state type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateType {
    Invalid = 0,
    Basic = 1,
    RuleStart = 2,
    BlockStart = 3,
    PlusBlockStart = 4,
    StarBlockStart = 5,
    TokensStart = 6,
    RuleStop = 7,
    BlockEnd = 8,
    StarLoopBack = 9,
    StarLoopEntry = 10,
    PlusLoopBack = 11,
    LoopEnd = 12,
}

impl StateType {
    pub fn from_tag(tag: u16) -> Option<Self> {
        Some(match tag {
            0 => StateType::Invalid,
            1 => StateType::Basic,
            2 => StateType::RuleStart,
            3 => StateType::BlockStart,
            4 => StateType::PlusBlockStart,
            5 => StateType::StarBlockStart,
            6 => StateType::TokensStart,
            7 => StateType::RuleStop,
            8 => StateType::BlockEnd,
            9 => StateType::StarLoopBack,
            10 => StateType::StarLoopEntry,
            11 => StateType::PlusLoopBack,
            12 => StateType::LoopEnd,
            _ => return None,
        })
    }

    pub fn tag(self) -> u16 {
        self as u16
    }
}

/// Decision number (unset until numbered) and non-greedy flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionInfo {
    pub decision: Option<usize>,
    pub non_greedy: bool,
}

/// The three block-start flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlavor {
    Basic,
    /// `(...)+` block; the loopback is linked after all edges exist
    Plus { loopback: Option<usize> },
    Star,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateKind {
    Invalid,
    Basic,
    RuleStart {
        stop_state: Option<usize>,
        precedence_rule: bool,
        left_factored: bool,
    },
    RuleStop,
    BlockStart {
        flavor: BlockFlavor,
        end_state: Option<usize>,
        decision: DecisionInfo,
    },
    BlockEnd {
        start_state: Option<usize>,
    },
    LoopEnd {
        loopback: Option<usize>,
    },
    PlusLoopBack {
        decision: DecisionInfo,
    },
    StarLoopBack,
    StarLoopEntry {
        decision: DecisionInfo,
        loopback: Option<usize>,
        precedence_decision: bool,
    },
    TokensStart {
        decision: DecisionInfo,
    },
}

impl StateKind {
    /// A fresh kind with all links unset
    pub fn from_type(state_type: StateType) -> Self {
        match state_type {
            StateType::Invalid => StateKind::Invalid,
            StateType::Basic => StateKind::Basic,
            StateType::RuleStart => StateKind::RuleStart {
                stop_state: None,
                precedence_rule: false,
                left_factored: false,
            },
            StateType::BlockStart => StateKind::block_start(BlockFlavor::Basic),
            StateType::PlusBlockStart => {
                StateKind::block_start(BlockFlavor::Plus { loopback: None })
            }
            StateType::StarBlockStart => StateKind::block_start(BlockFlavor::Star),
            StateType::TokensStart => StateKind::TokensStart {
                decision: DecisionInfo::default(),
            },
            StateType::RuleStop => StateKind::RuleStop,
            StateType::BlockEnd => StateKind::BlockEnd { start_state: None },
            StateType::StarLoopBack => StateKind::StarLoopBack,
            StateType::StarLoopEntry => StateKind::StarLoopEntry {
                decision: DecisionInfo::default(),
                loopback: None,
                precedence_decision: false,
            },
            StateType::PlusLoopBack => StateKind::PlusLoopBack {
                decision: DecisionInfo::default(),
            },
            StateType::LoopEnd => StateKind::LoopEnd { loopback: None },
        }
    }

    fn block_start(flavor: BlockFlavor) -> Self {
        StateKind::BlockStart {
            flavor,
            end_state: None,
            decision: DecisionInfo::default(),
        }
    }

    pub fn state_type(&self) -> StateType {
        match self {
            StateKind::Invalid => StateType::Invalid,
            StateKind::Basic => StateType::Basic,
            StateKind::RuleStart { .. } => StateType::RuleStart,
            StateKind::RuleStop => StateType::RuleStop,
            StateKind::BlockStart { flavor, .. } => match flavor {
                BlockFlavor::Basic => StateType::BlockStart,
                BlockFlavor::Plus { .. } => StateType::PlusBlockStart,
                BlockFlavor::Star => StateType::StarBlockStart,
            },
            StateKind::BlockEnd { .. } => StateType::BlockEnd,
            StateKind::LoopEnd { .. } => StateType::LoopEnd,
            StateKind::PlusLoopBack { .. } => StateType::PlusLoopBack,
            StateKind::StarLoopBack => StateType::StarLoopBack,
            StateKind::StarLoopEntry { .. } => StateType::StarLoopEntry,
            StateKind::TokensStart { .. } => StateType::TokensStart,
        }
    }

    pub fn decision(&self) -> Option<&DecisionInfo> {
        match self {
            StateKind::BlockStart { decision, .. }
            | StateKind::PlusLoopBack { decision }
            | StateKind::StarLoopEntry { decision, .. }
            | StateKind::TokensStart { decision } => Some(decision),
            _ => None,
        }
    }

    pub fn decision_mut(&mut self) -> Option<&mut DecisionInfo> {
        match self {
            StateKind::BlockStart { decision, .. }
            | StateKind::PlusLoopBack { decision }
            | StateKind::StarLoopEntry { decision, .. }
            | StateKind::TokensStart { decision } => Some(decision),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtnState {
    /// Index of this state in the ATN arena
    pub number: usize,
    pub rule_index: Option<usize>,
    pub kind: StateKind,
    transitions: Vec<Transition>,
    optimized: Option<Vec<Transition>>,
    epsilon_only: bool,
}

impl AtnState {
    pub fn new(number: usize, kind: StateKind, rule_index: Option<usize>) -> Self {
        AtnState {
            number,
            rule_index,
            kind,
            transitions: Vec::new(),
            optimized: None,
            epsilon_only: false,
        }
    }

    pub fn state_type(&self) -> StateType {
        self.kind.state_type()
    }

    pub fn is_rule_stop(&self) -> bool {
        matches!(self.kind, StateKind::RuleStop)
    }

    pub fn is_rule_start(&self) -> bool {
        matches!(self.kind, StateKind::RuleStart { .. })
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Mutable access to the raw edges, for in-place retargeting
    pub fn transitions_mut(&mut self) -> &mut [Transition] {
        &mut self.transitions
    }

    pub fn add_transition(&mut self, transition: Transition) {
        if self.transitions.is_empty() {
            self.epsilon_only = transition.is_epsilon();
        } else if self.epsilon_only != transition.is_epsilon() {
            warn!(
                state = self.number,
                "state mixes epsilon and non-epsilon transitions"
            );
            self.epsilon_only = false;
        }
        self.transitions.push(transition);
    }

    /// Remove and return all raw edges
    pub fn take_transitions(&mut self) -> Vec<Transition> {
        self.epsilon_only = false;
        std::mem::take(&mut self.transitions)
    }

    pub fn is_epsilon_only(&self) -> bool {
        self.epsilon_only
    }

    pub fn is_optimized(&self) -> bool {
        self.optimized.is_some()
    }

    /// The optimized edge list, or the raw list before optimization
    pub fn optimized_transitions(&self) -> &[Transition] {
        self.optimized.as_deref().unwrap_or(&self.transitions)
    }

    pub fn optimized_transitions_mut(&mut self) -> Option<&mut [Transition]> {
        self.optimized.as_deref_mut()
    }

    pub fn set_optimized_transitions(&mut self, transitions: Vec<Transition>) {
        self.optimized = Some(transitions);
    }

    /// Seed the optimized list with a copy of the raw list if it has none yet
    pub fn ensure_optimized(&mut self) {
        if self.optimized.is_none() {
            self.optimized = Some(self.transitions.clone());
        }
    }

    pub fn decision(&self) -> Option<usize> {
        self.kind.decision().and_then(|info| info.decision)
    }

    pub fn is_non_greedy(&self) -> bool {
        self.kind.decision().is_some_and(|info| info.non_greedy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_only_tracks_first_and_mixed_edges() {
        let mut state = AtnState::new(0, StateKind::Basic, Some(0));
        assert!(!state.is_epsilon_only());

        state.add_transition(Transition::epsilon(1));
        assert!(state.is_epsilon_only());

        state.add_transition(Transition::atom(2, 4));
        assert!(!state.is_epsilon_only());
    }

    #[test]
    fn test_optimized_view_falls_back_to_raw() {
        let mut state = AtnState::new(3, StateKind::Basic, None);
        state.add_transition(Transition::atom(4, 1));
        assert!(!state.is_optimized());
        assert_eq!(state.optimized_transitions(), state.transitions());

        state.set_optimized_transitions(vec![Transition::epsilon(5)]);
        assert_eq!(state.optimized_transitions(), &[Transition::epsilon(5)]);
        assert_eq!(state.transitions(), &[Transition::atom(4, 1)]);
    }

    #[test]
    fn test_state_type_round_trip() {
        for tag in 0..=12 {
            let state_type = StateType::from_tag(tag).expect("known tag");
            assert_eq!(StateKind::from_type(state_type).state_type(), state_type);
        }
        assert_eq!(StateType::from_tag(13), None);
    }
}
