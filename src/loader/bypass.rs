//! Rule bypass paths
//!
//! A bypass lets a parser match a whole rule with one synthetic token. Each
//! rule gets a new block (registered as a decision) that either runs the rule
//! body or matches token `max_token_type + rule + 1`.

use super::deserializer::loop_exits_to_rule_stop;
use super::errors::IntegrityError;
use crate::atn::{Atn, BlockFlavor, DecisionInfo, StateKind, Transition};
use tracing::debug;

pub(crate) fn generate_rule_bypass_transitions(atn: &mut Atn) -> Result<(), IntegrityError> {
    let rules = atn.rule_count();
    atn.rule_to_token_type = (0..rules)
        .map(|rule| atn.max_token_type + rule as i32 + 1)
        .collect();

    for rule in 0..rules {
        generate_for_rule(atn, rule)?;
    }
    debug!(rules, "generated rule bypass transitions");
    Ok(())
}

fn generate_for_rule(atn: &mut Atn, rule: usize) -> Result<(), IntegrityError> {
    let bypass_start = atn.add_state(
        StateKind::BlockStart {
            flavor: BlockFlavor::Basic,
            end_state: None,
            decision: DecisionInfo::default(),
        },
        Some(rule),
    );
    let bypass_stop = atn.add_state(
        StateKind::BlockEnd {
            start_state: Some(bypass_start),
        },
        Some(rule),
    );
    if let StateKind::BlockStart { end_state, .. } = &mut atn.states[bypass_start].kind {
        *end_state = Some(bypass_stop);
    }
    atn.define_decision_state(bypass_start)
        .ok_or(IntegrityError::DuplicateDecision {
            state: bypass_start,
        })?;

    // for precedence rules only the prefix before the recursion loop is bypassed
    let (end_state, excluded) = if atn.is_precedence_rule(rule) {
        let entry = find_precedence_prefix_end(atn, rule)
            .ok_or(IntegrityError::PrecedencePrefixNotFound { rule })?;
        let loopback = match atn.states[entry].kind {
            StateKind::StarLoopEntry {
                loopback: Some(loopback),
                ..
            } => loopback,
            _ => return Err(IntegrityError::MissingLoopback { state: entry }),
        };
        (entry, Some((loopback, 0)))
    } else {
        (atn.rule_to_stop_state[rule], None)
    };

    for state in 0..atn.states.len() {
        for (position, transition) in atn.states[state].transitions_mut().iter_mut().enumerate() {
            if excluded == Some((state, position)) {
                continue;
            }
            if transition.target() == end_state {
                transition.set_target(bypass_stop);
            }
        }
    }

    let start = atn.rule_to_start_state[rule];
    for transition in atn.states[start].take_transitions() {
        atn.states[bypass_start].add_transition(transition);
    }
    atn.states[start].add_transition(Transition::epsilon(bypass_start));
    atn.states[bypass_stop].add_transition(Transition::epsilon(end_state));

    let match_state = atn.add_state(StateKind::Basic, Some(rule));
    let token = atn.rule_to_token_type[rule];
    atn.states[match_state].add_transition(Transition::atom(bypass_stop, token));
    atn.states[bypass_start].add_transition(Transition::epsilon(match_state));
    Ok(())
}

fn find_precedence_prefix_end(atn: &Atn, rule: usize) -> Option<usize> {
    atn.states
        .iter()
        .filter(|state| state.rule_index == Some(rule))
        .filter(|state| matches!(state.kind, StateKind::StarLoopEntry { .. }))
        .map(|state| state.number)
        .find(|&entry| loop_exits_to_rule_stop(atn, entry))
}
