//! Tail-call identification
//!
//! A rule call is a tail call when nothing but epsilon edges lie between its
//! follow state and a rule stop state. The flag is computed twice per call:
//! once over the raw edges and once over the optimized edges.

use crate::atn::{Atn, Transition};
use rustc_hash::FxHashSet;

pub(crate) fn identify_tail_calls(atn: &mut Atn) {
    for number in 0..atn.states.len() {
        let raw_flags = tail_call_flags(atn, atn.states[number].transitions());
        for (position, tail_call, optimized_tail_call) in raw_flags {
            if let Some(call) = atn.states[number].transitions_mut()[position].as_rule_mut() {
                call.tail_call = tail_call;
                call.optimized_tail_call = optimized_tail_call;
            }
        }

        if !atn.states[number].is_optimized() {
            continue;
        }
        let optimized_flags = tail_call_flags(atn, atn.states[number].optimized_transitions());
        if let Some(optimized) = atn.states[number].optimized_transitions_mut() {
            for (position, tail_call, optimized_tail_call) in optimized_flags {
                if let Some(call) = optimized[position].as_rule_mut() {
                    call.tail_call = tail_call;
                    call.optimized_tail_call = optimized_tail_call;
                }
            }
        }
    }
}

fn tail_call_flags(atn: &Atn, transitions: &[Transition]) -> Vec<(usize, bool, bool)> {
    transitions
        .iter()
        .enumerate()
        .filter_map(|(position, transition)| {
            let call = transition.as_rule()?;
            Some((
                position,
                is_tail_call(atn, call.follow_state, false),
                is_tail_call(atn, call.follow_state, true),
            ))
        })
        .collect()
}

fn is_tail_call(atn: &Atn, follow_state: usize, optimized: bool) -> bool {
    let mut reachable = FxHashSet::default();
    let mut worklist = vec![follow_state];

    while let Some(number) = worklist.pop() {
        if !reachable.insert(number) {
            continue;
        }
        let state = &atn.states[number];
        if state.is_rule_stop() {
            continue;
        }
        if !state.is_epsilon_only() {
            return false;
        }

        let transitions = if optimized {
            state.optimized_transitions()
        } else {
            state.transitions()
        };
        for transition in transitions {
            if !matches!(transition, Transition::Epsilon { .. }) {
                return false;
            }
            worklist.push(transition.target());
        }
    }
    true
}
