//! Structural verification of a loaded ATN

use super::errors::IntegrityError;
use crate::atn::{Atn, AtnState, BlockFlavor, StateKind};

/// Check the structural invariants every well-formed ATN satisfies
pub(crate) fn verify_atn(atn: &Atn) -> Result<(), IntegrityError> {
    for state in &atn.states {
        if matches!(state.kind, StateKind::Invalid) {
            continue;
        }
        verify_state(atn, state)?;
    }
    Ok(())
}

fn check(condition: bool, state: &AtnState, message: &'static str) -> Result<(), IntegrityError> {
    if condition {
        Ok(())
    } else {
        Err(IntegrityError::Verification {
            state: state.number,
            condition: message,
        })
    }
}

fn target_kind<'a>(atn: &'a Atn, state: &AtnState, position: usize) -> Option<&'a StateKind> {
    state
        .transitions()
        .get(position)
        .map(|t| &atn.states[t.target()].kind)
}

fn verify_state(atn: &Atn, state: &AtnState) -> Result<(), IntegrityError> {
    let transitions = state.transitions().len();
    check(
        state.is_epsilon_only() || transitions <= 1,
        state,
        "state with several transitions must be epsilon-only",
    )?;

    match &state.kind {
        StateKind::BlockStart {
            flavor, end_state, ..
        } => {
            if let BlockFlavor::Plus { loopback } = flavor {
                check(loopback.is_some(), state, "plus block start has no loopback")?;
            }
            check(end_state.is_some(), state, "block start has no end state")?;
        }
        StateKind::StarLoopEntry { loopback, .. } => {
            check(loopback.is_some(), state, "star loop entry has no loopback")?;
            check(
                transitions == 2,
                state,
                "star loop entry must have two transitions",
            )?;

            let first = target_kind(atn, state, 0);
            let second = target_kind(atn, state, 1);
            let enters_first = matches!(
                first,
                Some(StateKind::BlockStart {
                    flavor: BlockFlavor::Star,
                    ..
                })
            );
            let exits_first = matches!(first, Some(StateKind::LoopEnd { .. }));

            if enters_first {
                check(
                    matches!(second, Some(StateKind::LoopEnd { .. })),
                    state,
                    "greedy star loop entry must exit through a loop end",
                )?;
                check(
                    !state.is_non_greedy(),
                    state,
                    "star loop entered first must be greedy",
                )?;
            } else if exits_first {
                check(
                    matches!(
                        second,
                        Some(StateKind::BlockStart {
                            flavor: BlockFlavor::Star,
                            ..
                        })
                    ),
                    state,
                    "non-greedy star loop entry must enter a star block",
                )?;
                check(
                    state.is_non_greedy(),
                    state,
                    "star loop exited first must be non-greedy",
                )?;
            } else {
                check(
                    false,
                    state,
                    "star loop entry must lead to a star block start and a loop end",
                )?;
            }
        }
        StateKind::StarLoopBack => {
            check(
                transitions == 1,
                state,
                "star loopback must have one transition",
            )?;
            check(
                matches!(
                    target_kind(atn, state, 0),
                    Some(StateKind::StarLoopEntry { .. })
                ),
                state,
                "star loopback must lead to a star loop entry",
            )?;
        }
        StateKind::LoopEnd { loopback } => {
            check(loopback.is_some(), state, "loop end has no loopback")?;
        }
        StateKind::RuleStart { stop_state, .. } => {
            check(stop_state.is_some(), state, "rule start has no stop state")?;
        }
        StateKind::BlockEnd { start_state } => {
            check(start_state.is_some(), state, "block end has no start state")?;
        }
        _ => {}
    }

    if state.kind.decision().is_some() {
        check(
            transitions <= 1 || state.decision().is_some(),
            state,
            "decision state with several transitions has no decision number",
        )?;
    } else {
        check(
            transitions <= 1 || state.is_rule_stop(),
            state,
            "non-decision state has several transitions",
        )?;
    }

    Ok(())
}
