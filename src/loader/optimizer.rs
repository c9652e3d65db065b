//! ATN optimization passes
//!
//! All passes rewrite the optimized edge lists only; raw lists stay as loaded
//! so alternative numbering never changes. The passes run in rounds until a
//! whole round reports no change:
//!
//! 1. **Inline set rules**: a call of a rule whose body is a single atom, range
//!    or set match is replaced by that match through a fresh basic state.
//! 2. **Combine chained epsilons**: an epsilon edge into a plain pass-through
//!    basic state is replaced by that state's own epsilon edges.
//! 3. **Optimize sets** (parsers only): decision branches that each match one
//!    symbol and meet at the same block end are merged into one set match.

use crate::atn::{Atn, GrammarKind, IntervalSet, StateKind, Transition};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Totals of one optimization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationReport {
    /// Rounds executed, including the final round that changed nothing
    pub rounds: usize,
    pub inlined_calls: usize,
    pub combined_epsilons: usize,
    pub merged_set_edges: usize,
}

impl OptimizationReport {
    pub fn total_changes(&self) -> usize {
        self.inlined_calls + self.combined_epsilons + self.merged_set_edges
    }
}

/// Run all passes to a fixpoint
pub fn optimize(atn: &mut Atn) -> OptimizationReport {
    for state in atn.states.iter_mut() {
        state.ensure_optimized();
    }

    let mut report = OptimizationReport::default();
    loop {
        report.rounds += 1;
        let inlined = inline_set_rules(atn);
        let combined = combine_chained_epsilons(atn);
        let merged = optimize_sets(atn);
        debug!(
            round = report.rounds,
            inlined, combined, merged, "optimizer round"
        );

        report.inlined_calls += inlined;
        report.combined_epsilons += combined;
        report.merged_set_edges += merged;
        if inlined + combined + merged == 0 {
            break;
        }
    }
    report
}

/// Follow single plain-epsilon hops from `from`
fn skip_epsilon_chain(atn: &Atn, from: usize) -> usize {
    let mut current = from;
    let mut visited = FxHashSet::default();
    loop {
        let state = &atn.states[current];
        match state.optimized_transitions() {
            [only] if state.is_epsilon_only() && matches!(only, Transition::Epsilon { .. }) => {
                if !visited.insert(current) {
                    return current;
                }
                current = only.target();
            }
            _ => return current,
        }
    }
}

fn inline_set_rules(atn: &mut Atn) -> usize {
    let inline: Vec<Option<Transition>> = (0..atn.rule_count())
        .map(|rule| inlinable_match(atn, rule))
        .collect();
    if inline.iter().all(Option::is_none) {
        return 0;
    }

    let mut inlined = 0;
    let existing = atn.states.len();
    for number in 0..existing {
        if atn.states[number].rule_index.is_none() {
            continue;
        }

        let current = atn.states[number].optimized_transitions();
        let calls_inlinable = current.iter().filter_map(Transition::as_rule).any(|call| {
            called_rule(atn, call.target, call.rule_index).is_some_and(|rule| inline[rule].is_some())
        });
        if !calls_inlinable {
            continue;
        }

        let current = current.to_vec();
        let mut rewritten = Vec::with_capacity(current.len());
        for transition in current {
            let replacement = transition.as_rule().and_then(|call| {
                let rule = called_rule(atn, call.target, call.rule_index)?;
                let effective = inline[rule].as_ref()?;
                Some((call.follow_state, effective.clone()))
            });

            let Some((follow, effective)) = replacement else {
                rewritten.push(transition);
                continue;
            };
            let follow_rule = atn.states[follow].rule_index;
            let intermediate = atn.add_state(StateKind::Basic, follow_rule);
            atn.states[intermediate].add_transition(effective.retargeted(follow));
            atn.states[intermediate].ensure_optimized();
            rewritten.push(Transition::epsilon(intermediate));
            inlined += 1;
        }
        atn.states[number].set_optimized_transitions(rewritten);
    }
    inlined
}

fn called_rule(atn: &Atn, target: usize, fallback: usize) -> Option<usize> {
    let rule = atn.states.get(target)?.rule_index.unwrap_or(fallback);
    (rule < atn.rule_count()).then_some(rule)
}

/// The single match of a rule body shaped `start ε* -> x -match-> y -ε-> stop`
fn inlinable_match(atn: &Atn, rule: usize) -> Option<Transition> {
    let middle = skip_epsilon_chain(atn, atn.rule_to_start_state[rule]);
    let [matched] = atn.states[middle].optimized_transitions() else {
        return None;
    };
    if !matches!(
        matched,
        Transition::Atom { .. } | Transition::Range { .. } | Transition::Set { .. }
    ) {
        return None;
    }

    let after = &atn.states[matched.target()];
    let [exit] = after.optimized_transitions() else {
        return None;
    };
    let reaches_stop = after.is_epsilon_only()
        && matches!(exit, Transition::Epsilon { .. })
        && exit.target() == atn.rule_to_stop_state[rule];
    reaches_stop.then(|| matched.clone())
}

fn combine_chained_epsilons(atn: &mut Atn) -> usize {
    let mut removed = 0;
    for number in 0..atn.states.len() {
        let rewritten = {
            let state = &atn.states[number];
            let transitions = state.optimized_transitions();
            if state.is_rule_stop()
                || transitions.is_empty()
                || !transitions.iter().all(Transition::is_epsilon)
            {
                continue;
            }

            let mut rewritten: Option<Vec<Transition>> = None;
            for (position, transition) in transitions.iter().enumerate() {
                match pass_through_targets(atn, number, transition) {
                    Some(targets) => {
                        let list =
                            rewritten.get_or_insert_with(|| transitions[..position].to_vec());
                        list.extend(targets.into_iter().map(Transition::epsilon));
                        removed += 1;
                    }
                    None => {
                        if let Some(list) = rewritten.as_mut() {
                            list.push(transition.clone());
                        }
                    }
                }
            }
            rewritten
        };

        if let Some(list) = rewritten {
            atn.states[number].set_optimized_transitions(list);
        }
    }
    removed
}

/// Targets of the intermediate state when `transition` can be spliced out
fn pass_through_targets(atn: &Atn, source: usize, transition: &Transition) -> Option<Vec<usize>> {
    if !transition.is_plain_epsilon() || transition.target() == source {
        return None;
    }
    let intermediate = &atn.states[transition.target()];
    if !matches!(intermediate.kind, StateKind::Basic) || !intermediate.is_epsilon_only() {
        return None;
    }

    if on_epsilon_cycle(atn, intermediate.number) {
        return None;
    }

    let hops = intermediate.optimized_transitions();
    let splicable = !hops.is_empty()
        && hops
            .iter()
            .all(|hop| {
                hop.is_plain_epsilon() && hop.target() != intermediate.number && hop.target() != source
            });
    splicable.then(|| hops.iter().map(Transition::target).collect())
}

fn is_pass_through(atn: &Atn, number: usize) -> bool {
    let state = &atn.states[number];
    matches!(state.kind, StateKind::Basic)
        && state.is_epsilon_only()
        && state
            .optimized_transitions()
            .iter()
            .all(Transition::is_plain_epsilon)
}

/// Whether `start` can reach itself through pass-through states alone
fn on_epsilon_cycle(atn: &Atn, start: usize) -> bool {
    let mut visited = FxHashSet::default();
    let mut pending = vec![start];
    while let Some(number) = pending.pop() {
        if !visited.insert(number) {
            continue;
        }
        for hop in atn.states[number].optimized_transitions() {
            let target = hop.target();
            if target == start {
                return true;
            }
            if is_pass_through(atn, target) {
                pending.push(target);
            }
        }
    }
    false
}

fn optimize_sets(atn: &mut Atn) -> usize {
    if atn.kind == GrammarKind::Lexer {
        return 0;
    }

    let mut removed = 0;
    for decision in 0..atn.decision_to_state.len() {
        let decision_state = atn.decision_to_state[decision];
        let transitions = atn.states[decision_state].optimized_transitions().to_vec();

        let mut block_end = None;
        let mut members = Vec::new();
        for (position, transition) in transitions.iter().enumerate() {
            let Transition::Epsilon { target, .. } = transition else {
                continue;
            };
            let [matched] = atn.states[*target].optimized_transitions() else {
                continue;
            };
            if !matches!(
                matched,
                Transition::Atom { .. } | Transition::Range { .. } | Transition::Set { .. }
            ) {
                continue;
            }
            if !matches!(atn.states[matched.target()].kind, StateKind::BlockEnd { .. }) {
                continue;
            }
            match block_end {
                None => block_end = Some(matched.target()),
                Some(end) if end != matched.target() => continue,
                Some(_) => {}
            }
            members.push(position);
        }

        let Some(end) = block_end else {
            continue;
        };
        if members.len() <= 1 {
            continue;
        }

        let mut set = IntervalSet::new();
        for &position in &members {
            let alternative = transitions[position].target();
            if let Some(label) = atn.states[alternative].optimized_transitions()[0].label() {
                set.add_set(&label);
            }
        }

        let merged = match set.intervals() {
            [only] if only.start == only.end => Transition::atom(end, only.start),
            [only] => Transition::range(end, only.start, only.end),
            _ => Transition::set(end, set),
        };
        let rule = atn.states[decision_state].rule_index;
        let merged_state = atn.add_state(StateKind::Basic, rule);
        atn.states[merged_state].add_transition(merged);
        atn.states[merged_state].ensure_optimized();

        let mut rewritten: Vec<Transition> = transitions
            .iter()
            .enumerate()
            .filter(|(position, _)| !members.contains(position))
            .map(|(_, transition)| transition.clone())
            .collect();
        rewritten.push(Transition::epsilon(merged_state));

        removed += transitions.len() - rewritten.len();
        atn.states[decision_state].set_optimized_transitions(rewritten);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::{BlockFlavor, DecisionInfo, StateType};

    /// Parser rule 0: `a : (B | C | D) ;`
    fn three_way_block() -> (Atn, usize) {
        let mut atn = Atn::new(GrammarKind::Parser, 4);
        let start = atn.add_state(StateKind::from_type(StateType::RuleStart), Some(0));
        let stop = atn.add_state(StateKind::RuleStop, Some(0));
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);

        let block = atn.add_state(
            StateKind::BlockStart {
                flavor: BlockFlavor::Basic,
                end_state: None,
                decision: DecisionInfo::default(),
            },
            Some(0),
        );
        let end = atn.add_state(StateKind::BlockEnd { start_state: Some(block) }, Some(0));
        atn.define_decision_state(block);
        atn.state_mut(start).add_transition(Transition::epsilon(block));

        for token in [1, 2, 3] {
            let alt = atn.add_state(StateKind::Basic, Some(0));
            atn.state_mut(block).add_transition(Transition::epsilon(alt));
            atn.state_mut(alt).add_transition(Transition::atom(end, token));
        }
        atn.state_mut(end).add_transition(Transition::epsilon(stop));
        (atn, block)
    }

    #[test]
    fn test_adjacent_atoms_become_range() {
        let (mut atn, block) = three_way_block();
        let report = optimize(&mut atn);
        assert_eq!(report.merged_set_edges, 2);

        let optimized = atn.state(block).optimized_transitions();
        assert_eq!(optimized.len(), 1);
        let merged = atn.state(optimized[0].target());
        assert!(matches!(
            merged.transitions()[0],
            Transition::Range { start: 1, end: 3, .. }
        ));

        // raw alternatives are untouched
        assert_eq!(atn.state(block).transitions().len(), 3);
    }

    #[test]
    fn test_epsilon_cycle_reaches_fixpoint() {
        let mut atn = Atn::new(GrammarKind::Parser, 1);
        let start = atn.add_state(StateKind::from_type(StateType::RuleStart), Some(0));
        let stop = atn.add_state(StateKind::RuleStop, Some(0));
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);

        let x = atn.add_state(StateKind::Basic, Some(0));
        let y = atn.add_state(StateKind::Basic, Some(0));
        let z = atn.add_state(StateKind::Basic, Some(0));
        atn.state_mut(start).add_transition(Transition::epsilon(x));
        atn.state_mut(x).add_transition(Transition::epsilon(y));
        atn.state_mut(y).add_transition(Transition::epsilon(z));
        atn.state_mut(z).add_transition(Transition::epsilon(y));

        let report = optimize(&mut atn);
        assert_eq!(report.combined_epsilons, 1);
        assert_eq!(report.rounds, 2);
        assert_eq!(atn.state(start).optimized_transitions()[0].target(), y);
        assert_eq!(atn.state(x).optimized_transitions()[0].target(), y);
        assert_eq!(atn.state(z).optimized_transitions()[0].target(), y);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let (mut atn, _) = three_way_block();
        optimize(&mut atn);
        let snapshot = atn.clone();

        let report = optimize(&mut atn);
        assert_eq!(report.total_changes(), 0);
        assert_eq!(report.rounds, 1);
        assert_eq!(atn, snapshot);
    }
}
