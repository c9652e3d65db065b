mod common;

use atnstep::atn::{Atn, Transition};
use atnstep::interpreter::{DebugEvent, DebuggerConfig};
use atnstep::loader::{optimize, LoaderOptions};
use common::*;
use rstest::rstest;

fn unoptimized(atn: Atn) -> Atn {
    Sketch { atn }.load_with(&LoaderOptions::default().with_optimize(false))
}

/// `s : x x ; x : B ;`
fn set_rule_sketch() -> Sketch {
    let mut sketch = Sketch::parser(4);
    let (s_start, s_stop) = sketch.rule();
    let (x_start, x_stop) = sketch.rule();

    let body = sketch.basic(0);
    sketch.epsilon(s_start, body);
    let between = sketch.call(0, body, 1, 0);
    let after = sketch.call(0, between, 1, 0);
    sketch.epsilon(after, s_stop);

    let first = sketch.basic(1);
    sketch.epsilon(x_start, first);
    let matched = sketch.atoms(1, first, &[1]);
    sketch.epsilon(matched, x_stop);
    sketch
}

#[rstest]
#[case::pair(pair_parser())]
#[case::calls(calls_parser())]
#[case::left_recursive(sum_parser())]
#[case::lexer(words_lexer())]
#[case::modes(string_lexer())]
fn test_second_run_changes_nothing(#[case] atn: Atn) {
    let mut atn = atn;
    let report = optimize(&mut atn);
    assert_eq!(report.total_changes(), 0);
    assert_eq!(report.rounds, 1);
}

#[rstest]
#[case::calls(calls_parser())]
#[case::lexer(words_lexer())]
fn test_raw_edges_are_untouched(#[case] atn: Atn) {
    let plain = unoptimized(atn.clone());
    let mut optimized = plain.clone();
    optimize(&mut optimized);

    assert!(optimized.states.len() >= plain.states.len());
    for (before, after) in plain.states.iter().zip(&optimized.states) {
        assert_eq!(before.transitions(), after.transitions(), "state {}", before.number);
    }
    assert_eq!(plain.decision_to_state, optimized.decision_to_state);
}

#[test]
fn test_chained_epsilons_are_combined() {
    let mut atn = unoptimized(pair_parser());
    let start = atn.rule_to_start_state[0];
    let stop = atn.rule_to_stop_state[0];
    let first = atn.state(start).transitions()[0].target();
    let second = atn.state(first).transitions()[0].target();
    let last = atn.state(second).transitions()[0].target();
    let end = atn.state(last).transitions()[0].target();

    let report = optimize(&mut atn);
    assert_eq!(report.combined_epsilons, 1);
    assert_eq!(atn.state(last).transitions()[0].target(), end);
    assert_eq!(atn.state(last).optimized_transitions().len(), 1);
    assert_eq!(atn.state(last).optimized_transitions()[0].target(), stop);
}

#[test]
fn test_lexer_alternative_order_is_kept() {
    let atn = words_lexer();
    for &mode_start in &atn.mode_to_start_state {
        let state = atn.state(mode_start);
        let raw: Vec<usize> = state.transitions().iter().map(Transition::target).collect();
        let optimized: Vec<usize> = state
            .optimized_transitions()
            .iter()
            .map(Transition::target)
            .collect();
        assert_eq!(raw, optimized);
    }
}

#[test]
fn test_single_match_rules_are_inlined() {
    let sketch = set_rule_sketch();
    let mut atn = sketch.load_with(&LoaderOptions::default().with_optimize(false));
    let body = atn.state(atn.rule_to_start_state[0]).transitions()[0].target();

    let report = optimize(&mut atn);
    assert_eq!(report.inlined_calls, 2);

    let raw = atn.state(body).transitions();
    assert!(matches!(raw, [Transition::Rule(_)]));
    let optimized = atn.state(body).optimized_transitions();
    assert!(optimized.iter().all(|t| t.as_rule().is_none()));
    let intermediate = atn.state(optimized[0].target());
    assert!(matches!(
        intermediate.transitions(),
        [Transition::Atom { label: 1, .. }]
    ));
}

#[test]
fn test_inlined_rules_still_build_rule_nodes() {
    let sketch = set_rule_sketch();
    let mut debugger = debugger(
        sketch.load(),
        letters_lexer(),
        &["s", "x"],
        letters_vocabulary(),
        None,
        DebuggerConfig::default(),
    );
    debugger.start(0, "BB").expect("session starts");

    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
    assert_eq!(debugger.parse_tree_text().as_deref(), Some("(s (x B) (x B))"));
}

#[test]
fn test_single_symbol_branches_merge_into_a_set() {
    let mut sketch = Sketch::parser(4);
    let (start, stop) = sketch.rule();
    let (block, end, alts) = sketch.block(0, 3);
    sketch.epsilon(start, block);
    for (alt, token) in alts.into_iter().zip([1, 2, 4]) {
        sketch.edge(alt, Transition::atom(end, token));
    }
    sketch.epsilon(end, stop);

    let mut atn = sketch.load_with(&LoaderOptions::default().with_optimize(false));
    let report = optimize(&mut atn);
    assert_eq!(report.merged_set_edges, 2);

    let optimized = atn.state(block).optimized_transitions();
    assert_eq!(optimized.len(), 1);
    let merged = atn.state(optimized[0].target());
    let [Transition::Set { set, target }] = merged.transitions() else {
        panic!("expected a set match, got {:?}", merged.transitions());
    };
    assert_eq!(*target, end);
    assert!(set.contains(1) && set.contains(2) && set.contains(4));
    assert!(!set.contains(3));

    // raw alternatives keep their numbering
    assert_eq!(atn.state(block).transitions().len(), 3);
}
