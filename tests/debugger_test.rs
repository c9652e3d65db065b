// Stepping sessions over small hand-built grammars

mod common;

use atnstep::grammar::GrammarInfo;
use atnstep::interpreter::{DebugEvent, Debugger, DebuggerConfig, RunMode};
use atnstep::symbols::{GrammarSymbols, SymbolId};
use common::*;
use rstest::rstest;

fn stop_on_entry() -> DebuggerConfig {
    DebuggerConfig {
        stop_on_entry: true,
    }
}

fn pair_debugger(config: DebuggerConfig) -> Debugger {
    debugger(
        pair_parser(),
        letters_lexer(),
        &["a"],
        letters_vocabulary(),
        Some(PAIR_SOURCE),
        config,
    )
}

fn calls_debugger(config: DebuggerConfig) -> Debugger {
    debugger(
        calls_parser(),
        letters_lexer(),
        &["s", "a"],
        letters_vocabulary(),
        Some(CALLS_SOURCE),
        config,
    )
}

fn frame_names(debugger: &Debugger) -> Vec<String> {
    debugger
        .call_stack()
        .iter()
        .map(|frame| frame.rule_name.clone())
        .collect()
}

fn error_messages(events: &[DebugEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            DebugEvent::Output {
                message,
                is_error: true,
                ..
            } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_step_in_through_pair() {
    let mut debugger = pair_debugger(stop_on_entry());
    let atn = debugger.parser_atn();
    let start = atn.rule_to_start_state[0];
    let first = atn.state(start).transitions()[0].target();
    let second = atn.state(first).transitions()[0].target();

    debugger.start(0, "BC").expect("session starts");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: start }]);
    assert!(debugger.call_stack().is_empty());

    // rule entry
    debugger.step_in().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: start }]);
    assert_eq!(frame_names(&debugger), vec!["a"]);
    assert_eq!(debugger.token_index(), Some(0));

    // B matched
    debugger.step_in().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: first }]);
    assert_eq!(debugger.token_index(), Some(1));

    // C matched
    debugger.step_in().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: second }]);
    assert_eq!(debugger.token_index(), Some(2));

    debugger.resume(RunMode::Normal).expect("run");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
    assert!(debugger.is_finished());
    assert!(debugger.call_stack().is_empty());
    assert_eq!(debugger.parse_tree_text().as_deref(), Some("(a B C)"));

    let tree = debugger.parse_tree().expect("tree");
    let root = tree.root().expect("root");
    assert_eq!(tree.children(root).len(), 2);
}

#[test]
fn test_resume_after_end_reports_end_again() {
    let mut debugger = pair_debugger(DebuggerConfig::default());
    debugger.start(0, "BC").expect("session starts");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);

    debugger.resume(RunMode::StepIn).expect("run");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
}

#[test]
fn test_resume_before_start_is_an_error() {
    let mut debugger = pair_debugger(DebuggerConfig::default());
    assert!(debugger.resume(RunMode::Normal).is_err());
    assert!(debugger.start(7, "BC").is_err());
}

#[test]
fn test_mismatch_is_reported_once_and_recovered() {
    let mut debugger = pair_debugger(DebuggerConfig::default());
    debugger.start(0, "BB").expect("session starts");

    let events = debugger.drain_events();
    assert_eq!(
        events,
        vec![
            DebugEvent::Output {
                message: "mismatched input 'B' expecting C".to_string(),
                source: None,
                line: 1,
                column: 1,
                is_error: true,
            },
            DebugEvent::End,
        ]
    );
    assert_eq!(debugger.failures().len(), 1);
    assert_eq!(debugger.parse_tree_text().as_deref(), Some("(a B B)"));
}

#[test]
fn test_missing_token_at_end_of_input() {
    let mut debugger = pair_debugger(DebuggerConfig::default());
    debugger.start(0, "B").expect("session starts");

    let events = debugger.drain_events();
    assert_eq!(
        error_messages(&events),
        vec!["mismatched input <EOF> expecting C".to_string()]
    );
    assert_eq!(events.last(), Some(&DebugEvent::End));
}

#[test]
fn test_lexer_errors_are_output_events() {
    let mut debugger = pair_debugger(DebuggerConfig::default());
    debugger.start(0, "BxC").expect("session starts");

    let events = debugger.drain_events();
    assert_eq!(
        events,
        vec![
            DebugEvent::Output {
                message: "token recognition error at: 'x'".to_string(),
                source: None,
                line: 1,
                column: 1,
                is_error: true,
            },
            DebugEvent::End,
        ]
    );
    assert_eq!(debugger.lexer_diagnostics().len(), 1);
    assert_eq!(debugger.parse_tree_text().as_deref(), Some("(a B C)"));
}

#[rstest]
#[case("BDBC", "(s (a B D) (a B C))")]
#[case("BC BD", "(s (a B C) (a B D))")]
fn test_prediction_looks_past_common_prefix(#[case] input: &str, #[case] tree: &str) {
    let mut debugger = calls_debugger(DebuggerConfig::default());
    debugger.start(0, input).expect("session starts");

    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
    assert!(debugger.failures().is_empty());
    assert_eq!(debugger.parse_tree_text().as_deref(), Some(tree));
}

#[test]
fn test_no_viable_alternative() {
    let mut debugger = calls_debugger(DebuggerConfig::default());
    debugger.start(0, "BBBC").expect("session starts");

    let events = debugger.drain_events();
    let messages = error_messages(&events);
    assert_eq!(messages[0], "no viable alternative at input 'BB'");
    assert_eq!(events.last(), Some(&DebugEvent::End));
}

#[test]
fn test_step_over_and_out_of_calls() {
    let mut debugger = calls_debugger(stop_on_entry());
    let atn = debugger.parser_atn();
    let s_start = atn.rule_to_start_state[0];
    let a_start = atn.rule_to_start_state[1];
    let a_stop = atn.rule_to_stop_state[1];

    debugger.start(0, "BDBC").expect("session starts");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: s_start }]);

    debugger.step_in().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: s_start }]);
    assert_eq!(frame_names(&debugger), vec!["s"]);

    // the whole first call of a runs
    debugger.step_over().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: a_stop }]);
    assert_eq!(frame_names(&debugger), vec!["s"]);
    assert_eq!(debugger.token_index(), Some(2));
    assert_eq!(debugger.parse_tree_text().as_deref(), Some("(s (a B D))"));

    debugger.step_in().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: a_start }]);
    assert_eq!(frame_names(&debugger), vec!["s", "a"]);

    debugger.step_out().expect("step");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnStep { state: a_stop }]);
    assert_eq!(frame_names(&debugger), vec!["s"]);
    assert_eq!(debugger.token_index(), Some(4));

    debugger.resume(RunMode::Normal).expect("run");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
    assert_eq!(
        debugger.parse_tree_text().as_deref(),
        Some("(s (a B D) (a B C))")
    );
}

#[rstest]
#[case(3, Some(3))]
#[case(6, Some(5))]
#[case(1, None)]
#[case(5, None)]
#[case(7, None)]
#[case(8, None)]
fn test_breakpoints_validate_on_declaration_lines(
    #[case] line: usize,
    #[case] snapped: Option<usize>,
) {
    let mut debugger = calls_debugger(DebuggerConfig::default());
    let breakpoint = debugger.add_breakpoint("T.g4", line);

    assert_eq!(breakpoint.validated, snapped.is_some());
    assert_eq!(debugger.is_validated(breakpoint.id), snapped.is_some());
    assert_eq!(breakpoint.requested_line, line);
    if let Some(snapped) = snapped {
        assert_eq!(breakpoint.line, snapped);
        assert_eq!(
            debugger.drain_events(),
            vec![DebugEvent::BreakpointValidated(breakpoint)]
        );
    } else {
        assert!(debugger.drain_events().is_empty());
    }
}

#[test]
fn test_breakpoint_in_other_source_is_not_validated() {
    let mut debugger = calls_debugger(DebuggerConfig::default());
    let breakpoint = debugger.add_breakpoint("Other.g4", 6);
    assert!(!breakpoint.validated);
    assert_eq!(breakpoint.state, None);
}

#[test]
fn test_breakpoint_hit_on_every_call() {
    let mut debugger = calls_debugger(DebuggerConfig::default());
    let a_start = debugger.parser_atn().rule_to_start_state[1];
    let breakpoint = debugger.add_breakpoint("T.g4", 6);
    assert_eq!(breakpoint.state, Some(a_start));
    debugger.drain_events();

    debugger.start(0, "BDBC").expect("session starts");
    let events = debugger.drain_events();
    assert!(matches!(events[0], DebugEvent::BreakpointValidated(ref bp) if bp.line == 5));
    assert_eq!(events[1], DebugEvent::StopOnBreakpoint { state: a_start });
    assert_eq!(frame_names(&debugger), vec!["s", "a"]);
    assert_eq!(debugger.token_index(), Some(0));

    debugger.resume(RunMode::Normal).expect("run");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::StopOnBreakpoint { state: a_start }]);
    assert_eq!(debugger.token_index(), Some(2));

    debugger.resume(RunMode::Normal).expect("run");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
}

#[test]
fn test_cleared_breakpoints_no_longer_stop() {
    let mut debugger = calls_debugger(DebuggerConfig::default());
    debugger.add_breakpoint("T.g4", 6);
    debugger.clear_breakpoints();
    assert_eq!(debugger.breakpoints().count(), 0);
    debugger.drain_events();

    debugger.start(0, "BDBC").expect("session starts");
    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
}

#[rstest]
#[case("1", "(e 1)")]
#[case("1+2", "(e (e 1) + (e 2))")]
#[case("1+2+3", "(e (e (e 1) + (e 2)) + (e 3))")]
fn test_left_recursive_rule(#[case] input: &str, #[case] tree: &str) {
    let mut debugger = debugger(
        sum_parser(),
        sum_lexer(),
        &["e"],
        sum_vocabulary(),
        None,
        DebuggerConfig::default(),
    );
    debugger.start(0, input).expect("session starts");

    assert_eq!(debugger.drain_events(), vec![DebugEvent::End]);
    assert!(debugger.failures().is_empty());
    assert_eq!(debugger.parse_tree_text().as_deref(), Some(tree));
}

#[test]
fn test_pause_and_stop_change_nothing() {
    let mut debugger = pair_debugger(stop_on_entry());
    debugger.start(0, "BC").expect("session starts");
    debugger.drain_events();

    debugger.pause();
    debugger.stop();
    assert!(debugger.drain_events().is_empty());
    assert!(!debugger.is_finished());
}

/// Symbols for `s : a a | b ;` and `a : B C | B D ;`
struct CallsSymbols {
    table: GrammarSymbols,
    s: SymbolId,
    first_a: SymbolId,
    second_a: SymbolId,
    a: SymbolId,
    b_before_c: SymbolId,
    b_before_d: SymbolId,
    d: SymbolId,
}

fn calls_symbols() -> CallsSymbols {
    let mut table = GrammarSymbols::new("T.g4");
    let s = table.add_rule("s");
    let pair = table.alternative(s);
    let first_a = table.rule_reference(pair, "a");
    let second_a = table.rule_reference(pair, "a");
    let other = table.alternative(s);
    table.rule_reference(other, "b");

    let a = table.add_rule("a");
    let first = table.alternative(a);
    let b_before_c = table.terminal(first, "B", 1);
    table.terminal(first, "C", 2);
    let second = table.alternative(a);
    let b_before_d = table.terminal(second, "B", 1);
    let d = table.terminal(second, "D", 3);

    CallsSymbols {
        table,
        s,
        first_a,
        second_a,
        a,
        b_before_c,
        b_before_d,
        d,
    }
}

#[test]
fn test_frames_track_symbols_while_stepping() {
    let symbols = calls_symbols();
    let grammar =
        GrammarInfo::from_source("T.g4", CALLS_SOURCE, &["s", "a"], letters_vocabulary());
    let mut debugger = debugger_with_symbols(
        calls_parser(),
        letters_lexer(),
        grammar,
        symbols.table.clone(),
        stop_on_entry(),
    );
    debugger.start(0, "BDBC").expect("session starts");

    debugger.step_in().expect("step");
    let frame = &debugger.call_stack()[0];
    assert_eq!(frame.current, vec![symbols.s]);
    assert_eq!(frame.next, vec![symbols.s]);

    // calling a keeps only the matching reference
    debugger.step_in().expect("step");
    assert_eq!(frame_names(&debugger), vec!["s", "a"]);
    let caller = &debugger.call_stack()[0];
    assert_eq!(caller.current, vec![symbols.s]);
    assert_eq!(caller.next, vec![symbols.first_a]);
    assert_eq!(debugger.call_stack()[1].next, vec![symbols.a]);

    // B is about to match in either alternative
    debugger.step_in().expect("step");
    let frame = &debugger.call_stack()[1];
    assert_eq!(frame.current, vec![symbols.a]);
    assert_eq!(frame.next, vec![symbols.b_before_c, symbols.b_before_d]);

    debugger.step_in().expect("step");
    let frame = &debugger.call_stack()[1];
    assert_eq!(frame.current, vec![symbols.b_before_c, symbols.b_before_d]);
    assert_eq!(frame.next, vec![symbols.d]);

    debugger.step_out().expect("step");
    assert_eq!(frame_names(&debugger), vec!["s"]);

    debugger.step_in().expect("step");
    let caller = &debugger.call_stack()[0];
    assert_eq!(caller.current, vec![symbols.first_a]);
    assert_eq!(caller.next, vec![symbols.second_a]);
}
