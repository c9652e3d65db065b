//! The stepping debugger
//!
//! A [`Debugger`] session tokenizes an input, walks the parser ATN for a start
//! rule and stops wherever the run mode or a breakpoint says so. Every public
//! call runs until it reaches a stop condition and then returns; what happened
//! is queued as [`DebugEvent`]s for the host to drain.

use super::breakpoints::{Breakpoint, Breakpoints};
use super::errors::{DebugError, RecognitionFailure};
use super::events::{DebugEvent, EventQueue};
use super::lexer::{tokenize, LexerDiagnostic};
use super::parser::ParserInterpreter;
use super::stack::{CallFrame, CallStack};
use super::tokens::TokenStream;
use super::tree::ParseTree;
use crate::atn::{Atn, GrammarKind, StateKind, Transition};
use crate::grammar::GrammarInfo;
use crate::symbols::{next_symbols, SymbolFilter, SymbolTable};
use std::sync::Arc;
use tracing::debug;

/// How far a resume call runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Until a breakpoint or the end
    Normal,
    /// Until the next rule entry or token match
    StepIn,
    /// Like `StepIn`, but a rule about to be entered runs to completion
    StepOver,
    /// Until the active rule returns
    StepOut,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebuggerConfig {
    /// Report a step stop on the start rule's entry instead of running
    pub stop_on_entry: bool,
}

pub struct Debugger {
    parser_atn: Arc<Atn>,
    lexer_atn: Arc<Atn>,
    grammar: Arc<GrammarInfo>,
    symbols: Arc<dyn SymbolTable>,
    config: DebuggerConfig,
    session: Option<ParserInterpreter>,
    call_stack: CallStack,
    breakpoints: Breakpoints,
    events: EventQueue,
    lexer_diagnostics: Vec<LexerDiagnostic>,
}

impl Debugger {
    pub fn new(
        parser_atn: Arc<Atn>,
        lexer_atn: Arc<Atn>,
        grammar: Arc<GrammarInfo>,
        symbols: Arc<dyn SymbolTable>,
        config: DebuggerConfig,
    ) -> Result<Self, DebugError> {
        expect_kind(&parser_atn, GrammarKind::Parser)?;
        expect_kind(&lexer_atn, GrammarKind::Lexer)?;
        Ok(Debugger {
            parser_atn,
            lexer_atn,
            grammar,
            symbols,
            config,
            session: None,
            call_stack: CallStack::new(),
            breakpoints: Breakpoints::new(),
            events: EventQueue::new(),
            lexer_diagnostics: Vec::new(),
        })
    }

    /// Begin a run of `rule_index` over `input`
    pub fn start(&mut self, rule_index: usize, input: &str) -> Result<(), DebugError> {
        let count = self.parser_atn.rule_count();
        if rule_index >= count {
            return Err(DebugError::UnknownRule {
                index: rule_index,
                count,
            });
        }

        let (tokens, diagnostics) = tokenize(&self.lexer_atn, input)?;
        for diagnostic in &diagnostics {
            self.events
                .error(diagnostic.message.clone(), None, diagnostic.line, diagnostic.column);
        }
        self.lexer_diagnostics = diagnostics;

        let mut session = ParserInterpreter::new(Arc::clone(&self.parser_atn), TokenStream::new(tokens));
        session.enter_root(rule_index);
        self.session = Some(session);
        self.call_stack.clear();

        self.breakpoints.reset_validation();
        for breakpoint in self.breakpoints.validate_all(&self.parser_atn, &self.grammar) {
            self.events.push(DebugEvent::BreakpointValidated(breakpoint));
        }

        debug!(rule = self.grammar.rule_name(rule_index), "debug session started");
        if self.config.stop_on_entry {
            let state = self.parser_atn.rule_to_start_state[rule_index];
            self.events.push(DebugEvent::StopOnStep { state });
            return Ok(());
        }
        self.resume(RunMode::Normal)
    }

    /// Run until the stop condition of `mode`
    pub fn resume(&mut self, mode: RunMode) -> Result<(), DebugError> {
        let atn = Arc::clone(&self.parser_atn);
        let Some(session) = self.session.as_mut() else {
            return Err(DebugError::NotStarted);
        };
        if session.is_finished() {
            self.events.push(DebugEvent::End);
            return Ok(());
        }

        let entry_depth = self.call_stack.depth();
        let over_rule = mode == RunMode::StepOver && enters_rule(&atn, session.state());

        loop {
            let Some(session) = self.session.as_mut() else {
                return Err(DebugError::NotStarted);
            };
            let p = session.state();
            let state = atn.state(p);

            if let [transition] = state.transitions() {
                if transition.is_matchable_or_call() {
                    self.update_symbols(transition);
                }
            }

            let Some(session) = self.session.as_mut() else {
                return Err(DebugError::NotStarted);
            };
            if state.is_rule_stop() {
                if session.at_root() {
                    session.finish_root();
                    self.call_stack.pop();
                    debug!(state = p, "run finished");
                    self.events.push(DebugEvent::End);
                    return Ok(());
                }
                session.visit_rule_stop();
                self.call_stack.pop();

                let depth = self.call_stack.depth();
                let stepped_out = mode == RunMode::StepOut && depth < entry_depth;
                let stepped_over = over_rule && depth == entry_depth;
                if stepped_out || stepped_over {
                    debug!(state = p, ?mode, "step finished on return");
                    self.events.push(DebugEvent::StopOnStep { state: p });
                    return Ok(());
                }
                continue;
            }

            if state.is_rule_start() {
                self.push_frame(state.rule_index.unwrap_or(0));
            }

            let Some(session) = self.session.as_mut() else {
                return Err(DebugError::NotStarted);
            };
            if let Err(failure) = session.visit_state() {
                self.report_failure(&failure);
                if let Some(session) = self.session.as_mut() {
                    session.fail(failure);
                }
            }

            if self.breakpoints.is_hit(p) {
                debug!(state = p, "breakpoint hit");
                self.events.push(DebugEvent::StopOnBreakpoint { state: p });
                return Ok(());
            }
            let stepping = match mode {
                RunMode::StepIn => true,
                RunMode::StepOver => !over_rule,
                RunMode::Normal | RunMode::StepOut => false,
            };
            if stepping && is_step_point(&atn, p) {
                debug!(state = p, ?mode, "step finished");
                self.events.push(DebugEvent::StopOnStep { state: p });
                return Ok(());
            }
        }
    }

    pub fn step_in(&mut self) -> Result<(), DebugError> {
        self.resume(RunMode::StepIn)
    }

    pub fn step_over(&mut self) -> Result<(), DebugError> {
        self.resume(RunMode::StepOver)
    }

    pub fn step_out(&mut self) -> Result<(), DebugError> {
        self.resume(RunMode::StepOut)
    }

    /// Accepted for protocol completeness; a run always ends at its own
    /// stop condition
    pub fn pause(&mut self) {
        debug!("pause requested, ignored");
    }

    /// Accepted for protocol completeness; there is nothing to tear down
    pub fn stop(&mut self) {
        debug!("stop requested, ignored");
    }

    /// Request a breakpoint; it is validated right away when `line`
    /// declares a rule
    pub fn add_breakpoint(&mut self, source: &str, line: usize) -> Breakpoint {
        let requested = self.breakpoints.add(source, line);
        match self
            .breakpoints
            .validate(requested.id, &self.parser_atn, &self.grammar)
        {
            Some(validated) => {
                self.events
                    .push(DebugEvent::BreakpointValidated(validated.clone()));
                validated
            }
            None => requested,
        }
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn is_validated(&self, id: usize) -> bool {
        self.breakpoints.get(id).is_some_and(|bp| bp.validated)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn drain_events(&mut self) -> Vec<DebugEvent> {
        self.events.drain()
    }

    pub fn current_state(&self) -> Option<usize> {
        self.session.as_ref().map(ParserInterpreter::state)
    }

    /// Active rules, outermost first
    pub fn call_stack(&self) -> &[CallFrame] {
        self.call_stack.frames()
    }

    pub fn tokens(&self) -> Option<&TokenStream> {
        self.session.as_ref().map(ParserInterpreter::tokens)
    }

    pub fn token_index(&self) -> Option<usize> {
        self.tokens().map(TokenStream::index)
    }

    pub fn parse_tree(&self) -> Option<&ParseTree> {
        self.session.as_ref().map(ParserInterpreter::tree)
    }

    /// LISP-style rendering of the parse tree so far
    pub fn parse_tree_text(&self) -> Option<String> {
        let session = self.session.as_ref()?;
        Some(session.tree().to_string_tree(session.tokens(), &self.grammar))
    }

    pub fn is_finished(&self) -> bool {
        self.session.as_ref().is_some_and(ParserInterpreter::is_finished)
    }

    pub fn failures(&self) -> &[RecognitionFailure] {
        self.session.as_ref().map_or(&[][..], ParserInterpreter::failures)
    }

    pub fn lexer_diagnostics(&self) -> &[LexerDiagnostic] {
        &self.lexer_diagnostics
    }

    pub fn grammar(&self) -> &GrammarInfo {
        &self.grammar
    }

    pub fn parser_atn(&self) -> &Atn {
        &self.parser_atn
    }

    pub fn symbols(&self) -> &dyn SymbolTable {
        self.symbols.as_ref()
    }

    fn push_frame(&mut self, rule_index: usize) {
        let name = self.grammar.rule_name(rule_index);
        let symbol = self.symbols.resolve(name);
        let source_name = symbol
            .and_then(|id| self.symbols.source_name(id))
            .map(str::to_string)
            .or_else(|| {
                (!self.grammar.source_name.is_empty()).then(|| self.grammar.source_name.clone())
            });

        let mut frame = CallFrame::new(rule_index, name, source_name);
        frame.current = symbol.into_iter().collect();
        frame.next = frame.current.clone();
        self.call_stack.push(frame);
    }

    /// Promote the active frame's next symbols and find the ones `transition`
    /// will match
    fn update_symbols(&mut self, transition: &Transition) {
        let filter = match transition {
            Transition::Rule(rule) => {
                Some(SymbolFilter::Rule(self.grammar.rule_name(rule.rule_index).to_string()))
            }
            other => SymbolFilter::for_match(other, self.parser_atn.max_token_type),
        };
        let Some(filter) = filter else {
            return;
        };
        let Some(frame) = self.call_stack.current_mut() else {
            return;
        };
        frame.current = std::mem::take(&mut frame.next);
        frame.next = next_symbols(self.symbols.as_ref(), &frame.current, &filter);
    }

    fn report_failure(&mut self, failure: &RecognitionFailure) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let message = failure.describe(session.tokens(), &self.grammar);
        let token = session.tokens().get(failure.offending_token());
        debug!(state = failure.state(), %message, "recognition failure");
        self.events.error(message, None, token.line, token.column);
    }
}

fn expect_kind(atn: &Atn, expected: GrammarKind) -> Result<(), DebugError> {
    if atn.kind == expected {
        Ok(())
    } else {
        Err(DebugError::WrongGrammarKind {
            expected,
            found: atn.kind,
        })
    }
}

/// Whether processing `state` enters a rule
fn enters_rule(atn: &Atn, state: usize) -> bool {
    let state = atn.state(state);
    state.is_rule_start() || matches!(state.transitions(), [Transition::Rule(_)])
}

/// States a single step stops after: rule entries and token matches
fn is_step_point(atn: &Atn, state: usize) -> bool {
    let state = atn.state(state);
    match state.kind {
        StateKind::RuleStart { .. } => true,
        StateKind::Basic => state.transitions().iter().any(|t| !t.is_epsilon()),
        _ => false,
    }
}
