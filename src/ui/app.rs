//! Main TUI application state and logic

use super::panes::{
    render_output_pane, render_source_pane, render_stack_pane, render_status_bar,
    render_tokens_pane, OutputLine, SessionState, SourceRenderData, SourceScrollState,
    StackRenderData, StackScrollState, StatusRenderData,
};
use crate::interpreter::{DebugError, DebugEvent, Debugger, RunMode};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::io;
use std::time::Duration;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Output,
    Stack,
    Tokens,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> output -> stack -> tokens)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Tokens,
            FocusedPane::Tokens => FocusedPane::Source,
        }
    }
}

/// The main application state
pub struct App {
    pub debugger: Debugger,

    /// Grammar file text shown in the source pane
    pub grammar_source: String,

    /// Input being parsed and the rule it is parsed with
    pub input: String,
    pub start_rule: usize,

    pub focused_pane: FocusedPane,

    pub source_scroll: SourceScrollState,
    pub stack_scroll: StackScrollState,
    pub tokens_scroll: usize,
    pub output_scroll: usize,

    /// Breakpoint cursor in the source pane (1-based)
    pub cursor_line: usize,

    /// Lines breakpoints were requested on
    pub requested_breakpoints: BTreeSet<usize>,

    /// Lines of validated breakpoints, after snapping
    pub breakpoint_lines: FxHashSet<usize>,

    pub output: Vec<OutputLine>,
    pub session_state: SessionState,
    pub should_quit: bool,
    pub status_message: String,
}

impl App {
    pub fn new(debugger: Debugger, grammar_source: String, input: String, start_rule: usize) -> Self {
        App {
            debugger,
            grammar_source,
            input,
            start_rule,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState {
                offset: 0,
                target_line_row: None,
            },
            stack_scroll: StackScrollState {
                offset: 0,
                prev_item_count: 0,
            },
            tokens_scroll: 0,
            output_scroll: 0,
            cursor_line: 1,
            requested_breakpoints: BTreeSet::new(),
            breakpoint_lines: FxHashSet::default(),
            output: Vec::new(),
            session_state: SessionState::Stopped,
            should_quit: false,
            status_message: String::from("Ready!"),
        }
    }

    /// Start the session and take its first events
    pub fn start(&mut self) -> Result<(), DebugError> {
        self.output.clear();
        let input = self.input.clone();
        self.debugger.start(self.start_rule, &input)?;
        self.collect_events();
        Ok(())
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Declaration line of the innermost active rule
    fn current_line(&self) -> usize {
        self.debugger
            .call_stack()
            .last()
            .and_then(|frame| self.debugger.grammar().rules.get(frame.rule_index))
            .map_or(0, |rule| rule.declaration_line)
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Output (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Stack (top) | Tokens (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        let grammar = self.debugger.grammar();
        let source_data = SourceRenderData {
            source_name: &grammar.source_name,
            source: &self.grammar_source,
            current_line: self.current_line(),
            cursor_line: self.cursor_line,
            breakpoint_lines: &self.breakpoint_lines,
            is_focused: self.focused_pane == FocusedPane::Source,
        };
        render_source_pane(frame, left_rows[0], &source_data, &mut self.source_scroll);

        render_output_pane(
            frame,
            left_rows[1],
            &self.output,
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        render_stack_pane(
            frame,
            right_rows[0],
            StackRenderData {
                frames: self.debugger.call_stack(),
                symbols: self.debugger.symbols(),
                state: self.debugger.current_state(),
            },
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
        );

        render_tokens_pane(
            frame,
            right_rows[1],
            self.debugger.tokens(),
            &grammar.vocabulary,
            self.focused_pane == FocusedPane::Tokens,
            &mut self.tokens_scroll,
        );

        let rule_name = self
            .debugger
            .call_stack()
            .last()
            .map_or("-", |frame| frame.rule_name.as_str());
        render_status_bar(
            frame,
            main_chunks[1],
            &StatusRenderData {
                message: &self.status_message,
                rule_name,
                token_index: self.debugger.token_index().unwrap_or(0),
                token_count: self.debugger.tokens().map_or(0, |t| t.tokens().len()),
                error_count: self.debugger.failures().len() + self.debugger.lexer_diagnostics().len(),
                state: self.session_state,
            },
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char('c') => self.run_mode(RunMode::Normal),
            KeyCode::Char('i') | KeyCode::Right => self.run_mode(RunMode::StepIn),
            KeyCode::Char('o') => self.run_mode(RunMode::StepOver),
            KeyCode::Char('u') => self.run_mode(RunMode::StepOut),
            KeyCode::Char('b') => self.toggle_breakpoint(),
            KeyCode::Char('r') => {
                if let Err(e) = self.start() {
                    self.status_message = format!("Error: {}", e);
                }
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    self.cursor_line = self.cursor_line.saturating_sub(1).max(1);
                }
                FocusedPane::Stack => {
                    self.stack_scroll.offset = self.stack_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Tokens => {
                    self.tokens_scroll = self.tokens_scroll.saturating_sub(1);
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    let last = self.grammar_source.lines().count().max(1);
                    self.cursor_line = (self.cursor_line + 1).min(last);
                }
                FocusedPane::Stack => {
                    self.stack_scroll.offset = self.stack_scroll.offset.saturating_add(1);
                }
                FocusedPane::Tokens => {
                    self.tokens_scroll = self.tokens_scroll.saturating_add(1);
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_add(1);
                }
            },
            _ => {}
        }
    }

    fn run_mode(&mut self, mode: RunMode) {
        match self.debugger.resume(mode) {
            Ok(()) => self.collect_events(),
            Err(e) => self.status_message = format!("Error: {}", e),
        }
    }

    /// Toggle the request at the cursor line and re-apply all breakpoints
    fn toggle_breakpoint(&mut self) {
        // a validated breakpoint is shown on its snapped line
        let snapped = self
            .debugger
            .breakpoints()
            .find(|bp| bp.validated && bp.line == self.cursor_line)
            .map(|bp| bp.requested_line);
        let line = snapped.unwrap_or(self.cursor_line);
        if !self.requested_breakpoints.remove(&line) {
            self.requested_breakpoints.insert(line);
        }

        self.debugger.clear_breakpoints();
        self.breakpoint_lines.clear();
        let source_name = self.debugger.grammar().source_name.clone();
        let mut rejected = 0;
        for &line in &self.requested_breakpoints {
            let breakpoint = self.debugger.add_breakpoint(&source_name, line);
            if !breakpoint.validated {
                rejected += 1;
            }
        }
        self.collect_events();
        self.status_message = if rejected > 0 {
            format!("{} breakpoint(s) not on a rule declaration", rejected)
        } else {
            format!("{} breakpoint(s) set", self.breakpoint_lines.len())
        };
    }

    /// Drain debugger events into the output log and status line
    fn collect_events(&mut self) {
        for event in self.debugger.drain_events() {
            match event {
                DebugEvent::End => {
                    self.session_state = SessionState::Finished;
                    self.status_message = "Parse finished".to_string();
                    if let Some(tree) = self.debugger.parse_tree_text() {
                        self.output.push(OutputLine {
                            text: tree,
                            is_error: false,
                        });
                    }
                }
                DebugEvent::StopOnBreakpoint { state } => {
                    self.session_state = SessionState::AtBreakpoint;
                    self.status_message = format!("Breakpoint hit at state {}", state);
                }
                DebugEvent::StopOnStep { state } => {
                    self.session_state = SessionState::Stopped;
                    self.status_message = format!("Stopped after state {}", state);
                }
                DebugEvent::BreakpointValidated(breakpoint) => {
                    self.breakpoint_lines.insert(breakpoint.line);
                }
                DebugEvent::Output {
                    message,
                    line,
                    column,
                    is_error,
                    ..
                } => {
                    self.output.push(OutputLine {
                        text: format!("line {}:{} {}", line, column, message),
                        is_error,
                    });
                }
            }
        }
        // keep the newest output in view
        self.output_scroll = usize::MAX;
    }
}
