//! Outbound debugger events
//!
//! The debugger never calls back into its host. Each session call queues the
//! events it produced and the host drains them afterwards.

use super::breakpoints::Breakpoint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// The start rule finished
    End,
    /// Execution reached a validated breakpoint
    StopOnBreakpoint { state: usize },
    /// A step request completed
    StopOnStep { state: usize },
    BreakpointValidated(Breakpoint),
    /// A line of interpreter output; errors carry the offending position
    Output {
        message: String,
        source: Option<String>,
        line: usize,
        column: usize,
        is_error: bool,
    },
}

impl DebugEvent {
    /// Whether this event ends a run
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            DebugEvent::End | DebugEvent::StopOnBreakpoint { .. } | DebugEvent::StopOnStep { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<DebugEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn push(&mut self, event: DebugEvent) {
        self.events.push(event);
    }

    /// Queue an error line
    pub fn error(&mut self, message: String, source: Option<String>, line: usize, column: usize) {
        self.push(DebugEvent::Output {
            message,
            source,
            line,
            column,
            is_error: true,
        });
    }

    /// Take everything queued so far, oldest first
    pub fn drain(&mut self) -> Vec<DebugEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
