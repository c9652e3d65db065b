//! Call stack of active rules
//!
//! This is the debugger's view of the rule invocations in progress:
//! - [`CallFrame`]: one active rule with its grammar symbols
//! - [`CallStack`]: the frames, outermost first
//!
//! # Symbol Sets
//!
//! Each frame tracks the grammar symbols the interpreter is at (`current`)
//! and the symbols that can match next (`next`). When the interpreter is about
//! to take a matching or calling transition, `next` becomes `current` and a
//! new `next` is computed from the symbol table.

use crate::symbols::SymbolId;

/// Activation record of one rule invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub rule_index: usize,
    pub rule_name: String,
    /// Grammar file the rule is declared in, if known
    pub source_name: Option<String>,
    pub current: Vec<SymbolId>,
    pub next: Vec<SymbolId>,
}

impl CallFrame {
    pub fn new(rule_index: usize, rule_name: impl Into<String>, source_name: Option<String>) -> Self {
        CallFrame {
            rule_index,
            rule_name: rule_name.into(),
            source_name,
            current: Vec::new(),
            next: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Innermost frame
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    /// Frames, outermost first
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_depth() {
        let mut stack = CallStack::new();
        stack.push(CallFrame::new(0, "a", Some("T.g4".to_string())));
        stack.push(CallFrame::new(1, "b", None));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().map(|f| f.rule_name.as_str()), Some("b"));

        let popped = stack.pop();
        assert_eq!(popped.map(|f| f.rule_index), Some(1));
        assert_eq!(stack.frames()[0].source_name.as_deref(), Some("T.g4"));
    }
}
