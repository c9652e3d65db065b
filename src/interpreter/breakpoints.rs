//! Breakpoints on grammar source lines
//!
//! A breakpoint is requested for a line in a grammar file. It only becomes
//! active (validated) when that line declares a rule, in which case it is
//! bound to the rule's start state and its line snaps to the start of the
//! rule's source range.

use crate::atn::Atn;
use crate::grammar::GrammarInfo;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub id: usize,
    pub source: String,
    /// Line shown for the breakpoint; snapped once validated
    pub line: usize,
    /// Line the breakpoint was requested on
    pub requested_line: usize,
    pub validated: bool,
    /// Rule start state the breakpoint is bound to
    pub state: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Breakpoints {
    entries: Vec<Breakpoint>,
    /// Bound states of validated breakpoints
    states: FxHashSet<usize>,
    next_id: usize,
}

impl Breakpoints {
    pub fn new() -> Self {
        Breakpoints::default()
    }

    /// Record a breakpoint request, unvalidated
    pub fn add(&mut self, source: &str, line: usize) -> Breakpoint {
        self.next_id += 1;
        let breakpoint = Breakpoint {
            id: self.next_id,
            source: source.to_string(),
            line,
            requested_line: line,
            validated: false,
            state: None,
        };
        self.entries.push(breakpoint.clone());
        breakpoint
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.states.clear();
    }

    /// Try to bind one breakpoint; returns it when it became validated
    pub fn validate(&mut self, id: usize, atn: &Atn, grammar: &GrammarInfo) -> Option<Breakpoint> {
        let entry = self.entries.iter_mut().find(|bp| bp.id == id)?;
        if entry.validated || entry.source != grammar.source_name {
            return None;
        }
        let rule = grammar.rule_declared_at(entry.requested_line)?;
        let state = *atn.rule_to_start_state.get(rule)?;

        entry.validated = true;
        entry.state = Some(state);
        entry.line = grammar.rules[rule].range.start.line;
        self.states.insert(state);
        Some(entry.clone())
    }

    /// Try to bind every breakpoint that is not validated yet
    pub fn validate_all(&mut self, atn: &Atn, grammar: &GrammarInfo) -> Vec<Breakpoint> {
        let ids: Vec<usize> = self.entries.iter().map(|bp| bp.id).collect();
        ids.into_iter()
            .filter_map(|id| self.validate(id, atn, grammar))
            .collect()
    }

    /// Drop all bindings so breakpoints can be validated again
    pub fn reset_validation(&mut self) {
        for entry in &mut self.entries {
            entry.validated = false;
            entry.state = None;
            entry.line = entry.requested_line;
        }
        self.states.clear();
    }

    /// Whether a validated breakpoint is bound to `state`
    pub fn is_hit(&self, state: usize) -> bool {
        self.states.contains(&state)
    }

    pub fn get(&self, id: usize) -> Option<&Breakpoint> {
        self.entries.iter().find(|bp| bp.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
