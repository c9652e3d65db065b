//! Parser interpreter
//!
//! Walks the parser ATN one state at a time. The debugger owns the loop and
//! calls [`ParserInterpreter::visit_state`] or
//! [`ParserInterpreter::visit_rule_stop`] for the state under the cursor; this
//! type owns everything that changes while walking: the cursor, the token
//! position, the rule contexts and the parse tree.
//!
//! # Rule Contexts
//!
//! Rule invocations are parse tree rule nodes linked through their parents.
//! Left-recursive (precedence) rules are handled the ANTLR way: entering one
//! pushes its precedence and the enclosing context, every loop iteration
//! wraps the context parsed so far in a fresh one, and leaving the rule
//! unrolls back to the enclosing context.

use super::errors::RecognitionFailure;
use super::prediction::Prediction;
use super::tokens::TokenStream;
use super::tree::{NodeId, ParseTree};
use crate::atn::{Atn, IntervalSet, StateKind, Transition, EOF, EPSILON, MIN_USER_TOKEN_TYPE};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct ParserInterpreter {
    atn: Arc<Atn>,
    tokens: TokenStream,
    tree: ParseTree,
    /// State under the cursor
    state: usize,
    /// Active rule context
    context: Option<NodeId>,
    start_rule: usize,
    precedence_stack: Vec<i32>,
    /// Enclosing context and invoking state of each precedence rule entry
    parent_contexts: Vec<(Option<NodeId>, Option<usize>)>,
    last_error_index: Option<usize>,
    last_error_states: FxHashSet<usize>,
    failures: Vec<RecognitionFailure>,
    finished: bool,
}

impl ParserInterpreter {
    pub fn new(atn: Arc<Atn>, tokens: TokenStream) -> Self {
        ParserInterpreter {
            atn,
            tokens,
            tree: ParseTree::new(),
            state: 0,
            context: None,
            start_rule: 0,
            precedence_stack: vec![0],
            parent_contexts: Vec::new(),
            last_error_index: None,
            last_error_states: FxHashSet::default(),
            failures: Vec::new(),
            finished: false,
        }
    }

    pub fn atn(&self) -> &Atn {
        &self.atn
    }

    pub fn state(&self) -> usize {
        self.state
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn context(&self) -> Option<NodeId> {
        self.context
    }

    pub fn failures(&self) -> &[RecognitionFailure] {
        &self.failures
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Enter the start rule with the cursor on its start state
    pub fn enter_root(&mut self, rule_index: usize) {
        let start = self.atn.rule_to_start_state[rule_index];
        self.start_rule = rule_index;
        let root = self.tree.add_rule(rule_index, None, None, self.tokens.index());
        if self.atn.is_precedence_rule(rule_index) {
            self.enter_recursion_rule(root, start, 0);
        } else {
            self.enter_rule(root, start);
        }
    }

    /// Whether the active context is the outermost one
    pub fn at_root(&self) -> bool {
        self.context
            .and_then(|node| self.tree.rule(node))
            .map_or(true, |rule| rule.invoking_state.is_none())
    }

    fn enter_rule(&mut self, node: NodeId, state: usize) {
        self.state = state;
        if let Some(parent) = self.tree.rule(node).and_then(|rule| rule.parent) {
            self.tree.attach(parent, node);
        }
        self.context = Some(node);
    }

    fn enter_recursion_rule(&mut self, node: NodeId, state: usize, precedence: i32) {
        let invoking_state = self.tree.rule(node).and_then(|rule| rule.invoking_state);
        self.parent_contexts.push((self.context, invoking_state));
        self.state = state;
        self.precedence_stack.push(precedence);
        self.context = Some(node);
    }

    /// Wrap the active context in a new invocation of the same rule
    fn push_new_recursion_context(&mut self, rule_start: usize) {
        let Some(previous) = self.context else {
            return;
        };
        let Some(rule_index) = self.tree.rule(previous).map(|rule| rule.rule_index) else {
            return;
        };
        let (parent, invoking_state) = self.parent_contexts.last().copied().unwrap_or((None, None));
        let start_token = self.tree.rule(previous).map_or(0, |rule| rule.start_token);
        let stop = self.tokens.previous();

        let wrapper = self.tree.add_rule(rule_index, parent, invoking_state, start_token);
        self.tree.reparent(previous, wrapper);
        if let Some(rule) = self.tree.rule_mut(previous) {
            rule.invoking_state = Some(rule_start);
            rule.stop_token = stop;
        }
        self.context = Some(wrapper);
    }

    fn unroll_recursion_contexts(&mut self, parent: Option<NodeId>) {
        self.precedence_stack.pop();
        let Some(finished) = self.context else {
            return;
        };
        let stop = self.tokens.previous();
        if let Some(rule) = self.tree.rule_mut(finished) {
            rule.stop_token = stop;
            rule.parent = parent;
        }
        if let Some(parent) = parent {
            self.tree.attach(parent, finished);
        }
        self.context = parent;
    }

    fn exit_rule(&mut self) {
        let Some(node) = self.context else {
            return;
        };
        let stop = self.tokens.previous();
        let (parent, invoking_state) = match self.tree.rule_mut(node) {
            Some(rule) => {
                rule.stop_token = stop;
                (rule.parent, rule.invoking_state)
            }
            None => (None, None),
        };
        self.context = parent;
        if let Some(state) = invoking_state {
            self.state = state;
        }
    }

    /// Finish the start rule; the cursor is on its stop state
    pub fn finish_root(&mut self) {
        if self.atn.is_precedence_rule(self.start_rule) {
            let parent = self.parent_contexts.pop().and_then(|(node, _)| node);
            self.unroll_recursion_contexts(parent);
        } else {
            self.exit_rule();
        }
        self.finished = true;
        debug!(rule = self.start_rule, "start rule finished");
    }

    /// Return from the rule whose stop state is under the cursor
    pub fn visit_rule_stop(&mut self) {
        let rule_index = self.atn.state(self.state).rule_index.unwrap_or(0);
        if self.atn.is_precedence_rule(rule_index) {
            let (parent, invoking_state) = self.parent_contexts.pop().unwrap_or((None, None));
            self.unroll_recursion_contexts(parent);
            if let Some(state) = invoking_state {
                self.state = state;
            }
        } else {
            self.exit_rule();
        }

        if let Some(follow) = self.follow_of(self.state) {
            self.state = follow;
        }
    }

    /// Follow state of the rule call leaving `state`
    fn follow_of(&self, state: usize) -> Option<usize> {
        self.atn
            .state(state)
            .transitions()
            .iter()
            .find_map(|t| t.as_rule().map(|rule| rule.follow_state))
    }

    /// Follow states of the live invocations, outermost first
    pub fn follow_states(&self) -> Vec<usize> {
        let mut follows = Vec::new();
        let mut current = self.context;
        while let Some(node) = current {
            let Some(rule) = self.tree.rule(node) else {
                break;
            };
            if let Some(follow) = rule.invoking_state.and_then(|state| self.follow_of(state)) {
                follows.push(follow);
            }
            current = rule.parent;
        }
        follows.reverse();
        follows
    }

    /// Take one transition out of the state under the cursor
    pub fn visit_state(&mut self) -> Result<(), RecognitionFailure> {
        let p = self.state;
        let atn = Arc::clone(&self.atn);
        let state = atn.state(p);

        let alt = if state.transitions().len() > 1 {
            let follow_states = self.follow_states();
            let prediction = Prediction {
                atn: &atn,
                tokens: &self.tokens,
                follow_states: &follow_states,
                precedence: self.precedence(),
            };
            prediction.predict(p)?
        } else {
            1
        };

        let Some(transition) = state.transitions().get(alt - 1) else {
            // a state without edges: nothing to take, leave the rule
            if let Some(rule) = state.rule_index {
                self.state = atn.rule_to_stop_state[rule];
            }
            return Ok(());
        };

        match transition {
            Transition::Epsilon { target, .. } => {
                let precedence_decision = matches!(
                    state.kind,
                    StateKind::StarLoopEntry {
                        precedence_decision: true,
                        ..
                    }
                );
                if precedence_decision
                    && !matches!(atn.state(*target).kind, StateKind::LoopEnd { .. })
                {
                    let rule = state.rule_index.unwrap_or(0);
                    self.push_new_recursion_context(atn.rule_to_start_state[rule]);
                }
            }
            Transition::Atom { label, .. } => self.match_token(p, |la| la == *label)?,
            Transition::Range { .. } | Transition::Set { .. } | Transition::NotSet { .. } => {
                let max = atn.max_token_type;
                self.match_token(p, |la| transition.matches(la, MIN_USER_TOKEN_TYPE, max))?;
            }
            Transition::Wildcard { .. } => self.match_token(p, |la| la != EOF)?,
            Transition::Rule(rule) => {
                let node = self.tree.add_rule(
                    rule.rule_index,
                    self.context,
                    Some(p),
                    self.tokens.index(),
                );
                if atn.is_precedence_rule(rule.rule_index) {
                    self.enter_recursion_rule(node, rule.target, rule.precedence);
                } else {
                    self.enter_rule(node, rule.target);
                }
            }
            Transition::Precedence { precedence, .. } => {
                if *precedence < self.precedence() {
                    return Err(RecognitionFailure::FailedPredicate {
                        state: p,
                        rule_index: state.rule_index.unwrap_or(0),
                        offending_token: self.tokens.index(),
                        predicate: format!("precpred(_ctx, {})", precedence),
                    });
                }
            }
            Transition::Predicate { .. } | Transition::Action { .. } => {}
        }

        self.state = transition.target();
        Ok(())
    }

    fn precedence(&self) -> i32 {
        self.precedence_stack.last().copied().unwrap_or(0)
    }

    fn match_token(
        &mut self,
        state: usize,
        accepts: impl Fn(i32) -> bool,
    ) -> Result<(), RecognitionFailure> {
        let la = self.tokens.la();
        if !accepts(la) {
            let expected = self.atn.expected_tokens(state, &self.follow_states());
            return Err(RecognitionFailure::InputMismatch {
                state,
                offending_token: self.tokens.index(),
                expected,
            });
        }
        if let Some(node) = self.context {
            self.tree.add_terminal(node, self.tokens.index());
        }
        self.tokens.consume();
        Ok(())
    }

    /// Record `failure`, leave the failing rule and resynchronize
    ///
    /// The cursor moves to the stop state of the rule the failure happened
    /// in, then tokens are consumed until one can follow some live
    /// invocation.
    pub fn fail(&mut self, failure: RecognitionFailure) {
        let rule = self.atn.state(failure.state()).rule_index.unwrap_or(0);
        self.state = self.atn.rule_to_stop_state[rule];
        if let Some(node) = self.context.and_then(|node| self.tree.rule_mut(node)) {
            node.failure = Some(failure.clone());
        }
        self.failures.push(failure);
        self.recover();
    }

    fn recover(&mut self) {
        let index = self.tokens.index();
        if self.last_error_index == Some(index) && self.last_error_states.contains(&self.state) {
            trace!(index, "same failure again, dropping one token");
            self.consume_error_token();
        }
        self.last_error_index = Some(index);
        self.last_error_states.insert(self.state);

        let recovery = self.error_recovery_set();
        let mut skipped = 0;
        while self.tokens.la() != EOF && !recovery.contains(self.tokens.la()) {
            self.consume_error_token();
            skipped += 1;
        }
        debug!(skipped, resume_at = self.tokens.index(), "resynchronized");
    }

    fn consume_error_token(&mut self) {
        if let Some(node) = self.context {
            self.tree.add_error(node, self.tokens.index());
        }
        self.tokens.consume();
    }

    /// Tokens that can follow any live invocation
    pub fn error_recovery_set(&self) -> IntervalSet {
        let mut recovery = IntervalSet::new();
        for follow in self.follow_states() {
            recovery.add_set(&self.atn.next_tokens(follow));
        }
        recovery.remove(EPSILON);
        recovery
    }
}
