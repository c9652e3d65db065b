//! Lexer interpreter
//!
//! Tokenizes the whole input up front by simulating the lexer ATN as an NFA.
//! The simulation keeps every live configuration, remembers the last point at
//! which some configuration reached the end of its token rule, and stops once
//! nothing is left alive. Ties go to the rule listed first.

use super::errors::DebugError;
use super::tokens::{Token, DEFAULT_CHANNEL};
use crate::atn::{
    Atn, GrammarKind, LexerAction, Transition, EOF, INVALID_TOKEN_TYPE, MAX_CHAR, MIN_CHAR,
};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

/// Deepest fragment-call nesting followed during closure
const MAX_CALL_DEPTH: usize = 256;

/// A character sequence no token rule accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LexerConfig {
    state: usize,
    alt: usize,
    /// Return states of the fragment calls in progress
    stack: Vec<usize>,
    /// Indices into the ATN's lexer action table
    actions: Vec<usize>,
    passed_non_greedy: bool,
}

#[derive(Debug, Clone)]
struct TokenMatch {
    /// Char offset one past the match
    end: usize,
    rule: usize,
    actions: Vec<usize>,
}

/// What the actions of a matched rule decided about the token
struct Outcome {
    token_type: i32,
    channel: i32,
    skip: bool,
    more: bool,
}

struct LexerInterpreter<'a> {
    atn: &'a Atn,
    chars: Vec<char>,
    /// (line, column) of every char offset, plus one entry for the end
    positions: Vec<(usize, usize)>,
    mode: usize,
    mode_stack: Vec<usize>,
}

/// Tokenize `input` with a lexer ATN
///
/// The returned token list always ends with an EOF token. Characters no rule
/// can match are reported as diagnostics and skipped one at a time.
pub fn tokenize(atn: &Atn, input: &str) -> Result<(Vec<Token>, Vec<LexerDiagnostic>), DebugError> {
    if atn.kind != GrammarKind::Lexer {
        return Err(DebugError::WrongGrammarKind {
            expected: GrammarKind::Lexer,
            found: atn.kind,
        });
    }
    if atn.mode_to_start_state.is_empty() {
        return Err(DebugError::NoLexerModes);
    }

    let mut lexer = LexerInterpreter::new(atn, input);
    let result = lexer.run();
    debug!(
        tokens = result.0.len(),
        diagnostics = result.1.len(),
        "tokenized input"
    );
    Ok(result)
}

impl<'a> LexerInterpreter<'a> {
    fn new(atn: &'a Atn, input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut positions = Vec::with_capacity(chars.len() + 1);
        let (mut line, mut column) = (1, 0);
        for &c in &chars {
            positions.push((line, column));
            if c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        positions.push((line, column));

        LexerInterpreter {
            atn,
            chars,
            positions,
            mode: 0,
            mode_stack: Vec::new(),
        }
    }

    fn run(&mut self) -> (Vec<Token>, Vec<LexerDiagnostic>) {
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();
        let mut token_start = 0;
        let mut position = 0;

        while position < self.chars.len() {
            match self.match_token(position) {
                Some(found) => {
                    let outcome = self.apply_actions(&found);
                    position = found.end;
                    if outcome.more {
                        continue;
                    }
                    if !outcome.skip {
                        tokens.push(self.make_token(&outcome, token_start, position, tokens.len()));
                    }
                    token_start = position;
                }
                None => {
                    let (line, column) = self.positions[token_start];
                    let text: String = self.chars[token_start..=position].iter().collect();
                    trace!(line, column, "token recognition error");
                    diagnostics.push(LexerDiagnostic {
                        line,
                        column,
                        message: format!("token recognition error at: '{}'", escape(&text)),
                    });
                    position += 1;
                    token_start = position;
                }
            }
        }

        let (line, column) = self.positions[self.chars.len()];
        tokens.push(Token {
            token_type: EOF,
            channel: DEFAULT_CHANNEL,
            start: self.chars.len(),
            stop: self.chars.len(),
            line,
            column,
            index: tokens.len(),
            text: "<EOF>".to_string(),
        });
        (tokens, diagnostics)
    }

    fn make_token(&self, outcome: &Outcome, start: usize, stop: usize, index: usize) -> Token {
        let (line, column) = self.positions[start];
        Token {
            token_type: outcome.token_type,
            channel: outcome.channel,
            start,
            stop,
            line,
            column,
            index,
            text: self.chars[start..stop].iter().collect(),
        }
    }

    fn apply_actions(&mut self, found: &TokenMatch) -> Outcome {
        let mut outcome = Outcome {
            token_type: self
                .atn
                .rule_to_token_type
                .get(found.rule)
                .copied()
                .unwrap_or(INVALID_TOKEN_TYPE),
            channel: DEFAULT_CHANNEL,
            skip: false,
            more: false,
        };

        for &index in &found.actions {
            let Some(action) = self.atn.lexer_actions.get(index) else {
                warn!(index, "lexer action index out of range");
                continue;
            };
            match *action {
                LexerAction::Skip => outcome.skip = true,
                LexerAction::More => outcome.more = true,
                LexerAction::Type(token_type) => outcome.token_type = token_type,
                LexerAction::Channel(channel) => outcome.channel = channel,
                LexerAction::Mode(mode) => self.set_mode(mode),
                LexerAction::PushMode(mode) => {
                    self.mode_stack.push(self.mode);
                    self.set_mode(mode);
                }
                LexerAction::PopMode => match self.mode_stack.pop() {
                    Some(mode) => self.mode = mode,
                    None => warn!("popMode with an empty mode stack"),
                },
                LexerAction::Custom {
                    rule_index,
                    action_index,
                } => trace!(rule_index, action_index, "custom lexer action ignored"),
            }
        }
        outcome
    }

    fn set_mode(&mut self, mode: i32) {
        match usize::try_from(mode) {
            Ok(mode) if mode < self.atn.mode_to_start_state.len() => self.mode = mode,
            _ => warn!(mode, "lexer switched to an unknown mode"),
        }
    }

    /// Longest match starting at `start` in the current mode
    fn match_token(&self, start: usize) -> Option<TokenMatch> {
        let start_state = self.atn.mode_to_start_state[self.mode];
        let mut configs = Vec::new();
        let mut seen = FxHashSet::default();
        for (alt, transition) in self.atn.state(start_state).transitions().iter().enumerate() {
            let config = LexerConfig {
                state: transition.target(),
                alt,
                stack: Vec::new(),
                actions: Vec::new(),
                passed_non_greedy: self.atn.state(start_state).is_non_greedy(),
            };
            self.closure(config, false, &mut configs, &mut seen);
        }

        let mut best = None;
        let mut position = start;
        while position < self.chars.len() && !configs.is_empty() {
            let symbol = self.chars[position] as i32;
            let reach = self.step(&configs, symbol);
            position += 1;
            if let Some(accept) = reach.iter().find(|c| self.is_accept(c)) {
                best = Some(TokenMatch {
                    end: position,
                    rule: self.atn.state(accept.state).rule_index.unwrap_or(0),
                    actions: accept.actions.clone(),
                });
            }
            configs = reach;
        }
        best
    }

    fn is_accept(&self, config: &LexerConfig) -> bool {
        config.stack.is_empty() && self.atn.state(config.state).is_rule_stop()
    }

    /// Configurations reachable from `configs` by matching `symbol`
    fn step(&self, configs: &[LexerConfig], symbol: i32) -> Vec<LexerConfig> {
        let mut reach = Vec::new();
        let mut seen = FxHashSet::default();
        let mut skip_alt = None;

        for config in configs {
            let alt_accepted = skip_alt == Some(config.alt);
            if alt_accepted && config.passed_non_greedy {
                continue;
            }
            let state = self.atn.state(config.state);
            if state.is_rule_stop() {
                continue;
            }
            for transition in state.optimized_transitions() {
                if !transition.matches(symbol, MIN_CHAR, MAX_CHAR) {
                    continue;
                }
                let next = LexerConfig {
                    state: transition.target(),
                    ..config.clone()
                };
                if self.closure(next, alt_accepted, &mut reach, &mut seen) {
                    skip_alt = Some(config.alt);
                    break;
                }
            }
        }
        reach
    }

    /// Add the epsilon closure of `config` to `out`; true when a token rule
    /// end was reached
    fn closure(
        &self,
        config: LexerConfig,
        alt_accepted: bool,
        out: &mut Vec<LexerConfig>,
        seen: &mut FxHashSet<LexerConfig>,
    ) -> bool {
        if !seen.insert(config.clone()) {
            return false;
        }
        let state = self.atn.state(config.state);

        if state.is_rule_stop() {
            let mut config = config;
            match config.stack.pop() {
                None => {
                    out.push(config);
                    return true;
                }
                Some(return_state) => {
                    config.state = return_state;
                    return self.closure(config, alt_accepted, out, seen);
                }
            }
        }

        if !state.is_epsilon_only() {
            out.push(config.clone());
        }

        let mut reached_accept = alt_accepted;
        for transition in state.optimized_transitions() {
            let mut next = config.clone();
            next.state = transition.target();
            next.passed_non_greedy =
                config.passed_non_greedy || self.atn.state(next.state).is_non_greedy();

            match transition {
                Transition::Rule(rule) => {
                    if config.stack.len() >= MAX_CALL_DEPTH {
                        warn!(state = config.state, "lexer call depth limit reached");
                        continue;
                    }
                    next.stack.push(rule.follow_state);
                }
                Transition::Action { action_index, .. } => {
                    if config.stack.is_empty() {
                        if let Some(index) = action_index {
                            next.actions.push(*index);
                        }
                    }
                }
                Transition::Epsilon { .. }
                | Transition::Predicate { .. }
                | Transition::Precedence { .. } => {}
                _ => continue,
            }

            if reached_accept && next.passed_non_greedy {
                continue;
            }
            if self.closure(next, reached_accept, out, seen) {
                reached_accept = true;
            }
        }
        reached_accept
    }
}

fn escape(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
