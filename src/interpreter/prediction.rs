//! Alternative prediction
//!
//! At a decision the parser simulates every alternative in parallel over the
//! upcoming tokens, the way ANTLR's SLL prediction does but without a DFA
//! cache: each call re-simulates the ATN from scratch.
//!
//! A configuration is a state, the alternative it descends from, and a return
//! stack. The stack holds the follow states of calls made during the
//! simulation; once it is empty, returning from a rule continues in the live
//! invocations of the parser, innermost first.

use super::errors::RecognitionFailure;
use super::tokens::TokenStream;
use crate::atn::{Atn, Transition, EOF, MIN_USER_TOKEN_TYPE};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Deepest call nesting followed during closure
const MAX_STACK: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Config {
    state: usize,
    /// 1-based alternative
    alt: usize,
    /// Only this raw transition of the decision state is live
    restrict: Option<usize>,
    stack: Vec<usize>,
    /// Live invocations not yet returned into
    outer_depth: usize,
    /// Set once a tail call left the decision's rule without pushing
    left_origin: bool,
}

/// Everything prediction needs from the parser at a decision
pub(crate) struct Prediction<'a> {
    pub atn: &'a Atn,
    pub tokens: &'a TokenStream,
    /// Follow states of the live invocations, outermost first
    pub follow_states: &'a [usize],
    /// Precedence of the current invocation of the decision's rule
    pub precedence: i32,
}

impl Prediction<'_> {
    /// Predict the 1-based alternative to take at `decision_state`
    pub fn predict(&self, decision_state: usize) -> Result<usize, RecognitionFailure> {
        let start_token = self.tokens.index();
        let state = self.atn.state(decision_state);

        let mut configs = Vec::new();
        let mut seen = FxHashSet::default();
        for alt in 0..state.transitions().len() {
            let config = Config {
                state: decision_state,
                alt: alt + 1,
                restrict: Some(alt),
                stack: Vec::new(),
                outer_depth: self.follow_states.len(),
                left_origin: false,
            };
            self.closure(config, &mut configs, &mut seen);
        }

        let mut index = start_token;
        loop {
            if let Some(alt) = self.resolved(&configs) {
                trace!(decision_state, alt, "prediction resolved");
                return Ok(alt);
            }
            let symbol = self.tokens.get(index).token_type;
            let reach = self.step(&configs, symbol);
            if symbol == EOF && !reach.is_empty() {
                return Ok(min_alt(&reach));
            }
            if reach.is_empty() {
                debug!(decision_state, start_token, offending = index, "no viable alternative");
                return Err(RecognitionFailure::NoViableAlternative {
                    state: decision_state,
                    start_token,
                    offending_token: index,
                });
            }
            configs = reach;
            index = self.tokens.next_on_channel(index + 1);
        }
    }

    /// The alternative to take if the configurations already decide it
    fn resolved(&self, configs: &[Config]) -> Option<usize> {
        let alts: BTreeSet<usize> = configs.iter().map(|c| c.alt).collect();
        match alts.len() {
            0 => None,
            1 => alts.first().copied(),
            _ => {
                // all alternatives lead to the same place: take the first
                let mut by_alt: FxHashMap<usize, FxHashSet<(usize, &[usize], usize, bool)>> =
                    FxHashMap::default();
                for c in configs {
                    by_alt.entry(c.alt).or_default().insert((
                        c.state,
                        c.stack.as_slice(),
                        c.outer_depth,
                        c.left_origin,
                    ));
                }
                let mut sets = by_alt.values();
                let first = sets.next()?;
                sets.all(|set| set == first).then(|| min_alt(configs))
            }
        }
    }

    fn transitions<'c>(&'c self, config: &Config) -> &'c [Transition] {
        let state = self.atn.state(config.state);
        match config.restrict {
            Some(index) => &state.transitions()[index..=index],
            None => state.optimized_transitions(),
        }
    }

    fn is_root_stop(&self, config: &Config) -> bool {
        self.atn.state(config.state).is_rule_stop()
            && config.stack.is_empty()
            && config.outer_depth == 0
    }

    fn step(&self, configs: &[Config], symbol: i32) -> Vec<Config> {
        let mut reach = Vec::new();
        let mut seen = FxHashSet::default();
        for config in configs {
            if self.is_root_stop(config) {
                // past the start rule only the end of input is acceptable
                if symbol == EOF && seen.insert(config.clone()) {
                    reach.push(config.clone());
                }
                continue;
            }
            for transition in self.transitions(config) {
                if transition.is_epsilon()
                    || !transition.matches(symbol, MIN_USER_TOKEN_TYPE, self.atn.max_token_type)
                {
                    continue;
                }
                let next = Config {
                    state: transition.target(),
                    restrict: None,
                    ..config.clone()
                };
                self.closure(next, &mut reach, &mut seen);
            }
        }
        reach
    }

    fn closure(&self, config: Config, out: &mut Vec<Config>, seen: &mut FxHashSet<Config>) {
        if !seen.insert(config.clone()) {
            return;
        }
        let state = self.atn.state(config.state);

        if state.is_rule_stop() {
            let mut config = config;
            if let Some(return_state) = config.stack.pop() {
                config.state = return_state;
                self.closure(config, out, seen);
            } else if config.outer_depth > 0 {
                config.outer_depth -= 1;
                config.state = self.follow_states[config.outer_depth];
                config.left_origin = true;
                self.closure(config, out, seen);
            } else {
                out.push(config);
            }
            return;
        }

        let transitions = self.transitions(&config);
        if transitions.iter().any(|t| !t.is_epsilon()) {
            out.push(config.clone());
        }

        for transition in transitions {
            let mut next = Config {
                state: transition.target(),
                restrict: None,
                ..config.clone()
            };
            match transition {
                Transition::Rule(rule) => {
                    if rule.optimized_tail_call {
                        next.left_origin = true;
                    } else if next.stack.len() >= MAX_STACK {
                        trace!(state = config.state, "prediction call depth limit reached");
                        continue;
                    } else {
                        next.stack.push(rule.follow_state);
                    }
                }
                Transition::Precedence { precedence, .. } => {
                    let in_origin_rule = config.stack.is_empty() && !config.left_origin;
                    if in_origin_rule && *precedence < self.precedence {
                        continue;
                    }
                }
                Transition::Epsilon { .. }
                | Transition::Predicate { .. }
                | Transition::Action { .. } => {}
                _ => continue,
            }
            self.closure(next, out, seen);
        }
    }
}

fn min_alt(configs: &[Config]) -> usize {
    configs.iter().map(|c| c.alt).min().unwrap_or(1)
}
