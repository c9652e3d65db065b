//! Error types for the stepping interpreter
//!
//! Two very different kinds of error live here:
//! - [`RecognitionFailure`]: the input does not match the grammar. These are
//!   expected while debugging a grammar; the interpreter records them on the
//!   parse tree, reports them as output events and recovers.
//! - [`DebugError`]: the session API was misused. These are returned to the
//!   host as `Result` errors.

use super::tokens::TokenStream;
use crate::atn::{GrammarKind, IntervalSet, EOF};
use crate::grammar::GrammarInfo;
use thiserror::Error;

/// A point where the input does not match the grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionFailure {
    /// No alternative of a decision can match the upcoming tokens
    #[error("no viable alternative at state {state}")]
    NoViableAlternative {
        state: usize,
        start_token: usize,
        offending_token: usize,
    },

    /// The current token is not the one the grammar requires
    #[error("mismatched input at state {state}")]
    InputMismatch {
        state: usize,
        offending_token: usize,
        expected: IntervalSet,
    },

    /// A precedence predicate rejected the current operator
    #[error("failed predicate {predicate} at state {state}")]
    FailedPredicate {
        state: usize,
        rule_index: usize,
        offending_token: usize,
        predicate: String,
    },
}

impl RecognitionFailure {
    pub fn state(&self) -> usize {
        match self {
            RecognitionFailure::NoViableAlternative { state, .. }
            | RecognitionFailure::InputMismatch { state, .. }
            | RecognitionFailure::FailedPredicate { state, .. } => *state,
        }
    }

    pub fn offending_token(&self) -> usize {
        match self {
            RecognitionFailure::NoViableAlternative {
                offending_token, ..
            }
            | RecognitionFailure::InputMismatch {
                offending_token, ..
            }
            | RecognitionFailure::FailedPredicate {
                offending_token, ..
            } => *offending_token,
        }
    }

    /// User-facing message in the usual ANTLR wording
    pub fn describe(&self, tokens: &TokenStream, grammar: &GrammarInfo) -> String {
        match self {
            RecognitionFailure::NoViableAlternative {
                start_token,
                offending_token,
                ..
            } => {
                let text = if tokens.get(*start_token).token_type == EOF {
                    "<EOF>".to_string()
                } else {
                    tokens.text_between(*start_token, *offending_token)
                };
                format!("no viable alternative at input {}", escape(&quoted(&text)))
            }
            RecognitionFailure::InputMismatch {
                offending_token,
                expected,
                ..
            } => format!(
                "mismatched input {} expecting {}",
                token_display(tokens, *offending_token),
                expected.to_string_with(|t| grammar.vocabulary.display_name(t))
            ),
            RecognitionFailure::FailedPredicate {
                rule_index,
                predicate,
                ..
            } => format!(
                "rule {} failed predicate: {{{}}}?",
                grammar.rule_name(*rule_index),
                predicate
            ),
        }
    }
}

fn quoted(text: &str) -> String {
    format!("'{}'", text)
}

fn escape(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

pub(crate) fn token_display(tokens: &TokenStream, index: usize) -> String {
    let token = tokens.get(index);
    if token.token_type == EOF {
        "<EOF>".to_string()
    } else {
        escape(&quoted(&token.text))
    }
}

/// Misuse of the debugger session API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    #[error("expected a {expected} ATN but got a {found} ATN")]
    WrongGrammarKind {
        expected: GrammarKind,
        found: GrammarKind,
    },

    #[error("rule index {index} is out of range ({count} rules)")]
    UnknownRule { index: usize, count: usize },

    #[error("the lexer ATN defines no modes")]
    NoLexerModes,

    #[error("the debugger has not been started")]
    NotStarted,
}
