//! Error types for loading, serializing and reading ATN data
//!
//! - [`FormatError`]: the word stream is not a well-formed serialized ATN
//! - [`IntegrityError`]: the stream decodes but describes an inconsistent graph
//! - [`LoadError`]: either of the above; any error aborts the load
//! - [`SerializeError`]: an in-memory ATN cannot be encoded
//! - [`InterpDataError`]: a `.interp` file is malformed

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("could not deserialize ATN with version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("could not deserialize ATN with unknown identifier {0:032X}")]
    UnknownIdentifier(u128),

    #[error("serialized ATN ends unexpectedly at word {offset}")]
    Truncated { offset: usize },

    #[error("invalid {what} {value} at word {offset}")]
    InvalidValue {
        what: &'static str,
        value: u32,
        offset: usize,
    },

    #[error("serialized ATN byte buffer has odd length {0}")]
    OddByteLength(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("{what} refers to state {index}, but the ATN has {count} states")]
    StateOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    #[error("state {state} should be a {expected} state")]
    UnexpectedStateKind {
        state: usize,
        expected: &'static str,
    },

    #[error("rule {rule} has no stop state")]
    MissingStopState { rule: usize },

    #[error("rule stop state {state} refers to rule {rule}, but the ATN has {count} rules")]
    RuleOutOfRange {
        state: usize,
        rule: usize,
        count: usize,
    },

    #[error("set index {index} is out of range ({count} sets)")]
    SetOutOfRange { index: usize, count: usize },

    #[error("block start {state} has no end state")]
    MissingEndState { state: usize },

    #[error("block end {end} is claimed by both {first} and {second}")]
    EndStateClaimed {
        end: usize,
        first: usize,
        second: usize,
    },

    #[error("decision state {state} is listed more than once")]
    DuplicateDecision { state: usize },

    #[error("star loop entry {state} has no loopback")]
    MissingLoopback { state: usize },

    #[error("couldn't identify final state of the precedence rule prefix section of rule {rule}")]
    PrecedencePrefixNotFound { rule: usize },

    #[error("ATN verification failed at state {state}: {condition}")]
    Verification {
        state: usize,
        condition: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    #[error("unknown format identifier {0:032X}")]
    UnknownIdentifier(u128),

    #[error("{what} {value} does not fit in a serialized word")]
    ValueOutOfRange { what: &'static str, value: i64 },

    #[error("interval {start}..{end} exceeds the 16-bit set table of this format")]
    SetNeedsExtendedFormat { start: i32, end: i32 },

    #[error("lexer action {index} cannot be written in a format without the action table")]
    ActionNeedsActionTable { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpDataError {
    #[error("line {line}: expected section header '{expected}'")]
    MissingSection { line: usize, expected: &'static str },

    #[error("line {line}: invalid ATN word '{text}'")]
    InvalidWord { line: usize, text: String },

    #[error("the interpreter data has no ATN section")]
    MissingAtn,

    #[error(transparent)]
    Load(#[from] LoadError),
}
