//! Stepping grammar interpreter
//!
//! This module runs a grammar against sample input under manual control:
//! - [`engine`]: the [`Debugger`] session and its run modes
//! - [`lexer`]: tokenizes input with the lexer ATN
//! - [`parser`]: walks the parser ATN one state at a time
//! - [`prediction`]: picks alternatives at decision states
//! - [`tree`]: the parse tree built along the way
//! - [`stack`]: the call stack of active rules
//! - [`breakpoints`], [`events`], [`tokens`]: session plumbing
//! - [`errors`]: recognition failures and API misuse errors
//!
//! # Execution Model
//!
//! The whole input is tokenized when a session starts. After that, each
//! session call processes parser states one by one until a stop condition
//! holds: the start rule finishes, a breakpoint state is reached, or the
//! requested step is complete. Recognition failures do not end a run; they
//! are reported as output events and the parser resynchronizes.

pub mod breakpoints;
pub mod engine;
pub mod errors;
pub mod events;
pub mod lexer;
pub mod parser;
pub mod prediction;
pub mod stack;
pub mod tokens;
pub mod tree;

pub use breakpoints::Breakpoint;
pub use engine::{Debugger, DebuggerConfig, RunMode};
pub use errors::{DebugError, RecognitionFailure};
pub use events::DebugEvent;
pub use lexer::{tokenize, LexerDiagnostic};
pub use stack::CallFrame;
pub use tokens::{Token, TokenStream};
pub use tree::ParseTree;
