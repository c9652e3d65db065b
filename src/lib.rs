//! # Introduction
//!
//! atnstep loads the serialized ATNs of an ANTLR lexer and parser, optimizes
//! them, and interprets a parse of an input one step at a time.  The stepping
//! session is driven through a terminal UI built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Pipeline
//!
//! ```text
//! .interp → Loader → ATN → Lexer interpreter → Tokens → Parser interpreter → Debugger → TUI
//! ```
//!
//! 1. [`loader`] — decodes serialized ATNs, adds rule bypass transitions,
//!    verifies, optimizes, and flags tail calls. Also reads `.interp` files
//!    and caches loaded ATNs by content.
//! 2. [`atn`] — the state graph: states, transitions, interval sets, lexer
//!    actions, and the follow-set analysis used for error messages.
//! 3. [`grammar`] — rule names, vocabulary and rule positions in the grammar
//!    source.
//! 4. [`symbols`] — the grammar symbol table and the next-symbol search that
//!    maps parser progress onto grammar elements.
//! 5. [`interpreter`] — tokenizer, parser interpreter with prediction and
//!    recovery, breakpoints, and the stepping [`interpreter::Debugger`].
//! 6. [`ui`] — ratatui-based TUI; not part of the stable library API.

pub mod atn;
pub mod grammar;
pub mod interpreter;
pub mod loader;
pub mod symbols;
pub mod ui;
