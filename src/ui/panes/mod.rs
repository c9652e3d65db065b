//! TUI pane rendering modules
//!
//! Each pane is a stateless render function plus the small scroll state it
//! keeps between frames.
//!
//! # Pane Modules
//!
//! - [`source`]: grammar source with breakpoints and the current rule
//! - [`stack`]: call stack of active rules and their next symbols
//! - [`tokens`]: the token stream with the parser's position
//! - [`output`]: diagnostics and messages from the debugger
//! - [`status`]: status bar with keybindings and session state

pub mod output;
pub mod source;
pub mod stack;
pub mod status;
pub mod tokens;

pub use output::{render_output_pane, OutputLine};
pub use source::{render_source_pane, SourceRenderData, SourceScrollState};
pub use stack::{render_stack_pane, StackRenderData, StackScrollState};
pub use status::{render_status_bar, SessionState, StatusRenderData};
pub use tokens::render_tokens_pane;
