//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: application state, keyboard event loop, pane focus, breakpoint cursor
//! - **[`panes`]**: stateless render functions for each visible pane (grammar source,
//!   call stack, tokens, output, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with a [`Debugger`], call
//! [`App::start`] and then [`App::run`] to start the event loop.
//!
//! [`Debugger`]: crate::interpreter::Debugger
//! [`App::start`]: app::App::start
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
