//! Run lifecycle control.
//!
//! This module owns the user-triggered workflow operations (submit, decide,
//! upload, simulate, refresh) and the command loop the interactive console
//! drives them through. Presentation layers call into this module to keep
//! responsibilities separated.

#[cfg(feature = "tui")]
mod console;
mod workflow;

#[cfg(feature = "tui")]
pub(crate) use console::{run_console, UiCommand, UiEvent};
pub use workflow::{WorkflowController, WorkflowError};
