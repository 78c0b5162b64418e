//! Shared utilities: shell output, filesystem helpers, and the global
//! command context.

pub mod context;
pub mod fs;
pub mod shell;

pub use context::{GlobalContext, LocateError};
pub use shell::{ColorChoice, Shell, ShellMode, Status, Verbosity};
