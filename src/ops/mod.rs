//! High-level operations.
//!
//! This module contains the implementation of depod commands.

pub mod deintegrate;

pub use deintegrate::{deintegrate, DeintegrateOpts, DeintegrateReport};
