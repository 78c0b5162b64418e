//! The deintegration engine: pattern registry, per-target pass, and
//! whole-project cleanup.

pub mod patterns;
pub mod project;
pub mod target;

pub use patterns::{registry, Generation, PatternRegistry, GENERATIONS};
pub use project::{deintegrate_project, DeintegrateOptions, OrphanPolicy, Summary};
pub use target::{deintegrate_target, TargetChanges};
