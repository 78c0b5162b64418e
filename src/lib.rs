//! depod - remove CocoaPods integration from Xcode projects
//!
//! This crate provides the core library functionality for depod:
//! parsing and rewriting `project.pbxproj` documents, stripping the
//! build phases, file references, and configuration hooks that the
//! dependency manager injected, and deleting the artifacts it left
//! next to the project.

pub mod deintegrate;
pub mod ops;
pub mod pbxproj;
pub mod util;

/// Test utilities for depod unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides builders for synthetic Xcode projects.
#[cfg(test)]
pub mod test_support;

pub use deintegrate::{deintegrate_project, DeintegrateOptions, OrphanPolicy, Summary};
pub use pbxproj::{OpenError, ParseError, Project};
pub use util::context::GlobalContext;
