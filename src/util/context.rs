//! Global context for depod operations.
//!
//! Carries the working directory and locates the Xcode project a command
//! should operate on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use thiserror::Error;

/// Failure to locate a project in a directory.
#[derive(Debug, Error, Diagnostic)]
pub enum LocateError {
    #[error("no `.xcodeproj` found in `{dir}`")]
    #[diagnostic(
        code(depod::locate::not_found),
        help("run from the directory containing the project, or pass its path explicitly")
    )]
    NotFound { dir: PathBuf },

    #[error("multiple `.xcodeproj` bundles found in `{dir}`: {}", candidates.join(", "))]
    #[diagnostic(
        code(depod::locate::ambiguous),
        help("pass the path of the project to deintegrate explicitly")
    )]
    Ambiguous {
        dir: PathBuf,
        candidates: Vec<String>,
    },
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory.
    cwd: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext { cwd })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext { cwd }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Find the single `.xcodeproj` bundle in the working directory.
    ///
    /// Zero matches and more than one match are both user errors; the caller
    /// can always pass an explicit path instead.
    pub fn find_project(&self) -> Result<PathBuf, LocateError> {
        let pattern = self.cwd.join("*.xcodeproj");
        let mut candidates: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .into_iter()
            .flatten()
            .flatten()
            .filter(|p| p.is_dir())
            .collect();
        candidates.sort();

        match candidates.len() {
            0 => Err(LocateError::NotFound {
                dir: self.cwd.clone(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(LocateError::Ambiguous {
                dir: self.cwd.clone(),
                candidates: candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect(),
            }),
        }
    }
}
