//! Implementation of `depod deintegrate`.
//!
//! Orchestrates a full deintegration: locate the project, strip the
//! generated integration out of the pbxproj document, persist it when it
//! changed, and delete the top-level artifacts next to it (workspace
//! bundle, Podfile, Podfile.lock, Pods directory).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::deintegrate::{deintegrate_project, DeintegrateOptions, OrphanPolicy, Summary};
use crate::pbxproj::Project;
use crate::util::fs::{remove_dir_all_if_exists, remove_file_if_exists};
use crate::util::{GlobalContext, Shell, Status};

/// Options for the deintegrate command.
#[derive(Debug, Clone, Default)]
pub struct DeintegrateOpts {
    /// Explicit project path (.xcodeproj bundle or project.pbxproj file).
    /// When absent the working directory is searched for a unique bundle.
    pub project: Option<PathBuf>,

    /// Leave the Pods/ directory, Podfile, and Podfile.lock on disk.
    pub keep_sources: bool,

    /// Leave the generated .xcworkspace bundle on disk.
    pub keep_workspace: bool,

    /// Never remove satellite targets, even fully orphaned ones.
    pub keep_orphaned_targets: bool,
}

/// What a deintegration run did.
#[derive(Debug)]
pub struct DeintegrateReport {
    /// Path of the project bundle that was processed.
    pub project: PathBuf,
    /// Changes made to the pbxproj document.
    pub summary: Summary,
    /// Files and directories deleted next to the project.
    pub deleted: Vec<PathBuf>,
}

/// Run a full deintegration of the project in `ctx`'s working directory
/// (or of `opts.project` when given).
pub fn deintegrate(
    ctx: &GlobalContext,
    shell: &Shell,
    opts: &DeintegrateOpts,
) -> Result<DeintegrateReport> {
    let path = match &opts.project {
        Some(path) => path.clone(),
        None => ctx.find_project()?,
    };

    let mut project = Project::open(&path)?;
    shell.status(Status::Info, format!("Deintegrating {}", project.name()));

    let options = DeintegrateOptions {
        orphan_policy: if opts.keep_orphaned_targets {
            OrphanPolicy::Keep
        } else {
            OrphanPolicy::GeneratedContentOnly
        },
    };

    let summary = deintegrate_project(&mut project, &options);

    for name in &summary.changed_targets {
        shell.status(Status::Deintegrated, format!("target {}", name));
    }
    for name in &summary.removed_targets {
        shell.status(Status::Removed, format!("target {}", name));
    }
    for name in &summary.pruned_file_refs {
        shell.status(Status::Removed, format!("reference to {}", name));
    }

    if summary.modified {
        project.save().context("failed to save project")?;
        shell.status(Status::Saved, project.path().display());
    } else {
        shell.note("project contains no integration artifacts");
    }

    let deleted = delete_artifacts(&project, shell, opts)?;

    if summary.modified || !deleted.is_empty() {
        shell.status(Status::Deintegrated, project.path().display());
    } else {
        shell.note("nothing to deintegrate");
    }

    Ok(DeintegrateReport {
        project: project.path().to_path_buf(),
        summary,
        deleted,
    })
}

/// Delete the workspace bundle, Podfile, Podfile.lock, and Pods/ directory
/// that live next to the project bundle. Absent files are skipped silently.
fn delete_artifacts(
    project: &Project,
    shell: &Shell,
    opts: &DeintegrateOpts,
) -> Result<Vec<PathBuf>> {
    let dir = project
        .path()
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut deleted = Vec::new();

    if !opts.keep_workspace {
        let workspace = dir.join(format!("{}.xcworkspace", project.name()));
        if remove_dir_all_if_exists(&workspace)? {
            shell.status(Status::Deleted, workspace.display());
            deleted.push(workspace);
        }
    }

    if !opts.keep_sources {
        for name in ["Podfile", "Podfile.lock"] {
            let file = dir.join(name);
            if remove_file_if_exists(&file)? {
                shell.status(Status::Deleted, file.display());
                deleted.push(file);
            }
        }

        let pods = dir.join("Pods");
        if remove_dir_all_if_exists(&pods)? {
            shell.status(Status::Deleted, pods.display());
            deleted.push(pods);
        }
    }

    Ok(deleted)
}
