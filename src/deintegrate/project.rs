//! Whole-project deintegration: per-target passes, orphan pruning, and
//! conservative removal of generated satellite targets.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::pbxproj::{ObjectId, Project};

use super::patterns::registry;
use super::target::deintegrate_target;

/// Policy for removing targets that existed only to support the integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Remove a satellite target when every referrer was deintegrated and its
    /// own remaining content is fully generated (no build files, no script
    /// phases left after its own pass).
    #[default]
    GeneratedContentOnly,
    /// Never remove targets.
    Keep,
}

/// Options for a project-level pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeintegrateOptions {
    pub orphan_policy: OrphanPolicy,
}

/// What a project-level pass changed.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    /// Targets that had integration artifacts removed.
    pub changed_targets: Vec<String>,
    /// Satellite targets removed from the project.
    pub removed_targets: Vec<String>,
    /// Display names of pruned file references.
    pub pruned_file_refs: Vec<String>,
    /// Whether the in-memory document differs from what was opened.
    pub modified: bool,
}

/// Deintegrate every target, then clean up the graph as a whole.
///
/// All mutation happens in memory; persisting the document is the caller's
/// decision, taken after this returns.
pub fn deintegrate_project(project: &mut Project, options: &DeintegrateOptions) -> Summary {
    let mut summary = Summary::default();
    let mut candidates: Vec<ObjectId> = Vec::new();
    let mut deintegrated: HashSet<ObjectId> = HashSet::new();

    for target in project.native_targets() {
        let changes = deintegrate_target(project, &target);
        if changes.is_empty() {
            continue;
        }
        candidates.extend(changes.orphan_candidates().cloned());
        summary
            .changed_targets
            .push(target_label(project, &target));
        deintegrated.insert(target);
    }

    // Generated-named references that were already unlinked before this run
    // (interrupted or hand-edited integrations) are prune candidates too.
    let patterns = registry();
    for file_ref in project.file_references() {
        if let Some(name) = project.file_display_name(&file_ref) {
            if patterns.matches_product(&name) || patterns.matches_xcconfig(&name) {
                candidates.push(file_ref);
            }
        }
    }

    prune_orphans(project, candidates, &mut summary);

    if options.orphan_policy == OrphanPolicy::GeneratedContentOnly {
        remove_satellite_targets(project, &deintegrated, &mut summary);
    }

    summary.modified = !summary.changed_targets.is_empty()
        || !summary.removed_targets.is_empty()
        || !summary.pruned_file_refs.is_empty();
    summary
}

fn target_label(project: &Project, target: &ObjectId) -> String {
    project
        .target_name(target)
        .map(str::to_string)
        .unwrap_or_else(|| target.to_string())
}

/// Remove candidate file references no longer linked anywhere in the project.
///
/// The scan covers the entire graph, not just the targets touched in this
/// run: a reference shared with a target that still links it must survive.
fn prune_orphans(project: &mut Project, candidates: Vec<ObjectId>, summary: &mut Summary) {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let live = project.referenced_file_refs();
    // Only groups a pruned reference was pulled out of are deletion
    // candidates; groups that were empty before the run are not ours.
    let mut emptied: Vec<ObjectId> = Vec::new();

    for file_ref in candidates {
        if !seen.insert(file_ref.clone()) || live.contains(&file_ref) {
            continue;
        }
        if project.object(&file_ref).is_none() {
            continue;
        }
        let name = project
            .file_display_name(&file_ref)
            .unwrap_or_else(|| file_ref.to_string());
        tracing::debug!(file_ref = %file_ref, name = %name, "pruning orphaned file reference");
        emptied.extend(project.groups_containing(&file_ref));
        project.remove_file_reference(&file_ref);
        summary.pruned_file_refs.push(name);
    }

    if !emptied.is_empty() {
        project.prune_emptied_groups(emptied);
    }
}

/// Remove targets that existed only to support the integration.
///
/// A target qualifies only when all of the following hold; any uncertainty
/// keeps the target in place:
/// - it has at least one incoming dependency edge, and every one of them
///   originates from a target deintegrated in this run;
/// - its name or product type follows the generated test-target convention;
/// - after its own deintegration it carries no build content of its own.
fn remove_satellite_targets(
    project: &mut Project,
    deintegrated: &HashSet<ObjectId>,
    summary: &mut Summary,
) {
    // Reverse dependency index, built fresh after the per-target passes.
    let mut referrers: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
    for owner in project.targets() {
        for dep in project.target_dependencies(&owner) {
            if let Some(dependee) = project.dependency_target(&dep) {
                referrers.entry(dependee).or_default().push(owner.clone());
            }
        }
    }

    let satellites: Vec<ObjectId> = project
        .native_targets()
        .into_iter()
        .filter(|target| {
            let incoming = referrers.get(target).map(Vec::as_slice).unwrap_or(&[]);
            !incoming.is_empty()
                && incoming.iter().all(|r| deintegrated.contains(r))
                && is_generated_satellite(project, target)
        })
        .collect();

    for target in satellites {
        let label = target_label(project, &target);
        tracing::debug!(target_name = %label, "removing orphaned satellite target");
        project.remove_target(&target);
        summary.removed_targets.push(label);
    }
}

/// Whether a target's own content is entirely generated.
fn is_generated_satellite(project: &Project, target: &ObjectId) -> bool {
    let test_like = project
        .product_type(target)
        .is_some_and(|p| p.ends_with("unit-test") || p.ends_with("ui-testing"))
        || project
            .target_name(target)
            .is_some_and(|n| n.ends_with("Tests"));
    if !test_like {
        return false;
    }

    // Any remaining build file or script phase is distinguishing content.
    project.build_phases(target).iter().all(|phase| {
        project.phase_files(phase).is_empty()
            && project.phase_kind(phase) != crate::pbxproj::BuildPhaseKind::ShellScript
    })
}
