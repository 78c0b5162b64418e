//! Per-target deintegration.
//!
//! Each step is idempotent: running over an already-clean target removes
//! nothing and reports nothing. File references linked by removed build files
//! are only *recorded* here; whether they can be deleted is a whole-project
//! question answered later, because early-generation integrations shared one
//! `libPods.a` reference across several targets.

use crate::pbxproj::{BuildPhaseKind, ObjectId, Project};

use super::patterns::registry;

/// What one target-level pass removed.
#[derive(Debug, Default)]
pub struct TargetChanges {
    /// File references whose build-file link was removed, with display names.
    pub removed_build_files: Vec<(ObjectId, String)>,
    /// Names of removed shell-script phases.
    pub removed_script_phases: Vec<String>,
    /// Cleared base configurations as (configuration, former xcconfig ref).
    pub cleared_base_configurations: Vec<(ObjectId, ObjectId)>,
}

impl TargetChanges {
    pub fn is_empty(&self) -> bool {
        self.removed_build_files.is_empty()
            && self.removed_script_phases.is_empty()
            && self.cleared_base_configurations.is_empty()
    }

    /// File references that may now be orphaned and are candidates for
    /// whole-project pruning.
    pub fn orphan_candidates(&self) -> impl Iterator<Item = &ObjectId> {
        self.removed_build_files
            .iter()
            .map(|(file_ref, _)| file_ref)
            .chain(
                self.cleared_base_configurations
                    .iter()
                    .map(|(_, file_ref)| file_ref),
            )
    }
}

/// Remove every integration artifact from one target.
pub fn deintegrate_target(project: &mut Project, target: &ObjectId) -> TargetChanges {
    let mut changes = TargetChanges::default();
    remove_generated_build_files(project, target, &mut changes);
    remove_generated_script_phases(project, target, &mut changes);
    clear_generated_base_configurations(project, target, &mut changes);

    if !changes.is_empty() {
        tracing::debug!(
            target_name = project.target_name(target).unwrap_or("<unnamed>"),
            build_files = changes.removed_build_files.len(),
            script_phases = changes.removed_script_phases.len(),
            base_configurations = changes.cleared_base_configurations.len(),
            "deintegrated target"
        );
    }
    changes
}

/// Strip generated libraries/frameworks from every Frameworks phase.
fn remove_generated_build_files(
    project: &mut Project,
    target: &ObjectId,
    changes: &mut TargetChanges,
) {
    let patterns = registry();
    for phase in project.build_phases(target) {
        if project.phase_kind(&phase) != BuildPhaseKind::Frameworks {
            continue;
        }
        for build_file in project.phase_files(&phase) {
            let Some(file_ref) = project.build_file_ref(&build_file) else {
                continue;
            };
            let Some(name) = project.file_display_name(&file_ref) else {
                continue;
            };
            if patterns.matches_product(&name) {
                project.remove_build_file(&phase, &build_file);
                changes.removed_build_files.push((file_ref, name));
            }
        }
    }
}

/// Remove injected shell-script phases wherever they sit in the phase list;
/// the relative order of remaining phases is untouched.
fn remove_generated_script_phases(
    project: &mut Project,
    target: &ObjectId,
    changes: &mut TargetChanges,
) {
    let patterns = registry();
    let generated: Vec<(ObjectId, String)> = project
        .build_phases(target)
        .into_iter()
        .filter(|p| project.phase_kind(p) == BuildPhaseKind::ShellScript)
        .filter_map(|p| {
            let name = project.phase_name(&p)?;
            patterns
                .matches_script_phase(name)
                .then(|| (p.clone(), name.to_string()))
        })
        .collect();

    for (phase, name) in generated {
        project.remove_build_phase(target, &phase);
        changes.removed_script_phases.push(name);
    }
}

/// Clear base-configuration references pointing at generated xcconfig files.
/// The configuration objects and their build settings stay as they are.
fn clear_generated_base_configurations(
    project: &mut Project,
    target: &ObjectId,
    changes: &mut TargetChanges,
) {
    let patterns = registry();
    for config in project.build_configurations(target) {
        let Some(file_ref) = project.base_configuration_reference(&config) else {
            continue;
        };
        let Some(name) = project.file_display_name(&file_ref) else {
            continue;
        };
        if patterns.matches_xcconfig(&name) {
            project.clear_base_configuration_reference(&config);
            changes.cleared_base_configurations.push((config, file_ref));
        }
    }
}
