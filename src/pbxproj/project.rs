//! Typed facade over a parsed `project.pbxproj` object graph.
//!
//! The document is a flat `objects` table keyed by 24-digit hex identifiers,
//! with every relationship expressed as an identifier string. `Project` keeps
//! the raw value tree (so attributes it does not understand pass through a
//! save untouched) and layers the accessors and mutators the deintegration
//! engine needs on top of it.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use thiserror::Error;

use super::parser::{self, ParseError};
use super::value::{Dict, Value};
use super::writer;

/// Identifier of an object in the `objects` table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        ObjectId(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of a build phase, derived from its isa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhaseKind {
    Sources,
    Frameworks,
    Resources,
    Headers,
    ShellScript,
    CopyFiles,
    Other,
}

impl BuildPhaseKind {
    fn from_isa(isa: &str) -> Self {
        match isa {
            "PBXSourcesBuildPhase" => BuildPhaseKind::Sources,
            "PBXFrameworksBuildPhase" => BuildPhaseKind::Frameworks,
            "PBXResourcesBuildPhase" => BuildPhaseKind::Resources,
            "PBXHeadersBuildPhase" => BuildPhaseKind::Headers,
            "PBXShellScriptBuildPhase" => BuildPhaseKind::ShellScript,
            "PBXCopyFilesBuildPhase" => BuildPhaseKind::CopyFiles,
            _ => BuildPhaseKind::Other,
        }
    }
}

/// Failure to open a project document.
#[derive(Debug, Error, Diagnostic)]
pub enum OpenError {
    #[error("no Xcode project found at `{path}`")]
    #[diagnostic(
        code(depod::project::not_found),
        help("pass the path to a .xcodeproj bundle or a project.pbxproj file")
    )]
    NotFound { path: PathBuf },

    #[error("failed to read `{path}`")]
    #[diagnostic(code(depod::project::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("`{path}` is not a valid project document: {message}")]
    #[diagnostic(code(depod::project::malformed))]
    Malformed { path: PathBuf, message: String },
}

/// An Xcode project document held in memory.
pub struct Project {
    /// The `.xcodeproj` bundle directory (equal to `pbxproj_path` when the
    /// document was opened from a bare pbxproj file).
    path: PathBuf,
    pbxproj_path: PathBuf,
    name: String,
    root: Dict,
}

impl Project {
    /// Open a project from a `.xcodeproj` bundle or a `project.pbxproj` file.
    pub fn open(path: &Path) -> Result<Project, OpenError> {
        let (bundle, pbxproj_path) = if path.extension().is_some_and(|e| e == "xcodeproj") {
            (path.to_path_buf(), path.join("project.pbxproj"))
        } else if path.file_name().is_some_and(|n| n == "project.pbxproj") {
            let bundle = path.parent().unwrap_or(path).to_path_buf();
            (bundle, path.to_path_buf())
        } else {
            return Err(OpenError::NotFound {
                path: path.to_path_buf(),
            });
        };

        if !pbxproj_path.is_file() {
            return Err(OpenError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let name = bundle
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Project".to_string());

        let source = fs::read_to_string(&pbxproj_path).map_err(|source| OpenError::Io {
            path: pbxproj_path.clone(),
            source,
        })?;
        let root = parser::parse(&source, &pbxproj_path.to_string_lossy())?;

        let project = Project {
            path: bundle,
            pbxproj_path,
            name,
            root,
        };
        if project.root.get_dict("objects").is_none() {
            return Err(OpenError::Malformed {
                path: project.pbxproj_path.clone(),
                message: "missing `objects` table".to_string(),
            });
        }
        if project.project_object().is_none() {
            return Err(OpenError::Malformed {
                path: project.pbxproj_path.clone(),
                message: "missing or dangling `rootObject`".to_string(),
            });
        }
        Ok(project)
    }

    /// Construct a project from in-memory document text (tests and tools).
    pub fn from_source(source: &str, name: &str) -> Result<Project, OpenError> {
        let root = parser::parse(source, name)?;
        let project = Project {
            path: PathBuf::from(name),
            pbxproj_path: PathBuf::from(name),
            name: name.to_string(),
            root,
        };
        if project.root.get_dict("objects").is_none() || project.project_object().is_none() {
            return Err(OpenError::Malformed {
                path: project.pbxproj_path.clone(),
                message: "missing `objects` table or `rootObject`".to_string(),
            });
        }
        Ok(project)
    }

    /// The `.xcodeproj` bundle path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The project name (bundle name without extension).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize to canonical pbxproj text.
    pub fn to_pbxproj_string(&self) -> String {
        writer::to_string(&self.root, Some(&self.name))
    }

    /// Write the document back to disk atomically (temp file + rename).
    pub fn save(&self) -> Result<()> {
        let dir = self
            .pbxproj_path
            .parent()
            .context("project file has no parent directory")?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(self.to_pbxproj_string().as_bytes())
            .context("failed to write project document")?;
        tmp.persist(&self.pbxproj_path)
            .with_context(|| format!("failed to replace {}", self.pbxproj_path.display()))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Object table access
    // ------------------------------------------------------------------

    fn objects(&self) -> &Dict {
        self.root.get_dict("objects").expect("validated on open")
    }

    fn objects_mut(&mut self) -> &mut Dict {
        self.root.get_dict_mut("objects").expect("validated on open")
    }

    /// Look up an object by identifier.
    pub fn object(&self, id: &ObjectId) -> Option<&Dict> {
        self.objects().get_dict(id.as_str())
    }

    fn object_mut(&mut self, id: &ObjectId) -> Option<&mut Dict> {
        self.objects_mut().get_dict_mut(id.as_str())
    }

    /// The isa of an object.
    pub fn isa(&self, id: &ObjectId) -> Option<&str> {
        self.object(id).and_then(|o| o.get_str("isa"))
    }

    fn remove_object(&mut self, id: &ObjectId) {
        self.objects_mut().remove(id.as_str());
    }

    fn project_object(&self) -> Option<&Dict> {
        let root_id = self.root.get_str("rootObject")?;
        self.root.get_dict("objects")?.get_dict(root_id)
    }

    fn project_object_mut(&mut self) -> Option<&mut Dict> {
        let root_id = self.root.get_str("rootObject")?.to_string();
        self.root.get_dict_mut("objects")?.get_dict_mut(&root_id)
    }

    // ------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------

    /// All targets listed by the project object, in document order.
    pub fn targets(&self) -> Vec<ObjectId> {
        self.project_object()
            .and_then(|p| p.get_array("targets"))
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| t.as_str().map(ObjectId::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Targets with isa `PBXNativeTarget`.
    pub fn native_targets(&self) -> Vec<ObjectId> {
        self.targets()
            .into_iter()
            .filter(|t| self.isa(t) == Some("PBXNativeTarget"))
            .collect()
    }

    pub fn target_name(&self, target: &ObjectId) -> Option<&str> {
        self.object(target).and_then(|t| t.get_str("name"))
    }

    pub fn product_type(&self, target: &ObjectId) -> Option<&str> {
        self.object(target).and_then(|t| t.get_str("productType"))
    }

    // ------------------------------------------------------------------
    // Build phases and build files
    // ------------------------------------------------------------------

    /// Build phases of a target, in build order. Missing lists are empty.
    pub fn build_phases(&self, target: &ObjectId) -> Vec<ObjectId> {
        self.object(target)
            .and_then(|t| t.get_array("buildPhases"))
            .map(|phases| {
                phases
                    .iter()
                    .filter_map(|p| p.as_str().map(ObjectId::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn phase_kind(&self, phase: &ObjectId) -> BuildPhaseKind {
        self.isa(phase)
            .map(BuildPhaseKind::from_isa)
            .unwrap_or(BuildPhaseKind::Other)
    }

    /// The `name` attribute of a phase. Only script and copy-files phases
    /// carry one.
    pub fn phase_name(&self, phase: &ObjectId) -> Option<&str> {
        self.object(phase).and_then(|p| p.get_str("name"))
    }

    /// Build file entries of a phase.
    pub fn phase_files(&self, phase: &ObjectId) -> Vec<ObjectId> {
        self.object(phase)
            .and_then(|p| p.get_array("files"))
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| f.as_str().map(ObjectId::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The file reference a build file links.
    pub fn build_file_ref(&self, build_file: &ObjectId) -> Option<ObjectId> {
        self.object(build_file)
            .and_then(|f| f.get_str("fileRef"))
            .map(ObjectId::from)
    }

    /// Display name of a file reference: its `name`, or the last component of
    /// its `path`.
    pub fn file_display_name(&self, file_ref: &ObjectId) -> Option<String> {
        let object = self.object(file_ref)?;
        object
            .get_str("name")
            .or_else(|| {
                object
                    .get_str("path")
                    .map(|p| p.rsplit('/').next().unwrap_or(p))
            })
            .map(str::to_string)
    }

    /// Remove one build file entry from a phase and delete its object.
    pub fn remove_build_file(&mut self, phase: &ObjectId, build_file: &ObjectId) {
        if let Some(files) = self
            .object_mut(phase)
            .and_then(|p| p.get_array_mut("files"))
        {
            files.retain(|f| f.as_str() != Some(build_file.as_str()));
        }
        self.remove_object(build_file);
    }

    /// Remove a build phase from a target, deleting the phase object and all
    /// of its build file entries. Other phases keep their relative order.
    pub fn remove_build_phase(&mut self, target: &ObjectId, phase: &ObjectId) {
        for build_file in self.phase_files(phase) {
            self.remove_object(&build_file);
        }
        if let Some(phases) = self
            .object_mut(target)
            .and_then(|t| t.get_array_mut("buildPhases"))
        {
            phases.retain(|p| p.as_str() != Some(phase.as_str()));
        }
        self.remove_object(phase);
    }

    // ------------------------------------------------------------------
    // Build configurations
    // ------------------------------------------------------------------

    /// Build configurations of a target via its configuration list.
    pub fn build_configurations(&self, target: &ObjectId) -> Vec<ObjectId> {
        self.object(target)
            .and_then(|t| t.get_str("buildConfigurationList"))
            .and_then(|list| self.objects().get_dict(list))
            .and_then(|list| list.get_array("buildConfigurations"))
            .map(|configs| {
                configs
                    .iter()
                    .filter_map(|c| c.as_str().map(ObjectId::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn base_configuration_reference(&self, config: &ObjectId) -> Option<ObjectId> {
        self.object(config)
            .and_then(|c| c.get_str("baseConfigurationReference"))
            .map(ObjectId::from)
    }

    /// Clear the base configuration reference; the configuration object and
    /// its build settings stay untouched.
    pub fn clear_base_configuration_reference(&mut self, config: &ObjectId) {
        if let Some(config) = self.object_mut(config) {
            config.remove("baseConfigurationReference");
        }
    }

    // ------------------------------------------------------------------
    // Whole-graph scans
    // ------------------------------------------------------------------

    /// Every file reference still linked somewhere: by a `PBXBuildFile` or by
    /// a configuration's base reference. Computed fresh per call so deletion
    /// decisions never run against a stale index.
    pub fn referenced_file_refs(&self) -> HashSet<ObjectId> {
        let mut live = HashSet::new();
        for (_, value) in self.objects().iter() {
            let Some(object) = value.as_dict() else { continue };
            match object.get_str("isa") {
                Some("PBXBuildFile") => {
                    if let Some(file_ref) = object.get_str("fileRef") {
                        live.insert(ObjectId::from(file_ref));
                    }
                }
                Some("XCBuildConfiguration") => {
                    if let Some(base) = object.get_str("baseConfigurationReference") {
                        live.insert(ObjectId::from(base));
                    }
                }
                _ => {}
            }
        }
        live
    }

    /// All file references in the object table.
    pub fn file_references(&self) -> Vec<ObjectId> {
        self.objects()
            .iter()
            .filter(|(_, v)| {
                v.as_dict().and_then(|d| d.get_str("isa")) == Some("PBXFileReference")
            })
            .map(|(id, _)| ObjectId::from(id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// The project's main group.
    pub fn main_group(&self) -> Option<ObjectId> {
        self.project_object()
            .and_then(|p| p.get_str("mainGroup"))
            .map(ObjectId::from)
    }

    /// The products group, when the project designates one.
    pub fn product_ref_group(&self) -> Option<ObjectId> {
        self.project_object()
            .and_then(|p| p.get_str("productRefGroup"))
            .map(ObjectId::from)
    }

    fn group_ids(&self) -> Vec<ObjectId> {
        self.objects()
            .iter()
            .filter(|(_, v)| {
                matches!(
                    v.as_dict().and_then(|d| d.get_str("isa")),
                    Some("PBXGroup") | Some("PBXVariantGroup")
                )
            })
            .map(|(id, _)| ObjectId::from(id))
            .collect()
    }

    /// Children of a group.
    pub fn group_children(&self, group: &ObjectId) -> Vec<ObjectId> {
        self.object(group)
            .and_then(|g| g.get_array("children"))
            .map(|children| {
                children
                    .iter()
                    .filter_map(|c| c.as_str().map(ObjectId::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a file reference is reachable from the group tree.
    pub fn is_in_group_tree(&self, file_ref: &ObjectId) -> bool {
        self.group_ids()
            .iter()
            .any(|g| self.group_children(g).contains(file_ref))
    }

    /// Groups that directly list `child` among their children.
    pub fn groups_containing(&self, child: &ObjectId) -> Vec<ObjectId> {
        self.group_ids()
            .into_iter()
            .filter(|g| self.group_children(g).contains(child))
            .collect()
    }

    /// Delete a file reference: detach it from every group and drop the
    /// object itself.
    pub fn remove_file_reference(&mut self, file_ref: &ObjectId) {
        for group in self.group_ids() {
            if let Some(children) = self
                .object_mut(&group)
                .and_then(|g| g.get_array_mut("children"))
            {
                children.retain(|c| c.as_str() != Some(file_ref.as_str()));
            }
        }
        self.remove_object(file_ref);
    }

    /// Delete groups from `emptied` that are now empty, cascading into
    /// parents the deletion empties in turn. Protected groups (the main
    /// group and the products group) always stay, and so do groups that
    /// were already empty before this run: only seeds and their emptied
    /// ancestors are considered.
    pub fn prune_emptied_groups(&mut self, mut emptied: Vec<ObjectId>) {
        let mut protected: HashSet<ObjectId> = HashSet::new();
        protected.extend(self.main_group());
        protected.extend(self.product_ref_group());

        while let Some(group) = emptied.pop() {
            let is_group = matches!(
                self.isa(&group),
                Some("PBXGroup") | Some("PBXVariantGroup")
            );
            if !is_group || protected.contains(&group) || !self.group_children(&group).is_empty()
            {
                continue;
            }
            let parents = self.groups_containing(&group);
            self.remove_file_reference(&group);
            emptied.extend(parents);
        }
    }

    // ------------------------------------------------------------------
    // Target dependencies
    // ------------------------------------------------------------------

    /// Dependency edges declared by a target.
    pub fn target_dependencies(&self, target: &ObjectId) -> Vec<ObjectId> {
        self.object(target)
            .and_then(|t| t.get_array("dependencies"))
            .map(|deps| {
                deps.iter()
                    .filter_map(|d| d.as_str().map(ObjectId::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve the target a dependency edge points at, either directly or
    /// through its container item proxy.
    pub fn dependency_target(&self, dependency: &ObjectId) -> Option<ObjectId> {
        let dep = self.object(dependency)?;
        if let Some(target) = dep.get_str("target") {
            return Some(ObjectId::from(target));
        }
        let proxy = dep.get_str("targetProxy")?;
        self.objects()
            .get_dict(proxy)?
            .get_str("remoteGlobalIDString")
            .map(ObjectId::from)
    }

    fn remove_dependency_edge(&mut self, owner: &ObjectId, dependency: &ObjectId) {
        let proxy = self
            .object(dependency)
            .and_then(|d| d.get_str("targetProxy"))
            .map(ObjectId::from);
        if let Some(deps) = self
            .object_mut(owner)
            .and_then(|t| t.get_array_mut("dependencies"))
        {
            deps.retain(|d| d.as_str() != Some(dependency.as_str()));
        }
        if let Some(proxy) = proxy {
            self.remove_object(&proxy);
        }
        self.remove_object(dependency);
    }

    /// Drop every dependency edge in the project that resolves to `target`.
    pub fn detach_dependencies_on(&mut self, target: &ObjectId) {
        for owner in self.targets() {
            let dangling: Vec<ObjectId> = self
                .target_dependencies(&owner)
                .into_iter()
                .filter(|d| self.dependency_target(d).as_ref() == Some(target))
                .collect();
            for dep in dangling {
                self.remove_dependency_edge(&owner, &dep);
            }
        }
    }

    /// Remove a target and everything it exclusively owns: build phases and
    /// their build files, outgoing dependency edges, the configuration list
    /// and its configurations, the product reference, and the target's entry
    /// in the project's target list and attributes.
    pub fn remove_target(&mut self, target: &ObjectId) {
        self.detach_dependencies_on(target);

        for phase in self.build_phases(target) {
            self.remove_build_phase(target, &phase);
        }
        for dep in self.target_dependencies(target) {
            self.remove_dependency_edge(target, &dep);
        }

        if let Some(list) = self
            .object(target)
            .and_then(|t| t.get_str("buildConfigurationList"))
            .map(ObjectId::from)
        {
            for config in self.build_configurations(target) {
                self.remove_object(&config);
            }
            self.remove_object(&list);
        }

        if let Some(product) = self
            .object(target)
            .and_then(|t| t.get_str("productReference"))
            .map(ObjectId::from)
        {
            self.remove_file_reference(&product);
        }

        let target_id = target.as_str().to_string();
        if let Some(project) = self.project_object_mut() {
            if let Some(targets) = project.get_array_mut("targets") {
                targets.retain(|t| t.as_str() != Some(&target_id));
            }
            if let Some(attrs) = project
                .get_dict_mut("attributes")
                .and_then(|a| a.get_dict_mut("TargetAttributes"))
            {
                attrs.remove(&target_id);
            }
        }
        self.remove_object(target);
    }
}
