//! Fixture builders for integrated Xcode projects.
//!
//! Tests describe a project shape (targets, linked products, script phases,
//! base configurations, dependency edges) and get back document text or an
//! opened [`Project`]. Identifiers are assigned sequentially so fixture
//! output is deterministic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pbxproj::value::{Dict, Value};
use crate::pbxproj::{writer, Project};

/// One target in a fixture project.
#[derive(Debug, Clone)]
pub struct FixtureTarget {
    name: String,
    product_type: Option<&'static str>,
    has_phases: bool,
    links: Vec<String>,
    script_phases: Vec<String>,
    base_configuration: Option<String>,
    deps: Vec<String>,
}

impl FixtureTarget {
    fn new(name: &str, product_type: Option<&'static str>, has_phases: bool) -> Self {
        FixtureTarget {
            name: name.to_string(),
            product_type,
            has_phases,
            links: Vec::new(),
            script_phases: Vec::new(),
            base_configuration: None,
            deps: Vec::new(),
        }
    }

    /// An application target with empty Sources and Frameworks phases.
    pub fn app(name: &str) -> Self {
        Self::new(name, Some("com.apple.product-type.application"), true)
    }

    /// A unit-test bundle target.
    pub fn test_bundle(name: &str) -> Self {
        Self::new(name, Some("com.apple.product-type.bundle.unit-test"), true)
    }

    /// A minimal target with no build phases and no configuration list.
    pub fn bare(name: &str) -> Self {
        Self::new(name, None, false)
    }

    /// Link a library/framework into the Frameworks phase. Products with the
    /// same name share one file reference across targets, as Xcode does.
    pub fn links(mut self, product: &str) -> Self {
        self.links.push(product.to_string());
        self
    }

    /// Add a shell-script build phase with the given name.
    pub fn script_phase(mut self, name: &str) -> Self {
        self.script_phases.push(name.to_string());
        self
    }

    /// Attach a base configuration file to every build configuration.
    pub fn base_configuration(mut self, xcconfig: &str) -> Self {
        self.base_configuration = Some(xcconfig.to_string());
        self
    }

    /// Add a dependency edge to another fixture target, by name.
    pub fn depends_on(mut self, target: &str) -> Self {
        self.deps.push(target.to_string());
        self
    }
}

/// A whole fixture project.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    name: String,
    targets: Vec<FixtureTarget>,
    groups: Vec<String>,
}

impl ProjectFixture {
    pub fn new(name: &str) -> Self {
        ProjectFixture {
            name: name.to_string(),
            targets: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn target(mut self, target: FixtureTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Add an empty group under the main group.
    pub fn group(mut self, name: &str) -> Self {
        self.groups.push(name.to_string());
        self
    }

    /// Render the fixture as pbxproj document text.
    pub fn pbxproj(&self) -> String {
        let root = Builder::new().build(self);
        writer::to_string(&root, Some(&self.name))
    }

    /// Open the fixture as an in-memory [`Project`].
    pub fn project(&self) -> Project {
        Project::from_source(&self.pbxproj(), &self.name).expect("fixture must parse")
    }

    /// Write the fixture as `<dir>/<name>.xcodeproj/project.pbxproj` and
    /// return the bundle path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let bundle = dir.join(format!("{}.xcodeproj", self.name));
        fs::create_dir_all(&bundle).expect("create .xcodeproj bundle");
        fs::write(bundle.join("project.pbxproj"), self.pbxproj()).expect("write pbxproj");
        bundle
    }
}

struct Builder {
    next_id: u64,
    objects: Dict,
}

impl Builder {
    fn new() -> Self {
        Builder {
            next_id: 1,
            objects: Dict::new(),
        }
    }

    fn id(&mut self) -> String {
        let id = format!("{:024X}", self.next_id);
        self.next_id += 1;
        id
    }

    fn add(&mut self, id: &str, entries: Vec<(&str, Value)>) {
        let mut dict = Dict::new();
        for (key, value) in entries {
            dict.insert(key, value);
        }
        self.objects.insert(id, Value::Dict(dict));
    }

    fn array(ids: &[String]) -> Value {
        Value::Array(ids.iter().map(|i| Value::from(i.as_str())).collect())
    }

    fn build(mut self, fixture: &ProjectFixture) -> Dict {
        let root_object = self.id();
        let main_group = self.id();
        let products_group = self.id();

        // Shared file references for linked products, one per distinct name.
        let mut product_refs: HashMap<String, String> = HashMap::new();
        let mut frameworks_children: Vec<String> = Vec::new();
        for target in &fixture.targets {
            for product in &target.links {
                if !product_refs.contains_key(product) {
                    let id = self.id();
                    self.add(
                        &id,
                        vec![
                            ("isa", Value::from("PBXFileReference")),
                            ("name", Value::from(product.as_str())),
                            ("path", Value::from(product.as_str())),
                            ("sourceTree", Value::from("BUILT_PRODUCTS_DIR")),
                        ],
                    );
                    frameworks_children.push(id.clone());
                    product_refs.insert(product.clone(), id);
                }
            }
        }

        // Shared xcconfig references, one per distinct name.
        let mut xcconfig_refs: HashMap<String, String> = HashMap::new();
        let mut pods_children: Vec<String> = Vec::new();
        for target in &fixture.targets {
            if let Some(xcconfig) = &target.base_configuration {
                if !xcconfig_refs.contains_key(xcconfig) {
                    let id = self.id();
                    let path =
                        format!("Pods/Target Support Files/Pods-{}/{}", target.name, xcconfig);
                    self.add(
                        &id,
                        vec![
                            ("isa", Value::from("PBXFileReference")),
                            ("name", Value::from(xcconfig.as_str())),
                            ("path", Value::from(path)),
                            ("sourceTree", Value::from("<group>")),
                        ],
                    );
                    pods_children.push(id.clone());
                    xcconfig_refs.insert(xcconfig.clone(), id);
                }
            }
        }

        let mut main_children: Vec<String> = Vec::new();
        if !frameworks_children.is_empty() {
            let frameworks_group = self.id();
            self.add(
                &frameworks_group,
                vec![
                    ("isa", Value::from("PBXGroup")),
                    ("children", Self::array(&frameworks_children)),
                    ("name", Value::from("Frameworks")),
                    ("sourceTree", Value::from("<group>")),
                ],
            );
            main_children.push(frameworks_group);
        }
        if !pods_children.is_empty() {
            let pods_group = self.id();
            self.add(
                &pods_group,
                vec![
                    ("isa", Value::from("PBXGroup")),
                    ("children", Self::array(&pods_children)),
                    ("name", Value::from("Pods")),
                    ("sourceTree", Value::from("<group>")),
                ],
            );
            main_children.push(pods_group);
        }
        for name in &fixture.groups {
            let group = self.id();
            self.add(
                &group,
                vec![
                    ("isa", Value::from("PBXGroup")),
                    ("children", Value::Array(vec![])),
                    ("name", Value::from(name.as_str())),
                    ("sourceTree", Value::from("<group>")),
                ],
            );
            main_children.push(group);
        }
        main_children.push(products_group.clone());

        // Assign target identifiers up front so dependency edges can point
        // forward as well as backward.
        let target_ids: HashMap<String, String> = fixture
            .targets
            .iter()
            .map(|t| (t.name.clone(), self.id()))
            .collect();

        let mut products_children: Vec<String> = Vec::new();
        let mut target_list: Vec<String> = Vec::new();

        for target in &fixture.targets {
            let target_id = target_ids[&target.name].clone();
            target_list.push(target_id.clone());

            let mut phases: Vec<String> = Vec::new();
            if target.has_phases {
                let sources = self.id();
                self.add(
                    &sources,
                    vec![
                        ("isa", Value::from("PBXSourcesBuildPhase")),
                        ("buildActionMask", Value::from("2147483647")),
                        ("files", Value::Array(vec![])),
                        ("runOnlyForDeploymentPostprocessing", Value::from("0")),
                    ],
                );
                phases.push(sources);

                let mut build_files: Vec<String> = Vec::new();
                for product in &target.links {
                    let build_file = self.id();
                    let file_ref = product_refs[product].clone();
                    self.add(
                        &build_file,
                        vec![
                            ("isa", Value::from("PBXBuildFile")),
                            ("fileRef", Value::from(file_ref)),
                        ],
                    );
                    build_files.push(build_file);
                }
                let frameworks = self.id();
                self.add(
                    &frameworks,
                    vec![
                        ("isa", Value::from("PBXFrameworksBuildPhase")),
                        ("buildActionMask", Value::from("2147483647")),
                        ("files", Self::array(&build_files)),
                        ("runOnlyForDeploymentPostprocessing", Value::from("0")),
                    ],
                );
                phases.push(frameworks);

                for name in &target.script_phases {
                    let phase = self.id();
                    self.add(
                        &phase,
                        vec![
                            ("isa", Value::from("PBXShellScriptBuildPhase")),
                            ("buildActionMask", Value::from("2147483647")),
                            ("files", Value::Array(vec![])),
                            ("name", Value::from(name.as_str())),
                            ("shellPath", Value::from("/bin/sh")),
                            (
                                "shellScript",
                                Value::from(
                                    "diff \"${PODS_ROOT}/../Podfile.lock\" \"${PODS_ROOT}/Manifest.lock\" > /dev/null\n",
                                ),
                            ),
                        ],
                    );
                    phases.push(phase);
                }
            }

            let mut deps: Vec<String> = Vec::new();
            for dep_name in &target.deps {
                let dependee = target_ids
                    .get(dep_name)
                    .unwrap_or_else(|| panic!("unknown fixture target `{}`", dep_name))
                    .clone();
                let proxy = self.id();
                self.add(
                    &proxy,
                    vec![
                        ("isa", Value::from("PBXContainerItemProxy")),
                        ("containerPortal", Value::from(root_object.as_str())),
                        ("proxyType", Value::from("1")),
                        ("remoteGlobalIDString", Value::from(dependee.as_str())),
                        ("remoteInfo", Value::from(dep_name.as_str())),
                    ],
                );
                let dependency = self.id();
                self.add(
                    &dependency,
                    vec![
                        ("isa", Value::from("PBXTargetDependency")),
                        ("target", Value::from(dependee)),
                        ("targetProxy", Value::from(proxy)),
                    ],
                );
                deps.push(dependency);
            }

            let mut entries: Vec<(&str, Value)> = vec![("isa", Value::from("PBXNativeTarget"))];

            if target.has_phases {
                let config_list = self.configuration_list(
                    target.base_configuration.as_deref(),
                    &xcconfig_refs,
                );
                entries.push(("buildConfigurationList", Value::from(config_list)));
            }
            entries.push(("buildPhases", Self::array(&phases)));
            entries.push(("dependencies", Self::array(&deps)));
            entries.push(("name", Value::from(target.name.as_str())));
            entries.push(("productName", Value::from(target.name.as_str())));

            if let Some(product_type) = target.product_type {
                let extension = if product_type.ends_with("unit-test") {
                    "xctest"
                } else {
                    "app"
                };
                let product_ref = self.id();
                self.add(
                    &product_ref,
                    vec![
                        ("isa", Value::from("PBXFileReference")),
                        ("explicitFileType", Value::from("wrapper.application")),
                        ("includeInIndex", Value::from("0")),
                        (
                            "path",
                            Value::from(format!("{}.{}", target.name, extension)),
                        ),
                        ("sourceTree", Value::from("BUILT_PRODUCTS_DIR")),
                    ],
                );
                products_children.push(product_ref.clone());
                entries.push(("productReference", Value::from(product_ref)));
                entries.push(("productType", Value::from(product_type)));
            }

            self.add(&target_id, entries);
        }

        self.add(
            &products_group,
            vec![
                ("isa", Value::from("PBXGroup")),
                ("children", Self::array(&products_children)),
                ("name", Value::from("Products")),
                ("sourceTree", Value::from("<group>")),
            ],
        );
        self.add(
            &main_group,
            vec![
                ("isa", Value::from("PBXGroup")),
                ("children", Self::array(&main_children)),
                ("sourceTree", Value::from("<group>")),
            ],
        );

        let project_config_list = self.configuration_list(None, &HashMap::new());
        self.add(
            &root_object,
            vec![
                ("isa", Value::from("PBXProject")),
                ("attributes", Value::Dict(Dict::new())),
                ("buildConfigurationList", Value::from(project_config_list)),
                ("compatibilityVersion", Value::from("Xcode 3.2")),
                ("developmentRegion", Value::from("en")),
                ("hasScannedForEncodings", Value::from("0")),
                ("mainGroup", Value::from(main_group)),
                ("productRefGroup", Value::from(products_group)),
                ("projectDirPath", Value::from("")),
                ("projectRoot", Value::from("")),
                ("targets", Self::array(&target_list)),
            ],
        );

        let mut root = Dict::new();
        root.insert("archiveVersion", Value::from("1"));
        root.insert("classes", Value::Dict(Dict::new()));
        root.insert("objectVersion", Value::from("46"));
        root.insert("objects", Value::Dict(self.objects));
        root.insert("rootObject", Value::from(root_object));
        root
    }

    fn configuration_list(
        &mut self,
        base_configuration: Option<&str>,
        xcconfig_refs: &HashMap<String, String>,
    ) -> String {
        let mut configs: Vec<String> = Vec::new();
        for variant in ["Debug", "Release"] {
            let config = self.id();
            let mut entries: Vec<(&str, Value)> =
                vec![("isa", Value::from("XCBuildConfiguration"))];
            if let Some(base) = base_configuration {
                if let Some(file_ref) = xcconfig_refs.get(base) {
                    entries.push((
                        "baseConfigurationReference",
                        Value::from(file_ref.as_str()),
                    ));
                }
            }
            let mut settings = Dict::new();
            settings.insert("PRODUCT_NAME", Value::from("$(TARGET_NAME)"));
            entries.push(("buildSettings", Value::Dict(settings)));
            entries.push(("name", Value::from(variant)));
            self.add(&config, entries);
            configs.push(config);
        }

        let list = self.id();
        self.add(
            &list,
            vec![
                ("isa", Value::from("XCConfigurationList")),
                ("buildConfigurations", Self::array(&configs)),
                ("defaultConfigurationIsVisible", Value::from("0")),
                ("defaultConfigurationName", Value::from("Release")),
            ],
        );
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbxproj::BuildPhaseKind;

    #[test]
    fn test_fixture_parses_and_exposes_targets() {
        let project = ProjectFixture::new("App")
            .target(FixtureTarget::app("App").links("libPods-App.a"))
            .target(FixtureTarget::test_bundle("AppTests").depends_on("App"))
            .project();

        assert_eq!(project.native_targets().len(), 2);
        let app = project
            .native_targets()
            .into_iter()
            .find(|t| project.target_name(t) == Some("App"))
            .unwrap();
        assert!(project
            .build_phases(&app)
            .iter()
            .any(|p| project.phase_kind(p) == BuildPhaseKind::Frameworks));
        assert_eq!(project.build_configurations(&app).len(), 2);
    }

    #[test]
    fn test_shared_link_uses_one_file_reference() {
        let project = ProjectFixture::new("Shared")
            .target(FixtureTarget::app("A").links("libPods.a"))
            .target(FixtureTarget::app("B").links("libPods.a"))
            .project();

        let refs: std::collections::HashSet<_> = project
            .native_targets()
            .iter()
            .flat_map(|t| project.build_phases(t))
            .filter(|p| project.phase_kind(p) == BuildPhaseKind::Frameworks)
            .flat_map(|p| project.phase_files(&p))
            .filter_map(|f| project.build_file_ref(&f))
            .collect();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_write_to_creates_bundle() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bundle = ProjectFixture::new("App")
            .target(FixtureTarget::app("App"))
            .write_to(tmp.path());

        assert!(bundle.join("project.pbxproj").is_file());
        assert!(Project::open(&bundle).is_ok());
    }
}
