//! Serializer emitting the canonical Xcode pbxproj layout.
//!
//! Xcode writes these files with tab indentation, the `objects` table grouped
//! into `/* Begin <ISA> section */` blocks sorted by isa, single-line entries
//! for `PBXBuildFile` and `PBXFileReference`, and `/* display name */`
//! annotations after every object reference. Annotations are derived from the
//! graph at write time, so they stay consistent after mutation.

use std::collections::HashMap;

use super::value::{Dict, Value};

/// Object kinds Xcode keeps on a single line.
const SINGLE_LINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// Serialize a parsed pbxproj root dictionary back to document text.
///
/// `project_name` is the `.xcodeproj` bundle name (without extension); it only
/// feeds the `Build configuration list for PBXProject "…"` annotation.
pub fn to_string(root: &Dict, project_name: Option<&str>) -> String {
    let annotations = Annotations::build(root, project_name);
    let mut out = String::with_capacity(16 * 1024);
    out.push_str("// !$*UTF8*$!\n{\n");
    for (key, value) in root.iter() {
        if key == "objects" {
            if let Some(objects) = value.as_dict() {
                write_objects(&mut out, objects, &annotations);
                continue;
            }
        }
        write_entry(&mut out, key, value, 1, &annotations);
    }
    out.push_str("}\n");
    out
}

fn write_objects(out: &mut String, objects: &Dict, annotations: &Annotations) {
    out.push_str("\tobjects = {\n");

    let mut isas: Vec<&str> = objects
        .iter()
        .filter_map(|(_, v)| v.as_dict().and_then(|d| d.get_str("isa")))
        .collect();
    isas.sort_unstable();
    isas.dedup();

    for isa in isas {
        out.push_str(&format!("\n/* Begin {} section */\n", isa));
        for (id, value) in objects.iter() {
            let Some(object) = value.as_dict() else { continue };
            if object.get_str("isa") != Some(isa) {
                continue;
            }
            if SINGLE_LINE_ISAS.contains(&isa) {
                write_single_line_object(out, id, object, annotations);
            } else {
                write_entry(out, id, value, 2, annotations);
            }
        }
        out.push_str(&format!("/* End {} section */\n", isa));
    }

    out.push_str("\t};\n");
}

fn write_single_line_object(out: &mut String, id: &str, object: &Dict, annotations: &Annotations) {
    out.push_str("\t\t");
    out.push_str(&annotations.annotate(id));
    out.push_str(" = {");
    for (key, value) in object.iter() {
        out.push_str(&quote(key));
        out.push_str(" = ");
        write_inline_value(out, value, annotations);
        out.push_str("; ");
    }
    out.push_str("};\n");
}

/// Values inside single-line objects, recursively: `(a, b, )` arrays and
/// `{key = value; }` dicts, e.g. a build file's `settings = {ATTRIBUTES =
/// (Weak, ); };`.
fn write_inline_value(out: &mut String, value: &Value, annotations: &Annotations) {
    match value {
        Value::String(s) => out.push_str(&annotations.annotate(s)),
        Value::Array(items) => {
            out.push('(');
            for item in items {
                write_inline_value(out, item, annotations);
                out.push_str(", ");
            }
            out.push(')');
        }
        Value::Dict(dict) => {
            out.push('{');
            for (key, v) in dict.iter() {
                out.push_str(&quote(key));
                out.push_str(" = ");
                write_inline_value(out, v, annotations);
                out.push_str("; ");
            }
            out.push('}');
        }
    }
}

fn write_entry(out: &mut String, key: &str, value: &Value, indent: usize, annotations: &Annotations) {
    let tabs = "\t".repeat(indent);
    out.push_str(&tabs);
    out.push_str(&annotations.annotate(key));
    out.push_str(" = ");
    write_value(out, value, indent, annotations);
    out.push_str(";\n");
}

fn write_value(out: &mut String, value: &Value, indent: usize, annotations: &Annotations) {
    match value {
        Value::String(s) => out.push_str(&annotations.annotate(s)),
        Value::Array(items) => {
            let tabs = "\t".repeat(indent);
            out.push_str("(\n");
            for item in items {
                out.push_str(&tabs);
                out.push('\t');
                write_value(out, item, indent + 1, annotations);
                out.push_str(",\n");
            }
            out.push_str(&tabs);
            out.push(')');
        }
        Value::Dict(dict) => {
            let tabs = "\t".repeat(indent);
            out.push_str("{\n");
            for (key, v) in dict.iter() {
                write_entry(out, key, v, indent + 1, annotations);
            }
            out.push_str(&tabs);
            out.push('}');
        }
    }
}

/// Quote a string the way Xcode does: bare when it consists solely of
/// identifier-safe characters, double-quoted with escapes otherwise.
fn quote(s: &str) -> String {
    let bare = !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b':' | b'.'));
    if bare {
        return s.to_string();
    }
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Display-name annotations for object references, computed once per write.
struct Annotations {
    by_id: HashMap<String, String>,
}

impl Annotations {
    fn build(root: &Dict, project_name: Option<&str>) -> Self {
        let mut by_id = HashMap::new();
        let Some(objects) = root.get_dict("objects") else {
            return Annotations { by_id };
        };

        // Phase that owns each build file, for "Name in Phase" annotations.
        let mut owning_phase: HashMap<&str, &str> = HashMap::new();
        for (id, value) in objects.iter() {
            let Some(object) = value.as_dict() else { continue };
            if let Some(files) = object.get_array("files") {
                for file in files {
                    if let Some(file_id) = file.as_str() {
                        owning_phase.insert(file_id, id);
                    }
                }
            }
        }

        // Owner of each configuration list, for the long-form annotation.
        let mut list_owner: HashMap<&str, &str> = HashMap::new();
        for (id, value) in objects.iter() {
            let Some(object) = value.as_dict() else { continue };
            if let Some(list) = object.get_str("buildConfigurationList") {
                list_owner.insert(list, id);
            }
        }

        for (id, value) in objects.iter() {
            let Some(object) = value.as_dict() else { continue };
            let Some(isa) = object.get_str("isa") else { continue };
            let annotation = match isa {
                "PBXBuildFile" => {
                    let file_name = object
                        .get_str("fileRef")
                        .and_then(|r| display_name(objects, r));
                    let phase_name = owning_phase
                        .get(id)
                        .and_then(|p| objects.get_dict(p))
                        .map(phase_display_name);
                    match (file_name, phase_name) {
                        (Some(f), Some(p)) => Some(format!("{} in {}", f, p)),
                        (Some(f), None) => Some(f),
                        _ => None,
                    }
                }
                "PBXFileReference" | "PBXGroup" | "PBXVariantGroup" | "XCVersionGroup" => {
                    display_name_of(object)
                }
                "PBXNativeTarget" | "PBXAggregateTarget" | "PBXLegacyTarget" => {
                    object.get_str("name").map(str::to_string)
                }
                "PBXProject" => Some("Project object".to_string()),
                "PBXSourcesBuildPhase"
                | "PBXFrameworksBuildPhase"
                | "PBXResourcesBuildPhase"
                | "PBXHeadersBuildPhase"
                | "PBXShellScriptBuildPhase"
                | "PBXCopyFilesBuildPhase" => Some(phase_display_name(object)),
                "XCBuildConfiguration" => object.get_str("name").map(str::to_string),
                "XCConfigurationList" => {
                    let owner = list_owner.get(id).and_then(|o| objects.get_dict(o));
                    match owner {
                        Some(owner_dict) => {
                            let owner_isa = owner_dict.get_str("isa").unwrap_or("PBXProject");
                            let owner_name = owner_dict
                                .get_str("name")
                                .or(project_name)
                                .unwrap_or("Project");
                            Some(format!(
                                "Build configuration list for {} \"{}\"",
                                owner_isa, owner_name
                            ))
                        }
                        None => None,
                    }
                }
                "PBXTargetDependency" | "PBXContainerItemProxy" => Some(isa.to_string()),
                _ => None,
            };
            if let Some(annotation) = annotation {
                by_id.insert(id.to_string(), annotation);
            }
        }

        Annotations { by_id }
    }

    /// Render a token with its `/* … */` annotation when it names an object.
    fn annotate(&self, token: &str) -> String {
        match self.by_id.get(token) {
            Some(name) => format!("{} /* {} */", quote(token), name),
            None => quote(token),
        }
    }
}

fn display_name(objects: &Dict, id: &str) -> Option<String> {
    objects.get_dict(id).and_then(display_name_of)
}

fn display_name_of(object: &Dict) -> Option<String> {
    object
        .get_str("name")
        .or_else(|| {
            object
                .get_str("path")
                .map(|p| p.rsplit('/').next().unwrap_or(p))
        })
        .map(str::to_string)
}

fn phase_display_name(phase: &Dict) -> String {
    if let Some(name) = phase.get_str("name") {
        return name.to_string();
    }
    match phase.get_str("isa") {
        Some("PBXSourcesBuildPhase") => "Sources",
        Some("PBXFrameworksBuildPhase") => "Frameworks",
        Some("PBXResourcesBuildPhase") => "Resources",
        Some("PBXHeadersBuildPhase") => "Headers",
        Some("PBXShellScriptBuildPhase") => "ShellScript",
        Some("PBXCopyFilesBuildPhase") => "CopyFiles",
        _ => "Build Phase",
    }
    .to_string()
}
