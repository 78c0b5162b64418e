//! Naming conventions for CocoaPods-generated artifacts.
//!
//! The integration step changed its naming scheme several times; projects in
//! the wild carry artifacts from any of the generations below. The registry
//! is a data table so supporting a new generation is a table edit, not an
//! algorithm change.

use std::sync::LazyLock;

use regex::RegexSet;

/// One integration-format generation and the names it produced.
#[derive(Debug, Clone, Copy)]
pub struct Generation {
    pub name: &'static str,
    /// Product names linked into Frameworks build phases.
    pub products: &'static [&'static str],
    /// Names of injected shell-script build phases.
    pub script_phases: &'static [&'static str],
    /// Base-configuration file names attached to build configurations.
    pub xcconfigs: &'static [&'static str],
}

/// All supported generations, oldest first.
pub const GENERATIONS: &[Generation] = &[
    // Single shared Pods target; one library/framework linked everywhere.
    // Legacy phase names are matched as substrings: Xcode decorates phase
    // names when duplicating, and early integrations never carried a marker
    // prefix to anchor on.
    Generation {
        name: "pre-1.0.0",
        products: &[r"(?i)^libPods\.a$", r"(?i)^Pods\.framework$"],
        script_phases: &[
            r"Check Pods Manifest\.lock",
            r"Copy Pods Resources",
            r"Embed Pods Frameworks",
        ],
        xcconfigs: &[r"(?i)^Pods\.xcconfig$", r"(?i)^Pods\.[^.]+\.xcconfig$"],
    },
    // Per-target products and per-configuration xcconfig files. Product
    // separators varied across releases (`libPods-App.a`, `Pods_App.framework`,
    // `PodsApp`-style names), so anything in the `libPods*.a` /
    // `Pods*.framework` families counts.
    Generation {
        name: "1.0.0",
        products: &[r"(?i)^libPods.+\.a$", r"(?i)^Pods.+\.framework$"],
        script_phases: &[
            r"^\[CP\] Check Pods Manifest\.lock$",
            r"^\[CP\] Copy Pods Resources$",
            r"^\[CP\] Embed Pods Frameworks$",
        ],
        xcconfigs: &[r"(?i)^Pods-.+\.xcconfig$"],
    },
    // Any phase carrying the dependency-manager prefix, including
    // user-defined script phases managed through the Podfile.
    Generation {
        name: "post-1.0.1",
        products: &[],
        script_phases: &[r"^\[CP\] ", r"^\[CP-User\] "],
        xcconfigs: &[],
    },
];

/// Compiled union of every generation's patterns.
#[derive(Debug)]
pub struct PatternRegistry {
    products: RegexSet,
    script_phases: RegexSet,
    xcconfigs: RegexSet,
}

impl PatternRegistry {
    fn compile(generations: &[Generation]) -> PatternRegistry {
        let collect = |select: fn(&Generation) -> &'static [&'static str]| {
            generations
                .iter()
                .flat_map(|g| select(g).iter().copied())
                .collect::<Vec<_>>()
        };
        PatternRegistry {
            products: RegexSet::new(collect(|g| g.products)).expect("product patterns"),
            script_phases: RegexSet::new(collect(|g| g.script_phases))
                .expect("script phase patterns"),
            xcconfigs: RegexSet::new(collect(|g| g.xcconfigs)).expect("xcconfig patterns"),
        }
    }

    /// Whether a Frameworks-phase entry names a generated library/framework.
    pub fn matches_product(&self, name: &str) -> bool {
        self.products.is_match(name)
    }

    /// Whether a shell-script phase name was injected by the integration.
    pub fn matches_script_phase(&self, name: &str) -> bool {
        self.script_phases.is_match(name)
    }

    /// Whether a base-configuration file name was generated by the
    /// integration.
    pub fn matches_xcconfig(&self, name: &str) -> bool {
        self.xcconfigs.is_match(name)
    }
}

static REGISTRY: LazyLock<PatternRegistry> = LazyLock::new(|| PatternRegistry::compile(GENERATIONS));

/// The shared registry covering every supported generation.
pub fn registry() -> &'static PatternRegistry {
    &REGISTRY
}
