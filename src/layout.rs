//! Artifact layout plans for the build tree and the installed package tree.

use std::path::PathBuf;

/// Which tree a layout describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    /// In-progress build tree, compiled in place
    Build,
    /// Installed package tree consumed by downstream projects
    Package,
}

/// Mapping from artifact class to relative directories within one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    pub bin_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    /// Always a single stable header root, so consumers get one `#include`
    /// search path regardless of internal source layout
    pub include_dirs: Vec<PathBuf>,
    pub licenses_dir: Option<PathBuf>,
    /// Library names consumers link against
    pub libs: Vec<String>,
}

/// The fixed layout for the given phase.
///
/// This is a library-only package: the build tree ships no runnable binaries
/// at all, while the package tree still declares `bin/` for dynamic-library
/// runtime companions (DLLs).
pub fn plan_for(phase: LayoutPhase) -> LayoutPlan {
    match phase {
        LayoutPhase::Build => LayoutPlan {
            bin_dirs: Vec::new(),
            lib_dirs: vec![PathBuf::from(".")],
            include_dirs: vec![PathBuf::from("include")],
            licenses_dir: None,
            libs: Vec::new(),
        },
        LayoutPhase::Package => LayoutPlan {
            bin_dirs: vec![PathBuf::from("bin")],
            lib_dirs: vec![PathBuf::from("lib")],
            include_dirs: vec![PathBuf::from("include")],
            licenses_dir: Some(PathBuf::from("licenses")),
            libs: vec!["formulae-engine".to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tree_has_no_runnable_binaries() {
        let plan = plan_for(LayoutPhase::Build);
        assert!(plan.bin_dirs.is_empty());
        assert!(plan.libs.is_empty());
    }

    #[test]
    fn test_package_tree_declares_runtime_bin_dir() {
        let plan = plan_for(LayoutPhase::Package);
        assert_eq!(plan.bin_dirs, vec![PathBuf::from("bin")]);
        assert_eq!(plan.libs, vec!["formulae-engine"]);
    }

    #[test]
    fn test_single_include_root_in_both_phases() {
        for phase in [LayoutPhase::Build, LayoutPhase::Package] {
            assert_eq!(plan_for(phase).include_dirs, vec![PathBuf::from("include")]);
        }
    }
}
