//! Generator fan-out: one configuration artifact per build-system backend.
//!
//! Each generator renders its artifact fully in memory; nothing touches disk
//! until every generator has succeeded, so a failed generate phase never
//! leaves a partial artifact set behind.

use std::path::{Path, PathBuf};

use semver::Version;
use thiserror::Error;

use crate::context::{RuntimeLinkage, ToolchainFamily};
use crate::deps::ResolvedDependency;
use crate::options::BuildOptions;

pub const TOOLCHAIN_FILE: &str = "toolchain.cmake";
pub const DEPS_FILE: &str = "deps.cmake";
pub const BUILD_ENV_FILE: &str = "buildenv.sh";
pub const RUN_ENV_FILE: &str = "runenv.sh";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(
        "dependency {name} must expose headers to consumers but provides no \
         include directory under {root}"
    )]
    DependencyLocation { name: String, root: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved configuration consumed by every generator.
#[derive(Debug)]
pub struct GenerateInput<'a> {
    pub package_name: &'a str,
    pub version: &'a Version,
    pub options: BuildOptions,
    /// Resolved dependencies in declaration order
    pub deps: &'a [ResolvedDependency],
    pub tests_enabled: bool,
    pub toolchain: ToolchainFamily,
    pub runtime: RuntimeLinkage,
}

/// A rendered, write-once configuration artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorArtifact {
    pub file_name: &'static str,
    pub contents: String,
}

/// One backend of the generator fan-out. Implementations are independent of
/// each other and carry no ordering requirements among themselves.
pub trait Generator {
    fn render(&self, input: &GenerateInput<'_>) -> Result<GeneratorArtifact, GenerateError>;
}

/// Translates options and resolved configuration into build-system
/// variables.
pub struct ToolchainGenerator;

impl Generator for ToolchainGenerator {
    fn render(&self, input: &GenerateInput<'_>) -> Result<GeneratorArtifact, GenerateError> {
        let mut out = String::from("# Generated toolchain configuration. Do not edit.\n");
        out.push_str(&set_var("ENABLE_APPS", on_off(input.options.with_apps)));
        out.push_str(&set_var(
            "EXTENSIVE_WARNINGS",
            on_off(input.options.enable_extensive_warnings),
        ));
        out.push_str(&set_var(
            &format!("{}_VERSION", cmake_ident(input.package_name).to_uppercase()),
            &format!("\"{}\"", input.version),
        ));
        out.push_str(&set_var("ENABLE_TESTS", on_off(input.tests_enabled)));

        // Runtime-linkage policy is only defined for the MSVC family.
        if input.toolchain == ToolchainFamily::Msvc {
            out.push_str(&set_var(
                "USE_MSVC_RUNTIME_LIBRARY_DLL",
                on_off(input.runtime == RuntimeLinkage::Dynamic),
            ));
        }

        Ok(GeneratorArtifact {
            file_name: TOOLCHAIN_FILE,
            contents: out,
        })
    }
}

/// Tells the external build system where each dependency's headers and
/// libraries live, in declaration order.
pub struct DepsGenerator;

impl Generator for DepsGenerator {
    fn render(&self, input: &GenerateInput<'_>) -> Result<GeneratorArtifact, GenerateError> {
        let mut out = String::from("# Generated dependency locations. Do not edit.\n");
        for dep in input.deps {
            if dep.transitive_headers && dep.include_dirs.is_empty() {
                return Err(GenerateError::DependencyLocation {
                    name: dep.name.clone(),
                    root: dep.root.clone(),
                });
            }

            let ident = cmake_ident(&dep.name);
            out.push_str(&format!("\n# {}/{}\n", dep.name, dep.version));
            out.push_str(&set_var(
                &format!("{}_INCLUDE_DIRS", ident),
                &quoted_path_list(&dep.include_dirs),
            ));
            out.push_str(&set_var(
                &format!("{}_LIB_DIRS", ident),
                &quoted_path_list(&dep.lib_dirs),
            ));
            out.push_str(&set_var(
                &format!("{}_LIBRARIES", ident),
                &format!("\"{}\"", dep.libs.join(";")),
            ));
            out.push_str(&format!(
                "list(APPEND CMAKE_PREFIX_PATH \"{}\")\n",
                dep.root.display()
            ));
        }

        Ok(GeneratorArtifact {
            file_name: DEPS_FILE,
            contents: out,
        })
    }
}

/// Environment active while compiling: dependency tool directories on PATH.
pub struct BuildEnvGenerator;

impl Generator for BuildEnvGenerator {
    fn render(&self, input: &GenerateInput<'_>) -> Result<GeneratorArtifact, GenerateError> {
        let mut out = String::from("#!/bin/sh\n# Generated build-time environment. Do not edit.\n");
        let bin_dirs: Vec<&Path> = input
            .deps
            .iter()
            .flat_map(|d| d.bin_dirs.iter().map(PathBuf::as_path))
            .collect();
        if !bin_dirs.is_empty() {
            out.push_str(&export_path_var("PATH", &bin_dirs));
        }

        Ok(GeneratorArtifact {
            file_name: BUILD_ENV_FILE,
            contents: out,
        })
    }
}

/// Environment active while running built binaries: shared-library search
/// paths for every dependency.
pub struct RunEnvGenerator;

impl Generator for RunEnvGenerator {
    fn render(&self, input: &GenerateInput<'_>) -> Result<GeneratorArtifact, GenerateError> {
        let mut out = String::from("#!/bin/sh\n# Generated run-time environment. Do not edit.\n");
        let lib_dirs: Vec<&Path> = input
            .deps
            .iter()
            .flat_map(|d| d.lib_dirs.iter().map(PathBuf::as_path))
            .collect();
        let bin_dirs: Vec<&Path> = input
            .deps
            .iter()
            .flat_map(|d| d.bin_dirs.iter().map(PathBuf::as_path))
            .collect();

        if !lib_dirs.is_empty() {
            out.push_str(&export_path_var("LD_LIBRARY_PATH", &lib_dirs));
            out.push_str(&export_path_var("DYLD_LIBRARY_PATH", &lib_dirs));
        }
        if !bin_dirs.is_empty() {
            out.push_str(&export_path_var("PATH", &bin_dirs));
        }

        Ok(GeneratorArtifact {
            file_name: RUN_ENV_FILE,
            contents: out,
        })
    }
}

/// Run every generator, then write the artifacts into `out_dir`. Either all
/// artifacts are written or none are.
pub fn generate_all(
    input: &GenerateInput<'_>,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, GenerateError> {
    let generators: [&dyn Generator; 4] = [
        &ToolchainGenerator,
        &DepsGenerator,
        &BuildEnvGenerator,
        &RunEnvGenerator,
    ];

    let artifacts = generators
        .iter()
        .map(|g| g.render(input))
        .collect::<Result<Vec<_>, _>>()?;

    let write_err = |path: &Path, source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(out_dir).map_err(|e| write_err(out_dir, e))?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in &artifacts {
        let path = out_dir.join(artifact.file_name);
        std::fs::write(&path, &artifact.contents).map_err(|e| write_err(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

fn set_var(name: &str, value: impl AsRef<str>) -> String {
    format!("set({} {})\n", name, value.as_ref())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// CMake-safe identifier for a package name (`range-v3` -> `range_v3`).
fn cmake_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn quoted_path_list(paths: &[PathBuf]) -> String {
    let joined = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(";");
    format!("\"{}\"", joined)
}

fn export_path_var(name: &str, dirs: &[&Path]) -> String {
    let joined = dirs
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":");
    format!("export {name}=\"{joined}:${name}\"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::ResolvedDependency;

    fn dep(name: &str, with_include: bool) -> ResolvedDependency {
        let root = PathBuf::from("/cache").join(name).join("1.0.0");
        ResolvedDependency {
            name: name.to_string(),
            version: Version::new(1, 0, 0),
            include_dirs: if with_include {
                vec![root.join("include")]
            } else {
                Vec::new()
            },
            lib_dirs: vec![root.join("lib")],
            bin_dirs: vec![root.join("bin")],
            libs: vec![name.to_string()],
            transitive_headers: true,
            root,
        }
    }

    fn input<'a>(
        version: &'a Version,
        deps: &'a [ResolvedDependency],
        toolchain: ToolchainFamily,
    ) -> GenerateInput<'a> {
        GenerateInput {
            package_name: "formulae-engine",
            version,
            options: BuildOptions::default(),
            deps,
            tests_enabled: true,
            toolchain,
            runtime: RuntimeLinkage::Dynamic,
        }
    }

    #[test]
    fn test_toolchain_variables() {
        let version = Version::new(5, 11, 0);
        let artifact = ToolchainGenerator
            .render(&input(&version, &[], ToolchainFamily::Gnu))
            .unwrap();

        assert!(artifact.contents.contains("set(ENABLE_APPS OFF)"));
        assert!(artifact.contents.contains("set(EXTENSIVE_WARNINGS OFF)"));
        assert!(artifact
            .contents
            .contains("set(FORMULAE_ENGINE_VERSION \"5.11.0\")"));
        assert!(artifact.contents.contains("set(ENABLE_TESTS ON)"));
        assert!(!artifact.contents.contains("USE_MSVC_RUNTIME_LIBRARY_DLL"));
    }

    #[test]
    fn test_msvc_runtime_variable_only_for_msvc() {
        let version = Version::new(1, 0, 0);
        let artifact = ToolchainGenerator
            .render(&input(&version, &[], ToolchainFamily::Msvc))
            .unwrap();
        assert!(artifact
            .contents
            .contains("set(USE_MSVC_RUNTIME_LIBRARY_DLL ON)"));
    }

    #[test]
    fn test_deps_file_keeps_declaration_order() {
        let version = Version::new(1, 0, 0);
        let deps = vec![dep("range-v3", true), dep("fmt", true)];
        let artifact = DepsGenerator
            .render(&input(&version, &deps, ToolchainFamily::Gnu))
            .unwrap();

        let range = artifact.contents.find("range_v3_INCLUDE_DIRS").unwrap();
        let fmt = artifact.contents.find("fmt_INCLUDE_DIRS").unwrap();
        assert!(range < fmt);
    }

    #[test]
    fn test_missing_headers_fail_generation() {
        let version = Version::new(1, 0, 0);
        let deps = vec![dep("spdlog", false)];
        let err = DepsGenerator
            .render(&input(&version, &deps, ToolchainFamily::Gnu))
            .unwrap_err();
        assert!(matches!(err, GenerateError::DependencyLocation { .. }));
    }

    #[test]
    fn test_env_scripts_from_resolved_deps_only() {
        let version = Version::new(1, 0, 0);
        let deps = vec![dep("fmt", true)];
        let run = RunEnvGenerator
            .render(&input(&version, &deps, ToolchainFamily::Gnu))
            .unwrap();
        assert!(run.contents.contains("LD_LIBRARY_PATH"));
        assert!(run.contents.contains("/cache/fmt/1.0.0/lib"));

        let empty = RunEnvGenerator
            .render(&input(&version, &[], ToolchainFamily::Gnu))
            .unwrap();
        assert!(!empty.contents.contains("LD_LIBRARY_PATH"));
    }
}
