//! Per-invocation configuration for recipe execution.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use semver::Version;

/// Compiler toolchain family driving the external build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFamily {
    Gnu,
    Clang,
    AppleClang,
    Msvc,
}

impl ToolchainFamily {
    /// Default toolchain family for the host platform.
    pub fn host() -> Self {
        if cfg!(windows) {
            ToolchainFamily::Msvc
        } else if cfg!(target_os = "macos") {
            ToolchainFamily::AppleClang
        } else {
            ToolchainFamily::Gnu
        }
    }
}

impl FromStr for ToolchainFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gnu" | "gcc" => Ok(ToolchainFamily::Gnu),
            "clang" => Ok(ToolchainFamily::Clang),
            "apple-clang" => Ok(ToolchainFamily::AppleClang),
            "msvc" => Ok(ToolchainFamily::Msvc),
            other => Err(format!(
                "unknown toolchain family '{}' (expected gnu, clang, apple-clang, or msvc)",
                other
            )),
        }
    }
}

impl fmt::Display for ToolchainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolchainFamily::Gnu => "gnu",
            ToolchainFamily::Clang => "clang",
            ToolchainFamily::AppleClang => "apple-clang",
            ToolchainFamily::Msvc => "msvc",
        };
        f.write_str(s)
    }
}

/// How the platform runtime library is linked. Only meaningful for the MSVC
/// toolchain family; a platform policy, not a user-facing option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeLinkage {
    Static,
    Dynamic,
}

/// Execution context for a single recipe invocation.
#[derive(Debug, Clone)]
pub struct Context {
    /// Folder containing the recipe, sources, and headers
    pub recipe_folder: PathBuf,
    /// Folder the external build compiles from (defaults to the recipe folder)
    pub source_folder: PathBuf,
    /// Destination for exported recipe metadata and sources
    pub export_folder: PathBuf,
    /// Build tree: generator artifacts land here, the external build runs here
    pub build_folder: PathBuf,
    /// Final package tree populated by the package phase
    pub package_folder: PathBuf,
    /// Local dependency cache consulted by the resolver
    pub cache_folder: PathBuf,
    /// Version supplied on the command line, if any
    pub version: Option<Version>,
    /// Raw `name=value` option overrides
    pub option_overrides: Vec<String>,
    /// Ambient skip-tests flag: drops test-only dependencies and disables
    /// test building in the generated toolchain configuration
    pub skip_tests: bool,
    pub toolchain: ToolchainFamily,
    pub runtime: RuntimeLinkage,
    /// Parallel jobs for the external build
    pub jobs: usize,
    /// Print external commands as they run
    pub verbose: bool,
}

impl Context {
    /// Create a context rooted at the given recipe folder, with the
    /// conventional sub-tree layout for everything else.
    pub fn new(recipe_folder: impl Into<PathBuf>) -> Self {
        let recipe_folder = recipe_folder.into();
        Self {
            source_folder: recipe_folder.clone(),
            export_folder: recipe_folder.join("export"),
            build_folder: recipe_folder.join("build"),
            package_folder: recipe_folder.join("package"),
            cache_folder: recipe_folder.join(".cache"),
            recipe_folder,
            version: None,
            option_overrides: Vec::new(),
            skip_tests: false,
            toolchain: ToolchainFamily::host(),
            runtime: RuntimeLinkage::Dynamic,
            jobs: num_cpus::get(),
            verbose: false,
        }
    }

    /// Set the build folder.
    pub fn build_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_folder = dir.into();
        self
    }

    /// Set the package folder.
    pub fn package_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_folder = dir.into();
        self
    }

    /// Set the export folder.
    pub fn export_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_folder = dir.into();
        self
    }

    /// Set the dependency cache folder.
    pub fn cache_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_folder = dir.into();
        self
    }

    /// Supply an explicit package version.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the skip-tests flag.
    pub fn skip_tests(mut self, skip: bool) -> Self {
        self.skip_tests = skip;
        self
    }

    /// Set the toolchain family.
    pub fn toolchain(mut self, toolchain: ToolchainFamily) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Set the runtime linkage policy.
    pub fn runtime(mut self, runtime: RuntimeLinkage) -> Self {
        self.runtime = runtime;
        self
    }

    /// Whether test building is enabled for this invocation.
    pub fn tests_enabled(&self) -> bool {
        !self.skip_tests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = Context::new("/tmp/recipe");
        assert_eq!(ctx.source_folder, PathBuf::from("/tmp/recipe"));
        assert_eq!(ctx.build_folder, PathBuf::from("/tmp/recipe/build"));
        assert!(ctx.tests_enabled());
        assert!(ctx.version.is_none());
    }

    #[test]
    fn test_context_builder() {
        let ctx = Context::new("/tmp/recipe")
            .build_folder("/tmp/b")
            .skip_tests(true)
            .toolchain(ToolchainFamily::Msvc)
            .runtime(RuntimeLinkage::Static);

        assert_eq!(ctx.build_folder, PathBuf::from("/tmp/b"));
        assert!(!ctx.tests_enabled());
        assert_eq!(ctx.toolchain, ToolchainFamily::Msvc);
        assert_eq!(ctx.runtime, RuntimeLinkage::Static);
    }

    #[test]
    fn test_toolchain_family_round_trip() {
        for s in ["gnu", "clang", "apple-clang", "msvc"] {
            let family: ToolchainFamily = s.parse().unwrap();
            assert_eq!(family.to_string(), s);
        }
        assert!("tcc".parse::<ToolchainFamily>().is_err());
    }
}
