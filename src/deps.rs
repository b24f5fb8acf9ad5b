//! Dependency declarations and resolution.
//!
//! The recipe declares what it needs by name and version constraint;
//! locating a concrete package satisfying the constraint is delegated to a
//! [`DependencyResolver`]. Declaration order is preserved all the way to the
//! generated dependency-location artifact, since it is the order downstream
//! builds search headers and libraries in.

use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("cannot resolve dependency {name} {constraint}: {reason}")]
    Unresolved {
        name: String,
        constraint: VersionReq,
        reason: String,
    },
}

/// Whether a dependency is needed for the normal build or only for the
/// package's test suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Required,
    TestOnly,
}

/// A declared dependency reference.
#[derive(Debug, Clone)]
pub struct DependencyRef {
    pub name: String,
    pub constraint: VersionReq,
    pub scope: Scope,
    /// Consumers of this package also see the dependency's headers
    pub transitive_headers: bool,
}

impl DependencyRef {
    pub fn required(name: &str, constraint: &str) -> Self {
        Self::new(name, constraint, Scope::Required)
    }

    pub fn test_only(name: &str, constraint: &str) -> Self {
        Self::new(name, constraint, Scope::TestOnly)
    }

    fn new(name: &str, constraint: &str, scope: Scope) -> Self {
        // Constraints are recipe-authored constants; a bad one is a
        // programming error, not a runtime condition.
        let constraint = VersionReq::parse(constraint)
            .unwrap_or_else(|e| panic!("invalid constraint {:?} for {}: {}", constraint, name, e));
        Self {
            name: name.to_string(),
            constraint,
            scope,
            transitive_headers: false,
        }
    }

    pub fn transitive_headers(mut self, visible: bool) -> Self {
        self.transitive_headers = visible;
        self
    }
}

/// A located dependency package, as reported by the external resolver.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: Version,
    pub root: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub bin_dirs: Vec<PathBuf>,
    /// Library names consumers link against
    pub libs: Vec<String>,
    /// Copied from the declaring [`DependencyRef`] during resolution
    pub transitive_headers: bool,
}

/// External package locator. Given a reference, returns a concrete package
/// satisfying the constraint or reports why it cannot.
pub trait DependencyResolver {
    fn locate(&self, dep: &DependencyRef) -> Result<ResolvedDependency, ResolveError>;
}

/// Ordered set of declared dependency references.
#[derive(Debug, Clone, Default)]
pub struct RequirementGraph {
    refs: Vec<DependencyRef>,
}

impl RequirementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dependency graph of the formulae-engine recipe. The unit-testing
    /// framework is only declared at all when test building is enabled.
    pub fn standard(tests_enabled: bool) -> Self {
        let mut graph = Self::new();
        graph.require(DependencyRef::required("range-v3", ">=0.12.0").transitive_headers(true));
        graph.require(DependencyRef::required("spdlog", ">=1.14.1").transitive_headers(true));
        graph.require(DependencyRef::required("fmt", ">=11.0.2").transitive_headers(true));
        graph.require(DependencyRef::required("lexy", ">=2022.12.1").transitive_headers(true));
        graph.require(DependencyRef::required("expected", ">=1.1.1").transitive_headers(true));
        graph.require(DependencyRef::test_only("standardprojectsettings", ">=0.2.0"));
        if tests_enabled {
            graph.require(DependencyRef::test_only("catch2", ">=3.4.0"));
        }
        graph
    }

    /// Declare a dependency. Order is significant and preserved.
    pub fn require(&mut self, dep: DependencyRef) {
        self.refs.push(dep);
    }

    pub fn refs(&self) -> &[DependencyRef] {
        &self.refs
    }

    /// Resolve every declared reference in declaration order, dropping
    /// test-only entries when test building is disabled. Resolution failures
    /// propagate unchanged; there is no retry or fallback.
    pub fn resolve_all(
        &self,
        resolver: &dyn DependencyResolver,
        tests_enabled: bool,
    ) -> Result<Vec<ResolvedDependency>, ResolveError> {
        self.refs
            .iter()
            .filter(|dep| tests_enabled || dep.scope == Scope::Required)
            .map(|dep| {
                let mut resolved = resolver.locate(dep)?;
                resolved.transitive_headers = dep.transitive_headers;
                Ok(resolved)
            })
            .collect()
    }
}

/// Resolver backed by a local on-disk package cache laid out as
/// `<cache>/<name>/<version>/{include,lib,bin}`. Picks the highest cached
/// version satisfying the constraint; it locates packages, it does not solve
/// version ranges across the graph.
pub struct CacheResolver {
    root: PathBuf,
}

impl CacheResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn cached_versions(&self, name: &str) -> Vec<Version> {
        let dir = self.root.join(name);
        let mut versions = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                if let Some(v) = entry
                    .file_name()
                    .to_str()
                    .and_then(|s| s.parse::<Version>().ok())
                {
                    versions.push(v);
                }
            }
        }
        versions
    }
}

impl DependencyResolver for CacheResolver {
    fn locate(&self, dep: &DependencyRef) -> Result<ResolvedDependency, ResolveError> {
        let best = self
            .cached_versions(&dep.name)
            .into_iter()
            .filter(|v| dep.constraint.matches(v))
            .max()
            .ok_or_else(|| ResolveError::Unresolved {
                name: dep.name.clone(),
                constraint: dep.constraint.clone(),
                reason: format!(
                    "no cached package under {}",
                    self.root.join(&dep.name).display()
                ),
            })?;

        let root = self.root.join(&dep.name).join(best.to_string());
        Ok(ResolvedDependency {
            name: dep.name.clone(),
            version: best,
            include_dirs: existing(&root, "include"),
            lib_dirs: existing(&root, "lib"),
            bin_dirs: existing(&root, "bin"),
            libs: library_names(&root.join("lib")),
            root,
            transitive_headers: dep.transitive_headers,
        })
    }
}

fn existing(root: &Path, sub: &str) -> Vec<PathBuf> {
    let dir = root.join(sub);
    if dir.is_dir() {
        vec![dir]
    } else {
        Vec::new()
    }
}

/// Link-names of the libraries in a directory: `libfoo.a` / `libfoo.so` /
/// `foo.lib` all contribute `foo`.
fn library_names(lib_dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(entries) = std::fs::read_dir(lib_dir) {
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let stem = match file_name.rsplit_once('.') {
                Some((stem, "a" | "so" | "dylib" | "lib")) => stem,
                _ => continue,
            };
            let name = stem.strip_prefix("lib").unwrap_or(stem).to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names.sort();
    names
}
