//! Package identity and version resolution.
//!
//! The version is either supplied explicitly (command line or an enclosing
//! orchestration) or read lazily from the `recipe-data.toml` record that a
//! prior export phase persisted next to the recipe. Once resolved it is
//! cached for the rest of the process.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the persisted recipe metadata record.
pub const METADATA_FILE: &str = "recipe-data.toml";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("no version supplied and no exported recipe metadata at {path}")]
    MissingVersion { path: PathBuf },

    #[error("invalid version {value:?} in {path}: {source}")]
    InvalidVersion {
        value: String,
        path: PathBuf,
        source: semver::Error,
    },

    #[error("malformed recipe metadata {path}: {source}")]
    MalformedMetadata {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write recipe metadata {path}: {source}")]
    WriteMetadata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize recipe metadata: {0}")]
    SerializeMetadata(#[from] toml::ser::Error),
}

/// Persisted recipe metadata, written at export and consumed by later
/// invocations re-deriving the same identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub version: String,
    pub author: String,
    pub homepage: String,
    pub description: String,
}

/// Immutable package identity, constructed once per invocation.
#[derive(Debug)]
pub struct PackageIdentity {
    pub name: String,
    pub author: String,
    pub homepage: String,
    pub description: String,
    explicit: Option<Version>,
    data_path: PathBuf,
    resolved: OnceLock<Version>,
}

impl PackageIdentity {
    /// Identity of the formulae-engine library recipe.
    pub fn new(recipe_folder: &Path, explicit: Option<Version>) -> Self {
        Self {
            name: "formulae-engine".to_string(),
            author: "Formulae Engine Maintainers".to_string(),
            homepage: "https://github.com/formulae-engine/formulae-engine".to_string(),
            description: "Formula parser and evaluator engine".to_string(),
            explicit,
            data_path: recipe_folder.join(METADATA_FILE),
            resolved: OnceLock::new(),
        }
    }

    /// Resolve the effective version. An explicit version wins; otherwise the
    /// persisted metadata record is consulted. Idempotent: the first result
    /// is returned for every later call.
    pub fn resolve(&self) -> Result<&Version, IdentityError> {
        if let Some(version) = self.resolved.get() {
            return Ok(version);
        }

        let version = match &self.explicit {
            Some(version) => version.clone(),
            None => read_persisted_version(&self.data_path)?,
        };

        Ok(self.resolved.get_or_init(|| version))
    }

    /// Persist the identity (with resolved version) as recipe metadata in
    /// `folder`. This is the export phase's side of the contract; `resolve`
    /// never writes.
    pub fn persist(&self, folder: &Path) -> Result<(), IdentityError> {
        let version = self.resolve()?;
        let data = RecipeData {
            name: self.name.clone(),
            version: version.to_string(),
            author: self.author.clone(),
            homepage: self.homepage.clone(),
            description: self.description.clone(),
        };

        let path = folder.join(METADATA_FILE);
        let rendered = toml::to_string_pretty(&data)?;
        if let Err(source) = std::fs::create_dir_all(folder) {
            return Err(IdentityError::WriteMetadata { path, source });
        }
        std::fs::write(&path, rendered).map_err(|source| IdentityError::WriteMetadata { path, source })
    }
}

fn read_persisted_version(path: &Path) -> Result<Version, IdentityError> {
    let content = std::fs::read_to_string(path).map_err(|_| IdentityError::MissingVersion {
        path: path.to_path_buf(),
    })?;

    let data: RecipeData =
        toml::from_str(&content).map_err(|source| IdentityError::MalformedMetadata {
            path: path.to_path_buf(),
            source,
        })?;

    data.version
        .parse()
        .map_err(|source| IdentityError::InvalidVersion {
            value: data.version,
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_version_wins() {
        let dir = TempDir::new().unwrap();
        let identity = PackageIdentity::new(dir.path(), Some("9.9.9".parse().unwrap()));
        assert_eq!(identity.resolve().unwrap().to_string(), "9.9.9");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let identity = PackageIdentity::new(dir.path(), Some("1.2.3".parse().unwrap()));
        let first = identity.resolve().unwrap().clone();
        let second = identity.resolve().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_version_without_metadata() {
        let dir = TempDir::new().unwrap();
        let identity = PackageIdentity::new(dir.path(), None);
        assert!(matches!(
            identity.resolve(),
            Err(IdentityError::MissingVersion { .. })
        ));
    }

    #[test]
    fn test_version_read_from_persisted_metadata() {
        let dir = TempDir::new().unwrap();

        let exporting = PackageIdentity::new(dir.path(), Some("5.11.0".parse().unwrap()));
        exporting.persist(dir.path()).unwrap();

        let later = PackageIdentity::new(dir.path(), None);
        assert_eq!(later.resolve().unwrap().to_string(), "5.11.0");
    }

    #[test]
    fn test_malformed_metadata_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), "version = [1, 2]").unwrap();

        let identity = PackageIdentity::new(dir.path(), None);
        assert!(matches!(
            identity.resolve(),
            Err(IdentityError::MalformedMetadata { .. })
        ));
    }
}
