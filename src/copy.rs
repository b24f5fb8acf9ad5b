//! Glob-based copy rules shared by the export-sources and package phases.
//!
//! A rule either preserves relative structure (headers, license text,
//! exported sources) or flattens to the destination root (compiled
//! artifacts, where only the final filename matters). Application is
//! idempotent: re-running a rule against an unchanged source tree overwrites
//! the same destination files with the same bytes.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("pattern {pattern:?} matched no files under {root}")]
    NoMatch { pattern: String, root: PathBuf },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to copy {src} -> {dst}: {source}")]
    Io {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },
}

/// One copy rule: files under `src` matching `pattern` land under `dst`.
#[derive(Debug, Clone)]
pub struct CopyRule {
    pub pattern: String,
    pub src: PathBuf,
    pub dst: PathBuf,
    /// Keep only the final filename instead of the relative path
    pub flatten: bool,
    /// Matching zero files is an error
    pub required: bool,
}

impl CopyRule {
    /// Structure-preserving rule that must match at least one file.
    pub fn tree(pattern: &str, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.to_string(),
            src: src.into(),
            dst: dst.into(),
            flatten: false,
            required: true,
        }
    }

    /// Flattening rule for compiled artifacts; may match nothing, since not
    /// every artifact class exists on every platform.
    pub fn artifacts(pattern: &str, src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.to_string(),
            src: src.into(),
            dst: dst.into(),
            flatten: true,
            required: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Apply the rule, returning how many files were copied.
    pub fn apply(&self) -> Result<usize, CopyError> {
        let pattern =
            glob::Pattern::new(&self.pattern).map_err(|source| CopyError::BadPattern {
                pattern: self.pattern.clone(),
                source,
            })?;

        let mut copied = 0;
        for entry in WalkDir::new(&self.src).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.src) else {
                continue;
            };
            if !pattern.matches_path(rel) {
                continue;
            }

            let dst = if self.flatten {
                match rel.file_name() {
                    Some(name) => self.dst.join(name),
                    None => continue,
                }
            } else {
                self.dst.join(rel)
            };

            copy_file(entry.path(), &dst)?;
            copied += 1;
        }

        if copied == 0 && self.required {
            return Err(CopyError::NoMatch {
                pattern: self.pattern.clone(),
                root: self.src.clone(),
            });
        }

        Ok(copied)
    }
}

/// Apply rules in declared order, returning the total file count.
pub fn apply_all(rules: &[CopyRule]) -> Result<usize, CopyError> {
    let mut total = 0;
    for rule in rules {
        total += rule.apply()?;
    }
    Ok(total)
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), CopyError> {
    let io = |source| CopyError::Io {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    };

    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::copy(src, dst).map_err(io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_tree_copy_preserves_structure() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src, "a/b/one.h", "one");
        write(&src, "two.h", "two");
        write(&src, "a/ignored.txt", "nope");

        let copied = CopyRule::tree("*.h", &src, &dst).apply().unwrap();
        assert_eq!(copied, 2);
        assert!(dst.join("a/b/one.h").is_file());
        assert!(dst.join("two.h").is_file());
        assert!(!dst.join("a/ignored.txt").exists());
    }

    #[test]
    fn test_artifact_copy_flattens() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("build");
        let dst = dir.path().join("lib");
        write(&src, "deep/nested/libengine.a", "archive");

        let copied = CopyRule::artifacts("*.a", &src, &dst).apply().unwrap();
        assert_eq!(copied, 1);
        assert!(dst.join("libengine.a").is_file());
        assert!(!dst.join("deep").exists());
    }

    #[test]
    fn test_required_rule_fails_on_zero_matches() {
        let dir = TempDir::new().unwrap();
        let rule = CopyRule::tree("LICENSE", dir.path(), dir.path().join("out"));
        assert!(matches!(rule.apply(), Err(CopyError::NoMatch { .. })));
    }

    #[test]
    fn test_optional_rule_tolerates_zero_matches() {
        let dir = TempDir::new().unwrap();
        let rule = CopyRule::artifacts("*.dll", dir.path(), dir.path().join("bin"));
        assert_eq!(rule.apply().unwrap(), 0);
    }

    #[test]
    fn test_reapplication_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src, "nested/file.h", "contents");

        let rule = CopyRule::tree("*.h", &src, &dst);
        rule.apply().unwrap();
        let first = std::fs::read(dst.join("nested/file.h")).unwrap();
        rule.apply().unwrap();
        let second = std::fs::read(dst.join("nested/file.h")).unwrap();
        assert_eq!(first, second);
    }
}
