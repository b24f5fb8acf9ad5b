//! User-configurable build options.
//!
//! Options are declared with a default before anything reads them; overrides
//! arrive as `name=value` strings per invocation. Validation happens here,
//! before generation, so a typo fails cheaply instead of deep inside the
//! external build.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),

    #[error("invalid value {value:?} for option {name}: expected true or false")]
    InvalidValue { name: String, value: String },

    #[error("malformed option override {0:?}: expected name=value")]
    MalformedOverride(String),
}

#[derive(Debug, Clone)]
struct OptionEntry {
    name: &'static str,
    default: bool,
    overridden: Option<bool>,
}

/// Declared option set with defaults and per-invocation overrides.
///
/// Declaration order is kept for reporting but carries no semantics.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    entries: Vec<OptionEntry>,
}

impl OptionSet {
    /// The options this recipe recognizes, with their defaults.
    pub fn standard() -> Self {
        let mut set = Self::default();
        set.declare("enable_extensive_warnings", false);
        set.declare("with_apps", false);
        set
    }

    /// Declare an option with its default value.
    pub fn declare(&mut self, name: &'static str, default: bool) {
        self.entries.push(OptionEntry {
            name,
            default,
            overridden: None,
        });
    }

    /// Override a declared option from a raw string value.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), OptionError> {
        let value = parse_bool(raw).ok_or_else(|| OptionError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
        })?;

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        entry.overridden = Some(value);
        Ok(())
    }

    /// Apply a `name=value` override string.
    pub fn apply_override(&mut self, spec: &str) -> Result<(), OptionError> {
        let (name, raw) = spec
            .split_once('=')
            .ok_or_else(|| OptionError::MalformedOverride(spec.to_string()))?;
        self.set(name.trim(), raw.trim())
    }

    /// Read an option: the override if present, the default otherwise.
    pub fn get(&self, name: &str) -> Result<bool, OptionError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.overridden.unwrap_or(e.default))
            .ok_or_else(|| OptionError::Unknown(name.to_string()))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Statically-typed view of the option set, consumed by the generators.
/// Resolving it up front means every option read during generation is a
/// plain field access on validated data.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Stricter compiler diagnostics in the generated toolchain config
    pub enable_extensive_warnings: bool,
    /// Build companion example/demo applications alongside the library
    pub with_apps: bool,
}

impl BuildOptions {
    pub fn from_set(set: &OptionSet) -> Result<Self, OptionError> {
        Ok(Self {
            enable_extensive_warnings: set.get("enable_extensive_warnings")?,
            with_apps: set.get("with_apps")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_override() {
        let set = OptionSet::standard();
        assert!(!set.get("enable_extensive_warnings").unwrap());
        assert!(!set.get("with_apps").unwrap());
    }

    #[test]
    fn test_override_returned_verbatim() {
        let mut set = OptionSet::standard();
        set.set("with_apps", "true").unwrap();
        assert!(set.get("with_apps").unwrap());
        // The other option keeps its default
        assert!(!set.get("enable_extensive_warnings").unwrap());
    }

    #[test]
    fn test_unknown_option() {
        let set = OptionSet::standard();
        assert_eq!(
            set.get("with_shared"),
            Err(OptionError::Unknown("with_shared".to_string()))
        );

        let mut set = OptionSet::standard();
        assert!(matches!(
            set.set("with_shared", "true"),
            Err(OptionError::Unknown(_))
        ));
    }

    #[test]
    fn test_out_of_domain_value() {
        let mut set = OptionSet::standard();
        assert!(matches!(
            set.set("with_apps", "yes"),
            Err(OptionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_override_spec_parsing() {
        let mut set = OptionSet::standard();
        set.apply_override("with_apps=True").unwrap();
        assert!(set.get("with_apps").unwrap());

        assert!(matches!(
            set.apply_override("with_apps"),
            Err(OptionError::MalformedOverride(_))
        ));
    }

    #[test]
    fn test_typed_view() {
        let mut set = OptionSet::standard();
        set.set("enable_extensive_warnings", "true").unwrap();
        let options = BuildOptions::from_set(&set).unwrap();
        assert!(options.enable_extensive_warnings);
        assert!(!options.with_apps);
    }
}
