//! Runtime configuration, loaded from YAML with every field defaulted.
//!
//! ```yaml
//! store:
//!   path: eduhub.db
//!   busy_timeout_ms: 5000
//! schema:
//!   path: schema.yaml
//! policy:
//!   allow_duplicate_enrollment: true
//! ```

use crate::error::{EduHubError, Result};
use crate::index::IndexPlan;
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EduHubConfig {
    pub store: StoreConfig,
    pub schema: SchemaConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, or `:memory:` for a throwaway in-memory store
    pub path: PathBuf,
    /// Upper bound on how long a store call waits for a locked database
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Schema YAML overriding the built-in one
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// When false, a student may hold only one enrollment per course.
    pub allow_duplicate_enrollment: bool,
}

impl StoreConfig {
    pub const IN_MEMORY: &'static str = ":memory:";
    pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from("eduhub.db"),
            busy_timeout_ms: Self::DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            allow_duplicate_enrollment: true,
        }
    }
}

impl EduHubConfig {
    /// Load a configuration file. Missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EduHubError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty file parses as null rather than an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: EduHubConfig = serde_yaml::from_str(content)
            .map_err(|e| EduHubError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.busy_timeout_ms == 0 {
            return Err(EduHubError::Config(
                "store.busy_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(EduHubError::Config("store.path must not be empty".into()));
        }
        Ok(())
    }

    /// The schema registry this configuration selects.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        match &self.schema.path {
            Some(path) => SchemaRegistry::from_path(path),
            None => SchemaRegistry::builtin(),
        }
    }

    pub fn index_plan(&self) -> IndexPlan {
        IndexPlan::from_policy(&self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EduHubConfig::default();
        assert_eq!(config.store.path, PathBuf::from("eduhub.db"));
        assert_eq!(config.store.busy_timeout(), Duration::from_millis(5000));
        assert!(config.policy.allow_duplicate_enrollment);
        assert_eq!(config.schema.path, None);
        assert_eq!(EduHubConfig::from_yaml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let config = EduHubConfig::from_yaml_str(
            r#"
policy:
  allow_duplicate_enrollment: false
store:
  busy_timeout_ms: 250
"#,
        )
        .unwrap();
        assert!(!config.policy.allow_duplicate_enrollment);
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert_eq!(config.store.path, PathBuf::from("eduhub.db"));
        assert_eq!(config.index_plan().unique_constraints("enrollments").count(), 1);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = EduHubConfig::from_yaml_str("store: { busy_timeout_ms: 0 }").unwrap_err();
        assert!(matches!(err, EduHubError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = EduHubConfig::from_yaml_str("store: [1, 2").unwrap_err();
        assert!(matches!(err, EduHubError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("eduhub.yaml");
        std::fs::write(&path, "store:\n  path: ':memory:'\n").unwrap();

        let config = EduHubConfig::load(&path).unwrap();
        assert_eq!(config.store.path, PathBuf::from(StoreConfig::IN_MEMORY));
        assert!(config.registry().is_ok());

        let missing = EduHubConfig::load(&tmp.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, EduHubError::Config(_)));
    }
}
