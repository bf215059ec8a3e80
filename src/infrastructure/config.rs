//! Engine configuration

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::infrastructure::rules::RuleCatalog;

/// Engine configuration loaded from environment
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Optional path to a rule data file overriding the embedded rules
    pub rules_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rules_path: env::var("ADVANCEMENT_RULES_PATH").ok().map(PathBuf::from),
        })
    }

    /// Build the rule catalog this configuration points at: the external
    /// file when one is configured, the embedded rules otherwise.
    pub fn load_catalog(&self) -> Result<RuleCatalog> {
        match &self.rules_path {
            Some(path) => RuleCatalog::from_path(path)
                .with_context(|| format!("failed to load rules from {}", path.display())),
            None => RuleCatalog::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_embedded_rules() {
        let config = EngineConfig::default();
        let catalog = config.load_catalog().unwrap();
        assert_eq!(catalog.max_level(), 10);
    }

    #[test]
    fn a_configured_path_overrides_the_embedded_rules() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "version": "override",
                "max_level": 6,
                "classes": {
                    "warrior": {
                        "domains": ["blade", "bone"],
                        "tiers": {"2": [{"description": "x", "type": "hit_point"}]}
                    }
                },
                "abilities": {}
            }"#,
        )
        .unwrap();

        let config = EngineConfig {
            rules_path: Some(file.path().to_path_buf()),
        };
        let catalog = config.load_catalog().unwrap();
        assert_eq!(catalog.version(), "override");
        assert_eq!(catalog.max_level(), 6);
    }

    #[test]
    fn a_missing_file_is_an_error() {
        let config = EngineConfig {
            rules_path: Some(PathBuf::from("/nonexistent/rules.json")),
        };
        assert!(config.load_catalog().is_err());
    }
}
