use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::Mode;

/// Project-local settings file merged by [`ConfigLoader::load`].
pub const DEFAULT_CONFIG_FILE: &str = "topiclog.yaml";

/// Environment prefix for settings overrides.
pub const ENV_PREFIX: &str = "TOPICLOG_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid mode: {0}. Must be one of: develop, testing, product")]
    InvalidMode(String),

    #[error("Rolling-file base directory cannot be empty")]
    EmptyFileBase,

    #[error("Ingest source cannot be empty")]
    EmptyIngestSource,

    #[error("Invalid separator: {0:?}. Must not contain whitespace")]
    InvalidSeparator(String),
}

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `develop`, `testing` or `product`
    pub mode: String,
    /// Scope qualifier for parameter keys
    pub entry: String,
    pub separator: String,
    /// JSON console output in product mode
    pub json_on_product: bool,
    /// Base directory for the rolling-file provider; unset disables it
    pub file_base: Option<PathBuf>,
    /// Log source for the ingestion provider; unset disables it
    pub ingest_source: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::default().to_string(),
            entry: "APP_LOG".to_string(),
            separator: "_".to_string(),
            json_on_product: false,
            file_base: None,
            ingest_source: None,
        }
    }
}

/// Settings loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. ./topiclog.yaml (optional)
    /// 3. Environment variables (TOPICLOG_* prefix, highest priority)
    pub fn load() -> Result<Settings> {
        Self::extract(Self::figment(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Load settings from a specific file, still honouring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        Self::extract(Self::figment(path))
            .with_context(|| format!("Failed to load settings from {}", path.display()))
    }

    /// The provider stack behind [`load`](Self::load).
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Settings> {
        let settings: Settings = figment
            .extract()
            .context("Failed to extract settings from figment")?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate settings after loading
    pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
        if settings.mode.parse::<Mode>().is_err() {
            return Err(ConfigError::InvalidMode(settings.mode.clone()));
        }

        if settings.separator.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidSeparator(settings.separator.clone()));
        }

        if settings
            .file_base
            .as_ref()
            .is_some_and(|base| base.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyFileBase);
        }

        if settings
            .ingest_source
            .as_ref()
            .is_some_and(|source| source.trim().is_empty())
        {
            return Err(ConfigError::EmptyIngestSource);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.mode, "develop");
        assert_eq!(settings.entry, "APP_LOG");
        assert_eq!(settings.separator, "_");
        assert!(settings.file_base.is_none());
        ConfigLoader::validate(&settings).expect("Default settings should be valid");
    }

    #[test]
    fn test_validate_invalid_mode() {
        let settings = Settings {
            mode: "staging".to_string(),
            ..Default::default()
        };
        match ConfigLoader::validate(&settings).unwrap_err() {
            ConfigError::InvalidMode(mode) => assert_eq!(mode, "staging"),
            other => panic!("Expected InvalidMode error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_empty_paths() {
        let settings = Settings {
            file_base: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&settings),
            Err(ConfigError::EmptyFileBase)
        ));

        let settings = Settings {
            ingest_source: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&settings),
            Err(ConfigError::EmptyIngestSource)
        ));
    }

    #[test]
    fn test_validate_separator() {
        let settings = Settings {
            separator: "a b".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&settings),
            Err(ConfigError::InvalidSeparator(_))
        ));
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mode: product\nentry: SVC\njson_on_product: true\nfile_base: /var/log/svc"
        )
        .unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("TOPICLOG_MODE", Some("testing")),
                ("TOPICLOG_INGEST_SOURCE", Some("web-01")),
            ],
            || {
                let settings = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(settings.mode, "testing", "Environment should win");
                assert_eq!(settings.entry, "SVC", "File value should persist");
                assert!(settings.json_on_product);
                assert_eq!(settings.file_base, Some(PathBuf::from("/var/log/svc")));
                assert_eq!(settings.ingest_source.as_deref(), Some("web-01"));
            },
        );
    }

    #[test]
    fn test_invalid_file_mode_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "mode: loud").unwrap();
        file.flush().unwrap();

        temp_env::with_var_unset("TOPICLOG_MODE", || {
            let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
            assert!(err.to_string().contains("Failed to load settings"));
        });
    }
}
