//! YAML configuration file support.
//!
//! Every section is optional; omitted sections and fields take the defaults
//! shown below. Command-line flags override values loaded from the file.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "cellar"
//!
//! artifact:
//!   path: "assets/model_kmeans_wine_quality.json"
//!   expected_clusters: 2
//!
//! input:
//!   zero_is_unset: true
//!
//! presenter:
//!   locale: "id"
//!   format: "text"
//!
//! logging:
//!   level: "info"
//!   json: false
//!
//! batch:
//!   parallel: false
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::quality::Locale;
use crate::{ArtifactLoadOptions, UnsetPolicy};

/// Artifact location used when neither the config nor the command line names one.
pub const DEFAULT_ARTIFACT_PATH: &str = "assets/model_kmeans_wine_quality.json";

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WineClusterConfig {
    /// Configuration format version
    #[serde(default = "default_config_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub artifact: ArtifactConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub presenter: PresenterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

impl WineClusterConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: WineClusterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.artifact.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn unset_policy(&self) -> UnsetPolicy {
        if self.input.zero_is_unset {
            UnsetPolicy::ZeroIsUnset
        } else {
            UnsetPolicy::ExplicitPresence
        }
    }

    pub fn load_options(&self) -> ArtifactLoadOptions {
        ArtifactLoadOptions {
            expected_clusters: self.artifact.expected_clusters,
        }
    }
}

impl Default for WineClusterConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            artifact: ArtifactConfig::default(),
            input: InputConfig::default(),
            presenter: PresenterConfig::default(),
            logging: LoggingConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Where the fitted artifact lives and what shape it must have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_path")]
    pub path: PathBuf,

    /// When set, loading fails unless the model has exactly this many clusters.
    #[serde(default)]
    pub expected_clusters: Option<usize>,
}

impl ArtifactConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "artifact.path must not be empty".to_string(),
            ));
        }
        if self.expected_clusters == Some(0) {
            return Err(ConfigLoadError::Validation(
                "artifact.expected_clusters must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: default_artifact_path(),
            expected_clusters: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Treat an entered `0` as "not filled in".
    #[serde(default = "true_value")]
    pub zero_is_unset: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            zero_is_unset: true,
        }
    }
}

/// Result rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresenterConfig {
    #[serde(default)]
    pub locale: Locale,

    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}', expected 'text' or 'json'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit newline-delimited JSON instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// `level` accepts anything `RUST_LOG` does, e.g. `info` or
    /// `winecluster=debug,wine_model=trace`.
    fn validate(&self) -> Result<(), ConfigLoadError> {
        EnvFilter::try_new(&self.level).map_err(|err| {
            ConfigLoadError::Validation(format!(
                "logging.level '{}' is not a valid filter directive: {err}",
                self.level
            ))
        })?;
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Spread batch predictions over the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

// Helper functions for serde defaults
fn default_config_version() -> String {
    "1.0".to_string()
}
fn default_artifact_path() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_PATH)
}
fn default_log_level() -> String {
    "info".to_string()
}
fn true_value() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "cellar"
artifact:
  path: "models/wine.json"
  expected_clusters: 2
presenter:
  locale: "en"
  format: "json"
"#;

        let config = WineClusterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, Some("cellar".to_string()));
        assert_eq!(config.artifact.path, PathBuf::from("models/wine.json"));
        assert_eq!(config.load_options().expected_clusters, Some(2));
        assert_eq!(config.presenter.locale, Locale::En);
        assert_eq!(config.presenter.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
version: "1"
input:
  zero_is_unset: false
batch:
  parallel: true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = WineClusterConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.unset_policy(), UnsetPolicy::ExplicitPresence);
        assert!(config.batch.parallel);
    }

    #[test]
    fn test_default_config() {
        let config = WineClusterConfig::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.artifact.path, PathBuf::from(DEFAULT_ARTIFACT_PATH));
        assert_eq!(config.unset_policy(), UnsetPolicy::ZeroIsUnset);
        assert_eq!(config.presenter.locale, Locale::Id);
        assert_eq!(config.logging.level, "info");
        assert!(!config.batch.parallel);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = WineClusterConfig::from_yaml("{}").unwrap();
        assert_eq!(config, WineClusterConfig::default());
    }

    #[test]
    fn test_unsupported_version() {
        let result = WineClusterConfig::from_yaml("version: \"2.0\"\n");
        assert!(matches!(
            result,
            Err(ConfigLoadError::UnsupportedVersion(ref v)) if v == "2.0"
        ));
    }

    #[test]
    fn test_expected_clusters_validation() {
        let yaml = r#"
artifact:
  expected_clusters: 0
"#;
        let result = WineClusterConfig::from_yaml(yaml);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("expected_clusters must be >= 1")
        );
    }

    #[test]
    fn test_logging_validation() {
        let yaml = r#"
logging:
  level: "winecluster=loudest"
"#;
        let result = WineClusterConfig::from_yaml(yaml);
        assert!(result.unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_logging_accepts_filter_directives() {
        for level in ["debug", "WARN", "winecluster=debug", "winecluster=debug,wine_model=trace"] {
            let yaml = format!("logging:\n  level: \"{level}\"\n");
            let config = WineClusterConfig::from_yaml(&yaml).unwrap();
            assert_eq!(config.logging.level, level);
        }
    }

    #[test]
    fn test_unknown_locale_is_parse_error() {
        let yaml = r#"
presenter:
  locale: "fr"
"#;
        assert!(matches!(
            WineClusterConfig::from_yaml(yaml),
            Err(ConfigLoadError::YamlParse(_))
        ));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
