//! Explicit configuration passed to core collaborators.
//!
//! # Responsibility
//! - Hold element suffixes, the audience catalog, display labels and
//!   logging settings in one serde-loadable value.
//! - Validate loaded configuration before any service is constructed.
//!
//! # Invariants
//! - A validated config has non-empty element suffixes and unique audiences.
//! - Nothing in core reads configuration from globals or the environment.

use crate::logging::default_log_level;
use crate::model::audience::{AudienceCatalog, AudienceDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Codename suffixes identifying the personalization elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSuffixes {
    pub variant_type: String,
    pub audience: String,
    pub variant_links: String,
}

impl Default for ElementSuffixes {
    fn default() -> Self {
        Self {
            variant_type: "variant_type".to_string(),
            audience: "personalization_audience".to_string(),
            variant_links: "content_variants".to_string(),
        }
    }
}

/// Labels used by `resolver::display_label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayLabels {
    pub base_content: String,
    pub unknown_audience: String,
}

impl Default for DisplayLabels {
    fn default() -> Self {
        Self {
            base_content: "Base Content".to_string(),
            unknown_audience: "Unknown".to_string(),
        }
    }
}

/// Logging settings consumed by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Top-level personalization configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalizationConfig {
    pub element_suffixes: ElementSuffixes,
    pub audiences: Vec<AudienceDefinition>,
    pub labels: DisplayLabels,
    /// Reject a second variant for an already targeted audience.
    pub enforce_unique_audiences: bool,
    pub logging: LoggingConfig,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            element_suffixes: ElementSuffixes::default(),
            audiences: AudienceCatalog::builtin().entries().to_vec(),
            labels: DisplayLabels::default(),
            enforce_unique_audiences: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl PersonalizationConfig {
    /// Parses and validates a JSON document. Missing keys take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("element_suffixes.variant_type", &self.element_suffixes.variant_type),
            ("element_suffixes.audience", &self.element_suffixes.audience),
            ("element_suffixes.variant_links", &self.element_suffixes.variant_links),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("`{key}` must not be blank")));
            }
        }

        let mut seen = HashSet::new();
        for audience in &self.audiences {
            if !seen.insert(audience.codename.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "audience `{}` is declared more than once",
                    audience.codename
                )));
            }
            if audience.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "audience `{}` has a blank name",
                    audience.codename
                )));
            }
        }

        Ok(())
    }

    /// Audience catalog built from the configured definitions.
    pub fn catalog(&self) -> AudienceCatalog {
        AudienceCatalog::new(self.audiences.iter().cloned())
    }
}

/// Loads configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<PersonalizationConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    PersonalizationConfig::from_json_str(raw.as_str())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PersonalizationConfig};

    #[test]
    fn empty_document_yields_defaults() {
        let config = PersonalizationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PersonalizationConfig::default());
        assert_eq!(config.catalog().len(), 4);
        assert!(!config.enforce_unique_audiences);
    }

    #[test]
    fn partial_document_overrides_selected_fields() {
        let config = PersonalizationConfig::from_json_str(
            r#"{
                "audiences": [{ "codename": "students", "name": "Students" }],
                "labels": { "unknown_audience": "n/a" },
                "enforce_unique_audiences": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.catalog().len(), 1);
        assert_eq!(config.labels.unknown_audience, "n/a");
        assert_eq!(config.labels.base_content, "Base Content");
        assert!(config.enforce_unique_audiences);
    }

    #[test]
    fn invalid_codename_fails_to_parse() {
        let err = PersonalizationConfig::from_json_str(
            r#"{ "audiences": [{ "codename": "Bad Code", "name": "Bad" }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn duplicate_audience_is_rejected() {
        let err = PersonalizationConfig::from_json_str(
            r#"{ "audiences": [
                { "codename": "students", "name": "Students" },
                { "codename": "students", "name": "Again" }
            ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("students")));
    }

    #[test]
    fn blank_suffix_is_rejected() {
        let err = PersonalizationConfig::from_json_str(
            r#"{ "element_suffixes": { "variant_links": " " } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
