//! Layered configuration for note synchronization sessions.
//!
//! # Responsibility
//! - Load settings from defaults, an optional TOML file and `PAGENOTE_*`
//!   environment variables, in that precedence order.
//! - Validate property names before any session uses them.
//!
//! # Invariants
//! - A loaded config has passed `validate`.
//! - Nested keys in the environment are separated by `__`
//!   (`PAGENOTE_LOGGING__LEVEL=debug`).

use crate::logging::{default_log_level, normalize_level};
use crate::service::factory::{InsertPolicy, LinkPathStyle};
use crate::service::sort::SortOrder;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PAGENOTE_";

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A provider could not be read or extracted.
    Load(String),
    /// Values were read but violate a constraint.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(message) => write!(f, "failed to load config: {message}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoterConfig {
    /// Page property key in single-document mode.
    pub page_property: String,
    /// Appended to the document key to form the page property key in
    /// multi-document mode.
    pub page_property_suffix: String,
    /// Identity property of Root-Sections in multi-document mode.
    pub document_id_property: String,
    /// Keyword (single mode) or Root-Section property (multi mode) naming
    /// the source document path.
    pub source_property: String,
    /// Embed a link to the source page in new headings.
    pub use_external_link: bool,
    /// How the source path is written inside heading links.
    pub link_paths: LinkPathStyle,
    /// Order applied by the teardown sort.
    pub sort_order: SortOrder,
    /// Where new Sections are placed among their siblings.
    pub insert_policy: InsertPolicy,
    pub logging: LoggingConfig,
}

impl Default for NoterConfig {
    fn default() -> Self {
        Self {
            page_property: "NOTER_PAGE".to_string(),
            page_property_suffix: "-page".to_string(),
            document_id_property: "CUSTOM_ID".to_string(),
            source_property: "NOTER_DOCUMENT".to_string(),
            use_external_link: false,
            link_paths: LinkPathStyle::default(),
            sort_order: SortOrder::default(),
            insert_policy: InsertPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging settings consumed by the binary at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

impl NoterConfig {
    /// Loads defaults, then `path` when given, then the environment.
    ///
    /// # Errors
    /// - `Load` when `path` is missing or not valid TOML for this schema.
    /// - `Invalid` when the merged values fail validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::Load(format!(
                    "config file `{}` does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML snippet on top of defaults, ignoring the environment.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(text))
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("page_property", self.page_property.as_str()),
            ("document_id_property", self.document_id_property.as_str()),
            ("source_property", self.source_property.as_str()),
        ] {
            validate_property_name(name, value)?;
        }
        if self
            .page_property_suffix
            .chars()
            .any(|c| c.is_whitespace() || c == ':')
        {
            return Err(ConfigError::Invalid(format!(
                "page_property_suffix `{}` must not contain whitespace or `:`",
                self.page_property_suffix
            )));
        }
        normalize_level(&self.logging.level).map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

fn validate_property_name(name: &str, value: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{name} must not be empty")));
    }
    if value.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(ConfigError::Invalid(format!(
            "{name} `{value}` must not contain whitespace or `:`"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, NoterConfig};
    use crate::service::factory::{InsertPolicy, LinkPathStyle};
    use crate::service::sort::SortOrder;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = NoterConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.page_property, "NOTER_PAGE");
        assert_eq!(config.sort_order, SortOrder::Ascending);
        assert_eq!(config.insert_policy, InsertPolicy::Append);
        assert!(!config.use_external_link);
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = NoterConfig::from_toml_str(
            r#"
page_property = "page"
use_external_link = true
sort_order = "descending"
link_paths = "relative"

[logging]
level = "warn"
"#,
        )
        .expect("valid toml should load");
        assert_eq!(config.page_property, "page");
        assert!(config.use_external_link);
        assert_eq!(config.sort_order, SortOrder::Descending);
        assert_eq!(config.link_paths, LinkPathStyle::Relative);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.document_id_property, "CUSTOM_ID");
    }

    #[test]
    fn rejects_property_names_with_colons() {
        let err = NoterConfig::from_toml_str(r#"page_property = "bad:name""#)
            .expect_err("colon must be rejected");
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("page_property")));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = NoterConfig::from_toml_str("[logging]\nlevel = \"loud\"\n")
            .expect_err("unknown level must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagenote.toml");
        assert!(matches!(
            NoterConfig::load(Some(&path)),
            Err(ConfigError::Load(_))
        ));

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "insert_policy = \"page_order\"").unwrap();
        let config = NoterConfig::load(Some(&path)).expect("file config should load");
        assert_eq!(config.insert_policy, InsertPolicy::PageOrder);
    }

    #[test]
    fn serializes_enums_in_snake_case() {
        let config = NoterConfig {
            insert_policy: InsertPolicy::PageOrder,
            sort_order: SortOrder::Descending,
            ..NoterConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["insert_policy"], "page_order");
        assert_eq!(json["sort_order"], "descending");
        assert!(json["logging"].get("dir").is_none());
    }
}
