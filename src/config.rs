//! Configuration loaded from YAML.
//!
//! Every field has a default, so an empty document is a valid configuration.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::types::{LedgerError, LedgerResult};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// REST backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the backend, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bearer token sent with every request (optional)
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            auth_token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Journal entry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalConfig {
    /// Largest accepted gap between total debit and total credit (exclusive)
    #[serde(
        default = "default_balance_tolerance",
        deserialize_with = "decimal_from_text_or_number"
    )]
    pub balance_tolerance: BigDecimal,
    /// Prefix of generated entry numbers ("AG" gives "AG-2024-1")
    #[serde(default = "default_entry_number_prefix")]
    pub entry_number_prefix: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
            entry_number_prefix: default_entry_number_prefix(),
        }
    }
}

fn default_balance_tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), 3)
}

fn default_entry_number_prefix() -> String {
    "AG".to_string()
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportsConfig {
    /// Records per page in the general ledger listing
    #[serde(default = "default_records_per_page")]
    pub records_per_page: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            records_per_page: default_records_per_page(),
        }
    }
}

fn default_records_per_page() -> usize {
    10
}

impl Config {
    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> LedgerResult<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| LedgerError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(LedgerError::Config("api.base_url cannot be empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(LedgerError::Config(
                "api.timeout_secs must be positive".to_string(),
            ));
        }
        if self.journal.balance_tolerance < BigDecimal::from(0) {
            return Err(LedgerError::Config(
                "journal.balance_tolerance cannot be negative".to_string(),
            ));
        }
        if self.journal.entry_number_prefix.trim().is_empty() {
            return Err(LedgerError::Config(
                "journal.entry_number_prefix cannot be empty".to_string(),
            ));
        }
        if self.reports.records_per_page == 0 {
            return Err(LedgerError::Config(
                "reports.records_per_page must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// YAML floats go through their shortest decimal text so 0.001 stays 0.001
fn decimal_from_text_or_number<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Integer(value) => value.to_string(),
        Raw::Float(value) => value.to_string(),
    };
    text.trim().parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.journal.entry_number_prefix, "AG");
        assert_eq!(config.reports.records_per_page, 10);
        assert_eq!(
            config.journal.balance_tolerance,
            "0.001".parse::<BigDecimal>().unwrap()
        );
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
api:
  base_url: "https://compta.example.org/api"
  auth_token: "secret"
journal:
  balance_tolerance: 0.01
reports:
  records_per_page: 25
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://compta.example.org/api");
        assert_eq!(config.api.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(
            config.journal.balance_tolerance,
            "0.01".parse::<BigDecimal>().unwrap()
        );
        assert_eq!(config.reports.records_per_page, 25);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_yaml_str("reports:\n  records_per_page: 0\n"),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("journal:\n  balance_tolerance: \"-1\"\n"),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("api: [1, 2]"),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/plan-comptable.yaml"),
            Err(LedgerError::Config(_))
        ));
    }
}
