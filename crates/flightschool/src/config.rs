//! Configuration management for flightschool.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightschool";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flightschool.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTSCHOOL_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/flightschool/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// CSV import configuration.
    pub import: ImportConfig,
    /// Flight-time calculation configuration.
    pub flight: FlightConfig,
    /// Invoicing configuration.
    pub billing: BillingConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightschool/flightschool.db`
    pub database_path: Option<PathBuf>,
}

/// What to do when an imported row matches a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Leave the stored record untouched and count the row as a duplicate.
    #[default]
    Skip,
    /// Overwrite the stored record with the imported row.
    Update,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// CSV import configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Report progress every N rows.
    pub progress_interval: usize,
    /// Field delimiter.
    pub delimiter: char,
    /// Policy for rows matching an existing record.
    pub on_duplicate: DuplicatePolicy,
    /// Abort the batch after this many failed rows.
    /// Set to 0 to always process every row.
    pub stop_after_errors: usize,
}

/// Flight-time calculation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Allowed difference between Hobbs and block time before a warning is raised.
    pub hobbs_tolerance_minutes: u32,
    /// Longest accepted block time for a single leg.
    pub max_block_minutes: u32,
}

/// Invoicing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// ISO currency code printed on invoices.
    pub currency: String,
    /// VAT percentage applied to every line.
    pub vat_percent: u32,
    /// Number series for proforma invoices.
    pub proforma_series: String,
    /// Number series for fiscal invoices.
    pub fiscal_series: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            delimiter: ',',
            on_duplicate: DuplicatePolicy::Skip,
            stop_after_errors: 0,
        }
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            hobbs_tolerance_minutes: 12,
            max_block_minutes: 18 * 60,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: "RON".to_string(),
            vat_percent: 19,
            proforma_series: "PF".to_string(),
            fiscal_series: "FS".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FLIGHTSCHOOL_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("FLIGHTSCHOOL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.import.progress_interval == 0 {
            return Err(Error::ConfigValidation {
                message: "progress_interval must be greater than 0".to_string(),
            });
        }

        if !self.import.delimiter.is_ascii() || self.import.delimiter.is_ascii_alphanumeric() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "delimiter must be an ASCII punctuation or whitespace character, got {:?}",
                    self.import.delimiter
                ),
            });
        }

        if self.flight.max_block_minutes == 0 || self.flight.max_block_minutes > 24 * 60 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "max_block_minutes ({}) must be between 1 and 1440",
                    self.flight.max_block_minutes
                ),
            });
        }

        if self.billing.vat_percent > 100 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "vat_percent ({}) cannot exceed 100",
                    self.billing.vat_percent
                ),
            });
        }

        let proforma = self.billing.proforma_series.trim();
        let fiscal = self.billing.fiscal_series.trim();
        if proforma.is_empty() || fiscal.is_empty() {
            return Err(Error::ConfigValidation {
                message: "invoice series cannot be empty".to_string(),
            });
        }
        if proforma.eq_ignore_ascii_case(fiscal) {
            return Err(Error::ConfigValidation {
                message: format!("proforma and fiscal series must differ (both '{proforma}')"),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the import delimiter as the byte the CSV reader expects.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.import.delimiter).unwrap_or(b',')
    }
}
