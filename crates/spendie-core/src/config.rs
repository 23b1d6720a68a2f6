//! Configuration file and environment overrides
//!
//! Lookup order for the file: explicit path, `$SPENDIE_CONFIG`, then
//! `<config dir>/spendie/config.toml` if it exists. Missing files mean
//! defaults. Environment variables override file values.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SPENDIE_CONFIG";

/// Threshold fractions used when none are configured
pub const DEFAULT_THRESHOLDS: [&str; 2] = ["0.8", "1.0"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,
    /// Owner used by the CLI when `--owner` is not given
    pub owner: String,
    /// Currency symbol printed before amounts
    pub currency: String,
    /// Category for expenses entered without one
    pub default_category: String,
    /// Expenses shown by a list command without an explicit limit
    pub list_limit: usize,
    pub alerts: AlertConfig,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Fractions of a budget limit that trigger an alert
    #[serde(deserialize_with = "decimal_list")]
    pub thresholds: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Path secret for the chat webhook; the webhook is disabled without one
    pub webhook_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            owner: "local".to_string(),
            currency: "₹".to_string(),
            default_category: "miscellaneous".to_string(),
            list_limit: 10,
            alerts: AlertConfig::default(),
            server: ServerSection::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS
                .iter()
                .filter_map(|t| Decimal::from_str(t).ok())
                .collect(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            webhook_secret: None,
        }
    }
}

/// Default database location (`<data dir>/spendie/spendie.db`)
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("spendie").join("spendie.db"))
        .unwrap_or_else(|| PathBuf::from("spendie.db"))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spendie").join("config.toml"))
}

impl Config {
    /// Load the config file (if any), apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(db) = get("SPENDIE_DB") {
            self.database = PathBuf::from(db);
        }
        if let Some(owner) = get("SPENDIE_OWNER") {
            self.owner = owner;
        }
        if let Some(currency) = get("SPENDIE_CURRENCY") {
            self.currency = currency;
        }
        if let Some(list) = get("SPENDIE_THRESHOLDS") {
            self.alerts.thresholds = list
                .split(',')
                .map(|t| {
                    Decimal::from_str(t.trim())
                        .map_err(|_| Error::Config(format!("invalid threshold: '{}'", t.trim())))
                })
                .collect::<Result<_>>()?;
        }
        if let Some(secret) = get("SPENDIE_WEBHOOK_SECRET").or_else(|| get("TELEGRAM_BOT_TOKEN")) {
            self.server.webhook_secret = Some(secret);
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: '{}'", port)))?;
        }
        Ok(())
    }

    /// Check values and put thresholds in ascending order without duplicates
    pub fn validate(&mut self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(Error::Config("owner must not be empty".into()));
        }
        if self.default_category.trim().is_empty() {
            return Err(Error::Config("default_category must not be empty".into()));
        }
        if self.list_limit == 0 {
            return Err(Error::Config("list_limit must be at least 1".into()));
        }
        if self.alerts.thresholds.is_empty() {
            return Err(Error::Config("at least one alert threshold is required".into()));
        }
        if let Some(bad) = self.alerts.thresholds.iter().find(|t| **t <= Decimal::ZERO) {
            return Err(Error::Config(format!(
                "alert thresholds must be positive, got {}",
                bad
            )));
        }
        self.alerts.thresholds = normalize_thresholds(&self.alerts.thresholds);
        Ok(())
    }
}

/// Sort ascending, drop duplicates, strip trailing zeros
pub fn normalize_thresholds(thresholds: &[Decimal]) -> Vec<Decimal> {
    let mut out: Vec<Decimal> = thresholds.iter().map(|t| t.normalize()).collect();
    out.sort();
    out.dedup();
    out
}

/// TOML floats go through their shortest text form so 0.8 stays exactly 0.8
fn decimal_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Float(f64),
        Text(String),
    }

    Vec::<Raw>::deserialize(deserializer)?
        .into_iter()
        .map(|raw| {
            let text = match raw {
                Raw::Float(f) => f.to_string(),
                Raw::Text(s) => s,
            };
            Decimal::from_str(text.trim()).map_err(serde::de::Error::custom)
        })
        .collect()
}
