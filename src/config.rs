// ⚙️ Configuration - JSON file, then BEL_* environment, then CLI flags
//
// Every field has a default so an absent file is not an error. Bad values
// are reported as ConfigError with the offending key.

use crate::error::ConfigError;
use crate::paginate::DEFAULT_PAGE_SIZE;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DATA_PATH: &str = "BEL_DATA_PATH";
pub const ENV_REFERENCE_DATE: &str = "BEL_REFERENCE_DATE";
pub const ENV_PAGE_SIZE: &str = "BEL_PAGE_SIZE";
pub const ENV_LOG: &str = "BEL_LOG";
pub const ENV_SERVER_ADDR: &str = "BEL_SERVER_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dataset document `{ "leaderboard": [...] }`
    pub data_path: PathBuf,
    /// Pins the cutoff policy; today's date when unset
    pub reference_date: Option<NaiveDate>,
    pub default_page_size: usize,
    pub log_level: Option<String>,
    pub server_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_path: PathBuf::from("data/bel_data.json"),
            reference_date: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            log_level: None,
            server_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// File when given, defaults otherwise, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BEL_*` overrides read through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATA_PATH) {
            self.data_path = PathBuf::from(path);
        }
        if let Some(date) = lookup(ENV_REFERENCE_DATE) {
            self.reference_date = Some(parse_date(ENV_REFERENCE_DATE, &date)?);
        }
        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            self.default_page_size = parse_page_size(ENV_PAGE_SIZE, &size)?;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = Some(level);
        }
        if let Some(addr) = lookup(ENV_SERVER_ADDR) {
            self.server_addr = addr;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(invalid("default_page_size", "0"));
        }
        Ok(())
    }

    /// Configured reference date, or today
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(crate::cutoff::today)
    }
}

pub fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(key, value))
}

pub fn parse_page_size(key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
