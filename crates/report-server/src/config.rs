//! Configuration for the merchant reporting service

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local};
use merchant_reporting::{CustomerScope, DEFAULT_MONTHS_BACK, WindowLimits};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::constants;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub reporting: ReportingConfig,
}

/// HTTP server section
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:8080"
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: constants::DEFAULT_BIND.to_string(),
        }
    }
}

/// Database section
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding payments and expenses
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DATABASE_FILE),
        }
    }
}

/// Reporting section
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Trailing window when a request does not specify one
    pub months_back: u32,
    /// Largest window a request may ask for
    pub max_months_back: u32,
    /// Reporting timezone as minutes east of UTC (system local when unset)
    pub utc_offset_minutes: Option<i32>,
    /// What `totalCustomers` counts: "all-time" or "date-range"
    pub customer_scope: CustomerScope,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            months_back: DEFAULT_MONTHS_BACK,
            max_months_back: constants::MAX_MONTHS_BACK,
            utc_offset_minutes: None,
            customer_scope: CustomerScope::default(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).with_context(|| {
            "Failed to parse config.toml. Check for:\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - Incorrect data types (strings vs numbers)\n\
             - customer_scope other than \"all-time\" or \"date-range\"\n\n\
             See config.toml.example for the expected format."
        })
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Timezone that month boundaries and "today" are computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingZone {
    /// Configured offset from UTC
    Fixed(FixedOffset),
    /// System timezone, looked up on every use so DST changes apply
    Local,
}

impl ReportingZone {
    /// Offset in effect right now
    pub fn offset_now(&self) -> FixedOffset {
        match self {
            ReportingZone::Fixed(offset) => *offset,
            ReportingZone::Local => *Local::now().offset(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub database: Option<PathBuf>,
}

/// Main configuration struct with parsed values
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub bind: SocketAddr,
    /// SQLite database path
    pub database_path: PathBuf,
    /// Default and maximum trailing window
    pub limits: WindowLimits,
    /// Reporting timezone
    pub zone: ReportingZone,
    /// Customer count semantics
    pub customer_scope: CustomerScope,
}

impl Config {
    /// Create config from file config and command-line overrides
    pub fn from_file(file_config: &FileConfig, overrides: Overrides) -> Result<Self> {
        let reporting = &file_config.reporting;

        let bind_str = overrides.bind.unwrap_or_else(|| file_config.server.bind.clone());
        let bind: SocketAddr = bind_str
            .parse()
            .with_context(|| format!("Invalid server.bind address: {}", bind_str))?;

        if reporting.max_months_back == 0 {
            anyhow::bail!("reporting.max_months_back must be at least 1");
        }
        if !(1..=reporting.max_months_back).contains(&reporting.months_back) {
            anyhow::bail!(
                "reporting.months_back must be between 1 and {} (got {})",
                reporting.max_months_back,
                reporting.months_back
            );
        }

        let zone = match reporting.utc_offset_minutes {
            Some(minutes) => {
                if minutes.abs() > constants::MAX_UTC_OFFSET_MINUTES {
                    anyhow::bail!("reporting.utc_offset_minutes out of range: {}", minutes);
                }
                let offset = FixedOffset::east_opt(minutes * 60)
                    .with_context(|| format!("Invalid reporting.utc_offset_minutes: {}", minutes))?;
                ReportingZone::Fixed(offset)
            }
            None => ReportingZone::Local,
        };

        Ok(Self {
            bind,
            database_path: overrides
                .database
                .unwrap_or_else(|| file_config.database.path.clone()),
            limits: WindowLimits {
                default_months: reporting.months_back,
                max_months: reporting.max_months_back,
            },
            zone,
            customer_scope: reporting.customer_scope,
        })
    }
}
