//! Centralized constants for the merchant reporting service
//!
//! Deployment-specific settings are loaded from config.toml; these are the
//! defaults and fixed names.

// =============================================================================
// Files
// =============================================================================

/// Default config file path
pub const CONFIG_FILE: &str = "config.toml";

/// Default SQLite database path
pub const DATABASE_FILE: &str = "./data/reports.db";

// =============================================================================
// Server
// =============================================================================

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Monthly revenue endpoint
pub const MONTHLY_GROWTH_PATH: &str = "/reports/monthly-growth";

/// Summary statistics endpoint
pub const SUMMARY_PATH: &str = "/reports/summary";

/// Prefix the dashboard front-end mounts the report routes under
pub const API_PREFIX: &str = "/api";

// =============================================================================
// Reporting
// =============================================================================

/// Largest trailing window a request may ask for
pub const MAX_MONTHS_BACK: u32 = 24;

/// Largest accepted UTC offset for the reporting timezone (minutes)
pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

// =============================================================================
// Storage
// =============================================================================

/// Fixed-width instant format; lexicographic order equals chronological order
pub const STORED_INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
