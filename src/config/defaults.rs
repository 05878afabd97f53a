//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.

use chrono_tz::Tz;

// Dispatcharr defaults
pub const DEFAULT_DISPATCHARR_URL: &str = "http://localhost:9191";
pub const DEFAULT_TOKEN_TTL: &str = "5m";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

// Scan defaults
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";
pub const DEFAULT_TIMEZONE_TZ: Tz = chrono_tz::America::Chicago;
pub const DEFAULT_PAST_DATE_GRACE_HOURS: i64 = 0;
pub const DEFAULT_KEEP_DUPLICATES: bool = false;
pub const DEFAULT_CLEAR_EPG_ON_HIDE: bool = false;
// Note: profile_names is the ONLY mandatory scan field with no default

// Schedule defaults
pub const DEFAULT_POLL_INTERVAL: &str = "30s";
pub const DEFAULT_TRIGGER_WINDOW: &str = "30s";

// Storage defaults
pub const DEFAULT_EXPORT_DIR: &str = "./data/exports";
pub const DEFAULT_RESULTS_FILE: &str = "./data/last_results.json";

// Environment
pub const ENV_PREFIX: &str = "ECM_";
pub const ENV_SECTION_SEPARATOR: &str = "__";
