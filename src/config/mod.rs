//! Layered configuration
//!
//! Settings resolve with a fixed precedence, lowest first:
//!
//! 1. built-in defaults (`defaults.rs`)
//! 2. the persisted TOML settings file
//! 3. `ECM_` environment variables (`ECM_SCAN__PROFILE_NAMES=...`)
//! 4. per-action overrides (CLI flags)
//!
//! The resolved [`ManagerConfig`] is turned into [`ValidatedSettings`] at the
//! start of every scan.

pub mod defaults;
pub mod duration_serde;
pub mod validated;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub use validated::ValidatedSettings;

use crate::engine::{DuplicateStrategy, NameSource};
use crate::errors::ConfigError;
use defaults::*;
use duration_serde::{duration, parse_default};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub dispatcharr: DispatcharrConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Dispatcharr API connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcharrConfig {
    #[serde(default = "default_dispatcharr_url")]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// How long an access token is reused before a new login
    #[serde(default = "default_token_ttl", with = "duration")]
    pub token_ttl: Duration,
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
}

/// Which channels are scanned and how they are judged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Comma separated profile names, matched case-insensitively
    #[serde(default)]
    pub profile_names: String,
    /// Comma separated group names; empty means every group
    #[serde(default)]
    pub channel_groups: String,
    /// Priority ordered rule list; empty means the default list
    #[serde(default)]
    pub hide_rules: String,
    #[serde(default)]
    pub regex_ignore: String,
    #[serde(default)]
    pub regex_mark_inactive: String,
    #[serde(default)]
    pub regex_force_visible: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_past_date_grace_hours")]
    pub past_date_grace_hours: i64,
    #[serde(default)]
    pub duplicate_strategy: DuplicateStrategy,
    #[serde(default = "default_keep_duplicates")]
    pub keep_duplicates: bool,
    #[serde(default)]
    pub name_source: NameSource,
    /// Clear EPG assignments of channels hidden by an applied scan
    #[serde(default = "default_clear_epg_on_hide")]
    pub clear_epg_on_hide: bool,
}

/// Daily scheduled scans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Comma separated `HHMM` times in the scan timezone
    #[serde(default)]
    pub scheduled_times: String,
    #[serde(default = "default_poll_interval", with = "duration")]
    pub poll_interval: Duration,
    #[serde(default = "default_trigger_window", with = "duration")]
    pub trigger_window: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,
}

fn default_dispatcharr_url() -> String {
    DEFAULT_DISPATCHARR_URL.to_string()
}

fn default_token_ttl() -> Duration {
    parse_default(DEFAULT_TOKEN_TTL)
}

fn default_request_timeout() -> Duration {
    parse_default(DEFAULT_REQUEST_TIMEOUT)
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_past_date_grace_hours() -> i64 {
    DEFAULT_PAST_DATE_GRACE_HOURS
}

fn default_keep_duplicates() -> bool {
    DEFAULT_KEEP_DUPLICATES
}

fn default_clear_epg_on_hide() -> bool {
    DEFAULT_CLEAR_EPG_ON_HIDE
}

fn default_poll_interval() -> Duration {
    parse_default(DEFAULT_POLL_INTERVAL)
}

fn default_trigger_window() -> Duration {
    parse_default(DEFAULT_TRIGGER_WINDOW)
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(DEFAULT_EXPORT_DIR)
}

fn default_results_file() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_FILE)
}

impl Default for DispatcharrConfig {
    fn default() -> Self {
        Self {
            url: default_dispatcharr_url(),
            username: String::new(),
            password: String::new(),
            token_ttl: default_token_ttl(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            profile_names: String::new(),
            channel_groups: String::new(),
            hide_rules: String::new(),
            regex_ignore: String::new(),
            regex_mark_inactive: String::new(),
            regex_force_visible: String::new(),
            timezone: default_timezone(),
            past_date_grace_hours: default_past_date_grace_hours(),
            duplicate_strategy: DuplicateStrategy::default(),
            keep_duplicates: default_keep_duplicates(),
            name_source: NameSource::default(),
            clear_epg_on_hide: default_clear_epg_on_hide(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scheduled_times: String::new(),
            poll_interval: default_poll_interval(),
            trigger_window: default_trigger_window(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            results_file: default_results_file(),
        }
    }
}

/// Per-action overrides; unset fields leave the lower layers untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub dispatcharr: DispatcharrOverrides,
    pub scan: ScanOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatcharrOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_groups: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_rules: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_strategy: Option<DuplicateStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_duplicates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_source: Option<NameSource>,
}

impl ManagerConfig {
    /// The layered provider stack for a settings file
    pub fn figment(path: &Path, overrides: &ConfigOverrides) -> Figment {
        Figment::from(Serialized::defaults(ManagerConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SECTION_SEPARATOR))
            .merge(Serialized::defaults(overrides))
    }

    /// Resolve settings from every layer
    pub fn resolve(path: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Ok(Self::figment(path, overrides).extract()?)
    }

    /// Persist settings as TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Where settings come from; re-read before every scan
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new<P: Into<PathBuf>>(path: P, overrides: ConfigOverrides) -> Self {
        Self {
            path: path.into(),
            overrides,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve settings, writing a default settings file first if none exists
    pub fn load(&self) -> Result<ManagerConfig, ConfigError> {
        if !self.path.exists() {
            ManagerConfig::default().save(&self.path)?;
            info!("Created default config file: {}", self.path.display());
        }
        ManagerConfig::resolve(&self.path, &self.overrides)
    }
}
