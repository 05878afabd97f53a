//! Settings validated for one scan
//!
//! Built once at the start of every scan so a changed rule string or regex is
//! picked up without a restart. Bad optional items (a regex that will not
//! compile, an unknown timezone) are warned about and skipped; only missing
//! profile names and an unusable rule list are fatal.

use chrono_tz::Tz;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::ScanConfig;
use crate::engine::{DuplicateStrategy, NameSource};
use crate::errors::{AppResult, ConfigError, ScanError};
use crate::rules::{HideRule, MAX_GRACE_HOURS, RuleParser};
use crate::utils::text::{decode_escapes, split_list};
use crate::utils::time::resolve_timezone;

#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    pub profile_names: Vec<String>,
    pub channel_groups: Vec<String>,
    pub rules: Vec<HideRule>,
    pub rule_warnings: Vec<String>,
    pub regex_ignore: Option<Regex>,
    pub regex_mark_inactive: Option<Regex>,
    pub regex_force_visible: Option<Regex>,
    pub timezone: Tz,
    pub past_date_grace_hours: i64,
    pub duplicate_strategy: DuplicateStrategy,
    pub keep_duplicates: bool,
    pub name_source: NameSource,
    pub clear_epg_on_hide: bool,
}

impl ValidatedSettings {
    pub fn from_config(config: &ScanConfig) -> AppResult<Self> {
        let profile_names = split_list(&config.profile_names);
        if profile_names.is_empty() {
            return Err(ConfigError::missing("scan.profile_names").into());
        }

        let parsed = RuleParser::new().parse(&config.hide_rules);
        if parsed.is_empty() {
            return Err(ScanError::NoValidRules {
                input: config.hide_rules.clone(),
            }
            .into());
        }

        let past_date_grace_hours = bounded_grace_hours(config.past_date_grace_hours);

        Ok(Self {
            profile_names,
            channel_groups: split_list(&config.channel_groups),
            rules: parsed.rules,
            rule_warnings: parsed.warnings,
            regex_ignore: compile_pattern("regex_ignore", &config.regex_ignore),
            regex_mark_inactive: compile_pattern(
                "regex_mark_inactive",
                &decode_escapes(&config.regex_mark_inactive),
            ),
            regex_force_visible: compile_pattern(
                "regex_force_visible",
                &config.regex_force_visible,
            ),
            timezone: resolve_timezone(&config.timezone),
            past_date_grace_hours,
            duplicate_strategy: config.duplicate_strategy,
            keep_duplicates: config.keep_duplicates,
            name_source: config.name_source,
            clear_epg_on_hide: config.clear_epg_on_hide,
        })
    }
}

/// Clamp the global grace period into `0..=MAX_GRACE_HOURS`
fn bounded_grace_hours(hours: i64) -> i64 {
    if !(0..=MAX_GRACE_HOURS).contains(&hours) {
        let bounded = hours.clamp(0, MAX_GRACE_HOURS);
        warn!(
            "past_date_grace_hours {} out of range 0..={}, using {}",
            hours, MAX_GRACE_HOURS, bounded
        );
        return bounded;
    }
    hours
}

/// Compile a user supplied, case-insensitive pattern; empty or invalid disables it
pub fn compile_pattern(field: &str, pattern: &str) -> Option<Regex> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Invalid {} '{}', pattern disabled: {}", field, pattern, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn config() -> ScanConfig {
        ScanConfig {
            profile_names: "Events, PPV".to_string(),
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_defaults_validate() {
        let settings = ValidatedSettings::from_config(&config()).unwrap();
        assert_eq!(settings.profile_names, vec!["Events", "PPV"]);
        assert_eq!(settings.rules.len(), 11);
        assert_eq!(settings.timezone, chrono_tz::America::Chicago);
        assert!(settings.regex_ignore.is_none());
    }

    #[test]
    fn test_missing_profile_is_fatal() {
        let err = ValidatedSettings::from_config(&ScanConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingField { .. })));
        assert!(err.is_fatal_scan_error());
    }

    #[test]
    fn test_all_invalid_rules_is_fatal() {
        let config = ScanConfig {
            hide_rules: "[Bogus]".to_string(),
            ..config()
        };
        let err = ValidatedSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, AppError::Scan(ScanError::NoValidRules { .. })));
    }

    #[test]
    fn test_bad_optional_items_are_skipped() {
        let config = ScanConfig {
            regex_ignore: "([unclosed".to_string(),
            regex_force_visible: "^keep".to_string(),
            timezone: "Not/AZone".to_string(),
            ..config()
        };
        let settings = ValidatedSettings::from_config(&config).unwrap();
        assert!(settings.regex_ignore.is_none());
        assert!(settings.regex_force_visible.as_ref().unwrap().is_match("KEEP this"));
        assert_eq!(settings.timezone, chrono_tz::America::Chicago);
    }

    #[test]
    fn test_grace_hours_are_bounded() {
        let huge = ScanConfig {
            past_date_grace_hours: 10_000_000_000,
            ..config()
        };
        let negative = ScanConfig {
            past_date_grace_hours: -3,
            ..config()
        };
        let settings = ValidatedSettings::from_config(&huge).unwrap();
        assert_eq!(settings.past_date_grace_hours, MAX_GRACE_HOURS);
        let settings = ValidatedSettings::from_config(&negative).unwrap();
        assert_eq!(settings.past_date_grace_hours, 0);
    }

    #[test]
    fn test_inactive_regex_is_escape_decoded() {
        let config = ScanConfig {
            regex_mark_inactive: r"\\bTBD\\b".to_string(),
            ..config()
        };
        let settings = ValidatedSettings::from_config(&config).unwrap();
        let re = settings.regex_mark_inactive.unwrap();
        assert!(re.is_match("Channel tbd"));
        assert!(!re.is_match("TBDX"));
    }
}
