//! Timezone and schedule parsing

use chrono::NaiveTime;
use chrono_tz::Tz;
use tracing::warn;

use crate::config::defaults::DEFAULT_TIMEZONE_TZ;

/// Resolve a timezone name, falling back to the default with a warning
pub fn resolve_timezone(tz_str: &str) -> Tz {
    let tz_str = tz_str.trim();
    if tz_str.is_empty() {
        return DEFAULT_TIMEZONE_TZ;
    }
    match tz_str.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(
                "Invalid timezone '{}', falling back to {}",
                tz_str, DEFAULT_TIMEZONE_TZ
            );
            DEFAULT_TIMEZONE_TZ
        }
    }
}

/// Parse timezone string and validate it
pub fn validate_timezone(tz_str: &str) -> Result<Tz, String> {
    tz_str.trim().parse::<Tz>().map_err(|_| {
        format!(
            "Invalid timezone: '{}'. Use a named timezone such as 'America/Chicago'",
            tz_str
        )
    })
}

/// Parse one `HHMM` entry
pub fn parse_hhmm(entry: &str) -> Result<NaiveTime, String> {
    let entry = entry.trim();
    if entry.len() != 4 || !entry.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid scheduled time '{}': expected HHMM", entry));
    }

    let hours: u32 = entry[..2]
        .parse()
        .map_err(|e| format!("Invalid hour in '{}': {}", entry, e))?;
    let minutes: u32 = entry[2..]
        .parse()
        .map_err(|e| format!("Invalid minute in '{}': {}", entry, e))?;

    NaiveTime::from_hms_opt(hours, minutes, 0)
        .ok_or_else(|| format!("Scheduled time '{}' is out of range", entry))
}

/// Parse a comma separated `HHMM` list, skipping invalid entries with a warning
///
/// The result is sorted and deduplicated.
pub fn parse_scheduled_times(value: &str) -> Vec<NaiveTime> {
    let mut times: Vec<NaiveTime> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|entry| match parse_hhmm(entry) {
            Ok(time) => Some(time),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect();

    times.sort();
    times.dedup();
    times
}
