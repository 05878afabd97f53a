//! Calendar date extraction from channel names
//!
//! Pattern families are tried in a fixed priority order and the first family
//! that yields a valid calendar date wins. A family whose match does not form
//! a real date (`02/30`, `13.45`) is skipped and the next family is tried.

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::{Captures, Regex, RegexBuilder};
use std::sync::LazyLock;
use strum::{Display, EnumIter};

/// Dates inferred without a year that land further back than this roll into next year
pub const YEAR_ROLLOVER_DAYS: i64 = 180;

const MONTH_NAMES: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

/// The pattern family a date was recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum DatePattern {
    /// `start: 2025-11-08 16:00:00` / `stop: ...`
    StartStopStamp,
    /// `(2025-11-08 16:00:00)`
    ParenthesizedStamp,
    /// `11/08/2025` or `11/08/25`
    MonthDayYear,
    /// `28th Apr`
    OrdinalDayMonth,
    /// `Nov 8`, `Nov 8 16:00`, `Nov 8 8:00 PM`
    MonthNameDay,
    /// `11.08`
    DottedMonthDay,
    /// `11/08`
    SlashedMonthDay,
}

/// A date recovered from a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedDate {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub pattern: DatePattern,
}

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("date pattern is a valid regex")
}

static START_STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    case_insensitive(r"\b(?:start|stop):\s*(\d{4})-(\d{2})-(\d{2})\s+(\d{2}):(\d{2}):(\d{2})")
});

static PARENTHESIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    case_insensitive(r"\((\d{4})-(\d{2})-(\d{2})\s+(\d{2}):(\d{2}):(\d{2})\)")
});

static MONTH_DAY_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| case_insensitive(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b"));

static ORDINAL_DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    case_insensitive(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)\s+(?:of\s+)?({MONTH_NAMES})\b"
    ))
});

static MONTH_NAME_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    case_insensitive(&format!(
        r"\b({MONTH_NAMES})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{1,2}}):(\d{{2}})(?:\s*(am|pm)\b)?)?"
    ))
});

static DOTTED_MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| case_insensitive(r"\b(\d{1,2})\.(\d{1,2})\b"));

static SLASHED_MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| case_insensitive(r"(\d{1,2})/(\d{1,2})"));

/// Recover a calendar date (and possibly a time) from `name`
///
/// `today` is the local date of the scan; it supplies the year for patterns
/// that carry none. Returns `None` when no family produces a valid date.
pub fn extract_date(name: &str, today: NaiveDate) -> Option<ExtractedDate> {
    start_stop_stamp(name)
        .or_else(|| parenthesized_stamp(name))
        .or_else(|| month_day_year(name))
        .or_else(|| ordinal_day_month(name, today))
        .or_else(|| month_name_day(name, today))
        .or_else(|| dotted_month_day(name, today))
        .or_else(|| slashed_month_day(name, today))
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

fn stamp_from(caps: &Captures<'_>, pattern: DatePattern) -> Option<ExtractedDate> {
    let date = NaiveDate::from_ymd_opt(number(caps, 1)?, number(caps, 2)?, number(caps, 3)?)?;
    let time = NaiveTime::from_hms_opt(number(caps, 4)?, number(caps, 5)?, number(caps, 6)?);
    Some(ExtractedDate {
        date,
        time,
        pattern,
    })
}

fn start_stop_stamp(name: &str) -> Option<ExtractedDate> {
    START_STOP_RE
        .captures_iter(name)
        .find_map(|caps| stamp_from(&caps, DatePattern::StartStopStamp))
}

fn parenthesized_stamp(name: &str) -> Option<ExtractedDate> {
    PARENTHESIZED_RE
        .captures_iter(name)
        .find_map(|caps| stamp_from(&caps, DatePattern::ParenthesizedStamp))
}

fn month_day_year(name: &str) -> Option<ExtractedDate> {
    MONTH_DAY_YEAR_RE.captures_iter(name).find_map(|caps| {
        let month: u32 = number(&caps, 1)?;
        let day: u32 = number(&caps, 2)?;
        let year_text = caps.get(3)?.as_str();
        let mut year: i32 = year_text.parse().ok()?;
        if year_text.len() == 2 {
            year += 2000;
        }
        Some(ExtractedDate {
            date: NaiveDate::from_ymd_opt(year, month, day)?,
            time: None,
            pattern: DatePattern::MonthDayYear,
        })
    })
}

/// Build a date in the current year, rolling into next year when it would sit
/// more than [`YEAR_ROLLOVER_DAYS`] in the past
fn with_rollover(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if (today - candidate).num_days() > YEAR_ROLLOVER_DAYS {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(candidate)
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn ordinal_day_month(name: &str, today: NaiveDate) -> Option<ExtractedDate> {
    ORDINAL_DAY_MONTH_RE.captures_iter(name).find_map(|caps| {
        let day: u32 = number(&caps, 1)?;
        let month = month_number(caps.get(2)?.as_str())?;
        Some(ExtractedDate {
            date: with_rollover(month, day, today)?,
            time: None,
            pattern: DatePattern::OrdinalDayMonth,
        })
    })
}

/// Clock time with an optional 12-hour marker
fn clock_time(hours: u32, minutes: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hours = match meridiem.map(str::to_ascii_lowercase).as_deref() {
        Some("am") if (1..=12).contains(&hours) => hours % 12,
        Some("pm") if (1..=12).contains(&hours) => hours % 12 + 12,
        Some(_) => return None,
        None => hours,
    };
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

fn month_name_day(name: &str, today: NaiveDate) -> Option<ExtractedDate> {
    MONTH_NAME_DAY_RE.captures_iter(name).find_map(|caps| {
        let month = month_number(caps.get(1)?.as_str())?;
        let day: u32 = number(&caps, 2)?;
        let date = with_rollover(month, day, today)?;

        let time = match (number::<u32>(&caps, 3), number::<u32>(&caps, 4)) {
            (Some(h), Some(m)) => clock_time(h, m, caps.get(5).map(|m| m.as_str())),
            _ => None,
        };

        Some(ExtractedDate {
            date,
            time,
            pattern: DatePattern::MonthNameDay,
        })
    })
}

fn dotted_month_day(name: &str, today: NaiveDate) -> Option<ExtractedDate> {
    DOTTED_MONTH_DAY_RE.captures_iter(name).find_map(|caps| {
        Some(ExtractedDate {
            date: NaiveDate::from_ymd_opt(today.year(), number(&caps, 1)?, number(&caps, 2)?)?,
            time: None,
            pattern: DatePattern::DottedMonthDay,
        })
    })
}

fn slashed_month_day(name: &str, today: NaiveDate) -> Option<ExtractedDate> {
    SLASHED_MONTH_DAY_RE.captures_iter(name).find_map(|caps| {
        let whole = caps.get(0)?;
        let before = name[..whole.start()].chars().next_back();
        let after = name[whole.end()..].chars().next();
        // no neighbouring digits or slashes: `1/2/2025` and `123/4` are not MM/DD
        let boundary = |c: Option<char>| c.is_none_or(|c| c != '/' && !c.is_ascii_digit());
        if !boundary(before) || !boundary(after) {
            return None;
        }

        Some(ExtractedDate {
            date: NaiveDate::from_ymd_opt(today.year(), number(&caps, 1)?, number(&caps, 2)?)?,
            time: None,
            pattern: DatePattern::SlashedMonthDay,
        })
    })
}
