//! Rule predicates
//!
//! One pure function per [`RuleTag`], dispatched through [`evaluate_rule`].
//! Each returns `Some(reason)` when the rule says the channel should be
//! hidden and `None` otherwise. Nothing here performs I/O or fails: a name
//! without a date simply does not match a date rule.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use super::{HideRule, RuleParam, RuleTag};
use crate::extractor::{extract_date, extract_weekday};
use crate::models::{ChannelRecord, EpgSourceKind};
use crate::utils::separators::{self, SeparatorKind};
use crate::utils::text::normalize_whitespace;

/// Default day threshold for `PastDate`
pub const DEFAULT_PAST_DATE_DAYS: i64 = 0;
/// Default day threshold for `FutureDate`
pub const DEFAULT_FUTURE_DATE_DAYS: i64 = 14;
/// `ShortDescription` matches descriptions shorter than this
pub const SHORT_DESCRIPTION_CHARS: usize = 15;
/// `ShortChannelName` matches names shorter than this
pub const SHORT_CHANNEL_NAME_CHARS: usize = 25;
/// `EmptyPlaceholder` tolerates this many characters after a separator
pub const PLACEHOLDER_MAX_CHARS: usize = 2;
/// Window scanned for programmes by `NoEPG`
pub const EPG_LOOKAHEAD_HOURS: i64 = 24;

static NO_EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r"\b(no[_\s-]?events?|offline|no[_\s-]?games?[_\s-]?scheduled|no[_\s-]?scheduled[_\s-]?events?)\b",
    )
    .case_insensitive(true)
    .build()
    .expect("no-event pattern is a valid regex")
});

static NUMBER_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}[\p{L}\s]*\s\d+$").expect("number-only pattern is a valid regex"));

/// Read-only inputs shared by every predicate during one scan
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Scan time in the configured timezone
    pub now: DateTime<Tz>,
    /// Compiled "mark inactive" regex, if one is configured and valid
    pub inactive_regex: Option<&'a Regex>,
    /// Grace hours used by `PastDate` when the rule carries none
    pub default_grace_hours: i64,
}

impl RuleContext<'_> {
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.now.with_timezone(&Utc)
    }
}

/// Evaluate one rule against a channel and its effective name
pub fn evaluate_rule(
    rule: &HideRule,
    channel: &ChannelRecord,
    name: &str,
    ctx: &RuleContext<'_>,
) -> Option<String> {
    match rule.tag {
        RuleTag::NoEpg => no_epg(channel, ctx),
        RuleTag::BlankName => blank_name(name),
        RuleTag::WrongDayOfWeek => wrong_day_of_week(name, ctx),
        RuleTag::NoEventPattern => no_event_pattern(name),
        RuleTag::EmptyPlaceholder => empty_placeholder(name),
        RuleTag::ShortDescription => short_description(name),
        RuleTag::ShortChannelName => short_channel_name(name),
        RuleTag::NumberOnly => number_only(name),
        RuleTag::PastDate => past_date(rule.param, name, ctx),
        RuleTag::FutureDate => future_date(rule.param, name, ctx),
        RuleTag::InactiveRegex => inactive_regex(name, ctx),
    }
}

fn no_epg(channel: &ChannelRecord, ctx: &RuleContext<'_>) -> Option<String> {
    let Some(epg) = &channel.epg else {
        return Some("No EPG assigned".to_string());
    };

    // dummy sources generate programmes on demand
    if epg.source_kind == EpgSourceKind::Dummy {
        return None;
    }

    let from = ctx.now_utc();
    let until = from + Duration::hours(EPG_LOOKAHEAD_HOURS);
    if epg.programs.iter().any(|p| p.overlaps(from, until)) {
        None
    } else {
        Some(format!("No EPG data in next {} hours", EPG_LOOKAHEAD_HOURS))
    }
}

fn blank_name(name: &str) -> Option<String> {
    name.trim()
        .is_empty()
        .then(|| "Blank channel name".to_string())
}

fn wrong_day_of_week(name: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let found = extract_weekday(name)?;
    let today = ctx.now.weekday();
    (found != today).then(|| format!("Wrong day of week ({}, today is {})", found, today))
}

fn no_event_pattern(name: &str) -> Option<String> {
    NO_EVENT_RE
        .find(name)
        .map(|m| format!("No event pattern ('{}')", m.as_str()))
}

fn empty_placeholder(name: &str) -> Option<String> {
    SeparatorKind::ALL.iter().find_map(|&kind| {
        let sep = separators::last_of_kind(name, kind)?;
        let trailing = name[sep.end..]
            .chars()
            .filter(|c| !c.is_whitespace())
            .count();
        (trailing <= PLACEHOLDER_MAX_CHARS)
            .then(|| format!("Empty placeholder after '{}'", kind))
    })
}

fn short_description(name: &str) -> Option<String> {
    let description = separators::text_after_last(name)?.trim();
    let length = description.chars().count();
    (length > 0 && length < SHORT_DESCRIPTION_CHARS)
        .then(|| format!("Short description ('{}')", description))
}

fn short_channel_name(name: &str) -> Option<String> {
    if separators::has_separator(name) {
        return None;
    }
    let length = normalize_whitespace(name).chars().count();
    (length < SHORT_CHANNEL_NAME_CHARS).then(|| "Short channel name without event".to_string())
}

fn number_only(name: &str) -> Option<String> {
    let normalized = normalize_whitespace(name);
    if normalized.contains(':') || normalized.contains('|') || normalized.contains(" - ") {
        return None;
    }
    NUMBER_ONLY_RE
        .is_match(&normalized)
        .then(|| "Number-only channel name".to_string())
}

fn past_date(param: RuleParam, name: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let threshold = param.days().unwrap_or(DEFAULT_PAST_DATE_DAYS);
    let grace_hours = param.grace_hours().unwrap_or(ctx.default_grace_hours);

    let event = extract_date(name, ctx.today())?;
    let reference = ctx
        .now
        .checked_sub_signed(Duration::try_hours(grace_hours)?)?
        .date_naive();
    let days_past = (reference - event.date).num_days();

    (days_past > threshold).then(|| {
        format!(
            "Past date ({}, {} day(s) ago)",
            event.date.format("%Y-%m-%d"),
            days_past
        )
    })
}

fn future_date(param: RuleParam, name: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let threshold = param.days().unwrap_or(DEFAULT_FUTURE_DATE_DAYS);

    let event = extract_date(name, ctx.today())?;
    let days_ahead = (event.date - ctx.today()).num_days();

    (days_ahead > threshold).then(|| {
        format!(
            "Future date ({}, {} days ahead)",
            event.date.format("%Y-%m-%d"),
            days_ahead
        )
    })
}

fn inactive_regex(name: &str, ctx: &RuleContext<'_>) -> Option<String> {
    ctx.inactive_regex
        .filter(|re| re.is_match(name))
        .map(|_| "Matches inactive pattern".to_string())
}
