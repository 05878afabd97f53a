//! Day-of-week token detection

use chrono::Weekday;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r"\b(monday|mon|tuesday|tues|tue|wednesday|weds|wed|thursday|thurs|thur|thu|thr|friday|fri|saturday|sat|sunday|sun)\b",
    )
    .case_insensitive(true)
    .build()
    .expect("weekday pattern is a valid regex")
});

/// Find the leftmost whole-word day-of-week token in `name`
pub fn extract_weekday(name: &str) -> Option<Weekday> {
    let token = WEEKDAY_RE.find(name)?.as_str().to_ascii_lowercase();
    let weekday = match &token[..2] {
        "mo" => Weekday::Mon,
        "tu" => Weekday::Tue,
        "we" => Weekday::Wed,
        "th" => Weekday::Thu,
        "fr" => Weekday::Fri,
        "sa" => Weekday::Sat,
        "su" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}
