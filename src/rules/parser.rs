//! Rule string parser
//!
//! Accepts the comma separated, bracket delimited format
//! (`[BlankName],[PastDate:0:4h]`) and the legacy one-rule-per-line format.
//! Problems with individual tokens never abort the parse: malformed
//! parameters are dropped (the rule keeps its defaults) and unknown tags are
//! skipped, each with a warning.

use std::str::FromStr;
use tracing::warn;

use super::{DEFAULT_HIDE_RULES, HideRule, MAX_GRACE_HOURS, RuleParam, RuleTag};

/// Result of parsing a rule string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    pub rules: Vec<HideRule>,
    pub warnings: Vec<String>,
    /// True when the input was empty and the default list was substituted
    pub used_defaults: bool,
}

impl ParsedRules {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RuleParser;

impl RuleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a rule string into the ordered rule list
    pub fn parse(&self, input: &str) -> ParsedRules {
        if input.trim().is_empty() {
            let mut parsed = self.parse_tokens(DEFAULT_HIDE_RULES);
            parsed.used_defaults = true;
            return parsed;
        }
        self.parse_tokens(input)
    }

    fn parse_tokens(&self, input: &str) -> ParsedRules {
        let mut parsed = ParsedRules::default();

        for token in self.split_tokens(input) {
            if let Some(rule) = self.parse_token(&token, &mut parsed.warnings) {
                parsed.rules.push(rule);
            }
        }

        for warning in &parsed.warnings {
            warn!("Hide rule: {}", warning);
        }

        parsed
    }

    /// Split on top-level commas, or on newlines when there are no commas
    fn split_tokens(&self, input: &str) -> Vec<String> {
        if !input.contains(',') {
            return input
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
        }

        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut depth: usize = 0;

        for ch in input.chars() {
            match ch {
                '[' => {
                    depth += 1;
                    current.push(ch);
                }
                ']' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                ',' if depth == 0 => {
                    tokens.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
        }
        tokens.push(current);

        tokens
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn parse_token(&self, token: &str, warnings: &mut Vec<String>) -> Option<HideRule> {
        let inner = token
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();

        if inner.is_empty() {
            warnings.push(format!("empty rule token '{}' skipped", token));
            return None;
        }

        let mut segments = inner.split(':').map(str::trim);
        let name = segments.next().unwrap_or_default();

        let tag = match RuleTag::from_str(name) {
            Ok(tag) => tag,
            Err(_) => {
                warnings.push(format!("unknown rule '{}' ignored", name));
                return None;
            }
        };

        let days_segment = segments.next();
        let grace_segment = segments.next();
        if segments.next().is_some() {
            warnings.push(format!("extra parameters in '{}' ignored", token));
        }

        Some(HideRule::with_param(
            tag,
            self.parse_param(tag, token, days_segment, grace_segment, warnings),
        ))
    }

    fn parse_param(
        &self,
        tag: RuleTag,
        token: &str,
        days_segment: Option<&str>,
        grace_segment: Option<&str>,
        warnings: &mut Vec<String>,
    ) -> RuleParam {
        let Some(days_text) = days_segment else {
            return RuleParam::None;
        };

        if !tag.takes_days() {
            warnings.push(format!("rule {} takes no parameters, '{}' ignored", tag, token));
            return RuleParam::None;
        }

        let days = match days_text.parse::<i64>() {
            Ok(days) => days,
            Err(_) => {
                warnings.push(format!(
                    "malformed day threshold '{}' in '{}', using defaults",
                    days_text, token
                ));
                return RuleParam::None;
            }
        };

        let Some(grace_text) = grace_segment else {
            return RuleParam::Days(days);
        };

        if !tag.takes_grace() {
            warnings.push(format!("rule {} takes no grace period, '{}' ignored", tag, grace_text));
            return RuleParam::Days(days);
        }

        match parse_grace_hours(grace_text) {
            Some(grace_hours) if grace_hours <= MAX_GRACE_HOURS => {
                RuleParam::DaysWithGrace { days, grace_hours }
            }
            Some(grace_hours) => {
                warnings.push(format!(
                    "grace period {}h in '{}' exceeds {}h, ignored",
                    grace_hours, token, MAX_GRACE_HOURS
                ));
                RuleParam::Days(days)
            }
            None => {
                warnings.push(format!(
                    "malformed grace period '{}' in '{}', expected e.g. 4h",
                    grace_text, token
                ));
                RuleParam::Days(days)
            }
        }
    }
}

/// Parse an hour-suffixed grace period such as `4h`
fn parse_grace_hours(text: &str) -> Option<i64> {
    let digits = text
        .strip_suffix('h')
        .or_else(|| text.strip_suffix('H'))?
        .trim();
    digits.parse::<i64>().ok().filter(|hours| *hours >= 0)
}
