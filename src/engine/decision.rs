//! Per-channel hide decision

use regex::Regex;

use crate::models::{ChannelRecord, DecisionSource, ScanAction};
use crate::rules::{HideRule, RuleContext, RuleTag, evaluate_rule};

pub const REASON_HAS_EVENT: &str = "Has event";
pub const REASON_IGNORED: &str = "Matches ignore pattern";
pub const REASON_FORCED_VISIBLE: &str = "Matches force visible pattern";
pub const REASON_DUPLICATE: &str = "Duplicate channel";

/// Outcome of running the decision pipeline on one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// No rule matched
    Visible,
    /// The first matching rule, with its reason
    Hide { reason: String, rule: RuleTag },
    /// The force-visible regex matched; rules were not consulted
    ForcedVisible,
    /// The ignore regex matched; the channel is left untouched
    Ignored,
}

impl RuleOutcome {
    /// Whether the channel should end up visible
    pub fn wants_visible(&self) -> Option<bool> {
        match self {
            Self::Visible | Self::ForcedVisible => Some(true),
            Self::Hide { .. } => Some(false),
            Self::Ignored => None,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Visible => REASON_HAS_EVENT,
            Self::Hide { reason, .. } => reason,
            Self::ForcedVisible => REASON_FORCED_VISIBLE,
            Self::Ignored => REASON_IGNORED,
        }
    }

    pub fn source(&self) -> DecisionSource {
        match self {
            Self::Visible => DecisionSource::NoMatch,
            Self::Hide { rule, .. } => DecisionSource::Rule(*rule),
            Self::ForcedVisible => DecisionSource::ForceVisible,
            Self::Ignored => DecisionSource::IgnoreRegex,
        }
    }

    /// Action needed to move from the current visibility to this outcome
    pub fn action(&self, currently_visible: bool) -> ScanAction {
        match self.wants_visible() {
            None => ScanAction::Ignored,
            Some(true) if !currently_visible => ScanAction::Show,
            Some(false) if currently_visible => ScanAction::Hide,
            Some(_) => ScanAction::NoChange,
        }
    }
}

/// The regexes and rules that drive [`decide`]
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub ignore: Option<&'a Regex>,
    pub force_visible: Option<&'a Regex>,
    pub rules: &'a [HideRule],
}

/// Decide a channel: ignore regex, then force-visible regex, then the
/// ordered rules with the first match winning
pub fn decide(
    channel: &ChannelRecord,
    name: &str,
    inputs: &DecisionInputs<'_>,
    ctx: &RuleContext<'_>,
) -> RuleOutcome {
    if inputs.ignore.is_some_and(|re| re.is_match(name)) {
        return RuleOutcome::Ignored;
    }

    if inputs.force_visible.is_some_and(|re| re.is_match(name)) {
        return RuleOutcome::ForcedVisible;
    }

    inputs
        .rules
        .iter()
        .find_map(|rule| {
            evaluate_rule(rule, channel, name, ctx).map(|reason| RuleOutcome::Hide {
                reason,
                rule: rule.tag,
            })
        })
        .unwrap_or(RuleOutcome::Visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn ctx() -> RuleContext<'static> {
        RuleContext {
            now: Chicago.with_ymd_and_hms(2025, 11, 5, 12, 0, 0).unwrap(),
            inactive_regex: None,
            default_grace_hours: 0,
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = [
            HideRule::new(RuleTag::ShortChannelName),
            HideRule::new(RuleTag::NumberOnly),
        ];
        let inputs = DecisionInputs {
            ignore: None,
            force_visible: None,
            rules: &rules,
        };
        let channel = ChannelRecord::new(1, "PPV 12");
        match decide(&channel, "PPV 12", &inputs, &ctx()) {
            RuleOutcome::Hide { rule, .. } => assert_eq!(rule, RuleTag::ShortChannelName),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_ignore_beats_force_visible_beats_rules() {
        let ignore = Regex::new("(?i)ignore").unwrap();
        let force = Regex::new("(?i)keep").unwrap();
        let rules = [HideRule::new(RuleTag::ShortChannelName)];
        let inputs = DecisionInputs {
            ignore: Some(&ignore),
            force_visible: Some(&force),
            rules: &rules,
        };

        let channel = ChannelRecord::new(1, "x");
        assert_eq!(decide(&channel, "ignore keep", &inputs, &ctx()), RuleOutcome::Ignored);
        assert_eq!(decide(&channel, "keep", &inputs, &ctx()), RuleOutcome::ForcedVisible);
        assert!(matches!(
            decide(&channel, "short", &inputs, &ctx()),
            RuleOutcome::Hide { .. }
        ));
    }

    #[test]
    fn test_no_match_is_visible() {
        let inputs = DecisionInputs {
            ignore: None,
            force_visible: None,
            rules: &[],
        };
        let outcome = decide(&ChannelRecord::new(1, "x"), "x", &inputs, &ctx());
        assert_eq!(outcome, RuleOutcome::Visible);
        assert_eq!(outcome.reason(), REASON_HAS_EVENT);
    }

    #[test]
    fn test_actions_depend_on_current_visibility() {
        let hide = RuleOutcome::Hide {
            reason: "r".into(),
            rule: RuleTag::BlankName,
        };
        assert_eq!(hide.action(true), ScanAction::Hide);
        assert_eq!(hide.action(false), ScanAction::NoChange);
        assert_eq!(RuleOutcome::Visible.action(false), ScanAction::Show);
        assert_eq!(RuleOutcome::Visible.action(true), ScanAction::NoChange);
        assert_eq!(RuleOutcome::ForcedVisible.action(false), ScanAction::Show);
        assert_eq!(RuleOutcome::Ignored.action(false), ScanAction::Ignored);
    }
}
