//! Hide-decision engine
//!
//! Pure, synchronous evaluation of a channel set against validated settings.
//! The engine never performs I/O: it receives the channel records and the
//! scan time and returns the per-channel decisions, the aggregate counts and
//! the visibility changes a write-back would need.

pub mod decision;
pub mod duplicates;
pub mod effective_name;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::debug;

pub use decision::{DecisionInputs, RuleOutcome, decide};
pub use duplicates::{DuplicateCandidate, DuplicateKey, DuplicateStrategy, resolve_duplicates};
pub use effective_name::{NameSource, effective_name};

use crate::config::ValidatedSettings;
use crate::models::{
    ChannelDecision, ChannelRecord, DecisionSource, ScanAction, ScanDecisions, ScanSummary,
    Visibility, VisibilityChanges,
};
use crate::rules::RuleContext;

/// Evaluate every channel and resolve duplicates
///
/// Decisions are returned in input order, so the same channels and settings
/// evaluated at the same instant always produce the same result.
pub fn evaluate_scan(
    channels: &[ChannelRecord],
    settings: &ValidatedSettings,
    now: DateTime<Tz>,
) -> ScanDecisions {
    let ctx = RuleContext {
        now,
        inactive_regex: settings.regex_mark_inactive.as_ref(),
        default_grace_hours: settings.past_date_grace_hours,
    };
    let inputs = DecisionInputs {
        ignore: settings.regex_ignore.as_ref(),
        force_visible: settings.regex_force_visible.as_ref(),
        rules: &settings.rules,
    };

    let names: Vec<String> = channels
        .iter()
        .map(|channel| effective_name(channel, settings.name_source))
        .collect();

    let mut decisions: Vec<ChannelDecision> = Vec::with_capacity(channels.len());
    let mut forced_visible = 0;

    for (channel, name) in channels.iter().zip(&names) {
        let outcome = decide(channel, name, &inputs, &ctx);
        if outcome == RuleOutcome::ForcedVisible {
            forced_visible += 1;
        }

        let decision = ChannelDecision {
            channel_id: channel.id,
            channel_name: channel.name.clone(),
            channel_number: channel.channel_number,
            channel_group: channel.group_name.clone().unwrap_or_default(),
            current_visibility: Visibility::from(channel.visible),
            action: outcome.action(channel.visible),
            reason: outcome.reason().to_string(),
            matched_rule: outcome.source(),
            has_epg: channel.has_epg(),
        };
        debug!(
            "Channel {} '{}': {} ({})",
            channel.id, name, decision.action, decision.reason
        );
        decisions.push(decision);
    }

    let duplicates_hidden = if settings.keep_duplicates {
        0
    } else {
        demote_duplicates(&mut decisions, &names, settings.duplicate_strategy)
    };

    let summary = summarize(&decisions, forced_visible, duplicates_hidden);
    let changes = collect_changes(&decisions);

    ScanDecisions {
        decisions,
        summary,
        changes,
    }
}

/// Demote all but one member of each duplicate group; returns the number demoted
fn demote_duplicates(
    decisions: &mut [ChannelDecision],
    names: &[String],
    strategy: DuplicateStrategy,
) -> usize {
    // channels ending up visible take part: passed the rules or forced visible
    let candidates: Vec<DuplicateCandidate<'_>> = decisions
        .iter()
        .zip(names)
        .filter(|(decision, _)| {
            matches!(
                decision.matched_rule,
                DecisionSource::NoMatch | DecisionSource::ForceVisible
            )
        })
        .map(|(decision, name)| DuplicateCandidate {
            id: decision.channel_id,
            name: name.as_str(),
            number: decision.channel_number,
        })
        .collect();

    let groups = resolve_duplicates(&candidates, strategy);
    let mut demoted = 0;

    for group in &groups {
        debug!(
            "Duplicate group {:?}: keeping channel {}, demoting {:?}",
            group.key, group.kept, group.demoted
        );
        for id in &group.demoted {
            if let Some(decision) = decisions.iter_mut().find(|d| d.channel_id == *id) {
                decision.action = match decision.current_visibility {
                    Visibility::Visible => ScanAction::Hide,
                    Visibility::Hidden => ScanAction::NoChange,
                };
                decision.reason = decision::REASON_DUPLICATE.to_string();
                decision.matched_rule = DecisionSource::Duplicate;
                demoted += 1;
            }
        }
    }

    demoted
}

fn summarize(
    decisions: &[ChannelDecision],
    forced_visible: usize,
    duplicates_hidden: usize,
) -> ScanSummary {
    let count = |action: ScanAction| decisions.iter().filter(|d| d.action == action).count();
    ScanSummary {
        total_channels: decisions.len(),
        to_hide: count(ScanAction::Hide),
        to_show: count(ScanAction::Show),
        ignored: count(ScanAction::Ignored),
        forced_visible,
        duplicates_hidden,
        unchanged: count(ScanAction::NoChange),
    }
}

fn collect_changes(decisions: &[ChannelDecision]) -> VisibilityChanges {
    let ids = |action: ScanAction| {
        decisions
            .iter()
            .filter(|d| d.action == action)
            .map(|d| d.channel_id)
            .collect()
    };
    VisibilityChanges {
        hide: ids(ScanAction::Hide),
        show: ids(ScanAction::Show),
    }
}
