//! Duplicate resolution
//!
//! Event providers often publish the same event on several channels
//! (`PPV 3: UFC 300` and `PPV 7: UFC 300`). Channels about to be visible are
//! grouped by a normalized identity key and every group of two or more keeps
//! exactly one survivor, chosen deterministically by the configured strategy.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

use crate::models::ChannelId;
use crate::utils::separators;
use crate::utils::text::comparison_key;

/// How the surviving channel of a duplicate group is chosen
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DuplicateStrategy {
    /// Lowest channel number wins; channels without a number lose
    #[default]
    LowestNumber,
    /// Highest channel number wins; channels without a number lose
    HighestNumber,
    /// Longest effective name wins
    LongestName,
}

/// Identity of an event: (base name, event description), normalized
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DuplicateKey {
    pub base: String,
    pub description: String,
}

impl DuplicateKey {
    pub fn from_name(name: &str) -> Self {
        let (base, description) = separators::split_at_first(name).unwrap_or((name, ""));
        Self {
            base: comparison_key(base),
            description: comparison_key(description),
        }
    }
}

/// A channel eligible for duplicate resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCandidate<'a> {
    pub id: ChannelId,
    pub name: &'a str,
    pub number: Option<f64>,
}

impl DuplicateCandidate<'_> {
    fn name_len(&self) -> usize {
        self.name.chars().count()
    }
}

/// Ascending number, channels without a number last
fn number_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending number, channels without a number treated as negative infinity
fn number_descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.unwrap_or(f64::NEG_INFINITY);
    let b = b.unwrap_or(f64::NEG_INFINITY);
    b.total_cmp(&a)
}

impl DuplicateStrategy {
    /// Total order over candidates; the minimum survives
    pub fn compare(&self, a: &DuplicateCandidate<'_>, b: &DuplicateCandidate<'_>) -> Ordering {
        let primary = match self {
            Self::LowestNumber => number_nulls_last(a.number, b.number)
                .then_with(|| a.name_len().cmp(&b.name_len())),
            Self::HighestNumber => number_descending(a.number, b.number)
                .then_with(|| a.name_len().cmp(&b.name_len())),
            Self::LongestName => b
                .name_len()
                .cmp(&a.name_len())
                .then_with(|| number_nulls_last(a.number, b.number)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// A group that had more than one member
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub key: DuplicateKey,
    pub kept: ChannelId,
    pub demoted: Vec<ChannelId>,
}

/// Group candidates by identity and pick one survivor per group
///
/// Groups are returned in key order; single-member groups are omitted.
pub fn resolve_duplicates(
    candidates: &[DuplicateCandidate<'_>],
    strategy: DuplicateStrategy,
) -> Vec<ResolvedGroup> {
    let mut groups: BTreeMap<DuplicateKey, Vec<&DuplicateCandidate<'_>>> = BTreeMap::new();
    for candidate in candidates {
        groups
            .entry(DuplicateKey::from_name(candidate.name))
            .or_default()
            .push(candidate);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .filter_map(|(key, mut members)| {
            members.sort_by(|a, b| strategy.compare(a, b));
            let (kept, rest) = members.split_first()?;
            Some(ResolvedGroup {
                key,
                kept: kept.id,
                demoted: rest.iter().map(|c| c.id).collect(),
            })
        })
        .collect()
}
