//! Domain models shared by the rule engine, the channel sources and the reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::RuleTag;

pub type ChannelId = i64;
pub type ProfileId = i64;

/// A channel profile (a named visibility set in the hosting application)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub id: ProfileId,
    pub name: String,
}

/// Kind of EPG source backing a channel's guide data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpgSourceKind {
    /// Programs are stored and can be queried
    #[default]
    Stored,
    /// Programs are generated on demand, never stored
    Dummy,
}

/// A single programme's airing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ProgramWindow {
    pub fn overlaps(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        self.start < until && self.end > from
    }
}

/// EPG data assigned to a channel, with the programmes the source materialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpgAssignment {
    pub id: i64,
    #[serde(default)]
    pub source_kind: EpgSourceKind,
    #[serde(default)]
    pub programs: Vec<ProgramWindow>,
}

/// A stream attached to a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRef {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// A channel as read from the channel source at the start of a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channel_number: Option<f64>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub epg: Option<EpgAssignment>,
    #[serde(default)]
    pub streams: Vec<StreamRef>,
    /// Visibility in the selected profile(s) when the scan started
    #[serde(default)]
    pub visible: bool,
}

impl ChannelRecord {
    pub fn new<S: Into<String>>(id: ChannelId, name: S) -> Self {
        Self {
            id,
            name: name.into(),
            channel_number: None,
            group_name: None,
            epg: None,
            streams: Vec::new(),
            visible: true,
        }
    }

    pub fn with_number(mut self, number: f64) -> Self {
        self.channel_number = Some(number);
        self
    }

    pub fn with_group<S: Into<String>>(mut self, group: S) -> Self {
        self.group_name = Some(group.into());
        self
    }

    pub fn with_epg(mut self, epg: EpgAssignment) -> Self {
        self.epg = Some(epg);
        self
    }

    pub fn with_stream(mut self, stream: StreamRef) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn has_epg(&self) -> bool {
        self.epg.is_some()
    }
}

/// Visibility of a channel in a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible { Self::Visible } else { Self::Hidden }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "Visible"),
            Self::Hidden => write!(f, "Hidden"),
        }
    }
}

/// What a scan does to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanAction {
    Hide,
    Show,
    #[serde(rename = "No change")]
    NoChange,
    Ignored,
}

impl fmt::Display for ScanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hide => write!(f, "Hide"),
            Self::Show => write!(f, "Show"),
            Self::NoChange => write!(f, "No change"),
            Self::Ignored => write!(f, "Ignored"),
        }
    }
}

/// What produced a channel's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// A hide rule matched
    Rule(RuleTag),
    /// The ignore regex matched
    IgnoreRegex,
    /// The force-visible regex matched
    ForceVisible,
    /// Demoted by duplicate resolution
    Duplicate,
    /// No rule matched
    NoMatch,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule(tag) => write!(f, "{tag}"),
            Self::IgnoreRegex => write!(f, "IgnoreRegex"),
            Self::ForceVisible => write!(f, "ForceVisible"),
            Self::Duplicate => write!(f, "Duplicate"),
            Self::NoMatch => Ok(()),
        }
    }
}

impl Serialize for DecisionSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of a scan report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDecision {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub channel_number: Option<f64>,
    pub channel_group: String,
    pub current_visibility: Visibility,
    pub action: ScanAction,
    pub reason: String,
    pub matched_rule: DecisionSource,
    pub has_epg: bool,
}

/// Aggregate counts for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total_channels: usize,
    pub to_hide: usize,
    pub to_show: usize,
    pub ignored: usize,
    pub forced_visible: usize,
    pub duplicates_hidden: usize,
    pub unchanged: usize,
}

/// The visibility writes a scan wants applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityChanges {
    pub hide: Vec<ChannelId>,
    pub show: Vec<ChannelId>,
}

impl VisibilityChanges {
    pub fn is_empty(&self) -> bool {
        self.hide.is_empty() && self.show.is_empty()
    }

    /// Flatten into (channel id, enabled) pairs, hides first
    pub fn to_pairs(&self) -> Vec<(ChannelId, bool)> {
        self.hide
            .iter()
            .map(|id| (*id, false))
            .chain(self.show.iter().map(|id| (*id, true)))
            .collect()
    }
}

/// Decisions for every channel in one pass of the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanDecisions {
    pub decisions: Vec<ChannelDecision>,
    pub summary: ScanSummary,
    pub changes: VisibilityChanges,
}

/// Whether a scan writes its changes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    DryRun,
    Apply,
}

impl ScanMode {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DryRun => "dryrun",
            Self::Apply => "applied",
        }
    }
}

/// The complete, immutable outcome of one scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub scan_time: DateTime<Utc>,
    pub mode: ScanMode,
    pub profile_names: Vec<String>,
    pub summary: ScanSummary,
    pub changes: VisibilityChanges,
    pub results: Vec<ChannelDecision>,
}

impl ScanResult {
    pub fn new(
        scan_time: DateTime<Utc>,
        mode: ScanMode,
        profile_names: Vec<String>,
        decisions: ScanDecisions,
    ) -> Self {
        Self {
            scan_time,
            mode,
            profile_names,
            summary: decisions.summary,
            changes: decisions.changes,
            results: decisions.decisions,
        }
    }

    /// Human readable summary in the style of the UI action message
    pub fn summary_message(&self) -> String {
        let mode = if self.mode.is_dry_run() { "Dry Run" } else { "Applied" };
        let mut lines = vec![
            format!("Channel Visibility Scan {mode}:"),
            format!("• Total channels processed: {}", self.summary.total_channels),
            format!("• Channels to hide: {}", self.summary.to_hide),
            format!("• Channels to show: {}", self.summary.to_show),
            format!("• Channels ignored: {}", self.summary.ignored),
            format!("• Channels forced visible: {}", self.summary.forced_visible),
            format!("• Duplicate channels hidden: {}", self.summary.duplicates_hidden),
        ];
        if self.mode.is_dry_run() {
            lines.push(String::new());
            lines.push("Use 'run' to apply these changes.".to_string());
        }
        lines.join("\n")
    }
}

/// Outcome of clearing EPG data from one hidden channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpgRemovalEntry {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub channel_number: Option<f64>,
    pub status: EpgRemovalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpgRemovalStatus {
    SetToDummy,
    AlreadyDummy,
}
