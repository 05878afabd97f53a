//! Service seams
//!
//! The scan orchestrator talks to the outside world only through these
//! traits, so the same scan runs against the Dispatcharr API, an in-memory
//! snapshot or a test double.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::{ReportResult, SourceResult};
use crate::models::{
    ChannelId, ChannelProfile, ChannelRecord, EpgRemovalEntry, ProfileId, ScanResult,
};

/// Where channel records come from
///
/// Implementations return fresh records on every call; the orchestrator
/// never caches them between scans.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// List every channel profile
    async fn list_profiles(&self) -> SourceResult<Vec<ChannelProfile>>;

    /// List the channels of the given profiles
    ///
    /// # Arguments
    /// * `profile_ids` - Profiles whose visibility is reported; a channel is
    ///   visible when it is enabled in any of them
    /// * `groups` - Group names to keep (case-insensitive); empty keeps all
    async fn list_channels(
        &self,
        profile_ids: &[ProfileId],
        groups: &[String],
    ) -> SourceResult<Vec<ChannelRecord>>;
}

/// Where visibility changes are written back
#[async_trait]
pub trait WriteBackSink: Send + Sync {
    /// Apply (channel id, visible) pairs to one profile as a single batch
    ///
    /// Returns the number of channels updated.
    async fn apply_visibility(
        &self,
        profile_id: ProfileId,
        changes: &[(ChannelId, bool)],
    ) -> SourceResult<usize>;

    /// Remove the EPG assignment of a channel
    async fn clear_epg(&self, channel_id: ChannelId) -> SourceResult<()>;
}

/// Where scan results are reported
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Record a finished scan; returns the path written, if any
    async fn write_scan(&self, result: &ScanResult) -> ReportResult<Option<PathBuf>>;

    /// Record an EPG removal run; sinks that do not track these ignore it
    async fn write_epg_removal(
        &self,
        _entries: &[EpgRemovalEntry],
    ) -> ReportResult<Option<PathBuf>> {
        Ok(None)
    }
}
