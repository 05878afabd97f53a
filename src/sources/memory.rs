//! In-memory channel store backed by a JSON snapshot
//!
//! Holds profiles and channels in memory and implements both
//! [`ChannelSource`] and [`WriteBackSink`], so a scan can run end to end
//! without a Dispatcharr instance. Snapshots load from and save to JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::{SourceError, SourceResult};
use crate::models::{ChannelId, ChannelProfile, ChannelRecord, ProfileId};
use crate::services::traits::{ChannelSource, WriteBackSink};

/// A profile with the ids of the channels enabled in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProfile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub enabled: BTreeSet<ChannelId>,
}

/// Serialized form of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    #[serde(default)]
    pub profiles: Vec<SnapshotProfile>,
    #[serde(default)]
    pub channels: Vec<ChannelRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryChannelStore {
    state: RwLock<ChannelSnapshot>,
}

impl InMemoryChannelStore {
    pub fn from_snapshot(snapshot: ChannelSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Load a snapshot from a JSON file
    pub async fn load_json(path: &Path) -> SourceResult<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            SourceError::store(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;
        let snapshot: ChannelSnapshot = serde_json::from_str(&contents).map_err(|e| {
            SourceError::store(format!("Invalid snapshot {}: {}", path.display(), e))
        })?;
        info!(
            "Loaded snapshot {} ({} profile(s), {} channel(s))",
            path.display(),
            snapshot.profiles.len(),
            snapshot.channels.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current state to a JSON file
    pub async fn save_json(&self, path: &Path) -> SourceResult<()> {
        let contents = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state)
                .map_err(|e| SourceError::store(format!("Failed to serialize snapshot: {}", e)))?
        };
        tokio::fs::write(path, contents).await.map_err(|e| {
            SourceError::store(format!("Failed to write snapshot {}: {}", path.display(), e))
        })
    }

    /// A copy of the current state
    pub async fn snapshot(&self) -> ChannelSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl ChannelSource for InMemoryChannelStore {
    async fn list_profiles(&self) -> SourceResult<Vec<ChannelProfile>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .map(|p| ChannelProfile {
                id: p.id,
                name: p.name.clone(),
            })
            .collect())
    }

    async fn list_channels(
        &self,
        profile_ids: &[ProfileId],
        groups: &[String],
    ) -> SourceResult<Vec<ChannelRecord>> {
        let state = self.state.read().await;

        let enabled: HashSet<ChannelId> = state
            .profiles
            .iter()
            .filter(|p| profile_ids.contains(&p.id))
            .flat_map(|p| p.enabled.iter().copied())
            .collect();
        let wanted_groups: HashSet<String> = groups.iter().map(|g| g.to_lowercase()).collect();

        let channels: Vec<ChannelRecord> = state
            .channels
            .iter()
            .filter(|c| {
                wanted_groups.is_empty()
                    || c.group_name
                        .as_deref()
                        .is_some_and(|g| wanted_groups.contains(&g.trim().to_lowercase()))
            })
            .map(|c| {
                let mut channel = c.clone();
                channel.visible = enabled.contains(&c.id);
                channel
            })
            .collect();

        debug!("Snapshot returned {} channel(s)", channels.len());
        Ok(channels)
    }
}

#[async_trait]
impl WriteBackSink for InMemoryChannelStore {
    async fn apply_visibility(
        &self,
        profile_id: ProfileId,
        changes: &[(ChannelId, bool)],
    ) -> SourceResult<usize> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| SourceError::store(format!("Profile {} not in snapshot", profile_id)))?;

        for (channel_id, visible) in changes {
            if *visible {
                profile.enabled.insert(*channel_id);
            } else {
                profile.enabled.remove(channel_id);
            }
        }
        Ok(changes.len())
    }

    async fn clear_epg(&self, channel_id: ChannelId) -> SourceResult<()> {
        let mut state = self.state.write().await;
        let channel = state
            .channels
            .iter_mut()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| SourceError::store(format!("Channel {} not in snapshot", channel_id)))?;
        channel.epg = None;
        Ok(())
    }
}
