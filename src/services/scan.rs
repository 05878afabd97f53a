//! Scan orchestration
//!
//! Drives one scan end to end: validate settings, resolve profiles, load
//! channels, run the engine, write the changes back as one batch per profile
//! and hand the result to the report sinks. Scans are serialized by a single
//! async mutex so scheduled and manual runs never overlap.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::traits::{ChannelSource, ReportSink, WriteBackSink};
use crate::config::{ScanConfig, ValidatedSettings};
use crate::engine::evaluate_scan;
use crate::errors::{AppResult, ScanError};
use crate::models::{
    ChannelProfile, ChannelRecord, EpgRemovalEntry, EpgRemovalStatus, EpgSourceKind, ScanMode,
    ScanResult,
};

/// Progress of the scan in flight
#[derive(Debug, Default)]
pub struct ScanProgress {
    current: AtomicUsize,
    total: AtomicUsize,
    running: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub total: usize,
    pub running: bool,
}

impl ScanProgress {
    fn begin(&self) {
        self.current.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn advance(&self, by: usize) {
        self.current.fetch_add(by, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            current: self.current.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

/// Marks progress finished however the scan exits
struct ProgressGuard<'a>(&'a ScanProgress);

impl<'a> ProgressGuard<'a> {
    fn start(progress: &'a ScanProgress) -> Self {
        progress.begin();
        Self(progress)
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

pub struct ScanOrchestrator {
    source: Arc<dyn ChannelSource>,
    sink: Arc<dyn WriteBackSink>,
    reports: Vec<Arc<dyn ReportSink>>,
    scan_lock: Mutex<()>,
    progress: Arc<ScanProgress>,
}

impl ScanOrchestrator {
    pub fn new(source: Arc<dyn ChannelSource>, sink: Arc<dyn WriteBackSink>) -> Self {
        Self {
            source,
            sink,
            reports: Vec::new(),
            scan_lock: Mutex::new(()),
            progress: Arc::new(ScanProgress::default()),
        }
    }

    pub fn with_report_sink(mut self, report: Arc<dyn ReportSink>) -> Self {
        self.reports.push(report);
        self
    }

    pub fn progress(&self) -> Arc<ScanProgress> {
        Arc::clone(&self.progress)
    }

    /// Run a scan at the current time
    pub async fn scan(&self, config: &ScanConfig, mode: ScanMode) -> AppResult<ScanResult> {
        self.scan_at(config, mode, Utc::now()).await
    }

    /// Run a scan as if the clock read `now`
    pub async fn scan_at(
        &self,
        config: &ScanConfig,
        mode: ScanMode,
        now: DateTime<Utc>,
    ) -> AppResult<ScanResult> {
        let _lock = self.scan_lock.lock().await;
        let _progress = ProgressGuard::start(&self.progress);

        let result = self.run_scan(config, mode, now).await;
        if let Err(e) = &result {
            error!("Channel visibility scan failed: {}", e);
        }
        result
    }

    async fn run_scan(
        &self,
        config: &ScanConfig,
        mode: ScanMode,
        now: DateTime<Utc>,
    ) -> AppResult<ScanResult> {
        let settings = ValidatedSettings::from_config(config)?;
        info!(
            "Starting channel visibility scan ({}) for profile(s) {:?} with {} rule(s)",
            mode.label(),
            settings.profile_names,
            settings.rules.len()
        );

        let (profiles, channels) = self.load_channels(&settings).await?;
        self.progress.set_total(channels.len());

        let local_now = now.with_timezone(&settings.timezone);
        let decisions = evaluate_scan(&channels, &settings, local_now);
        self.progress.advance(channels.len());

        if mode == ScanMode::Apply && !decisions.changes.is_empty() {
            let pairs = decisions.changes.to_pairs();
            let mut written: Vec<&str> = Vec::new();
            for profile in &profiles {
                let updated = match self.sink.apply_visibility(profile.id, &pairs).await {
                    Ok(updated) => updated,
                    Err(e) => {
                        if !written.is_empty() {
                            warn!(
                                "Profile '{}' failed after {:?} were already updated, those keep their changes",
                                profile.name, written
                            );
                        }
                        return Err(e.into());
                    }
                };
                info!(
                    "Updated {} channel(s) in profile '{}' ({} hidden, {} shown)",
                    updated,
                    profile.name,
                    decisions.changes.hide.len(),
                    decisions.changes.show.len()
                );
                written.push(&profile.name);
            }

            if settings.clear_epg_on_hide {
                self.clear_epg_for(&channels, &decisions.changes.hide).await;
            }
        }

        let result = ScanResult::new(
            now,
            mode,
            profiles.iter().map(|p| p.name.clone()).collect(),
            decisions,
        );

        info!(
            "Scan complete: {} channel(s), {} to hide, {} to show, {} ignored, {} duplicate(s)",
            result.summary.total_channels,
            result.summary.to_hide,
            result.summary.to_show,
            result.summary.ignored,
            result.summary.duplicates_hidden
        );

        for report in &self.reports {
            match report.write_scan(&result).await {
                Ok(Some(path)) => info!("Scan report written to {}", path.display()),
                Ok(None) => {}
                Err(e) => error!("Failed to write scan report: {}", e),
            }
        }

        Ok(result)
    }

    /// Clear EPG data from every hidden channel of the configured profiles
    pub async fn remove_epg_from_hidden(
        &self,
        config: &ScanConfig,
    ) -> AppResult<Vec<EpgRemovalEntry>> {
        let _lock = self.scan_lock.lock().await;
        let _progress = ProgressGuard::start(&self.progress);

        let settings = ValidatedSettings::from_config(config)?;
        let (_, channels) = self.load_channels(&settings).await?;

        let hidden: Vec<&ChannelRecord> = channels
            .iter()
            .filter(|c| !c.visible && c.epg.is_some())
            .collect();
        self.progress.set_total(hidden.len());
        info!("Removing EPG data from {} hidden channel(s)", hidden.len());

        let mut entries = Vec::with_capacity(hidden.len());
        for channel in hidden {
            let already_dummy = channel
                .epg
                .as_ref()
                .is_some_and(|epg| epg.source_kind == EpgSourceKind::Dummy);

            let status = if already_dummy {
                EpgRemovalStatus::AlreadyDummy
            } else {
                match self.sink.clear_epg(channel.id).await {
                    Ok(()) => EpgRemovalStatus::SetToDummy,
                    Err(e) => {
                        warn!("Failed to clear EPG for channel {}: {}", channel.id, e);
                        self.progress.advance(1);
                        continue;
                    }
                }
            };

            entries.push(EpgRemovalEntry {
                channel_id: channel.id,
                channel_name: channel.name.clone(),
                channel_number: channel.channel_number,
                status,
            });
            self.progress.advance(1);
        }

        for report in &self.reports {
            match report.write_epg_removal(&entries).await {
                Ok(Some(path)) => info!("EPG removal report written to {}", path.display()),
                Ok(None) => {}
                Err(e) => error!("Failed to write EPG removal report: {}", e),
            }
        }

        Ok(entries)
    }

    async fn clear_epg_for(&self, channels: &[ChannelRecord], hidden: &[i64]) {
        let hidden: HashSet<i64> = hidden.iter().copied().collect();
        for channel in channels.iter().filter(|c| hidden.contains(&c.id)) {
            let stored = channel
                .epg
                .as_ref()
                .is_some_and(|epg| epg.source_kind == EpgSourceKind::Stored);
            if !stored {
                continue;
            }
            if let Err(e) = self.sink.clear_epg(channel.id).await {
                warn!("Failed to clear EPG for hidden channel {}: {}", channel.id, e);
            }
        }
    }

    async fn resolve_profiles(
        &self,
        settings: &ValidatedSettings,
    ) -> AppResult<Vec<ChannelProfile>> {
        let available = self.source.list_profiles().await?;

        let mut selected = Vec::new();
        for wanted in &settings.profile_names {
            match available
                .iter()
                .find(|p| p.name.trim().eq_ignore_ascii_case(wanted))
            {
                Some(profile) => {
                    if !selected.iter().any(|p: &ChannelProfile| p.id == profile.id) {
                        selected.push(profile.clone());
                    }
                }
                None => warn!("Channel profile '{}' not found", wanted),
            }
        }

        if selected.is_empty() {
            return Err(ScanError::ProfilesNotFound {
                names: settings.profile_names.join(", "),
            }
            .into());
        }
        Ok(selected)
    }

    async fn load_channels(
        &self,
        settings: &ValidatedSettings,
    ) -> AppResult<(Vec<ChannelProfile>, Vec<ChannelRecord>)> {
        let profiles = self.resolve_profiles(settings).await?;
        let ids: Vec<i64> = profiles.iter().map(|p| p.id).collect();
        let channels = self
            .source
            .list_channels(&ids, &settings.channel_groups)
            .await?;

        if channels.is_empty() {
            let groups = if settings.channel_groups.is_empty() {
                String::new()
            } else {
                format!(" in group(s) '{}'", settings.channel_groups.join(", "))
            };
            return Err(ScanError::NoChannels {
                profiles: settings.profile_names.join(", "),
                groups,
            }
            .into());
        }

        Ok((profiles, channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, SourceError, SourceResult};
    use crate::models::{ChannelId, ProfileId};
    use crate::sources::memory::{ChannelSnapshot, InMemoryChannelStore, SnapshotProfile};
    use async_trait::async_trait;
    use tracing_test::traced_test;

    /// Store wrapper whose write-back fails for one profile
    struct RejectingSink {
        inner: Arc<InMemoryChannelStore>,
        reject: ProfileId,
    }

    #[async_trait]
    impl WriteBackSink for RejectingSink {
        async fn apply_visibility(
            &self,
            profile_id: ProfileId,
            changes: &[(ChannelId, bool)],
        ) -> SourceResult<usize> {
            if profile_id == self.reject {
                return Err(SourceError::store("write rejected"));
            }
            self.inner.apply_visibility(profile_id, changes).await
        }

        async fn clear_epg(&self, channel_id: ChannelId) -> SourceResult<()> {
            self.inner.clear_epg(channel_id).await
        }
    }

    fn store() -> Arc<InMemoryChannelStore> {
        let snapshot = ChannelSnapshot {
            profiles: vec![SnapshotProfile {
                id: 1,
                name: "Events".to_string(),
                enabled: [1, 2].into_iter().collect(),
            }],
            channels: vec![
                ChannelRecord::new(1, "PPV 1"),
                ChannelRecord::new(2, "PPV 2: Boxing Heavyweight Title"),
                ChannelRecord::new(3, "PPV 3: Football Championship Final"),
            ],
        };
        Arc::new(InMemoryChannelStore::from_snapshot(snapshot))
    }

    fn config() -> ScanConfig {
        ScanConfig {
            profile_names: "events".to_string(),
            hide_rules: "[NumberOnly]".to_string(),
            ..ScanConfig::default()
        }
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write() {
        let store = store();
        let orchestrator = ScanOrchestrator::new(store.clone(), store.clone());

        let result = orchestrator.scan(&config(), ScanMode::DryRun).await.unwrap();
        assert_eq!(result.changes.hide, vec![1]);
        assert_eq!(result.changes.show, vec![3]);
        assert_eq!(result.profile_names, vec!["Events"]);

        let snapshot = store.snapshot().await;
        assert!(snapshot.profiles[0].enabled.contains(&1));
        assert!(!orchestrator.progress().snapshot().running);
    }

    #[tokio::test]
    async fn test_apply_writes_back() {
        let store = store();
        let orchestrator = ScanOrchestrator::new(store.clone(), store.clone());

        orchestrator.scan(&config(), ScanMode::Apply).await.unwrap();
        let snapshot = store.snapshot().await;
        let enabled = &snapshot.profiles[0].enabled;
        assert!(!enabled.contains(&1));
        assert!(enabled.contains(&2));
        assert!(enabled.contains(&3));

        // a second run finds nothing left to do
        let again = orchestrator.scan(&config(), ScanMode::Apply).await.unwrap();
        assert!(again.changes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_profile_aborts() {
        let store = store();
        let orchestrator = ScanOrchestrator::new(store.clone(), store);
        let config = ScanConfig {
            profile_names: "Nope".to_string(),
            ..config()
        };
        let err = orchestrator.scan(&config, ScanMode::Apply).await.unwrap_err();
        assert!(matches!(err, AppError::Scan(ScanError::ProfilesNotFound { .. })));
    }

    #[tokio::test]
    async fn test_empty_group_filter_result_aborts() {
        let store = store();
        let orchestrator = ScanOrchestrator::new(store.clone(), store);
        let config = ScanConfig {
            channel_groups: "Nothing Here".to_string(),
            ..config()
        };
        let err = orchestrator.scan(&config, ScanMode::DryRun).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Scan aborted: No channels found in profile(s) 'events' in group(s) 'Nothing Here'"
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_profile_write_reports_applied_profiles() {
        let snapshot = ChannelSnapshot {
            profiles: vec![
                SnapshotProfile {
                    id: 1,
                    name: "Events".to_string(),
                    enabled: [1, 2].into_iter().collect(),
                },
                SnapshotProfile {
                    id: 2,
                    name: "Backup".to_string(),
                    enabled: [1, 2].into_iter().collect(),
                },
            ],
            channels: vec![
                ChannelRecord::new(1, "PPV 1"),
                ChannelRecord::new(2, "PPV 2: Boxing Heavyweight Title"),
            ],
        };
        let store = Arc::new(InMemoryChannelStore::from_snapshot(snapshot));
        let sink = Arc::new(RejectingSink {
            inner: store.clone(),
            reject: 2,
        });
        let orchestrator = ScanOrchestrator::new(store.clone(), sink);
        let config = ScanConfig {
            profile_names: "Events, Backup".to_string(),
            ..config()
        };

        let err = orchestrator.scan(&config, ScanMode::Apply).await.unwrap_err();
        assert!(matches!(err, AppError::Source(SourceError::Store { .. })));

        let snapshot = store.snapshot().await;
        assert!(!snapshot.profiles[0].enabled.contains(&1));
        assert!(snapshot.profiles[1].enabled.contains(&1));
        assert!(logs_contain("[\"Events\"] were already updated"));
    }
}
