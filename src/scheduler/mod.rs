//! Daily scan scheduler
//!
//! Runs a job at fixed local times of day. The scheduler polls every
//! `poll_interval`; a slot fires when the current time is within
//! `trigger_window` of it and that slot has not fired for that day yet.
//! Each slot keeps its own last-run date, so several slots on the same day
//! all run.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::{ConfigLoader, ScheduleConfig};
use crate::models::ScanMode;
use crate::services::ScanOrchestrator;

/// Work triggered by the scheduler
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self);
}

/// Reloads settings and applies a scan
pub struct ScanJob {
    orchestrator: Arc<ScanOrchestrator>,
    loader: ConfigLoader,
}

impl ScanJob {
    pub fn new(orchestrator: Arc<ScanOrchestrator>, loader: ConfigLoader) -> Self {
        Self {
            orchestrator,
            loader,
        }
    }
}

#[async_trait]
impl ScheduledJob for ScanJob {
    async fn run(&self) {
        let config = match self.loader.load() {
            Ok(config) => config,
            Err(e) => {
                error!("Scheduled scan skipped, settings could not be loaded: {}", e);
                return;
            }
        };

        match self.orchestrator.scan(&config.scan, ScanMode::Apply).await {
            Ok(result) => info!("Scheduled scan finished\n{}", result.summary_message()),
            Err(e) => error!("Scheduled scan failed: {}", e),
        }
    }
}

/// The slot due at `now`, with the local date it belongs to
///
/// Slots are checked on yesterday, today and tomorrow so a window that
/// crosses midnight still matches. Local times that do not exist (DST gaps)
/// never fire.
pub fn due_slot(
    now: DateTime<Tz>,
    times: &[NaiveTime],
    last_runs: &HashMap<NaiveTime, NaiveDate>,
    window: chrono::Duration,
) -> Option<(NaiveTime, NaiveDate)> {
    let tz = now.timezone();
    let today = now.date_naive();
    let days = [today.pred_opt(), Some(today), today.succ_opt()];

    for time in times {
        for date in days.iter().flatten() {
            let Some(slot) = tz.from_local_datetime(&date.and_time(*time)).earliest() else {
                continue;
            };
            if (now - slot).abs() > window {
                continue;
            }
            if last_runs.get(time) == Some(date) {
                continue;
            }
            return Some((*time, *date));
        }
    }
    None
}

/// Owns the background task that fires scheduled scans
pub struct ScanScheduler {
    poll_interval: Duration,
    trigger_window: Duration,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl ScanScheduler {
    pub fn new(poll_interval: Duration, trigger_window: Duration) -> Self {
        Self {
            poll_interval,
            trigger_window,
            cancel: None,
            handle: None,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.poll_interval, config.trigger_window)
    }

    /// Start firing `job` at `times` (local to `tz`)
    ///
    /// Returns false when there is nothing to schedule or the scheduler is
    /// already running.
    pub fn start(&mut self, times: Vec<NaiveTime>, tz: Tz, job: Arc<dyn ScheduledJob>) -> bool {
        if self.is_running() {
            debug!("Scan scheduler already running");
            return false;
        }
        if times.is_empty() {
            info!("No scheduled times configured, scheduler not started");
            return false;
        }

        let window = chrono::Duration::from_std(self.trigger_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let poll = self.poll_interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();

        info!(
            "Scan scheduler started for {} ({})",
            times
                .iter()
                .map(|t| t.format("%H:%M").to_string())
                .collect::<Vec<_>>()
                .join(", "),
            tz
        );

        let handle = tokio::spawn(run_loop(times, tz, job, poll, window, cancel.clone()));
        self.cancel = Some(cancel);
        self.handle = Some(handle);
        true
    }

    /// Stop the scheduler, waiting for a running job to finish
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            error!("Scan scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

async fn run_loop(
    times: Vec<NaiveTime>,
    tz: Tz,
    job: Arc<dyn ScheduledJob>,
    poll: Duration,
    window: chrono::Duration,
    cancel: CancellationToken,
) {
    let mut last_runs: HashMap<NaiveTime, NaiveDate> = HashMap::new();
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Scan scheduler stopped");
                break;
            }
            _ = ticker.tick() => {
                let now = Utc::now().with_timezone(&tz);
                trace!("Scheduler tick at {}", now);
                if let Some((time, date)) = due_slot(now, &times, &last_runs, window) {
                    info!("Running scheduled scan for {} {}", date, time.format("%H:%M"));
                    last_runs.insert(time, date);
                    job.run().await;
                }
            }
        }
    }
}
