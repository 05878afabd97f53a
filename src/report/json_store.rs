//! Last scan results persisted as a JSON document

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::ReportResult;
use crate::models::{ChannelDecision, ScanResult, ScanSummary};
use crate::services::traits::ReportSink;

#[derive(Debug, Serialize)]
struct ResultsDocument<'a> {
    scan_time: DateTime<Utc>,
    dry_run: bool,
    profile_names: &'a [String],
    counts: &'a ScanSummary,
    results: &'a [ChannelDecision],
}

impl<'a> From<&'a ScanResult> for ResultsDocument<'a> {
    fn from(result: &'a ScanResult) -> Self {
        Self {
            scan_time: result.scan_time,
            dry_run: result.mode.is_dry_run(),
            profile_names: &result.profile_names,
            counts: &result.summary,
            results: &result.results,
        }
    }
}

/// Overwrites a single JSON file with the latest scan
#[derive(Debug, Clone)]
pub struct JsonResultsStore {
    path: PathBuf,
}

impl JsonResultsStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonResultsStore {
    async fn write_scan(&self, result: &ScanResult) -> ReportResult<Option<PathBuf>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(&ResultsDocument::from(result))?;
        tokio::fs::write(&self.path, contents).await?;
        debug!("Scan results saved to {}", self.path.display());
        Ok(Some(self.path.clone()))
    }
}
