//! CSV export of scan results and EPG removal runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::ReportResult;
use crate::models::{EpgRemovalEntry, EpgRemovalStatus, ScanResult};
use crate::services::traits::ReportSink;

pub const SCAN_REPORT_PREFIX: &str = "event_channel_manager_";
pub const EPG_REMOVAL_PREFIX: &str = "epg_removal_";

const SCAN_HEADERS: [&str; 9] = [
    "channel_id",
    "channel_name",
    "channel_number",
    "channel_group",
    "current_visibility",
    "action",
    "reason",
    "matched_rule",
    "has_epg",
];

const EPG_REMOVAL_HEADERS: [&str; 4] = ["channel_id", "channel_name", "channel_number", "status"];

fn file_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d_%H%M%S").to_string()
}

/// Channel numbers print without a trailing `.0`
fn format_number(number: Option<f64>) -> String {
    number.map(|n| n.to_string()).unwrap_or_default()
}

fn removal_status(status: EpgRemovalStatus) -> &'static str {
    match status {
        EpgRemovalStatus::SetToDummy => "Set to dummy",
        EpgRemovalStatus::AlreadyDummy => "Already dummy",
    }
}

/// Writes one CSV file per scan into the export directory
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    export_dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new<P: Into<PathBuf>>(export_dir: P) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn scan_file_name(result: &ScanResult) -> String {
        format!(
            "{}{}_{}.csv",
            SCAN_REPORT_PREFIX,
            result.mode.label(),
            file_timestamp(result.scan_time)
        )
    }

    async fn write_file(&self, name: &str, contents: Vec<u8>) -> ReportResult<PathBuf> {
        tokio::fs::create_dir_all(&self.export_dir).await?;
        let path = self.export_dir.join(name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }
}

fn render_scan(result: &ScanResult) -> ReportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SCAN_HEADERS)?;
    for row in &result.results {
        writer.write_record([
            row.channel_id.to_string(),
            row.channel_name.clone(),
            format_number(row.channel_number),
            row.channel_group.clone(),
            row.current_visibility.to_string(),
            row.action.to_string(),
            row.reason.clone(),
            row.matched_rule.to_string(),
            row.has_epg.to_string(),
        ])?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

fn render_epg_removal(entries: &[EpgRemovalEntry]) -> ReportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EPG_REMOVAL_HEADERS)?;
    for entry in entries {
        writer.write_record([
            entry.channel_id.to_string(),
            entry.channel_name.clone(),
            format_number(entry.channel_number),
            removal_status(entry.status).to_string(),
        ])?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

#[async_trait]
impl ReportSink for CsvReportWriter {
    async fn write_scan(&self, result: &ScanResult) -> ReportResult<Option<PathBuf>> {
        let contents = render_scan(result)?;
        let path = self
            .write_file(&Self::scan_file_name(result), contents)
            .await?;
        debug!("Scan report written to {}", path.display());
        Ok(Some(path))
    }

    async fn write_epg_removal(
        &self,
        entries: &[EpgRemovalEntry],
    ) -> ReportResult<Option<PathBuf>> {
        if entries.is_empty() {
            return Ok(None);
        }
        let contents = render_epg_removal(entries)?;
        let name = format!("{}{}.csv", EPG_REMOVAL_PREFIX, file_timestamp(Utc::now()));
        let path = self.write_file(&name, contents).await?;
        debug!("EPG removal report written to {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChannelDecision, DecisionSource, ScanAction, ScanDecisions, ScanMode, ScanSummary,
        Visibility, VisibilityChanges,
    };
    use crate::rules::RuleTag;
    use chrono::TimeZone;

    fn sample_result(mode: ScanMode) -> ScanResult {
        let decisions = ScanDecisions {
            decisions: vec![
                ChannelDecision {
                    channel_id: 7,
                    channel_name: "PPV 1".to_string(),
                    channel_number: Some(101.0),
                    channel_group: "PPV".to_string(),
                    current_visibility: Visibility::Visible,
                    action: ScanAction::Hide,
                    reason: "No event pattern ('PPV 1')".to_string(),
                    matched_rule: DecisionSource::Rule(RuleTag::NoEventPattern),
                    has_epg: false,
                },
                ChannelDecision {
                    channel_id: 8,
                    channel_name: "PPV 2: Fight, Night".to_string(),
                    channel_number: Some(101.5),
                    channel_group: "PPV".to_string(),
                    current_visibility: Visibility::Visible,
                    action: ScanAction::NoChange,
                    reason: "Has event".to_string(),
                    matched_rule: DecisionSource::NoMatch,
                    has_epg: true,
                },
            ],
            summary: ScanSummary {
                total_channels: 2,
                to_hide: 1,
                unchanged: 1,
                ..ScanSummary::default()
            },
            changes: VisibilityChanges {
                hide: vec![7],
                show: vec![],
            },
        };
        ScanResult::new(
            Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 3).unwrap(),
            mode,
            vec!["Events".to_string()],
            decisions,
        )
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            CsvReportWriter::scan_file_name(&sample_result(ScanMode::DryRun)),
            "event_channel_manager_dryrun_20261017_090503.csv"
        );
        assert_eq!(
            CsvReportWriter::scan_file_name(&sample_result(ScanMode::Apply)),
            "event_channel_manager_applied_20261017_090503.csv"
        );
    }

    #[test]
    fn test_number_format() {
        assert_eq!(format_number(Some(101.0)), "101");
        assert_eq!(format_number(Some(101.5)), "101.5");
        assert_eq!(format_number(None), "");
    }

    #[tokio::test]
    async fn test_write_scan_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(dir.path().join("exports"));

        let path = writer
            .write_scan(&sample_result(ScanMode::DryRun))
            .await
            .unwrap()
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), SCAN_HEADERS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "101");
        assert_eq!(&rows[0][5], "Hide");
        assert_eq!(&rows[0][7], "NoEventPattern");
        assert_eq!(&rows[1][1], "PPV 2: Fight, Night");
        assert_eq!(&rows[1][5], "No change");
        assert_eq!(&rows[1][7], "");
        assert_eq!(&rows[1][8], "true");
    }

    #[tokio::test]
    async fn test_empty_epg_removal_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(dir.path());
        assert!(writer.write_epg_removal(&[]).await.unwrap().is_none());

        let entries = [EpgRemovalEntry {
            channel_id: 3,
            channel_name: "NFL: Bears vs Lions".to_string(),
            channel_number: Some(12.0),
            status: EpgRemovalStatus::SetToDummy,
        }];
        let path = writer.write_epg_removal(&entries).await.unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(EPG_REMOVAL_PREFIX));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("3,NFL: Bears vs Lions,12,Set to dummy"));
    }
}
