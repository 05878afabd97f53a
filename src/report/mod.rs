//! Scan reports
//!
//! [`ReportSink`](crate::services::traits::ReportSink) implementations plus
//! the maintenance action that clears exported files.

pub mod csv_writer;
pub mod json_store;

use std::path::Path;
use tracing::{info, warn};

use crate::errors::ReportResult;

pub use csv_writer::{CsvReportWriter, EPG_REMOVAL_PREFIX, SCAN_REPORT_PREFIX};
pub use json_store::JsonResultsStore;

fn is_export_file(name: &str) -> bool {
    (name.starts_with(SCAN_REPORT_PREFIX) || name.starts_with(EPG_REMOVAL_PREFIX))
        && name.ends_with(".csv")
}

/// Delete the CSV files this tool exported into `dir`
///
/// Other files are left alone. A missing directory clears nothing.
/// Returns the deleted file names, sorted.
pub async fn clear_exports(dir: &Path) -> ReportResult<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut deleted = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_export_file(&name) || !entry.file_type().await?.is_file() {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => deleted.push(name),
            Err(e) => warn!("Failed to delete export {}: {}", name, e),
        }
    }

    deleted.sort();
    info!("Cleared {} export file(s) from {}", deleted.len(), dir.display());
    Ok(deleted)
}
