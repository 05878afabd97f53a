pub mod scan;
pub mod traits;

pub use scan::{ProgressSnapshot, ScanOrchestrator, ScanProgress};
pub use traits::{ChannelSource, ReportSink, WriteBackSink};
