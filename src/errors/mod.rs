//! Centralized error handling for the event channel manager
//!
//! Errors are split by layer so callers can tell a bad setting apart from an
//! unreachable API or an aborted scan.
//!
//! # Error Categories
//!
//! - **Configuration Errors**: settings that cannot be loaded or are missing required values
//! - **Scan Errors**: fatal conditions that abort a scan before any write-back
//! - **Source Errors**: Dispatcharr API connectivity, authentication and response parsing
//! - **Report Errors**: CSV/JSON export failures
//!
//! # Usage
//!
//! ```rust
//! use event_channel_manager::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for channel source / write-back Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for report sink Results
pub type ReportResult<T> = Result<T, ReportError>;
