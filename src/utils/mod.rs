//! Utility modules
//!
//! - `separators` for the colon/pipe/dash name separators
//! - `text` for whitespace normalization, truncation and escape decoding
//! - `time` for timezone and scheduled-time parsing

pub mod separators;
pub mod text;
pub mod time;
