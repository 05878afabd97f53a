//! Name/date extraction
//!
//! Recovers an embedded calendar date, clock time or day-of-week from a free
//! text channel name. Misses are `None`, never errors.

pub mod dates;
pub mod weekday;

pub use dates::{DatePattern, ExtractedDate, YEAR_ROLLOVER_DAYS, extract_date};
pub use weekday::extract_weekday;
