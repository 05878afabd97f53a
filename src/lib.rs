//! Event channel manager
//!
//! Scans Dispatcharr channel profiles and hides event channels that carry no
//! live or upcoming event, driven by an ordered list of hide rules.

pub mod config;
pub mod engine;
pub mod errors;
pub mod extractor;
pub mod models;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod services;
pub mod sources;
pub mod utils;
