//! Channel sources and write-back sinks
//!
//! - `dispatcharr` talks to a live Dispatcharr instance over its REST API
//! - `memory` keeps channels in memory, loaded from a JSON snapshot

pub mod dispatcharr;
pub mod memory;

pub use dispatcharr::DispatcharrClient;
pub use memory::{ChannelSnapshot, InMemoryChannelStore, SnapshotProfile};
