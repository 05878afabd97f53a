//! Effective-name resolution

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::ChannelRecord;
use crate::utils::text::bounded_name;

/// Which name the rules are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NameSource {
    /// The channel's own display name
    #[default]
    ChannelName,
    /// The name of the channel's lowest-ordered stream
    StreamName,
}

/// Resolve the name the rules see for `channel`
///
/// Falls back to the channel name whenever the stream name is unavailable.
/// The result is truncated to the matching limit and never fails.
pub fn effective_name(channel: &ChannelRecord, source: NameSource) -> String {
    let name = match source {
        NameSource::ChannelName => channel.name.as_str(),
        NameSource::StreamName => channel
            .streams
            .iter()
            .min_by_key(|stream| (stream.order, stream.id))
            .and_then(|stream| stream.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(channel.name.as_str()),
    };
    bounded_name(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamRef;

    fn stream(id: i64, name: Option<&str>, order: i32) -> StreamRef {
        StreamRef {
            id,
            name: name.map(str::to_string),
            order,
        }
    }

    #[test]
    fn test_stream_name_uses_lowest_order() {
        let channel = ChannelRecord::new(1, "PPV 1")
            .with_stream(stream(10, Some("Backup: Fight"), 2))
            .with_stream(stream(11, Some("UFC 300: Main Card"), 0));
        assert_eq!(effective_name(&channel, NameSource::StreamName), "UFC 300: Main Card");
        assert_eq!(effective_name(&channel, NameSource::ChannelName), "PPV 1");
    }

    #[test]
    fn test_stream_name_falls_back_to_channel_name() {
        let no_streams = ChannelRecord::new(1, "PPV 1");
        assert_eq!(effective_name(&no_streams, NameSource::StreamName), "PPV 1");

        let unnamed = ChannelRecord::new(2, "PPV 2").with_stream(stream(5, None, 0));
        assert_eq!(effective_name(&unnamed, NameSource::StreamName), "PPV 2");

        let blank = ChannelRecord::new(3, "PPV 3").with_stream(stream(6, Some("  "), 0));
        assert_eq!(effective_name(&blank, NameSource::StreamName), "PPV 3");
    }

    #[test]
    fn test_long_names_are_truncated() {
        let channel = ChannelRecord::new(1, "y".repeat(800));
        assert_eq!(effective_name(&channel, NameSource::ChannelName).len(), 500);
    }
}
