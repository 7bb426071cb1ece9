//! Enumeration types for the GeoSSE event stream.
//!
//! [`EventKind`] is the SSE `event:` tag. [`FeatureType`] and
//! [`GeometryType`] are the single-valued `"type"` discriminators that
//! `GeoJSON` requires on features and geometries.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event tags
// ---------------------------------------------------------------------------

/// The tag written on the `event:` line of every frame.
///
/// The client dispatches on this tag: `create`/`update`/`add` place or
/// replace a feature by its `post_id`, `delete`/`remove` take it off the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A feature appears for the first time.
    Create,
    /// An existing feature moves or changes.
    Update,
    /// A feature is deleted.
    Delete,
    /// A feature is added, replacing any feature with the same id.
    Add,
    /// A feature is removed.
    Remove,
}

impl EventKind {
    /// Every tag, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Add,
        Self::Remove,
    ];

    /// The tag exactly as it appears on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known event tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct ParseEventKindError(pub String);

impl FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseEventKindError(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// GeoJSON discriminators
// ---------------------------------------------------------------------------

/// `GeoJSON` object type of an event record. Always `"Feature"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FeatureType {
    /// A single `GeoJSON` feature.
    #[default]
    Feature,
}

/// `GeoJSON` geometry type. Only points are streamed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum GeometryType {
    /// A single position.
    #[default]
    Point,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn serde_uses_wire_tags() {
        let json = serde_json::to_string(&EventKind::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
        let kind: EventKind = serde_json::from_str("\"remove\"").unwrap();
        assert_eq!(kind, EventKind::Remove);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "message".parse::<EventKind>().unwrap_err();
        assert_eq!(err, ParseEventKindError(String::from("message")));
    }

    #[test]
    fn discriminators_serialize_as_geojson_names() {
        assert_eq!(serde_json::to_string(&FeatureType::Feature).unwrap(), "\"Feature\"");
        assert_eq!(serde_json::to_string(&GeometryType::Point).unwrap(), "\"Point\"");
    }
}
