//! The `GeoJSON` point feature carried by every event frame.
//!
//! A [`Feature`] stores its position twice: once as
//! `geometry.coordinates` (`[lon, lat]`, `GeoJSON` order) and once as
//! `properties.lat` / `properties.lon`. Clients read either form, so both
//! must always describe the same point. [`Feature::point`] is the intended
//! constructor and fills both from the same two values.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{FeatureType, GeometryType};

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: core::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: core::ops::RangeInclusive<f64> = -90.0..=90.0;

/// A `GeoJSON` point geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PointGeometry {
    /// Always [`GeometryType::Point`].
    #[serde(rename = "type")]
    pub geometry_type: GeometryType,
    /// Position as `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    /// Create a point at the given longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self {
            geometry_type: GeometryType::Point,
            coordinates: [lon, lat],
        }
    }

    /// Longitude in degrees.
    pub const fn lon(&self) -> f64 {
        self.coordinates[0]
    }

    /// Latitude in degrees.
    pub const fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    /// Whether both coordinates fall inside their valid ranges.
    pub fn in_bounds(&self) -> bool {
        LONGITUDE_RANGE.contains(&self.lon()) && LATITUDE_RANGE.contains(&self.lat())
    }
}

/// Properties attached to a streamed feature.
///
/// Field order is the serialization order: `post_id`, `lat`, `lon`,
/// then `popup_text` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FeatureProperties {
    /// Stable identifier the client uses to match updates to features.
    pub post_id: u64,
    /// Latitude, duplicated from the geometry.
    pub lat: f64,
    /// Longitude, duplicated from the geometry.
    pub lon: f64,
    /// Optional text shown in the map popup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub popup_text: Option<String>,
}

/// One event record: a tagged `GeoJSON` point feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Feature {
    /// Always [`FeatureType::Feature`].
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    /// Where the feature is.
    pub geometry: PointGeometry,
    /// Identifier and duplicated position.
    pub properties: FeatureProperties,
}

impl Feature {
    /// Build a point feature, writing the position into both the geometry
    /// and the properties.
    pub const fn point(post_id: u64, lon: f64, lat: f64) -> Self {
        Self {
            feature_type: FeatureType::Feature,
            geometry: PointGeometry::new(lon, lat),
            properties: FeatureProperties {
                post_id,
                lat,
                lon,
                popup_text: None,
            },
        }
    }

    /// Attach popup text to the feature.
    #[must_use]
    pub fn with_popup_text(mut self, text: impl Into<String>) -> Self {
        self.properties.popup_text = Some(text.into());
        self
    }

    /// The feature's `post_id`.
    pub const fn post_id(&self) -> u64 {
        self.properties.post_id
    }

    /// Whether the geometry and the duplicated `lat`/`lon` properties
    /// describe the same point.
    pub fn is_consistent(&self) -> bool {
        self.geometry.lon().to_bits() == self.properties.lon.to_bits()
            && self.geometry.lat().to_bits() == self.properties.lat.to_bits()
    }

    /// Whether the feature is consistent and its position is in range.
    pub fn is_valid(&self) -> bool {
        self.is_consistent() && self.geometry.in_bounds()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_duplicates_position() {
        let feature = Feature::point(1, -77.0369, 38.9072);
        assert!(feature.is_consistent());
        assert!(feature.is_valid());
        assert_eq!(feature.post_id(), 1);
    }

    #[test]
    fn serializes_in_geojson_shape() {
        let feature = Feature::point(1, -77.0369, 38.9072);
        let json = serde_json::to_string(&feature).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[-77.0369,38.9072]},"properties":{"post_id":1,"lat":38.9072,"lon":-77.0369}}"#
        );
    }

    #[test]
    fn popup_text_is_emitted_only_when_set() {
        let feature = Feature::point(2, -106.3468, 56.1304).with_popup_text("Add event");
        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["properties"]["popup_text"], "Add event");

        let bare = serde_json::to_value(Feature::point(2, -106.3468, 56.1304)).unwrap();
        assert!(bare["properties"].get("popup_text").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let feature = Feature::point(7, -118.2437, 34.0522).with_popup_text("Update event");
        let json = serde_json::to_string(&feature).unwrap();
        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, feature);
    }

    #[test]
    fn detects_inconsistent_duplicate() {
        let mut feature = Feature::point(1, -77.0369, 38.9072);
        feature.properties.lon = -77.036;
        assert!(!feature.is_consistent());
        assert!(!feature.is_valid());
    }

    #[test]
    fn detects_out_of_range_position() {
        let feature = Feature::point(1, 200.0, 38.9072);
        assert!(feature.is_consistent());
        assert!(!feature.is_valid());
    }
}
