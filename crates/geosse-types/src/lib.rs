//! Shared type definitions for the GeoSSE event streamer.
//!
//! This crate is the single source of truth for the records that travel
//! over the event stream. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` so the Leaflet client can type its event handlers.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for stream session identifiers
//! - [`enums`] -- Event tags and `GeoJSON` type discriminators
//! - [`structs`] -- The `GeoJSON` point feature emitted as an event record

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EventKind, FeatureType, GeometryType, ParseEventKindError};
pub use ids::SessionId;
pub use structs::{Feature, FeatureProperties, PointGeometry};
