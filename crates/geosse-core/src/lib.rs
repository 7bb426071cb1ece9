//! Event catalog, SSE framing, and the paced stream writer for GeoSSE.
//!
//! This crate owns the part of the system with a real contract: which
//! events are emitted, in what order, how each one is framed on the wire,
//! how emission is paced, and how a stream stops.
//!
//! # Modules
//!
//! - [`catalog`] -- The fixed, ordered rotation of tagged records
//!   (the event source).
//! - [`config`] -- Configuration loading from `geosse-config.yaml` into
//!   strongly-typed structs.
//! - [`frame`] -- Server-Sent Events frame encoding and parsing.
//! - [`sink`] -- [`OutputSink`] trait and the channel-backed [`ChannelSink`].
//! - [`writer`] -- The per-connection stream session and its emit/pause loop.
//!
//! [`OutputSink`]: sink::OutputSink
//! [`ChannelSink`]: sink::ChannelSink

pub mod catalog;
pub mod config;
pub mod frame;
pub mod sink;
pub mod writer;

pub use catalog::{CatalogEntry, CatalogPreset, EventCatalog, build_catalog, build_catalog_for};
pub use frame::SseFrame;
pub use sink::{ChannelSink, OutputSink, SinkClosed};
pub use writer::{SessionEnd, SessionState, SessionSummary, StreamError, StreamSession, run};
