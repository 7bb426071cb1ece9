//! The event source: a fixed, ordered rotation of tagged records.
//!
//! A catalog is built once when a stream opens and never changes while the
//! stream runs. Entry order is emission order; the writer replays the same
//! order on every pass.

use core::fmt;
use core::str::FromStr;

use geosse_types::{EventKind, Feature};
use serde::{Deserialize, Serialize};

/// One `(tag, record)` pair of the rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// The SSE event tag.
    pub kind: EventKind,
    /// The record serialized into the `data:` line.
    pub record: Feature,
}

impl CatalogEntry {
    /// Pair a tag with a record.
    pub const fn new(kind: EventKind, record: Feature) -> Self {
        Self { kind, record }
    }
}

/// An ordered, immutable sequence of catalog entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCatalog {
    entries: Vec<CatalogEntry>,
}

impl EventCatalog {
    /// Build a catalog from entries in emission order.
    ///
    /// An empty catalog is representable so that the writer can reject it
    /// with [`StreamError::EmptyCatalog`](crate::writer::StreamError::EmptyCatalog).
    pub const fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries in one pass.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    /// Entries in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Tags in emission order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.entries.iter().map(|entry| entry.kind).collect()
    }
}

impl<'a> IntoIterator for &'a EventCatalog {
    type Item = &'a CatalogEntry;
    type IntoIter = core::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The built-in demo sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogPreset {
    /// `create`, `update`, `delete` of a single feature.
    #[default]
    Basic,
    /// The basic sequence with popup text, followed by `add`, `add`,
    /// `remove` of a second feature.
    Extended,
}

impl CatalogPreset {
    /// The preset name as used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Extended => "extended",
        }
    }
}

impl fmt::Display for CatalogPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "extended" => Ok(Self::Extended),
            other => Err(format!("unknown catalog preset: {other}")),
        }
    }
}

// Washington, D.C.
const DC: (f64, f64) = (-77.0369, 38.9072);
// Los Angeles
const LA: (f64, f64) = (-118.2437, 34.0522);
// Canada
const CANADA: (f64, f64) = (-106.3468, 56.1304);
// Mexico
const MEXICO: (f64, f64) = (-102.5528, 23.6345);

/// Build the reference catalog: `create`, `update`, `delete`.
///
/// Feature 1 is created over Washington, D.C., moved to Los Angeles, then
/// deleted at its new position. Every call returns an equal catalog.
pub fn build_catalog() -> EventCatalog {
    let created = Feature::point(1, DC.0, DC.1);
    let moved = Feature::point(1, LA.0, LA.1);

    EventCatalog::from_entries(vec![
        CatalogEntry::new(EventKind::Create, created),
        CatalogEntry::new(EventKind::Update, moved.clone()),
        CatalogEntry::new(EventKind::Delete, moved),
    ])
}

/// Build the catalog for a preset.
pub fn build_catalog_for(preset: CatalogPreset) -> EventCatalog {
    match preset {
        CatalogPreset::Basic => build_catalog(),
        CatalogPreset::Extended => build_extended_catalog(),
    }
}

fn build_extended_catalog() -> EventCatalog {
    let created = Feature::point(1, DC.0, DC.1).with_popup_text("Create event");
    let moved = Feature::point(1, LA.0, LA.1).with_popup_text("Update event");
    let added = Feature::point(2, CANADA.0, CANADA.1).with_popup_text("Add event");
    let re_added = Feature::point(2, MEXICO.0, MEXICO.1).with_popup_text("Update (via Add) event");

    EventCatalog::from_entries(vec![
        CatalogEntry::new(EventKind::Create, created),
        CatalogEntry::new(EventKind::Update, moved.clone()),
        CatalogEntry::new(EventKind::Delete, moved),
        CatalogEntry::new(EventKind::Add, added),
        CatalogEntry::new(EventKind::Add, re_added.clone()),
        CatalogEntry::new(EventKind::Remove, re_added),
    ])
}
