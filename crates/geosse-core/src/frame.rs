//! Server-Sent Events framing.
//!
//! One frame is written as three separate chunks:
//!
//! ```text
//! event: <tag>\n
//! data: <compact json>
//! \n\n
//! ```
//!
//! No `id:` or `retry:` fields are ever produced. Compact JSON escapes
//! control characters, so the payload never contains a raw newline and a
//! blank line always marks the end of a frame.

use geosse_types::{EventKind, Feature};

/// Prefix of the tag line.
pub const EVENT_PREFIX: &str = "event: ";

/// Prefix of the payload line.
pub const DATA_PREFIX: &str = "data: ";

/// Frame terminator, written as its own chunk.
pub const TERMINATOR: &str = "\n\n";

/// A frame ready to be written to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    kind: EventKind,
    data: String,
}

/// Errors produced while parsing frames back from wire text.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame did not start with an `event:` line.
    #[error("frame is missing the event line")]
    MissingEvent,

    /// The frame had no `data:` line after the event line.
    #[error("frame is missing the data line")]
    MissingData,

    /// The event tag is not a known [`EventKind`].
    #[error(transparent)]
    UnknownKind(#[from] geosse_types::ParseEventKindError),

    /// The payload is not a valid feature.
    #[error("invalid frame payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl SseFrame {
    /// Serialize a record into a frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the record cannot be converted to
    /// JSON.
    pub fn encode(kind: EventKind, record: &Feature) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_string(record)?;
        Ok(Self { kind, data })
    }

    /// The frame's tag.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// The serialized payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The three chunks written for this frame, in order.
    pub fn chunks(&self) -> [String; 3] {
        [
            format!("{EVENT_PREFIX}{}\n", self.kind),
            format!("{DATA_PREFIX}{}", self.data),
            TERMINATOR.to_owned(),
        ]
    }

    /// The whole frame as one string.
    pub fn to_wire(&self) -> String {
        self.chunks().concat()
    }

    /// Parse one frame (with or without its trailing blank line).
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if the text is not a well-formed frame or
    /// its payload is not a feature.
    pub fn parse(text: &str) -> Result<(EventKind, Feature), FrameError> {
        let mut lines = text.trim_end_matches('\n').lines();
        let tag = lines
            .next()
            .and_then(|line| line.strip_prefix(EVENT_PREFIX))
            .ok_or(FrameError::MissingEvent)?;
        let data = lines
            .next()
            .and_then(|line| line.strip_prefix(DATA_PREFIX))
            .ok_or(FrameError::MissingData)?;

        let kind = tag.parse::<EventKind>()?;
        let record = serde_json::from_str(data)?;
        Ok((kind, record))
    }

    /// Parse every complete frame in a chunk of stream text.
    ///
    /// Trailing text after the last blank line is an incomplete frame and
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns the first [`FrameError`] encountered.
    pub fn parse_all(text: &str) -> Result<Vec<(EventKind, Feature)>, FrameError> {
        let mut frames = Vec::new();
        let mut rest = text;
        while let Some((frame, tail)) = rest.split_once(TERMINATOR) {
            frames.push(Self::parse(frame)?);
            rest = tail;
        }
        Ok(frames)
    }
}
