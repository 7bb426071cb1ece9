//! The stream writer: one paced, cancellable emit loop per connection.
//!
//! A [`StreamSession`] walks its catalog in order, writes each entry as one
//! SSE frame, then pauses for the configured delay before the next frame.
//! After the last entry it wraps around to the first, forever. The pause
//! after the last entry of a pass is the same as every other pause.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --run()--> Streaming --(cancel | sink closed | error)--> Terminated
//! ```
//!
//! [`Terminated`](SessionState::Terminated) is absorbing: a session that
//! has stopped can never stream again. A reconnecting client gets a brand
//! new session that starts from the first catalog entry.
//!
//! # Cancellation
//!
//! The cancellation token is checked before every write and raced against
//! every pause, so a cancelled session writes nothing further and exits
//! without waiting out the remaining delay. A cancel raised in the middle of
//! a frame leaves that frame unterminated; SSE clients discard it, and it is
//! not counted in `frames_sent`.

use std::time::Duration;

use geosse_types::SessionId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::EventCatalog;
use crate::frame::SseFrame;
use crate::sink::{OutputSink, SinkClosed};

/// Errors that end (or prevent) a stream session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The catalog has no entries, so there is nothing to emit.
    #[error("event catalog is empty")]
    EmptyCatalog,

    /// The delay between frames must be greater than zero.
    #[error("frame delay must be positive")]
    InvalidDelay,

    /// The client went away (or the transport failed) mid-stream.
    #[error("output sink closed after {frames_sent} frames")]
    SinkClosed {
        /// Complete frames delivered before the sink closed.
        frames_sent: u64,
    },

    /// A record could not be serialized into a frame.
    #[error("failed to serialize event record: {source}")]
    Serialization {
        /// The underlying serializer error.
        #[from]
        source: serde_json::Error,
    },

    /// The session already ran to completion and cannot stream again.
    #[error("stream session already terminated")]
    Terminated,
}

/// Lifecycle state of a [`StreamSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Validated and waiting to start.
    Idle,
    /// Emitting frames or pausing between them.
    Streaming,
    /// Stopped for good.
    Terminated,
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The cancellation token was raised.
    Cancelled,
}

/// Outcome of a session that stopped because it was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// The session that ended.
    pub session_id: SessionId,
    /// Complete frames written.
    pub frames_sent: u64,
    /// Why the session ended.
    pub end: SessionEnd,
}

/// Per-connection stream state.
///
/// Owns the sink it writes to and its own position in the catalog; no
/// other session or task reaches into it.
#[derive(Debug)]
pub struct StreamSession<S> {
    id: SessionId,
    catalog: EventCatalog,
    sink: S,
    delay: Duration,
    cursor: usize,
    frames_sent: u64,
    state: SessionState,
}

impl<S: OutputSink> StreamSession<S> {
    /// Validate the inputs and create an idle session.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::EmptyCatalog`] for an empty catalog and
    /// [`StreamError::InvalidDelay`] for a zero delay. Nothing is written
    /// to the sink in either case.
    pub fn open(catalog: EventCatalog, sink: S, delay: Duration) -> Result<Self, StreamError> {
        if catalog.is_empty() {
            return Err(StreamError::EmptyCatalog);
        }
        if delay.is_zero() {
            return Err(StreamError::InvalidDelay);
        }
        Ok(Self {
            id: SessionId::new(),
            catalog,
            sink,
            delay,
            cursor: 0,
            frames_sent: 0,
            state: SessionState::Idle,
        })
    }

    /// Use a caller-chosen session id (for log correlation).
    #[must_use]
    pub const fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    /// The session id.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Index of the catalog entry the next frame will carry.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Complete frames written so far.
    pub const fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Stream until cancelled or until the sink closes.
    ///
    /// Never returns while the stream is healthy: the only `Ok` outcome is
    /// cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::SinkClosed`] when a write fails,
    /// [`StreamError::Serialization`] when a record cannot be framed, and
    /// [`StreamError::Terminated`] when called on a session that already
    /// stopped.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<SessionSummary, StreamError> {
        if self.state == SessionState::Terminated {
            return Err(StreamError::Terminated);
        }

        self.state = SessionState::Streaming;
        info!(
            session_id = %self.id,
            entries = self.catalog.len(),
            delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
            "Stream session started"
        );

        let result = self.stream(cancel).await;
        self.state = SessionState::Terminated;

        match &result {
            Ok(summary) => info!(
                session_id = %self.id,
                frames_sent = summary.frames_sent,
                "Stream session cancelled"
            ),
            Err(StreamError::SinkClosed { frames_sent }) => debug!(
                session_id = %self.id,
                frames_sent,
                "Client disconnected, stream session closed"
            ),
            Err(e) => warn!(
                session_id = %self.id,
                frames_sent = self.frames_sent,
                error = %e,
                "Stream session failed"
            ),
        }

        result
    }

    async fn stream(&mut self, cancel: &CancellationToken) -> Result<SessionSummary, StreamError> {
        loop {
            if !self.emit_next(cancel).await? {
                return Ok(self.summary());
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(self.summary()),
                () = tokio::time::sleep(self.delay) => {}
            }
        }
    }

    /// Write the frame at the cursor and advance the cursor, wrapping to
    /// the start after the last entry.
    ///
    /// Returns `false` without advancing if `cancel` is raised before any
    /// of the frame's writes.
    async fn emit_next(&mut self, cancel: &CancellationToken) -> Result<bool, StreamError> {
        let entry = self
            .catalog
            .get(self.cursor)
            .ok_or(StreamError::EmptyCatalog)?;
        let frame = SseFrame::encode(entry.kind, &entry.record)?;

        for chunk in frame.chunks() {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            self.sink
                .write(chunk)
                .await
                .map_err(|SinkClosed| StreamError::SinkClosed {
                    frames_sent: self.frames_sent,
                })?;
        }

        self.frames_sent = self.frames_sent.saturating_add(1);
        let next = self.cursor.saturating_add(1);
        self.cursor = if next >= self.catalog.len() { 0 } else { next };

        debug!(
            session_id = %self.id,
            kind = %frame.kind(),
            frames_sent = self.frames_sent,
            "Frame emitted"
        );
        Ok(true)
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            frames_sent: self.frames_sent,
            end: SessionEnd::Cancelled,
        }
    }
}

/// Open a session over `sink` and stream `catalog` until cancelled.
///
/// Frames are spaced by `delay`; the first frame is written immediately.
///
/// # Errors
///
/// See [`StreamSession::open`] and [`StreamSession::run`].
pub async fn run<S: OutputSink>(
    catalog: EventCatalog,
    sink: S,
    delay: Duration,
    cancel: CancellationToken,
) -> Result<SessionSummary, StreamError> {
    let mut session = StreamSession::open(catalog, sink, delay)?;
    session.run(&cancel).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use geosse_types::{EventKind, Feature};
    use tokio::time::Instant;

    use super::*;
    use crate::catalog::{CatalogEntry, build_catalog};

    /// Records every chunk with the (paused-clock) time it was written.
    /// Optionally cancels a token once a given number of chunks exist.
    #[derive(Clone, Default)]
    struct RecordingSink {
        chunks: Arc<Mutex<Vec<(Instant, String)>>>,
        stop: Option<(CancellationToken, usize)>,
    }

    impl RecordingSink {
        fn stopping_after(frames: usize, token: CancellationToken) -> Self {
            Self::stopping_after_chunks(frames * 3, token)
        }

        fn stopping_after_chunks(chunks: usize, token: CancellationToken) -> Self {
            Self {
                chunks: Arc::default(),
                stop: Some((token, chunks)),
            }
        }

        fn chunk_count(&self) -> usize {
            self.chunks.lock().unwrap().len()
        }

        fn text(&self) -> String {
            self.chunks
                .lock()
                .unwrap()
                .iter()
                .map(|(_, chunk)| chunk.as_str())
                .collect()
        }

        fn frame_starts(&self) -> Vec<Instant> {
            self.chunks
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, chunk)| chunk.starts_with("event: "))
                .map(|(at, _)| *at)
                .collect()
        }

        fn kinds(&self) -> Vec<EventKind> {
            SseFrame::parse_all(&self.text())
                .unwrap()
                .into_iter()
                .map(|(kind, _)| kind)
                .collect()
        }
    }

    impl OutputSink for RecordingSink {
        async fn write(&mut self, chunk: String) -> Result<(), SinkClosed> {
            let mut chunks = self.chunks.lock().unwrap();
            chunks.push((Instant::now(), chunk));
            if let Some((token, limit)) = &self.stop {
                if chunks.len() >= *limit {
                    token.cancel();
                }
            }
            Ok(())
        }
    }

    /// Accepts `remaining` chunks, then reports the client as gone.
    struct ClosingSink {
        remaining: usize,
    }

    impl OutputSink for ClosingSink {
        async fn write(&mut self, _chunk: String) -> Result<(), SinkClosed> {
            if self.remaining == 0 {
                return Err(SinkClosed);
            }
            self.remaining -= 1;
            Ok(())
        }
    }

    fn scenario_catalog() -> EventCatalog {
        let a = Feature::point(1, -77.0369, 38.9072);
        let b = Feature::point(1, -118.2437, 34.0522);
        EventCatalog::from_entries(vec![
            CatalogEntry::new(EventKind::Create, a),
            CatalogEntry::new(EventKind::Update, b.clone()),
            CatalogEntry::new(EventKind::Delete, b),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_at_twelve_seconds_emits_three_frames() {
        let sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            scenario_catalog(),
            sink.clone(),
            Duration::from_secs(5),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.frames_sent, 3);
        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert_eq!(
            sink.kinds(),
            vec![EventKind::Create, EventKind::Update, EventKind::Delete]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_frame_repeats_first_entry() {
        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after(4, cancel.clone());

        let summary = run(scenario_catalog(), sink.clone(), Duration::from_secs(5), cancel)
            .await
            .unwrap();

        assert_eq!(summary.frames_sent, 4);
        assert_eq!(
            sink.kinds(),
            vec![
                EventKind::Create,
                EventKind::Update,
                EventKind::Delete,
                EventKind::Create,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tags_follow_cyclic_repetition() {
        let catalog = scenario_catalog();
        let expected: Vec<EventKind> = catalog.kinds().into_iter().cycle().take(11).collect();

        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after(11, cancel.clone());
        let summary = run(catalog, sink.clone(), Duration::from_millis(250), cancel)
            .await
            .unwrap();

        assert_eq!(summary.frames_sent, 11);
        assert_eq!(sink.kinds(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_spaced_by_the_delay() {
        let delay = Duration::from_secs(5);
        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after(6, cancel.clone());
        let started = Instant::now();

        run(scenario_catalog(), sink.clone(), delay, cancel).await.unwrap();

        let starts = sink.frame_starts();
        assert_eq!(starts.len(), 6);
        assert_eq!(starts.first().copied().unwrap(), started);
        for pair in starts.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= delay, "gap {gap:?} shorter than {delay:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn emitted_payloads_round_trip_to_catalog_records() {
        let catalog = build_catalog();
        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after(6, cancel.clone());

        run(catalog.clone(), sink.clone(), Duration::from_secs(1), cancel)
            .await
            .unwrap();

        let frames = SseFrame::parse_all(&sink.text()).unwrap();
        assert_eq!(frames.len(), 6);
        for (i, (kind, record)) in frames.iter().enumerate() {
            let entry = catalog.get(i % catalog.len()).unwrap();
            assert_eq!(*kind, entry.kind);
            assert_eq!(record, &entry.record);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_pause_exits_without_waiting() {
        let sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let handle = tokio::spawn(run(
            scenario_catalog(),
            sink.clone(),
            Duration::from_secs(60),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.frames_sent, 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_frame_stops_remaining_writes() {
        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after_chunks(1, cancel.clone());

        let summary = run(build_catalog(), sink.clone(), Duration::from_secs(5), cancel)
            .await
            .unwrap();

        assert_eq!(sink.chunk_count(), 1);
        assert_eq!(sink.text(), "event: create\n");
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(summary.end, SessionEnd::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_terminator_leaves_frame_uncounted() {
        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after_chunks(5, cancel.clone());

        let summary = run(build_catalog(), sink.clone(), Duration::from_secs(5), cancel)
            .await
            .unwrap();

        assert_eq!(sink.chunk_count(), 5);
        assert_eq!(summary.frames_sent, 1);
        assert_eq!(sink.kinds(), vec![EventKind::Create]);
    }

    #[tokio::test]
    async fn pre_cancelled_session_writes_nothing() {
        let sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run(scenario_catalog(), sink.clone(), Duration::from_secs(5), cancel)
            .await
            .unwrap();

        assert_eq!(summary.frames_sent, 0);
        assert!(sink.text().is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_is_rejected_before_any_write() {
        let sink = RecordingSink::default();
        let result = run(
            EventCatalog::from_entries(Vec::new()),
            sink.clone(),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(StreamError::EmptyCatalog)));
        assert!(sink.text().is_empty());
    }

    #[tokio::test]
    async fn zero_delay_is_rejected() {
        let result = StreamSession::open(scenario_catalog(), RecordingSink::default(), Duration::ZERO);
        assert!(matches!(result, Err(StreamError::InvalidDelay)));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_sink_ends_session_without_retry() {
        // One full frame, then the first chunk of the second frame fails.
        let sink = ClosingSink { remaining: 3 };
        let result = run(
            scenario_catalog(),
            sink,
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(StreamError::SinkClosed { frames_sent: 1 })));
    }

    #[tokio::test(start_paused = true)]
    async fn terminated_session_cannot_restart() {
        let cancel = CancellationToken::new();
        let sink = RecordingSink::stopping_after(2, cancel.clone());
        let mut session =
            StreamSession::open(scenario_catalog(), sink.clone(), Duration::from_secs(1)).unwrap();
        assert_eq!(session.state(), SessionState::Idle);

        session.run(&cancel).await.unwrap();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.frames_sent(), 2);
        assert_eq!(session.cursor(), 2);

        let again = session.run(&CancellationToken::new()).await;
        assert!(matches!(again, Err(StreamError::Terminated)));
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(sink.kinds().len(), 2);
    }

    #[tokio::test]
    async fn with_id_overrides_generated_id() {
        let id = SessionId::new();
        let session = StreamSession::open(scenario_catalog(), RecordingSink::default(), Duration::from_secs(1))
            .unwrap()
            .with_id(id);
        assert_eq!(session.id(), id);
    }

    #[tokio::test]
    async fn sessions_stream_independently() {
        let first_cancel = CancellationToken::new();
        let second_cancel = CancellationToken::new();
        let first = RecordingSink::stopping_after(2, first_cancel.clone());
        let second = RecordingSink::stopping_after(5, second_cancel.clone());

        let (a, b) = tokio::join!(
            run(scenario_catalog(), first.clone(), Duration::from_millis(5), first_cancel),
            run(scenario_catalog(), second.clone(), Duration::from_millis(5), second_cancel),
        );

        assert_eq!(a.unwrap().frames_sent, 2);
        assert_eq!(b.unwrap().frames_sent, 5);
        assert_eq!(second.kinds().first(), Some(&EventKind::Create));
    }
}
