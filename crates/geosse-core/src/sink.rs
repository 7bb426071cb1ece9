//! Output sinks that stream frames to a client.
//!
//! The writer only needs ordered, flush-on-write delivery of string chunks
//! and a clear signal when the other end has gone away. [`OutputSink`]
//! captures exactly that; [`ChannelSink`] implements it over a bounded
//! tokio channel whose receiver becomes the HTTP response body.

use std::future::Future;

use tokio::sync::mpsc;

/// The receiving side of the sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("output sink closed")]
pub struct SinkClosed;

/// Destination for the chunks of a stream.
///
/// Each call delivers one chunk, in call order. A chunk must be handed on
/// as soon as it is written; implementations do not coalesce writes.
pub trait OutputSink: Send {
    /// Deliver one chunk.
    ///
    /// Resolves to [`SinkClosed`] once the consumer is gone; later writes
    /// keep failing the same way.
    fn write(&mut self, chunk: String) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

/// Sink backed by a bounded [`mpsc`] channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    pub const fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver that drains it.
    ///
    /// `capacity` bounds how many chunks may wait for a slow reader before
    /// writes start waiting. A capacity of zero is raised to one.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// A future that resolves once the receiver has been dropped.
    ///
    /// The future holds its own sender handle; drop it when it is no
    /// longer needed so the receiver can observe end-of-stream.
    pub fn disconnected(&self) -> impl Future<Output = ()> + Send + 'static {
        let tx = self.tx.clone();
        async move { tx.closed().await }
    }
}

impl OutputSink for ChannelSink {
    async fn write(&mut self, chunk: String) -> Result<(), SinkClosed> {
        self.tx.send(chunk).await.map_err(|_closed| SinkClosed)
    }
}
