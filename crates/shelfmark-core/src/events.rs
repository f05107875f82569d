//! Fire-and-forget progress notification boundary.
//!
//! Conversion jobs report fractional progress through an [`EventSink`].
//! Delivery is best-effort: a sink failure must never affect the job, so
//! the trait cannot return an error.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::ProgressEvent;

/// Channel name conversion jobs publish their progress on.
pub const PROGRESS_CHANNEL: &str = "notification-progress";

/// Destination for progress reports.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish `event` on the named channel. Fire-and-forget.
    async fn notify(&self, channel: &str, event: ProgressEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn notify(&self, _channel: &str, _event: ProgressEvent) {}
}

/// Sink that forwards events over an in-process channel.
///
/// The transport that pushes events to connected clients consumes the
/// receiving half; tests use it to observe emission order.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(String, ProgressEvent)>,
}

impl ChannelSink {
    /// Create a sink and the receiver observing it.
    #[must_use]
    pub fn unbounded() -> (
        Self,
        mpsc::UnboundedReceiver<(String, ProgressEvent)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn notify(&self, channel: &str, event: ProgressEvent) {
        if self.tx.send((channel.to_string(), event)).is_err() {
            debug!("progress receiver dropped, discarding event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::JobKind;

    #[tokio::test]
    async fn channel_sink_forwards_events_in_order() {
        let (sink, mut rx) = ChannelSink::unbounded();
        sink.notify(
            PROGRESS_CHANNEL,
            ProgressEvent::started(JobKind::BookmarkConversion),
        )
        .await;
        sink.notify(
            PROGRESS_CHANNEL,
            ProgressEvent::ended(JobKind::BookmarkConversion),
        )
        .await;

        let (channel, first) = rx.recv().await.unwrap();
        assert_eq!(channel, PROGRESS_CHANNEL);
        assert_eq!(first.fraction, 0.0);
        let (_, second) = rx.recv().await.unwrap();
        assert_eq!(second.fraction, 1.0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_not_an_error() {
        let (sink, rx) = ChannelSink::unbounded();
        drop(rx);
        // Must not panic or error.
        sink.notify(
            PROGRESS_CHANNEL,
            ProgressEvent::started(JobKind::CoverConversion),
        )
        .await;
    }
}
