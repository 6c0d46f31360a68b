//! The presentation surface notifications are delivered to.

use teleprompter_core::RelayNotification;
use tokio::sync::mpsc;

/// Receives every [`RelayNotification`] the relay produces.
///
/// There is exactly one sink per relay, bound when the coordinator is built.
/// `deliver` is always called from the coordinator's single dispatcher task,
/// one notification at a time and in queue order, so implementations never
/// see concurrent calls.  It must not block for long: a slow sink delays every
/// later notification.
pub trait PresentationSink: Send + Sync + 'static {
    fn deliver(&self, notification: RelayNotification);
}

/// A sink that forwards notifications into a Tokio channel.
///
/// Useful when the presentation surface runs its own event loop.  If the
/// receiver has been dropped, notifications are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RelayNotification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PresentationSink for ChannelSink {
    fn deliver(&self, notification: RelayNotification) {
        // The surface is gone; nothing left to notify.
        let _ = self.tx.send(notification);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
