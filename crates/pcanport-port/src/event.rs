use pcanport_frame::Frame;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::ErrorInfo;
use crate::status::StatusSnapshot;

/// Why a port closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called.
    Requested,
    /// The port was dropped while open.
    Dropped,
}

/// Notifications produced by a [`Port`](crate::Port).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// The channel is initialized and filters are programmed.
    Open,
    /// An inbound frame, from the bus or from the loopback echo.
    Data(Frame),
    /// A frame was handed to the controller.
    Write(Frame),
    /// The bus status changed.
    Status(StatusSnapshot),
    /// The port closed. No events follow.
    Close(CloseReason),
    /// An operation failed.
    Error(ErrorInfo),
}

pub(crate) fn event_channel() -> (UnboundedSender<PortEvent>, PortEvents) {
    let (tx, rx) = unbounded_channel();
    (tx, PortEvents { rx })
}

/// Receiving side of a port's event stream.
///
/// The queue is unbounded; the drain path never waits on the consumer. The
/// stream ends after [`PortEvent::Close`].
#[derive(Debug)]
pub struct PortEvents {
    rx: UnboundedReceiver<PortEvent>,
}

impl PortEvents {
    /// Next queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<PortEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. Returns `None` once the port has closed and
    /// every queued event was received.
    pub async fn recv(&mut self) -> Option<PortEvent> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv). Must not be called from
    /// within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<PortEvent> {
        self.rx.blocking_recv()
    }

    /// Every event queued right now.
    pub fn drain(&mut self) -> Vec<PortEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Whether the port side is gone and nothing is left to receive.
    pub fn is_finished(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}

#[cfg(feature = "async")]
impl futures_core::Stream for PortEvents {
    type Item = PortEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<PortEvent>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_queued_events_in_order() {
        let (tx, mut events) = event_channel();
        tx.send(PortEvent::Open).unwrap();
        tx.send(PortEvent::Close(CloseReason::Requested)).unwrap();
        assert_eq!(
            events.drain(),
            vec![PortEvent::Open, PortEvent::Close(CloseReason::Requested)]
        );
        assert!(events.try_recv().is_none());
        assert!(!events.is_finished());
    }

    #[test]
    fn stream_ends_when_sender_dropped() {
        let (tx, mut events) = event_channel();
        tx.send(PortEvent::Open).unwrap();
        drop(tx);
        assert_eq!(events.blocking_recv(), Some(PortEvent::Open));
        assert_eq!(events.blocking_recv(), None);
        assert!(events.is_finished());
    }
}
