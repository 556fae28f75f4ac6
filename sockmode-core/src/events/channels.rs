//! Inbound event channel.
//!
//! The inbound channel is the only resource shared between concurrent
//! producers (the transport and the recovery filter). It has exactly one
//! consumer, the [`Dispatcher`](crate::dispatcher::Dispatcher).

use super::types::Event;
use tokio::sync::mpsc;

/// Default buffer size for the inbound channel.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for inbound events.
pub type EventSender = mpsc::Sender<Event>;
/// Receiver handle for inbound events.
pub type EventReceiver = mpsc::Receiver<Event>;
/// Sender handle that does not keep the channel open.
pub type WeakEventSender = mpsc::WeakSender<Event>;

/// Create the inbound channel.
///
/// Returns a (sender, receiver) pair. Multiple senders can be cloned from
/// the returned sender. A zero buffer is raised to one.
pub fn inbound_channel(buffer: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer.max(1))
}
