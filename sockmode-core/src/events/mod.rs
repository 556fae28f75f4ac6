//! Event model and inbound channel.
//!
//! # Event Flow
//!
//! 1. The transport decodes frames into `Event`s and sends them on the
//!    inbound channel
//! 2. The `Dispatcher` receives them in order and looks up handlers by
//!    `Classifier`
//! 3. Each handler runs as a detached task
//! 4. The recovery filter may send a reconstructed `Event` back into the
//!    inbound channel

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, EventReceiver, EventSender, WeakEventSender, inbound_channel,
};
pub use types::{
    Classifier, Delivery, EnvelopeId, Event, LifecycleEvent, MalformedEnvelope, Payload,
};
