//! Event type definitions.
//!
//! An [`Event`] is built once at the transport boundary and never mutated
//! afterwards. Its [`Classifier`] is derived from the [`Payload`] variant by
//! the constructor, so the dispatch key always agrees with the payload
//! shape and handlers never need to probe the payload type.

use bytes::Bytes;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use sockmode_sdk::objects::{
    EventsApiPayload, InteractionCallback, InteractionType, SlashCommand, SocketEnvelope,
};
use std::sync::Arc;

/// Envelope id echoed back to acknowledge an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvelopeId(CompactString);

impl EnvelopeId {
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvelopeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<CompactString> for EnvelopeId {
    fn from(id: CompactString) -> Self {
        Self(id)
    }
}

/// Dispatch key of an event. Lookup is by exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// The connection loop is (re)connecting.
    Connecting,
    /// A WebSocket was established.
    Connected,
    /// Connecting or reading failed.
    ConnectionError,
    /// The server greeted a new connection.
    Hello,
    /// The server asked the client to reconnect.
    Disconnect,
    /// An Events API callback, keyed by inner event type (`app_home_opened`),
    /// or by outer type for non-callback payloads (`url_verification`).
    EventsApi(CompactString),
    /// An interaction without a more specific key.
    Interaction(InteractionType),
    /// A `block_actions` interaction, keyed by its first action id.
    BlockAction(CompactString),
    /// A slash command, keyed by the command including its slash.
    SlashCommand(CompactString),
    /// An envelope kind this crate does not model.
    Unsupported(CompactString),
    /// A frame whose payload failed typed validation.
    MalformedEnvelope,
}

impl Classifier {
    pub fn events_api(kind: &str) -> Self {
        Classifier::EventsApi(CompactString::from(kind))
    }

    pub fn block_action(action_id: &str) -> Self {
        Classifier::BlockAction(CompactString::from(action_id))
    }

    pub fn slash_command(command: &str) -> Self {
        Classifier::SlashCommand(CompactString::from(command))
    }
}

impl std::fmt::Display for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classifier::Connecting => write!(f, "connecting"),
            Classifier::Connected => write!(f, "connected"),
            Classifier::ConnectionError => write!(f, "connection_error"),
            Classifier::Hello => write!(f, "hello"),
            Classifier::Disconnect => write!(f, "disconnect"),
            Classifier::EventsApi(kind) => write!(f, "events_api:{kind}"),
            Classifier::Interaction(kind) => write!(f, "interactive:{kind}"),
            Classifier::BlockAction(action_id) => write!(f, "block_action:{action_id}"),
            Classifier::SlashCommand(command) => write!(f, "slash_command:{command}"),
            Classifier::Unsupported(kind) => write!(f, "unsupported:{kind}"),
            Classifier::MalformedEnvelope => write!(f, "malformed_envelope"),
        }
    }
}

/// Connection lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting { attempt: u32 },
    Connected,
    ConnectionError { detail: String },
    Hello { num_connections: Option<u32> },
    Disconnect { reason: Option<String> },
}

/// A frame that could not be parsed into a typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEnvelope {
    /// The complete frame as received.
    pub raw: Bytes,
    /// The parser's error message.
    pub detail: String,
}

/// Event payload, one variant per wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Lifecycle(LifecycleEvent),
    EventsApi(EventsApiPayload),
    Interaction(InteractionCallback),
    SlashCommand(SlashCommand),
    Unsupported {
        kind: CompactString,
        body: serde_json::Value,
    },
    Malformed(MalformedEnvelope),
}

/// Delivery metadata copied from the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub retry_attempt: Option<u32>,
    pub retry_reason: Option<String>,
    pub accepts_response_payload: bool,
}

impl From<&SocketEnvelope> for Delivery {
    fn from(envelope: &SocketEnvelope) -> Self {
        Self {
            retry_attempt: envelope.retry_attempt,
            retry_reason: envelope.retry_reason.clone().filter(|r| !r.is_empty()),
            accepts_response_payload: envelope.accepts_response_payload,
        }
    }
}

/// The unit of work flowing from the transport to the handlers.
///
/// Cloning is cheap: the payload is shared, so every handler of an event
/// observes the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    classifier: Classifier,
    payload: Arc<Payload>,
    correlation: Option<EnvelopeId>,
    delivery: Delivery,
}

impl Event {
    fn new(classifier: Classifier, payload: Payload, correlation: Option<EnvelopeId>) -> Self {
        Self {
            classifier,
            payload: Arc::new(payload),
            correlation,
            delivery: Delivery::default(),
        }
    }

    /// A connection lifecycle event. These carry no envelope id.
    pub fn lifecycle(event: LifecycleEvent) -> Self {
        let classifier = match &event {
            LifecycleEvent::Connecting { .. } => Classifier::Connecting,
            LifecycleEvent::Connected => Classifier::Connected,
            LifecycleEvent::ConnectionError { .. } => Classifier::ConnectionError,
            LifecycleEvent::Hello { .. } => Classifier::Hello,
            LifecycleEvent::Disconnect { .. } => Classifier::Disconnect,
        };
        Self::new(classifier, Payload::Lifecycle(event), None)
    }

    /// An Events API event. Never classified as malformed.
    pub fn events_api(correlation: Option<EnvelopeId>, payload: EventsApiPayload) -> Self {
        let classifier = Classifier::events_api(payload.kind());
        Self::new(classifier, Payload::EventsApi(payload), correlation)
    }

    pub fn interaction(correlation: Option<EnvelopeId>, callback: InteractionCallback) -> Self {
        let classifier = match (callback.kind, callback.actions.first()) {
            (InteractionType::BlockActions, Some(action)) => {
                Classifier::BlockAction(action.action_id.clone())
            }
            (kind, _) => Classifier::Interaction(kind),
        };
        Self::new(classifier, Payload::Interaction(callback), correlation)
    }

    pub fn slash_command(correlation: Option<EnvelopeId>, command: SlashCommand) -> Self {
        let classifier = Classifier::SlashCommand(command.command.clone());
        Self::new(classifier, Payload::SlashCommand(command), correlation)
    }

    pub fn unsupported(
        correlation: Option<EnvelopeId>,
        kind: CompactString,
        body: serde_json::Value,
    ) -> Self {
        let classifier = Classifier::Unsupported(kind.clone());
        Self::new(classifier, Payload::Unsupported { kind, body }, correlation)
    }

    /// The only constructor producing [`Classifier::MalformedEnvelope`].
    pub fn malformed(correlation: Option<EnvelopeId>, raw: Bytes, detail: impl Into<String>) -> Self {
        let payload = Payload::Malformed(MalformedEnvelope {
            raw,
            detail: detail.into(),
        });
        Self::new(Classifier::MalformedEnvelope, payload, correlation)
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn correlation(&self) -> Option<&EnvelopeId> {
        self.correlation.as_ref()
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Original frame bytes, for malformed events only.
    pub fn raw(&self) -> Option<&Bytes> {
        self.malformed_payload().map(|m| &m.raw)
    }

    pub fn malformed_payload(&self) -> Option<&MalformedEnvelope> {
        match self.payload() {
            Payload::Malformed(malformed) => Some(malformed),
            _ => None,
        }
    }

    pub fn events_api_payload(&self) -> Option<&EventsApiPayload> {
        match self.payload() {
            Payload::EventsApi(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn interaction_payload(&self) -> Option<&InteractionCallback> {
        match self.payload() {
            Payload::Interaction(callback) => Some(callback),
            _ => None,
        }
    }

    pub fn slash_command_payload(&self) -> Option<&SlashCommand> {
        match self.payload() {
            Payload::SlashCommand(command) => Some(command),
            _ => None,
        }
    }

    /// Whether two events share one payload allocation.
    pub fn shares_payload(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}
