//! Socket Mode envelope framing.
//!
//! Every frame received over the socket is a JSON object with a `"type"`
//! field. Frames that carry work (`events_api`, `interactive`,
//! `slash_commands`) also carry an `envelope_id` that must be echoed back
//! in an [`Ack`] so the server stops retransmitting:
//!
//! ```json
//! {"envelope_id":"1d3c...","type":"events_api","payload":{ ... },
//!  "accepts_response_payload":false,"retry_attempt":0,"retry_reason":""}
//! ```
//!
//! The payload is kept as an untyped [`serde_json::Value`] here; typed
//! parsing happens one step later so that a payload which fails
//! validation can still be reported together with its envelope.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Known envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeType {
    Hello,
    Disconnect,
    EventsApi,
    Interactive,
    SlashCommands,
    Unknown,
}

impl EnvelopeType {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "hello" => EnvelopeType::Hello,
            "disconnect" => EnvelopeType::Disconnect,
            "events_api" => EnvelopeType::EventsApi,
            "interactive" => EnvelopeType::Interactive,
            "slash_commands" => EnvelopeType::SlashCommands,
            _ => EnvelopeType::Unknown,
        }
    }
}

/// A raw frame as received from the socket.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    /// The frame kind, kept verbatim so unknown kinds can still be reported.
    #[serde(rename = "type")]
    pub kind: CompactString,
    #[serde(default)]
    pub envelope_id: Option<CompactString>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub accepts_response_payload: bool,
    #[serde(default)]
    pub retry_attempt: Option<u32>,
    #[serde(default)]
    pub retry_reason: Option<String>,
    /// Set on `disconnect` frames (`warning`, `refresh_requested`, ...).
    #[serde(default)]
    pub reason: Option<String>,
    /// Set on `hello` frames.
    #[serde(default)]
    pub num_connections: Option<u32>,
}

impl SocketEnvelope {
    pub fn envelope_type(&self) -> EnvelopeType {
        EnvelopeType::from_kind(&self.kind)
    }
}

/// Acknowledgement written back over the socket.
///
/// `payload` is only honoured by the server for envelopes that were sent
/// with `accepts_response_payload: true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
    pub envelope_id: CompactString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Ack {
    pub fn new(envelope_id: impl Into<CompactString>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_frame() {
        let frame = r#"{"type":"hello","num_connections":1,"connection_info":{"app_id":"A1"}}"#;
        let envelope: SocketEnvelope = serde_json::from_str(frame).unwrap();
        assert_eq!(envelope.envelope_type(), EnvelopeType::Hello);
        assert_eq!(envelope.num_connections, Some(1));
        assert!(envelope.envelope_id.is_none());
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let envelope: SocketEnvelope =
            serde_json::from_str(r#"{"type":"workflow_step","envelope_id":"e1"}"#).unwrap();
        assert_eq!(envelope.envelope_type(), EnvelopeType::Unknown);
        assert_eq!(envelope.kind, "workflow_step");
    }

    #[test]
    fn test_ack_serialization() {
        let ack = Ack::new("env-1");
        assert_eq!(
            serde_json::to_string(&ack).unwrap(),
            r#"{"envelope_id":"env-1"}"#
        );

        let ack = Ack::new("env-2").with_payload(serde_json::json!({"text": "ok"}));
        assert_eq!(
            serde_json::to_string(&ack).unwrap(),
            r#"{"envelope_id":"env-2","payload":{"text":"ok"}}"#
        );
    }
}
