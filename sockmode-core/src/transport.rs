//! Frame decoding at the transport boundary.
//!
//! [`decode_frame`] turns one raw socket frame into an [`Event`]. Frames
//! that fail typed validation become [`Classifier::MalformedEnvelope`]
//! events carrying the complete frame, so a recovery handler can inspect
//! the original bytes.
//!
//! [`Classifier::MalformedEnvelope`]: crate::events::Classifier::MalformedEnvelope

use bytes::Bytes;
use sockmode_sdk::objects::{
    EnvelopeType, InteractionCallback, ParseError, ParseOptions, SlashCommand, SocketEnvelope,
    parse_events_api,
};
use thiserror::Error;

use crate::events::{Delivery, EnvelopeId, Event, LifecycleEvent};

/// Settings for [`decode_frame`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// If set, Events API payloads must carry this verification token.
    pub verification_token: Option<String>,
}

impl DecodeOptions {
    fn parse_options(&self) -> ParseOptions {
        match &self.verification_token {
            Some(token) => ParseOptions::verify_token(token.clone()),
            None => ParseOptions::no_verify_token(),
        }
    }
}

/// Frames that are rejected instead of being turned into events.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("verification token mismatch on envelope {0:?}")]
    TokenMismatch(Option<EnvelopeId>),
}

/// Decode a raw frame into an event.
pub fn decode_frame(raw: Bytes, options: &DecodeOptions) -> Result<Event, FrameError> {
    let envelope: SocketEnvelope = match serde_json::from_slice(&raw) {
        Ok(envelope) => envelope,
        Err(e) => return Ok(Event::malformed(None, raw, e.to_string())),
    };

    let correlation = envelope.envelope_id.clone().map(EnvelopeId::from);
    let delivery = Delivery::from(&envelope);
    let body = envelope.payload.clone().unwrap_or_default();

    let event = match envelope.envelope_type() {
        EnvelopeType::Hello => Event::lifecycle(LifecycleEvent::Hello {
            num_connections: envelope.num_connections,
        }),
        EnvelopeType::Disconnect => Event::lifecycle(LifecycleEvent::Disconnect {
            reason: envelope.reason.clone(),
        }),
        EnvelopeType::EventsApi => match parse_events_api(body, &options.parse_options()) {
            Ok(payload) => Event::events_api(correlation, payload),
            Err(ParseError::TokenMismatch) => return Err(FrameError::TokenMismatch(correlation)),
            Err(ParseError::Json(e)) => Event::malformed(correlation, raw, e.to_string()),
        },
        EnvelopeType::Interactive => match serde_json::from_value::<InteractionCallback>(body) {
            Ok(callback) => Event::interaction(correlation, callback),
            Err(e) => Event::malformed(correlation, raw, e.to_string()),
        },
        EnvelopeType::SlashCommands => match serde_json::from_value::<SlashCommand>(body) {
            Ok(command) => Event::slash_command(correlation, command),
            Err(e) => Event::malformed(correlation, raw, e.to_string()),
        },
        EnvelopeType::Unknown => Event::unsupported(correlation, envelope.kind, body),
    };

    Ok(event.with_delivery(delivery))
}
