//! Malformed envelope recovery.
//!
//! Some `events_api` envelopes (notably `app_home_opened` for a Home tab
//! that has never held inputs) serialize the view state as
//! `"state":{"values":[]}` instead of `"state":{"values":{}}`. Typed
//! parsing rejects them, so the transport reports them as
//! [`Classifier::MalformedEnvelope`] with the raw frame attached.
//!
//! [`attempt_recover`] patches the first occurrence of that exact token,
//! re-parses the frame and rebuilds a regular Events API [`Event`]. The
//! patch is deliberately narrow: a frame without the token, or one that
//! still fails to parse after patching, is not recoverable. Recovery is
//! one-shot; a failed frame is logged and dropped.

use async_trait::async_trait;
use serde::Deserialize;
use sockmode_sdk::objects::{ParseError, ParseOptions, parse_events_api};
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{Classifier, Delivery, EnvelopeId, Event, EventSender, WeakEventSender};
use crate::registry::{Handler, HandlerResult};
use crate::responder::Responder;

/// The malformed sub-structure.
pub const DEFECT_TOKEN: &[u8] = br#""state":{"values":[]}"#;
/// Its well-formed replacement.
pub const REPAIRED_TOKEN: &[u8] = br#""state":{"values":{}}"#;

/// Why an event could not be recovered.
#[derive(Debug, Error)]
pub enum RecoveryFailure {
    #[error("event is not a malformed envelope")]
    NotMalformed,

    #[error("malformed envelope carries no raw bytes")]
    MissingRaw,

    #[error("raw envelope does not contain the known defect")]
    DefectAbsent,

    #[error("patched envelope is still invalid: {0}")]
    Reparse(#[source] serde_json::Error),

    #[error("patched payload is not a valid event: {0}")]
    InnerParse(#[from] ParseError),
}

/// The part of an envelope needed to rebuild the event.
#[derive(Debug, Deserialize)]
struct RecoveredEnvelope {
    envelope_id: EnvelopeId,
    payload: serde_json::Value,
    #[serde(default)]
    accepts_response_payload: bool,
    #[serde(default)]
    retry_attempt: Option<u32>,
    #[serde(default)]
    retry_reason: Option<String>,
}

/// Replace the first occurrence of [`DEFECT_TOKEN`].
///
/// Returns `None` if the token does not occur.
pub fn patch_first_defect(raw: &[u8]) -> Option<Vec<u8>> {
    let at = raw
        .windows(DEFECT_TOKEN.len())
        .position(|window| window == DEFECT_TOKEN)?;

    let mut patched = Vec::with_capacity(raw.len() - DEFECT_TOKEN.len() + REPAIRED_TOKEN.len());
    patched.extend_from_slice(&raw[..at]);
    patched.extend_from_slice(REPAIRED_TOKEN);
    patched.extend_from_slice(&raw[at + DEFECT_TOKEN.len()..]);
    Some(patched)
}

/// Rebuild a malformed envelope as a regular Events API event.
///
/// The inner payload is parsed without verification token checks: the
/// frame was already accepted by the transport once. The result is built
/// through [`Event::events_api`], so it can never be classified as
/// malformed again.
pub fn attempt_recover(event: &Event) -> Result<Event, RecoveryFailure> {
    if event.classifier() != &Classifier::MalformedEnvelope {
        return Err(RecoveryFailure::NotMalformed);
    }

    let raw = event
        .raw()
        .filter(|raw| !raw.is_empty())
        .ok_or(RecoveryFailure::MissingRaw)?;

    let patched = patch_first_defect(raw).ok_or(RecoveryFailure::DefectAbsent)?;

    let envelope: RecoveredEnvelope =
        serde_json::from_slice(&patched).map_err(RecoveryFailure::Reparse)?;

    let payload = parse_events_api(envelope.payload, &ParseOptions::no_verify_token())?;

    let delivery = Delivery {
        retry_attempt: envelope.retry_attempt,
        retry_reason: envelope.retry_reason.filter(|r| !r.is_empty()),
        accepts_response_payload: envelope.accepts_response_payload,
    };
    Ok(Event::events_api(Some(envelope.envelope_id), payload).with_delivery(delivery))
}

/// Handler for [`Classifier::MalformedEnvelope`] that re-injects recovered
/// events into the inbound channel.
///
/// Holds a weak sender so it never keeps the inbound channel open by
/// itself.
pub struct RecoveryFilter {
    inbound: WeakEventSender,
}

impl RecoveryFilter {
    pub fn new(inbound: &EventSender) -> Self {
        Self {
            inbound: inbound.downgrade(),
        }
    }
}

#[async_trait]
impl Handler for RecoveryFilter {
    async fn handle(&self, event: Event, _responder: Responder) -> HandlerResult {
        warn!(
            envelope_id = ?event.correlation().map(|c| c.as_str()),
            detail = ?event.malformed_payload().map(|m| m.detail.as_str()),
            "Attempting to recover malformed envelope"
        );

        let recovered = match attempt_recover(&event) {
            Ok(recovered) => recovered,
            Err(e) => {
                warn!(error = %e, "Malformed envelope is not recoverable, dropping");
                return Ok(());
            }
        };

        let Some(inbound) = self.inbound.upgrade() else {
            warn!("Inbound channel closed, dropping recovered event");
            return Ok(());
        };

        info!(
            classifier = %recovered.classifier(),
            envelope_id = ?recovered.correlation().map(|c| c.as_str()),
            "Re-injecting recovered event"
        );
        if inbound.send(recovered).await.is_err() {
            warn!("Inbound channel closed, dropping recovered event");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recovery_filter"
    }
}
