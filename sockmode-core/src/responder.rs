//! Acknowledge and publish capability handed to every handler.
//!
//! The transport and the outbound API are external collaborators behind
//! [`ResponderBackend`]. The [`Responder`] wraps a backend for a single
//! handler invocation and makes acknowledgement idempotent across all
//! handlers launched for the same event.

use async_trait::async_trait;
use compact_str::CompactString;
use sockmode_sdk::objects::Ack;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

use crate::events::EnvelopeId;

/// Errors surfaced to handlers by the [`Responder`].
#[derive(Debug, Error)]
pub enum ResponderError {
    /// The event carries no envelope id.
    #[error("event has no envelope id to acknowledge")]
    MissingCorrelation,

    /// A response payload was given after the event was already acknowledged.
    #[error("envelope {0} was already acknowledged")]
    AlreadyAcknowledged(EnvelopeId),

    /// The transport could not deliver the acknowledgement.
    #[error("acknowledgement failed: {0}")]
    Acknowledge(String),

    /// The outbound call failed.
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Where [`Responder::publish`] delivers content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    /// Replace a user's Home tab.
    HomeTab { user_id: CompactString },
    /// Open a modal for an interaction trigger.
    Modal { trigger_id: String },
    /// Post a message to a channel.
    Message { channel_id: CompactString },
    /// Post a message only one user can see.
    Ephemeral {
        channel_id: CompactString,
        user_id: CompactString,
    },
    /// Edit a previously posted message.
    Update {
        channel_id: CompactString,
        ts: CompactString,
    },
}

/// The outbound side of the system, implemented outside the core.
#[async_trait]
pub trait ResponderBackend: Send + Sync + 'static {
    /// Deliver an acknowledgement to the transport.
    async fn acknowledge(&self, ack: Ack) -> Result<(), ResponderError>;

    /// Perform an outbound call and return its response body.
    async fn publish(
        &self,
        target: PublishTarget,
        content: serde_json::Value,
    ) -> Result<serde_json::Value, ResponderError>;
}

/// Per-invocation handle to the [`ResponderBackend`].
#[derive(Clone)]
pub struct Responder {
    backend: Arc<dyn ResponderBackend>,
    correlation: Option<EnvelopeId>,
    acknowledged: Arc<AtomicBool>,
    sequence: u64,
}

impl Responder {
    /// A responder with its own acknowledgement state.
    pub fn new(backend: Arc<dyn ResponderBackend>, correlation: Option<EnvelopeId>) -> Self {
        Self::for_invocation(backend, correlation, Arc::new(AtomicBool::new(false)), 0)
    }

    /// A responder sharing `acknowledged` with sibling invocations.
    pub(crate) fn for_invocation(
        backend: Arc<dyn ResponderBackend>,
        correlation: Option<EnvelopeId>,
        acknowledged: Arc<AtomicBool>,
        sequence: u64,
    ) -> Self {
        Self {
            backend,
            correlation,
            acknowledged,
            sequence,
        }
    }

    /// Launch sequence assigned by the dispatcher. Strictly increasing in
    /// launch order across all events.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn correlation(&self) -> Option<&EnvelopeId> {
        self.correlation.as_ref()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::Acquire)
    }

    /// Acknowledge the event's envelope.
    ///
    /// Only the first call per event reaches the transport; later calls
    /// from this or any sibling handler return `Ok(())`.
    pub async fn acknowledge(&self) -> Result<(), ResponderError> {
        let envelope_id = self
            .correlation
            .as_ref()
            .ok_or(ResponderError::MissingCorrelation)?;
        if self.acknowledged.swap(true, Ordering::AcqRel) {
            debug!(envelope_id = %envelope_id, "Envelope already acknowledged");
            return Ok(());
        }
        self.send(Ack::new(envelope_id.as_str())).await
    }

    /// Acknowledge the event with a response payload.
    ///
    /// Counts as the event's acknowledgement. Fails if the event was
    /// already acknowledged, since the payload could not be delivered.
    pub async fn respond(&self, content: serde_json::Value) -> Result<(), ResponderError> {
        let envelope_id = self
            .correlation
            .as_ref()
            .ok_or(ResponderError::MissingCorrelation)?;
        if self.acknowledged.swap(true, Ordering::AcqRel) {
            return Err(ResponderError::AlreadyAcknowledged(envelope_id.clone()));
        }
        self.send(Ack::new(envelope_id.as_str()).with_payload(content))
            .await
    }

    /// Perform an outbound call.
    pub async fn publish(
        &self,
        target: PublishTarget,
        content: serde_json::Value,
    ) -> Result<serde_json::Value, ResponderError> {
        self.backend.publish(target, content).await
    }

    async fn send(&self, ack: Ack) -> Result<(), ResponderError> {
        if let Err(e) = self.backend.acknowledge(ack).await {
            // Let a later call retry.
            self.acknowledged.store(false, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("correlation", &self.correlation)
            .field("acknowledged", &self.is_acknowledged())
            .field("sequence", &self.sequence)
            .finish()
    }
}
