//! Socket Mode connection loop and the Slack-backed responder.
//!
//! The [`ConnectionLoop`] owns the WebSocket. It decodes every frame into
//! an [`Event`] and sends it on the inbound channel, reconnecting with
//! exponential backoff when the connection fails or the server asks for a
//! reconnect. The write half of the current socket is published through a
//! shared [`AckSlot`], so acknowledgements from handlers always go to the
//! live connection.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use sockmode_core::events::{EventSender, LifecycleEvent};
use sockmode_core::transport::{DecodeOptions, FrameError, decode_frame};
use sockmode_core::{Classifier, Event, PublishTarget, ResponderBackend, ResponderError};
use sockmode_sdk::client::{AckWriter, ClientError, WebClient, connect};
use sockmode_sdk::objects::Ack;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};

use crate::config::ReconnectPolicy;

/// The write half of the live connection, if any.
pub type AckSlot = Arc<RwLock<Option<AckWriter>>>;

/// How a connected session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The server sent a `disconnect` envelope.
    Disconnected,
    /// The server closed the socket.
    Closed,
    /// Nobody consumes inbound events anymore.
    InboundClosed,
}

/// Maintains the WebSocket and feeds the inbound channel.
pub struct ConnectionLoop {
    client: WebClient,
    inbound: EventSender,
    acks: AckSlot,
    decode: DecodeOptions,
    policy: ReconnectPolicy,
}

impl ConnectionLoop {
    pub fn new(
        client: WebClient,
        inbound: EventSender,
        acks: AckSlot,
        decode: DecodeOptions,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            client,
            inbound,
            acks,
            decode,
            policy,
        }
    }

    /// Run until shutdown is requested or the inbound channel closes.
    ///
    /// Consumes `self`, dropping the inbound sender on return so the
    /// dispatcher can drain and stop.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut attempt: u32 = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            attempt = attempt.saturating_add(1);
            if !self.emit(LifecycleEvent::Connecting { attempt }).await {
                break;
            }

            let outcome = tokio::select! {
                biased;

                _ = shutdown_rx.changed() => break,
                outcome = self.session(&mut attempt) => outcome,
            };
            self.release_writer().await;

            let delay = match outcome {
                Ok(SessionEnd::InboundClosed) => {
                    tracing::info!("Inbound channel closed, stopping connection loop");
                    break;
                }
                Ok(SessionEnd::Disconnected) => {
                    tracing::info!("Server requested a reconnect");
                    continue;
                }
                Ok(SessionEnd::Closed) => {
                    tracing::warn!("Socket closed by server");
                    backoff_delay(&self.policy, attempt.max(1))
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt, "Socket Mode connection failed");
                    if !self
                        .emit(LifecycleEvent::ConnectionError {
                            detail: e.to_string(),
                        })
                        .await
                    {
                        break;
                    }
                    backoff_delay(&self.policy, attempt)
                }
            };

            tracing::debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.release_writer().await;
        tracing::info!("Connection loop stopped");
    }

    async fn session(&self, attempt: &mut u32) -> Result<SessionEnd, ClientError> {
        let mut url = self.client.open_connection().await?;
        if self.policy.debug_reconnects {
            url.query_pairs_mut().append_pair("debug_reconnects", "true");
        }

        let (mut reader, writer) = connect(&url).await?;
        *self.acks.write().await = Some(writer);
        *attempt = 0;
        tracing::info!("Socket Mode connection established");
        if !self.emit(LifecycleEvent::Connected).await {
            return Ok(SessionEnd::InboundClosed);
        }

        while let Some(frame) = reader.next_frame().await {
            let event = match decode_frame(frame?, &self.decode) {
                Ok(event) => event,
                Err(FrameError::TokenMismatch(envelope_id)) => {
                    tracing::warn!(
                        envelope_id = ?envelope_id.as_ref().map(|id| id.as_str()),
                        "Dropping envelope with mismatched verification token"
                    );
                    continue;
                }
            };

            let disconnect = event.classifier() == &Classifier::Disconnect;
            tracing::trace!(classifier = %event.classifier(), "Frame decoded");
            if self.inbound.send(event).await.is_err() {
                return Ok(SessionEnd::InboundClosed);
            }
            if disconnect {
                return Ok(SessionEnd::Disconnected);
            }
        }

        Ok(SessionEnd::Closed)
    }

    async fn emit(&self, event: LifecycleEvent) -> bool {
        self.inbound.send(Event::lifecycle(event)).await.is_ok()
    }

    async fn release_writer(&self) {
        let writer = self.acks.write().await.take();
        if let Some(writer) = writer
            && let Err(e) = writer.close().await
        {
            tracing::debug!(error = %e, "Closing socket failed");
        }
    }
}

/// Delay before reconnect attempt number `attempt` (1-based).
///
/// Doubles from the policy minimum up to its maximum, plus up to 25%
/// random jitter.
pub fn backoff_delay(policy: &ReconnectPolicy, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = policy
        .min_delay
        .saturating_mul(1u32 << exponent)
        .min(policy.max_delay);
    let jitter_ms = (base.as_millis() / 4) as u64;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };
    base + Duration::from_millis(jitter)
}

/// [`ResponderBackend`] talking to Slack: acks go over the live socket,
/// publishes go through the Web API.
#[derive(Clone)]
pub struct SlackResponder {
    client: WebClient,
    acks: AckSlot,
}

impl SlackResponder {
    pub fn new(client: WebClient, acks: AckSlot) -> Self {
        Self { client, acks }
    }

    async fn call(&self, target: PublishTarget, content: Value) -> Result<Value, ClientError> {
        match target {
            PublishTarget::HomeTab { user_id } => {
                self.client.publish_view(&user_id, &content).await
            }
            PublishTarget::Modal { trigger_id } => {
                self.client.open_view(&trigger_id, &content).await
            }
            PublishTarget::Message { channel_id } => {
                let posted = self.client.post_message(&channel_id, &content).await?;
                Ok(serde_json::to_value(posted)?)
            }
            PublishTarget::Ephemeral {
                channel_id,
                user_id,
            } => {
                self.client
                    .post_ephemeral(&channel_id, &user_id, &content)
                    .await
            }
            PublishTarget::Update { channel_id, ts } => {
                let updated = self.client.update_message(&channel_id, &ts, &content).await?;
                Ok(serde_json::to_value(updated)?)
            }
        }
    }
}

#[async_trait]
impl ResponderBackend for SlackResponder {
    async fn acknowledge(&self, ack: Ack) -> Result<(), ResponderError> {
        // The slot lock is not held across the send.
        let writer = self
            .acks
            .read()
            .await
            .clone()
            .ok_or_else(|| ResponderError::Acknowledge("socket is not connected".to_string()))?;
        writer
            .send_ack(&ack)
            .await
            .map_err(|e| ResponderError::Acknowledge(e.to_string()))?;
        tracing::debug!(envelope_id = %ack.envelope_id, "Envelope acknowledged");
        Ok(())
    }

    async fn publish(&self, target: PublishTarget, content: Value) -> Result<Value, ResponderError> {
        self.call(target, content)
            .await
            .map_err(|e| ResponderError::Publish(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sockmode_sdk::token::BotToken;

    fn policy(min: u64, max: u64) -> ReconnectPolicy {
        ReconnectPolicy {
            min_delay: Duration::from_secs(min),
            max_delay: Duration::from_secs(max),
            debug_reconnects: false,
        }
    }

    fn assert_within(delay: Duration, base_secs: u64) {
        let base = Duration::from_secs(base_secs);
        assert!(delay >= base, "{delay:?} < {base:?}");
        assert!(delay <= base + base / 4, "{delay:?} > {base:?} + 25%");
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let policy = policy(1, 30);
        assert_within(backoff_delay(&policy, 1), 1);
        assert_within(backoff_delay(&policy, 2), 2);
        assert_within(backoff_delay(&policy, 3), 4);
        assert_within(backoff_delay(&policy, 5), 16);
        assert_within(backoff_delay(&policy, 6), 30);
        assert_within(backoff_delay(&policy, u32::MAX), 30);
    }

    #[test]
    fn test_backoff_attempt_zero_uses_min() {
        assert_within(backoff_delay(&policy(2, 10), 0), 2);
    }

    #[tokio::test]
    async fn test_acknowledge_without_connection_fails() {
        let client = WebClient::new(BotToken::new("xoxb-test").unwrap()).unwrap();
        let responder = SlackResponder::new(client, AckSlot::default());
        assert!(matches!(
            responder.acknowledge(Ack::new("env-1")).await,
            Err(ResponderError::Acknowledge(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_ack_does_not_hold_the_slot() {
        // The peer accepts the socket but never reads, so writes back up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = url::Url::parse(&format!("ws://{}", listener.local_addr().unwrap())).unwrap();
        let peer = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let _ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            std::future::pending::<()>().await;
        });

        let (_reader, writer) = connect(&url).await.unwrap();
        let acks = AckSlot::default();
        *acks.write().await = Some(writer);

        let client = WebClient::new(BotToken::new("xoxb-test").unwrap()).unwrap();
        let responder = SlackResponder::new(client, acks.clone());
        let filler = serde_json::Value::String("x".repeat(1 << 20));
        let sender = tokio::spawn(async move {
            for i in 0..256 {
                let ack = Ack::new(format!("env-{i}")).with_payload(filler.clone());
                if responder.acknowledge(ack).await.is_err() {
                    break;
                }
            }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!sender.is_finished(), "socket never backed up");

        let released = tokio::time::timeout(Duration::from_secs(1), acks.write())
            .await
            .expect("slot lock held by a pending ack")
            .take();
        assert!(released.is_some());

        sender.abort();
        peer.abort();
    }

    #[tokio::test]
    async fn test_loop_stops_when_inbound_is_closed() {
        let client = WebClient::new(BotToken::new("xoxb-test").unwrap()).unwrap();
        let (inbound_tx, inbound_rx) = sockmode_core::events::inbound_channel(1);
        drop(inbound_rx);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let connection = ConnectionLoop::new(
            client,
            inbound_tx,
            AckSlot::default(),
            DecodeOptions::default(),
            policy(1, 1),
        );
        tokio::time::timeout(Duration::from_secs(1), connection.run(shutdown_rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let client = WebClient::new(BotToken::new("xoxb-test").unwrap()).unwrap();
        let (inbound_tx, _inbound_rx) = sockmode_core::events::inbound_channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(true);

        let connection = ConnectionLoop::new(
            client,
            inbound_tx,
            AckSlot::default(),
            DecodeOptions::default(),
            policy(1, 1),
        );
        tokio::time::timeout(Duration::from_secs(1), connection.run(shutdown_rx))
            .await
            .unwrap();
        drop(shutdown_tx);
    }
}
