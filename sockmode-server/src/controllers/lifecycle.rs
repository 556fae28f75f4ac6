//! Connection lifecycle logging.

use async_trait::async_trait;
use sockmode_core::events::LifecycleEvent;
use sockmode_core::{Classifier, Event, Handler, HandlerResult, Payload, RegistryBuilder, Responder};
use std::sync::Arc;

const LIFECYCLE_CLASSIFIERS: [Classifier; 5] = [
    Classifier::Connecting,
    Classifier::Connected,
    Classifier::ConnectionError,
    Classifier::Hello,
    Classifier::Disconnect,
];

pub fn register(builder: &mut RegistryBuilder) {
    let logger = Arc::new(ConnectionLogger);
    for classifier in LIFECYCLE_CLASSIFIERS {
        builder.register_shared(classifier, logger.clone());
    }
}

pub struct ConnectionLogger;

#[async_trait]
impl Handler for ConnectionLogger {
    async fn handle(&self, event: Event, _responder: Responder) -> HandlerResult {
        let Payload::Lifecycle(lifecycle) = event.payload() else {
            return Ok(());
        };
        match lifecycle {
            LifecycleEvent::Connecting { attempt } => {
                tracing::info!(attempt, "Connecting to Slack with Socket Mode");
            }
            LifecycleEvent::Connected => tracing::info!("Connected to Slack with Socket Mode"),
            LifecycleEvent::ConnectionError { detail } => {
                tracing::warn!(detail = %detail, "Connection failed, retrying later");
            }
            LifecycleEvent::Hello { num_connections } => {
                tracing::debug!(num_connections = ?num_connections, "Hello received");
            }
            LifecycleEvent::Disconnect { reason } => {
                tracing::info!(reason = ?reason, "Disconnect requested by server");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "connection_logger"
    }
}
