//! Dispatcher processor.
//!
//! The Dispatcher is responsible for:
//! - Receiving `Event`s from the inbound channel in delivery order
//! - Looking up the handlers registered for each event's classifier
//! - Launching every handler as a detached task
//!
//! The loop never waits for a handler. A handler that sleeps, calls out
//! to the network, fails, panics or never completes does not delay the
//! next event. Detached tasks are not joined and their results are not
//! propagated; failures end up in the log and nowhere else.

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::events::{Event, EventReceiver};
use crate::registry::{Registry, SharedHandler};
use crate::responder::{Responder, ResponderBackend};

/// Routes inbound events to registered handlers.
pub struct Dispatcher {
    registry: Registry,
    backend: Arc<dyn ResponderBackend>,
    next_sequence: u64,
}

impl Dispatcher {
    /// Create a new Dispatcher.
    ///
    /// # Arguments
    ///
    /// * `registry` - Frozen handler registry
    /// * `backend` - Acknowledge/publish capability handed to handlers
    pub fn new(registry: Registry, backend: Arc<dyn ResponderBackend>) -> Self {
        Self {
            registry,
            backend,
            next_sequence: 0,
        }
    }

    /// Run the Dispatcher until the inbound channel closes or shutdown is
    /// signaled.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut inbound_rx: EventReceiver,
    ) {
        info!(
            classifiers = self.registry.classifiers().count(),
            handlers = self.registry.len(),
            "Dispatcher started"
        );

        loop {
            tokio::select! {
                biased;

                // Shutdown has highest priority.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Dispatcher received shutdown signal");
                        break;
                    }
                }

                event = inbound_rx.recv() => match event {
                    Some(event) => {
                        self.dispatch(event);
                    }
                    // All senders dropped.
                    None => {
                        info!("Inbound channel closed");
                        break;
                    }
                },
            }
        }

        info!("Dispatcher shutdown complete");
    }

    /// Launch one detached invocation per handler registered for the
    /// event's classifier, in registration order.
    ///
    /// Returns the number of invocations launched. Events without handlers
    /// are dropped.
    pub fn dispatch(&mut self, event: Event) -> usize {
        let handlers = self.registry.lookup(event.classifier());
        if handlers.is_empty() {
            trace!(classifier = %event.classifier(), "No handlers registered, dropping event");
            return 0;
        }

        debug!(
            classifier = %event.classifier(),
            envelope_id = ?event.correlation().map(|c| c.as_str()),
            handlers = handlers.len(),
            "Dispatching event"
        );

        // Siblings share one acknowledgement flag.
        let acknowledged = Arc::new(AtomicBool::new(false));
        for handler in handlers {
            let responder = Responder::for_invocation(
                self.backend.clone(),
                event.correlation().cloned(),
                acknowledged.clone(),
                self.next_sequence,
            );
            self.next_sequence += 1;
            spawn_invocation(handler.clone(), event.clone(), responder);
        }
        handlers.len()
    }
}

/// Run one handler invocation as a detached task.
///
/// The `JoinHandle` is dropped: nothing awaits the invocation.
fn spawn_invocation(handler: SharedHandler, event: Event, responder: Responder) {
    let span = info_span!(
        "handler",
        name = handler.name(),
        classifier = %event.classifier(),
        sequence = responder.sequence(),
    );

    tokio::spawn(
        async move {
            match AssertUnwindSafe(handler.handle(event, responder))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => debug!("Handler completed"),
                Ok(Err(e)) => warn!(error = %e, "Handler failed"),
                Err(panic) => error!(panic_msg = %panic_message(&*panic), "Handler panicked"),
            }
        }
        .instrument(span),
    );
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
