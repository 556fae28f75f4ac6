#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod dispatcher;
pub mod events;
pub mod recovery;
pub mod registry;
pub mod responder;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use events::{Classifier, EnvelopeId, Event, Payload};
pub use recovery::{RecoveryFailure, RecoveryFilter, attempt_recover};
pub use registry::{Handler, HandlerResult, Registry, RegistryBuilder, handler_fn};
pub use responder::{PublishTarget, Responder, ResponderBackend, ResponderError};
