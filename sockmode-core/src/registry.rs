//! Handler registry.
//!
//! Handlers are registered on a [`RegistryBuilder`] during startup. Calling
//! [`build()`](RegistryBuilder::build) freezes the mapping into a
//! [`Registry`], a cheap read-only handle shared with the dispatcher. There
//! is no way to add or remove handlers afterwards.

use async_trait::async_trait;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::events::{Classifier, Event};
use crate::responder::Responder;

/// Result of one handler invocation.
pub type HandlerResult = anyhow::Result<()>;

/// A callable bound to one or more classifiers.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, event: Event, responder: Responder) -> HandlerResult;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared reference to a registered handler.
pub type SharedHandler = Arc<dyn Handler>;

/// Adapter returned by [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
    name: &'static str,
}

/// Turn an async closure into a [`Handler`].
///
/// ```ignore
/// builder.register(
///     Classifier::events_api("app_home_opened"),
///     handler_fn("publish_home_tab", |event: Event, responder: Responder| async move {
///         responder.acknowledge().await?;
///         anyhow::Ok(())
///     }),
/// );
/// ```
pub fn handler_fn<F, Fut>(name: &'static str, f: F) -> FnHandler<F>
where
    F: Fn(Event, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f, name }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Event, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, event: Event, responder: Responder) -> HandlerResult {
        (self.f)(event, responder).await
    }

    fn name(&self) -> &str {
        self.name
    }
}

type HandlerMap = HashMap<Classifier, SmallVec<[SharedHandler; 2]>>;

/// Mutable registration phase.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HandlerMap,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the sequence for `classifier`.
    pub fn register(&mut self, classifier: Classifier, handler: impl Handler) -> &mut Self {
        self.register_shared(classifier, Arc::new(handler))
    }

    /// Append an already shared handler, e.g. one bound to several classifiers.
    pub fn register_shared(&mut self, classifier: Classifier, handler: SharedHandler) -> &mut Self {
        self.handlers.entry(classifier).or_default().push(handler);
        self
    }

    /// Freeze the registrations.
    pub fn build(self) -> Registry {
        Registry {
            handlers: Arc::new(self.handlers),
        }
    }
}

/// Frozen classifier → handlers mapping.
#[derive(Clone)]
pub struct Registry {
    handlers: Arc<HandlerMap>,
}

impl Registry {
    /// Handlers registered for exactly `classifier`, in registration order.
    pub fn lookup(&self, classifier: &Classifier) -> &[SharedHandler] {
        self.handlers
            .get(classifier)
            .map(|handlers| handlers.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.handlers.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn classifiers(&self) -> impl Iterator<Item = &Classifier> {
        self.handlers.keys()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(c, h)| (c.to_string(), h.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Handler for Named {
        async fn handle(&self, _event: Event, _responder: Responder) -> HandlerResult {
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_lookup_preserves_registration_order() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(Classifier::events_api("app_mention"), Named("first"))
            .register(Classifier::events_api("app_mention"), Named("second"))
            .register(Classifier::slash_command("/rocket"), Named("rocket"));
        let registry = builder.build();

        let names: Vec<_> = registry
            .lookup(&Classifier::events_api("app_mention"))
            .iter()
            .map(|h| h.name().to_owned())
            .collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unregistered_classifier_is_empty() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.lookup(&Classifier::Hello).is_empty());
    }

    #[test]
    fn test_exact_match_only() {
        let mut builder = RegistryBuilder::new();
        builder.register(Classifier::events_api("app_home_opened"), Named("home"));
        let registry = builder.build();
        assert!(registry.lookup(&Classifier::events_api("app_home")).is_empty());
        assert!(
            registry
                .lookup(&Classifier::Unsupported("app_home_opened".into()))
                .is_empty()
        );
    }

    #[test]
    fn test_handler_fn_name() {
        let handler = handler_fn("greet", |_event: Event, _responder: Responder| async move {
            anyhow::Ok(())
        });
        assert_eq!(handler.name(), "greet");
    }
}
