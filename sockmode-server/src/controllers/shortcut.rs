//! Global shortcut: opens the stickie note modal from anywhere.

use anyhow::Context;
use sockmode_core::{
    Classifier, Event, HandlerResult, PublishTarget, RegistryBuilder, Responder, handler_fn,
};
use sockmode_sdk::objects::InteractionType;

use crate::views::app_home::create_stickie_note_modal;

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(
        Classifier::Interaction(InteractionType::Shortcut),
        handler_fn("global_shortcut", open_modal_from_shortcut),
    );
}

async fn open_modal_from_shortcut(event: Event, responder: Responder) -> HandlerResult {
    responder.acknowledge().await?;

    let trigger_id = event
        .interaction_payload()
        .and_then(|callback| callback.trigger_id.clone())
        .context("shortcut has no trigger_id")?;

    responder
        .publish(PublishTarget::Modal { trigger_id }, create_stickie_note_modal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::FakeSlack;
    use sockmode_sdk::objects::InteractionCallback;
    use std::sync::Arc;

    fn shortcut(trigger_id: Option<&str>) -> Event {
        let callback: InteractionCallback = serde_json::from_value(serde_json::json!({
            "type": "shortcut",
            "user": {"id": "U1"},
            "callback_id": "new_note",
            "trigger_id": trigger_id
        }))
        .unwrap();
        Event::interaction(Some("env-1".into()), callback)
    }

    #[tokio::test]
    async fn test_shortcut_opens_modal() {
        let backend = Arc::new(FakeSlack::default());
        let event = shortcut(Some("trig-9"));
        assert_eq!(
            event.classifier(),
            &Classifier::Interaction(InteractionType::Shortcut)
        );

        open_modal_from_shortcut(event, Responder::new(backend.clone(), Some("env-1".into())))
            .await
            .unwrap();

        assert_eq!(backend.acks.lock().await.len(), 1);
        let published = backend.published.lock().await;
        assert_eq!(
            published[0].0,
            PublishTarget::Modal {
                trigger_id: "trig-9".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_shortcut_without_trigger_still_acknowledges() {
        let backend = Arc::new(FakeSlack::default());
        let result =
            open_modal_from_shortcut(shortcut(None), Responder::new(backend.clone(), Some("env-1".into())))
                .await;

        assert!(result.is_err());
        assert_eq!(backend.acks.lock().await.len(), 1);
        assert!(backend.published.lock().await.is_empty());
    }
}
