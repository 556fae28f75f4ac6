//! App Home: publishes the Home tab and manages stickie notes.

use anyhow::{Context, anyhow};
use sockmode_core::events::EventSender;
use sockmode_core::{
    Classifier, Event, HandlerResult, PublishTarget, RecoveryFilter, RegistryBuilder, Responder,
    handler_fn,
};
use sockmode_sdk::objects::{InnerEvent, InteractionType};

use crate::views::app_home::{
    ADD_STICKIE_NOTE_ACTION_ID, CREATE_STICKIE_NOTE_CALLBACK_ID, StickieNote,
    create_stickie_note_modal, home_tab, home_tab_with_note,
};

pub fn register(builder: &mut RegistryBuilder, inbound: &EventSender) {
    builder
        .register(Classifier::MalformedEnvelope, RecoveryFilter::new(inbound))
        .register(
            Classifier::events_api("app_home_opened"),
            handler_fn("publish_home_tab", publish_home_tab),
        )
        .register(
            Classifier::block_action(ADD_STICKIE_NOTE_ACTION_ID),
            handler_fn("open_create_stickie_note_modal", open_create_stickie_note_modal),
        )
        .register(
            Classifier::Interaction(InteractionType::ViewSubmission),
            handler_fn("create_stickie_note", create_stickie_note),
        );
}

async fn publish_home_tab(event: Event, responder: Responder) -> HandlerResult {
    responder.acknowledge().await?;

    let Some(InnerEvent::AppHomeOpened(opened)) = event
        .events_api_payload()
        .and_then(|payload| payload.inner_event())
    else {
        return Err(anyhow!("expected an app_home_opened event"));
    };

    responder
        .publish(
            PublishTarget::HomeTab {
                user_id: opened.user.clone(),
            },
            home_tab(),
        )
        .await?;
    tracing::debug!(user_id = %opened.user, "Home tab published");
    Ok(())
}

async fn open_create_stickie_note_modal(event: Event, responder: Responder) -> HandlerResult {
    responder.acknowledge().await?;

    let trigger_id = event
        .interaction_payload()
        .and_then(|callback| callback.trigger_id.clone())
        .context("block action has no trigger_id")?;

    responder
        .publish(PublishTarget::Modal { trigger_id }, create_stickie_note_modal())
        .await?;
    Ok(())
}

async fn create_stickie_note(event: Event, responder: Responder) -> HandlerResult {
    let callback = event
        .interaction_payload()
        .context("expected an interaction payload")?;

    let view = callback.view.as_ref().context("submission has no view")?;
    if view.callback_id.as_deref() != Some(CREATE_STICKIE_NOTE_CALLBACK_ID) {
        tracing::debug!(callback_id = ?view.callback_id, "Ignoring submission of another view");
        return Ok(());
    }

    // Acknowledging without a payload closes the modal.
    responder.acknowledge().await?;

    let note = StickieNote::from_submission(view).context("submission is missing inputs")?;
    responder
        .publish(
            PublishTarget::HomeTab {
                user_id: callback.user.id.clone(),
            },
            home_tab_with_note(&note),
        )
        .await?;
    tracing::info!(user_id = %callback.user.id, color = %note.color, "Stickie note created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::FakeSlack;
    use bytes::Bytes;
    use serde_json::json;
    use sockmode_core::events::inbound_channel;
    use sockmode_core::transport::{DecodeOptions, decode_frame};
    use sockmode_core::{Dispatcher, Handler};
    use sockmode_sdk::objects::Ack;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn decode(frame: serde_json::Value) -> Event {
        decode_frame(Bytes::from(frame.to_string()), &DecodeOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_home_tab_published_for_opening_user() {
        let backend = Arc::new(FakeSlack::default());
        let event = decode(json!({
            "envelope_id": "env-1",
            "type": "events_api",
            "payload": {"type": "event_callback", "event": {"type": "app_home_opened", "user": "U1"}}
        }));

        publish_home_tab(event, Responder::new(backend.clone(), Some("env-1".into())))
            .await
            .unwrap();

        assert_eq!(*backend.acks.lock().await, vec![Ack::new("env-1")]);
        let published = backend.published.lock().await;
        assert_eq!(published[0].0, PublishTarget::HomeTab { user_id: "U1".into() });
        assert_eq!(published[0].1, home_tab());
    }

    #[tokio::test]
    async fn test_add_button_opens_modal() {
        let backend = Arc::new(FakeSlack::default());
        let event = decode(json!({
            "envelope_id": "env-2",
            "type": "interactive",
            "payload": {
                "type": "block_actions",
                "user": {"id": "U1"},
                "trigger_id": "trig-1",
                "actions": [{"action_id": ADD_STICKIE_NOTE_ACTION_ID}]
            }
        }));
        assert_eq!(event.classifier(), &Classifier::block_action(ADD_STICKIE_NOTE_ACTION_ID));

        open_create_stickie_note_modal(event, Responder::new(backend.clone(), Some("env-2".into())))
            .await
            .unwrap();

        let published = backend.published.lock().await;
        assert_eq!(
            published[0].0,
            PublishTarget::Modal {
                trigger_id: "trig-1".to_string()
            }
        );
        assert_eq!(published[0].1["type"], "modal");
    }

    #[tokio::test]
    async fn test_submission_publishes_note() {
        let backend = Arc::new(FakeSlack::default());
        let event = decode(json!({
            "envelope_id": "env-3",
            "type": "interactive",
            "accepts_response_payload": true,
            "payload": {
                "type": "view_submission",
                "user": {"id": "U7"},
                "view": {
                    "id": "V1",
                    "type": "modal",
                    "callback_id": CREATE_STICKIE_NOTE_CALLBACK_ID,
                    "state": {"values": {
                        "note_description": {"content": {"type": "plain_text_input", "value": "ship it"}},
                        "note_color": {"color": {"type": "static_select", "selected_option": {"value": "blue"}}}
                    }}
                }
            }
        }));

        create_stickie_note(event, Responder::new(backend.clone(), Some("env-3".into())))
            .await
            .unwrap();

        assert_eq!(backend.acks.lock().await.len(), 1);
        let published = backend.published.lock().await;
        assert_eq!(published[0].0, PublishTarget::HomeTab { user_id: "U7".into() });
        let blocks = published[0].1["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[3]["text"]["text"], "ship it");
    }

    #[tokio::test]
    async fn test_other_submission_is_ignored() {
        let backend = Arc::new(FakeSlack::default());
        let event = decode(json!({
            "envelope_id": "env-4",
            "type": "interactive",
            "payload": {
                "type": "view_submission",
                "user": {"id": "U7"},
                "view": {"id": "V2", "callback_id": "someone_elses_modal", "state": {"values": {}}}
            }
        }));

        create_stickie_note(event, Responder::new(backend.clone(), Some("env-4".into())))
            .await
            .unwrap();
        assert!(backend.acks.lock().await.is_empty());
        assert!(backend.published.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_home_event_is_recovered_end_to_end() {
        let (inbound_tx, inbound_rx) = inbound_channel(8);
        let mut builder = RegistryBuilder::new();
        register(&mut builder, &inbound_tx);
        let backend = Arc::new(FakeSlack::default());
        let dispatcher = Dispatcher::new(builder.build(), backend.clone());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let run = tokio::spawn(dispatcher.run(shutdown_rx, inbound_rx));

        let event = decode(json!({
            "envelope_id": "env-5",
            "type": "events_api",
            "payload": {
                "type": "event_callback",
                "event": {
                    "type": "app_home_opened",
                    "user": "U5",
                    "view": {"id": "V5", "type": "home", "state": {"values": []}}
                }
            }
        }));
        assert_eq!(event.classifier(), &Classifier::MalformedEnvelope);
        inbound_tx.send(event).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while backend.published.lock().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(*backend.acks.lock().await, vec![Ack::new("env-5")]);
        assert_eq!(
            backend.published.lock().await[0].0,
            PublishTarget::HomeTab { user_id: "U5".into() }
        );

        drop(inbound_tx);
        tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_registered_names() {
        let handler = handler_fn("publish_home_tab", publish_home_tab);
        assert_eq!(handler.name(), "publish_home_tab");
    }
}
