//! Greets users who mention the app.

use anyhow::anyhow;
use async_trait::async_trait;
use sockmode_core::{
    Classifier, Event, Handler, HandlerResult, PublishTarget, RegistryBuilder, Responder,
};
use sockmode_sdk::client::WebClient;
use sockmode_sdk::objects::InnerEvent;
use std::sync::Arc;

use crate::views::greeting::greeting_message;

/// Resolves user ids to the names shown in greetings.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    async fn display_name(&self, user_id: &str) -> anyhow::Result<String>;
}

#[async_trait]
impl UserDirectory for WebClient {
    async fn display_name(&self, user_id: &str) -> anyhow::Result<String> {
        let user = self.user_info(user_id).await?;
        Ok(user.display_name().to_string())
    }
}

pub fn register(builder: &mut RegistryBuilder, users: Arc<dyn UserDirectory>) {
    builder.register(
        Classifier::events_api("app_mention"),
        GreetingController { users },
    );
}

pub struct GreetingController {
    users: Arc<dyn UserDirectory>,
}

#[async_trait]
impl Handler for GreetingController {
    async fn handle(&self, event: Event, responder: Responder) -> HandlerResult {
        responder.acknowledge().await?;

        let Some(InnerEvent::AppMention(mention)) = event
            .events_api_payload()
            .and_then(|payload| payload.inner_event())
        else {
            return Err(anyhow!("expected an app_mention event"));
        };

        let name = match self.users.display_name(&mention.user).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(user_id = %mention.user, error = %e, "Unable to retrieve user info");
                format!("<@{}>", mention.user)
            }
        };

        responder
            .publish(
                PublishTarget::Ephemeral {
                    channel_id: mention.channel.clone(),
                    user_id: mention.user.clone(),
                },
                greeting_message(&name),
            )
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "post_greeting_message"
    }
}
