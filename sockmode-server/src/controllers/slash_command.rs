//! `/rocket`: a countdown that edits its own message once per tick.
//!
//! The handler runs for several seconds, which is fine: every invocation
//! is its own task, so other events keep flowing meanwhile.

use anyhow::Context;
use async_trait::async_trait;
use sockmode_core::{
    Classifier, Event, Handler, HandlerResult, PublishTarget, RegistryBuilder, Responder,
};
use sockmode_sdk::client::PostMessageResponse;
use std::time::Duration;

use crate::views::rocket::{countdown, launch_announcement};

pub const ROCKET_COMMAND: &str = "/rocket";

const DEFAULT_COUNTDOWN: u32 = 3;
const MAX_COUNTDOWN: u32 = 10;

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(
        Classifier::slash_command(ROCKET_COMMAND),
        RocketLauncher::new(Duration::from_secs(1)),
    );
}

pub struct RocketLauncher {
    tick: Duration,
}

impl RocketLauncher {
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }
}

/// Countdown length requested in the command text, e.g. `/rocket 5`.
fn parse_countdown(text: &str) -> u32 {
    text.split_whitespace()
        .next()
        .and_then(|word| word.parse::<u32>().ok())
        .map(|n| n.clamp(1, MAX_COUNTDOWN))
        .unwrap_or(DEFAULT_COUNTDOWN)
}

#[async_trait]
impl Handler for RocketLauncher {
    async fn handle(&self, event: Event, responder: Responder) -> HandlerResult {
        responder.acknowledge().await?;

        let command = event
            .slash_command_payload()
            .context("expected a slash command")?;
        let seconds = parse_countdown(&command.text);
        let channel_id = command.channel_id.clone();

        responder
            .publish(
                PublishTarget::Message {
                    channel_id: channel_id.clone(),
                },
                launch_announcement(seconds),
            )
            .await?;

        let posted = responder
            .publish(
                PublishTarget::Message {
                    channel_id: channel_id.clone(),
                },
                countdown(seconds),
            )
            .await?;
        let posted: PostMessageResponse =
            serde_json::from_value(posted).context("chat.postMessage returned no ts")?;

        for remaining in (0..seconds).rev() {
            tokio::time::sleep(self.tick).await;
            responder
                .publish(
                    PublishTarget::Update {
                        channel_id: posted.channel.clone(),
                        ts: posted.ts.clone(),
                    },
                    countdown(remaining),
                )
                .await?;
        }

        tracing::info!(channel_id = %channel_id, user_id = %command.user_id, "Rocket launched");
        Ok(())
    }

    fn name(&self) -> &str {
        "launch_rocket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::FakeSlack;
    use sockmode_sdk::objects::SlashCommand;
    use std::sync::Arc;

    fn rocket(text: &str) -> Event {
        let command: SlashCommand = serde_json::from_value(serde_json::json!({
            "command": "/rocket",
            "text": text,
            "user_id": "U1",
            "channel_id": "C1"
        }))
        .unwrap();
        Event::slash_command(Some("env-1".into()), command)
    }

    #[test]
    fn test_parse_countdown() {
        assert_eq!(parse_countdown(""), 3);
        assert_eq!(parse_countdown("5"), 5);
        assert_eq!(parse_countdown(" 7 now"), 7);
        assert_eq!(parse_countdown("0"), 1);
        assert_eq!(parse_countdown("99"), 10);
        assert_eq!(parse_countdown("soon"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_updates_once_per_tick() {
        let backend = Arc::new(FakeSlack::default());
        let launcher = RocketLauncher::new(Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        launcher
            .handle(rocket("2"), Responder::new(backend.clone(), Some("env-1".into())))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        assert_eq!(backend.acks.lock().await.len(), 1);
        let published = backend.published.lock().await;
        let texts: Vec<_> = published
            .iter()
            .map(|(_, content)| content["text"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            texts,
            [
                "Falcon 9 launching in 2s",
                "*2*...",
                "*1*...",
                ":rocket: Lift off!"
            ]
        );
        assert_eq!(
            published[3].0,
            PublishTarget::Update {
                channel_id: "C1".into(),
                ts: "1700000000.000100".into()
            }
        );
    }
}
