//! Events API payloads carried by `events_api` envelopes.
//!
//! The outer payload is tagged by `"type"` (`event_callback`,
//! `url_verification`, `app_rate_limited`). An `event_callback` wraps an
//! inner event, again tagged by `"type"`; inner events the application
//! does not model are kept as [`InnerEvent::Other`] with their raw JSON.

use super::view::View;
use compact_str::CompactString;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing an Events API payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid events api payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("verification token mismatch")]
    TokenMismatch,
}

/// Options controlling [`parse_events_api`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    verification_token: Option<String>,
}

impl ParseOptions {
    /// Require the payload's `token` field to equal `token`.
    pub fn verify_token(token: impl Into<String>) -> Self {
        Self {
            verification_token: Some(token.into()),
        }
    }

    /// Accept the payload regardless of its `token` field.
    pub fn no_verify_token() -> Self {
        Self {
            verification_token: None,
        }
    }
}

/// Parse an Events API payload, optionally checking its verification token.
pub fn parse_events_api(
    payload: serde_json::Value,
    options: &ParseOptions,
) -> Result<EventsApiPayload, ParseError> {
    let parsed: EventsApiPayload = serde_json::from_value(payload)?;
    if let Some(expected) = &options.verification_token {
        if parsed.token() != Some(expected.as_str()) {
            return Err(ParseError::TokenMismatch);
        }
    }
    Ok(parsed)
}

/// The outer Events API payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventsApiPayload {
    EventCallback(EventCallback),
    UrlVerification {
        #[serde(default)]
        token: Option<String>,
        challenge: String,
    },
    AppRateLimited {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        team_id: Option<CompactString>,
        #[serde(default)]
        minute_rate_limited: Option<i64>,
        #[serde(default)]
        api_app_id: Option<CompactString>,
    },
}

impl EventsApiPayload {
    pub fn token(&self) -> Option<&str> {
        match self {
            EventsApiPayload::EventCallback(callback) => callback.token.as_deref(),
            EventsApiPayload::UrlVerification { token, .. } => token.as_deref(),
            EventsApiPayload::AppRateLimited { token, .. } => token.as_deref(),
        }
    }

    /// The inner event type for callbacks, the outer type otherwise.
    pub fn kind(&self) -> &str {
        match self {
            EventsApiPayload::EventCallback(callback) => callback.event.kind(),
            EventsApiPayload::UrlVerification { .. } => "url_verification",
            EventsApiPayload::AppRateLimited { .. } => "app_rate_limited",
        }
    }

    pub fn inner_event(&self) -> Option<&InnerEvent> {
        match self {
            EventsApiPayload::EventCallback(callback) => Some(&callback.event),
            _ => None,
        }
    }
}

/// An `event_callback` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventCallback {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub team_id: Option<CompactString>,
    #[serde(default)]
    pub api_app_id: Option<CompactString>,
    #[serde(default)]
    pub event_id: Option<CompactString>,
    #[serde(default)]
    pub event_time: Option<i64>,
    pub event: InnerEvent,
}

/// The event wrapped by an `event_callback`.
#[derive(Debug, Clone, PartialEq)]
pub enum InnerEvent {
    AppHomeOpened(AppHomeOpenedEvent),
    AppMention(AppMentionEvent),
    Other {
        kind: CompactString,
        data: serde_json::Value,
    },
}

impl InnerEvent {
    pub fn kind(&self) -> &str {
        match self {
            InnerEvent::AppHomeOpened(_) => "app_home_opened",
            InnerEvent::AppMention(_) => "app_mention",
            InnerEvent::Other { kind, .. } => kind,
        }
    }
}

impl<'de> Deserialize<'de> for InnerEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| de::Error::missing_field("type"))?;

        match kind {
            "app_home_opened" => serde_json::from_value(value)
                .map(InnerEvent::AppHomeOpened)
                .map_err(de::Error::custom),
            "app_mention" => serde_json::from_value(value)
                .map(InnerEvent::AppMention)
                .map_err(de::Error::custom),
            other => Ok(InnerEvent::Other {
                kind: CompactString::from(other),
                data: value,
            }),
        }
    }
}

/// A user opened the app's Home tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppHomeOpenedEvent {
    pub user: CompactString,
    #[serde(default)]
    pub channel: Option<CompactString>,
    #[serde(default)]
    pub tab: Option<CompactString>,
    #[serde(default)]
    pub event_ts: Option<CompactString>,
    /// The previously published view; absent on first open.
    #[serde(default)]
    pub view: Option<View>,
}

/// The app was mentioned in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppMentionEvent {
    pub user: CompactString,
    pub channel: CompactString,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: Option<CompactString>,
    #[serde(default)]
    pub thread_ts: Option<CompactString>,
    #[serde(default)]
    pub event_ts: Option<CompactString>,
}
