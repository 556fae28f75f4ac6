//! Web API client.
//!
//! Every method is a `POST {base_url}/{method}` authenticated with a bearer
//! token. The Web API reports failures in the body as
//! `{"ok": false, "error": "..."}` with a 200 status, which is mapped to
//! [`ClientError::Slack`].

use compact_str::CompactString;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use super::ClientError;
use crate::token::{APP_TOKEN_ENV, AppToken, BotToken};

/// Default Web API root. The trailing slash matters for [`Url::join`].
pub const DEFAULT_API_BASE: &str = "https://slack.com/api/";

/// Typed client for the Web API methods the application uses.
#[derive(Debug, Clone)]
pub struct WebClient {
    http: Client,
    base_url: Url,
    bot_token: BotToken,
    app_token: Option<AppToken>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConnectionsOpenResponse {
    url: Url,
}

/// Result of `chat.postMessage` and `chat.update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub channel: CompactString,
    pub ts: CompactString,
}

#[derive(Debug, Clone, Deserialize)]
struct UsersInfoResponse {
    user: UserInfo,
}

/// Subset of `users.info`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfo {
    pub id: CompactString,
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

impl UserInfo {
    /// The most human name available.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref())
            .filter(|n| !n.is_empty())
            .or(self.real_name.as_deref())
            .unwrap_or(&self.name)
    }
}

#[derive(Serialize)]
struct Empty {}

impl WebClient {
    /// Create a client for the public Web API.
    pub fn new(bot_token: BotToken) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(DEFAULT_API_BASE)?,
            bot_token,
            app_token: None,
        })
    }

    /// Attach the app-level token needed by [`open_connection`](Self::open_connection).
    pub fn with_app_token(mut self, app_token: AppToken) -> Self {
        self.app_token = Some(app_token);
        self
    }

    /// Point the client at another API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `apps.connections.open` – obtain a fresh WebSocket URL.
    pub async fn open_connection(&self) -> Result<Url, ClientError> {
        let token = self
            .app_token
            .as_ref()
            .ok_or(ClientError::MissingToken(APP_TOKEN_ENV))?;
        let response: ConnectionsOpenResponse = self
            .call("apps.connections.open", token.expose(), &Empty {})
            .await?;
        Ok(response.url)
    }

    /// `views.publish` – replace a user's Home tab.
    pub async fn publish_view(&self, user_id: &str, view: &Value) -> Result<Value, ClientError> {
        self.bot_call("views.publish", &json!({ "user_id": user_id, "view": view }))
            .await
    }

    /// `views.open` – open a modal for a trigger.
    pub async fn open_view(&self, trigger_id: &str, view: &Value) -> Result<Value, ClientError> {
        self.bot_call("views.open", &json!({ "trigger_id": trigger_id, "view": view }))
            .await
    }

    /// `chat.postMessage`.
    pub async fn post_message(
        &self,
        channel: &str,
        content: &Value,
    ) -> Result<PostMessageResponse, ClientError> {
        self.bot_call("chat.postMessage", &with_fields(content, &[("channel", channel)]))
            .await
    }

    /// `chat.postEphemeral` – a message only `user` can see.
    pub async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        content: &Value,
    ) -> Result<Value, ClientError> {
        self.bot_call(
            "chat.postEphemeral",
            &with_fields(content, &[("channel", channel), ("user", user)]),
        )
        .await
    }

    /// `chat.update` – edit a previously posted message.
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &Value,
    ) -> Result<PostMessageResponse, ClientError> {
        self.bot_call(
            "chat.update",
            &with_fields(content, &[("channel", channel), ("ts", ts)]),
        )
        .await
    }

    /// `users.info`. This method only accepts form-encoded arguments.
    pub async fn user_info(&self, user_id: &str) -> Result<UserInfo, ClientError> {
        let url = self.base_url.join("users.info")?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.bot_token.expose())
            .form(&[("user", user_id)])
            .send()
            .await?;
        let response: UsersInfoResponse = parse_response("users.info", resp).await?;
        Ok(response.user)
    }

    async fn bot_call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        self.call(method, self.bot_token.expose(), body).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        token: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(method)?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        parse_response(method, resp).await
    }
}

/// Merge routing fields into a message body (`text`, `blocks`, ...).
fn with_fields(content: &Value, fields: &[(&str, &str)]) -> Value {
    let mut body = match content {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("text".to_owned(), other.clone());
            map
        }
    };
    for (key, value) in fields {
        body.insert((*key).to_owned(), Value::String((*value).to_owned()));
    }
    Value::Object(body)
}

async fn parse_response<T: DeserializeOwned>(
    method: &'static str,
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    decode_body(method, &bytes)
}

fn decode_body<T: DeserializeOwned>(method: &'static str, bytes: &[u8]) -> Result<T, ClientError> {
    let value: Value = serde_json::from_slice(bytes)?;
    if value.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_owned();
        return Err(ClientError::Slack { method, error });
    }
    serde_json::from_value(value).map_err(ClientError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_fields_merges_object() {
        let body = with_fields(&json!({"text": "hi"}), &[("channel", "C1"), ("ts", "1.2")]);
        assert_eq!(body, json!({"text": "hi", "channel": "C1", "ts": "1.2"}));
    }

    #[test]
    fn test_with_fields_wraps_plain_text() {
        let body = with_fields(&json!("hello"), &[("channel", "C1")]);
        assert_eq!(body, json!({"text": "hello", "channel": "C1"}));
    }

    #[test]
    fn test_decode_body_error() {
        let err = decode_body::<Value>("views.publish", br#"{"ok":false,"error":"invalid_auth"}"#)
            .unwrap_err();
        match err {
            ClientError::Slack { method, error } => {
                assert_eq!(method, "views.publish");
                assert_eq!(error, "invalid_auth");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_body_success() {
        let response: PostMessageResponse =
            decode_body("chat.postMessage", br#"{"ok":true,"channel":"C1","ts":"171.01"}"#)
                .unwrap();
        assert_eq!(response.ts, "171.01");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let user: UserInfo = serde_json::from_value(json!({
            "id": "U1", "name": "ada", "real_name": "Ada L", "profile": {"display_name": ""}
        }))
        .unwrap();
        assert_eq!(user.display_name(), "Ada L");

        let user: UserInfo = serde_json::from_value(json!({"id": "U1", "name": "ada"})).unwrap();
        assert_eq!(user.display_name(), "ada");
    }
}
