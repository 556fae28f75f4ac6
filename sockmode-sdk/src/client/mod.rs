//! Web API and WebSocket clients.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest` or `tokio-tungstenite`.

mod socket;
mod web;

pub use socket::{AckWriter, FrameReader, connect};
pub use web::{DEFAULT_API_BASE, PostMessageResponse, UserInfo, UserProfile, WebClient};

use reqwest::StatusCode;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// The Web API answered with `"ok": false`.
    #[error("{method} failed: {error}")]
    Slack { method: &'static str, error: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the method name.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The WebSocket failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The call needs a token the client was not given.
    #[error("{0} is not configured")]
    MissingToken(&'static str),
}
