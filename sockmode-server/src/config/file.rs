//! TOML file configuration structures.
//!
//! These structs directly map to the `sockmode.toml` file format. Every
//! section is optional; a missing file section falls back to its defaults.

use serde::{Deserialize, Serialize};
use sockmode_core::events::DEFAULT_CHANNEL_BUFFER;
use sockmode_sdk::client::DEFAULT_API_BASE;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Dispatcher configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Capacity of the inbound event channel.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_buffer: default_channel_buffer(),
        }
    }
}

fn default_channel_buffer() -> usize {
    DEFAULT_CHANNEL_BUFFER
}

/// WebSocket connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Initial reconnect delay.
    #[serde(default = "default_reconnect_min_secs")]
    pub reconnect_min_secs: u64,
    /// Upper bound for the exponential reconnect delay.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
    /// Ask the server to drop the connection after a short time, to
    /// exercise the reconnect path.
    #[serde(default)]
    pub debug_reconnects: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            reconnect_min_secs: default_reconnect_min_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
            debug_reconnects: false,
        }
    }
}

fn default_reconnect_min_secs() -> u64 {
    1
}

fn default_reconnect_max_secs() -> u64 {
    30
}

/// Web API section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
    /// Legacy verification token. Events API payloads carrying a different
    /// token are rejected when set.
    #[serde(default)]
    pub verification_token: Option<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            verification_token: None,
        }
    }
}

fn default_api_base_url() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("valid default api base")
}
