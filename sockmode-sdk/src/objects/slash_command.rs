use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A slash command invocation carried by a `slash_commands` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashCommand {
    /// The command including its leading slash, e.g. `/rocket`.
    pub command: CompactString,
    #[serde(default)]
    pub text: String,
    pub user_id: CompactString,
    #[serde(default)]
    pub user_name: Option<CompactString>,
    pub channel_id: CompactString,
    #[serde(default)]
    pub channel_name: Option<CompactString>,
    #[serde(default)]
    pub team_id: Option<CompactString>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub api_app_id: Option<CompactString>,
}
