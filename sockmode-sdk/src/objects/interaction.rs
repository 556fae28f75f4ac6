//! Interaction callbacks carried by `interactive` envelopes.

use super::view::{OptionObject, View};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// The kind of interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    BlockActions,
    BlockSuggestion,
    ViewSubmission,
    ViewClosed,
    Shortcut,
    MessageAction,
    InteractiveMessage,
    DialogSubmission,
    #[serde(other)]
    Unknown,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::BlockActions => "block_actions",
            InteractionType::BlockSuggestion => "block_suggestion",
            InteractionType::ViewSubmission => "view_submission",
            InteractionType::ViewClosed => "view_closed",
            InteractionType::Shortcut => "shortcut",
            InteractionType::MessageAction => "message_action",
            InteractionType::InteractiveMessage => "interactive_message",
            InteractionType::DialogSubmission => "dialog_submission",
            InteractionType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interaction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub user: InteractionUser,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub callback_id: Option<CompactString>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

/// The user who triggered an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionUser {
    pub id: CompactString,
    #[serde(default)]
    pub username: Option<CompactString>,
    #[serde(default)]
    pub name: Option<CompactString>,
    #[serde(default)]
    pub team_id: Option<CompactString>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: CompactString,
    #[serde(default)]
    pub name: Option<CompactString>,
}

/// One element action inside a `block_actions` interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAction {
    pub action_id: CompactString,
    #[serde(default)]
    pub block_id: Option<CompactString>,
    #[serde(rename = "type", default)]
    pub kind: Option<CompactString>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<OptionObject>,
    #[serde(default)]
    pub action_ts: Option<CompactString>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_actions() {
        let json = r#"{
            "type": "block_actions",
            "user": {"id": "U1", "username": "ada"},
            "trigger_id": "T.123",
            "actions": [{"action_id": "add_stickie_note", "block_id": "b1", "type": "button", "value": "x"}]
        }"#;
        let callback: InteractionCallback = serde_json::from_str(json).unwrap();
        assert_eq!(callback.kind, InteractionType::BlockActions);
        assert_eq!(callback.actions[0].action_id, "add_stickie_note");
        assert_eq!(callback.trigger_id.as_deref(), Some("T.123"));
    }

    #[test]
    fn test_unknown_interaction_type() {
        let json = r#"{"type": "workflow_step_edit", "user": {"id": "U1"}}"#;
        let callback: InteractionCallback = serde_json::from_str(json).unwrap();
        assert_eq!(callback.kind, InteractionType::Unknown);
        assert!(callback.actions.is_empty());
    }
}
