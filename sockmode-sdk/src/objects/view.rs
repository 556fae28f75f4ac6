//! Inbound view surfaces (App Home tabs and modals).
//!
//! Only the fields the application reads are modelled. Outbound views are
//! built as plain JSON and never go through these types.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A view as echoed back by the server on events and interactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    pub id: Option<CompactString>,
    #[serde(rename = "type", default)]
    pub kind: Option<CompactString>,
    #[serde(default)]
    pub callback_id: Option<CompactString>,
    #[serde(default)]
    pub external_id: Option<CompactString>,
    #[serde(default)]
    pub private_metadata: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub state: Option<ViewState>,
}

/// Input state of a view, keyed by `block_id` then `action_id`.
///
/// The server is expected to send `"values":{}` for a view without inputs.
/// Some App Home payloads send `"values":[]` instead, which does not
/// deserialize into this map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<CompactString, HashMap<CompactString, BlockActionValue>>,
}

impl ViewState {
    /// Look up the value an input element submitted.
    pub fn value(&self, block_id: &str, action_id: &str) -> Option<&BlockActionValue> {
        self.values.get(block_id)?.get(action_id)
    }
}

/// The submitted value of one input element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockActionValue {
    #[serde(rename = "type", default)]
    pub kind: Option<CompactString>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<OptionObject>,
}

/// An option of a select element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionObject {
    pub value: String,
    #[serde(default)]
    pub text: Option<TextObject>,
}

/// A Block Kit text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: CompactString,
    pub text: String,
}
