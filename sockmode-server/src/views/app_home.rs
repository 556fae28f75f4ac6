//! Home tab and stickie note modal.

use serde_json::{Value, json};
use sockmode_sdk::objects::View;
use time::OffsetDateTime;
use time::macros::format_description;

/// Action id of the "Add a Stickie" button on the Home tab.
pub const ADD_STICKIE_NOTE_ACTION_ID: &str = "add_stickie_note";
/// Block and action ids of the modal's inputs.
pub const MODAL_DESCRIPTION_BLOCK_ID: &str = "note_description";
pub const MODAL_DESCRIPTION_ACTION_ID: &str = "content";
pub const MODAL_COLOR_BLOCK_ID: &str = "note_color";
pub const MODAL_COLOR_ACTION_ID: &str = "color";
/// Callback id of the modal, echoed back in its `view_submission`.
pub const CREATE_STICKIE_NOTE_CALLBACK_ID: &str = "create_stickie_note";

pub const NOTE_COLORS: [&str; 2] = ["yellow", "blue"];

const STICKIE_IMAGE_BASE: &str =
    "https://cdn.glitch.com/0d5619da-dfb3-451b-9255-5560cd0da50b%2Fstickie_";

/// A note submitted through the modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickieNote {
    pub description: String,
    pub color: String,
    pub timestamp: String,
}

impl StickieNote {
    /// Read a note from a submitted modal, stamped with the current time.
    ///
    /// Returns `None` if either input is missing.
    pub fn from_submission(view: &View) -> Option<Self> {
        let state = view.state.as_ref()?;
        let description = state
            .value(MODAL_DESCRIPTION_BLOCK_ID, MODAL_DESCRIPTION_ACTION_ID)?
            .value
            .clone()?;
        let color = state
            .value(MODAL_COLOR_BLOCK_ID, MODAL_COLOR_ACTION_ID)?
            .selected_option
            .as_ref()?
            .value
            .clone();

        Some(Self {
            description,
            color,
            timestamp: format_timestamp(OffsetDateTime::now_utc()),
        })
    }
}

fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    at.format(&format).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn welcome_blocks() -> Vec<Value> {
    vec![
        json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": "*Welcome Back!* \nThis is a home for Stickers app. You can add small notes here!"
            },
            "accessory": {
                "type": "button",
                "action_id": ADD_STICKIE_NOTE_ACTION_ID,
                "text": {"type": "plain_text", "text": "Add a Stickie"}
            }
        }),
        json!({"type": "divider"}),
    ]
}

fn note_blocks(note: &StickieNote) -> Vec<Value> {
    vec![
        json!({
            "type": "context",
            "elements": [{"type": "mrkdwn", "text": note.timestamp}]
        }),
        json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": note.description},
            "accessory": {
                "type": "image",
                "image_url": format!("{STICKIE_IMAGE_BASE}{}.png", note.color),
                "alt_text": format!("{} stickie note", note.color)
            }
        }),
        json!({"type": "divider"}),
    ]
}

/// The default Home tab.
pub fn home_tab() -> Value {
    json!({"type": "home", "blocks": welcome_blocks()})
}

/// The Home tab showing a freshly created note below the welcome section.
pub fn home_tab_with_note(note: &StickieNote) -> Value {
    let mut blocks = welcome_blocks();
    blocks.extend(note_blocks(note));
    json!({"type": "home", "blocks": blocks})
}

/// The "create a stickie note" modal.
pub fn create_stickie_note_modal() -> Value {
    let options: Vec<Value> = NOTE_COLORS
        .iter()
        .map(|color| {
            json!({
                "text": {"type": "plain_text", "text": color},
                "value": color
            })
        })
        .collect();

    json!({
        "type": "modal",
        "callback_id": CREATE_STICKIE_NOTE_CALLBACK_ID,
        "title": {"type": "plain_text", "text": "Create a stickie note", "emoji": true},
        "submit": {"type": "plain_text", "text": "Create", "emoji": true},
        "blocks": [
            {
                "type": "input",
                "block_id": MODAL_DESCRIPTION_BLOCK_ID,
                "label": {"type": "plain_text", "text": "Note"},
                "element": {
                    "type": "plain_text_input",
                    "action_id": MODAL_DESCRIPTION_ACTION_ID,
                    "multiline": true,
                    "placeholder": {"type": "plain_text", "text": "Take a note... "}
                }
            },
            {
                "type": "input",
                "block_id": MODAL_COLOR_BLOCK_ID,
                "label": {"type": "plain_text", "text": "Color"},
                "element": {
                    "type": "static_select",
                    "action_id": MODAL_COLOR_ACTION_ID,
                    "options": options
                }
            }
        ]
    })
}
