//! Ephemeral greeting posted when the app is mentioned.

use serde_json::{Value, json};

pub fn greeting_message(user_name: &str) -> Value {
    json!({
        "blocks": [
            {
                "type": "section",
                "text": {"type": "mrkdwn", "text": format!("Hi {user_name} :wave:")}
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": "Great to see you here! I can help you keep small notes. Open my *Home* tab to add a stickie."
                }
            }
        ],
        "text": format!("Hi {user_name}")
    })
}
