//! `/rocket` launch messages.

use serde_json::{Value, json};

pub const ROCKET_NAME: &str = "Falcon 9";

/// Initial message announcing the countdown.
pub fn launch_announcement(countdown: u32) -> Value {
    json!({
        "blocks": [
            {
                "type": "section",
                "text": {"type": "mrkdwn", "text": ":rocket: *Launch sequence initiated*"}
            },
            {
                "type": "section",
                "fields": [
                    {"type": "mrkdwn", "text": format!("*Rocket:*\n{ROCKET_NAME}")},
                    {"type": "mrkdwn", "text": format!("*When:*\n{countdown}s count down")}
                ]
            }
        ],
        "text": format!("{ROCKET_NAME} launching in {countdown}s")
    })
}

/// Countdown step; `0` is lift-off.
pub fn countdown(remaining: u32) -> Value {
    let text = if remaining == 0 {
        ":rocket: Lift off!".to_string()
    } else {
        format!("*{remaining}*...")
    };
    json!({
        "blocks": [{"type": "section", "text": {"type": "mrkdwn", "text": text}}],
        "text": text
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_fields() {
        let message = launch_announcement(3);
        let fields = &message["blocks"][1]["fields"];
        assert_eq!(fields[0]["text"], "*Rocket:*\nFalcon 9");
        assert_eq!(fields[1]["text"], "*When:*\n3s count down");
    }

    #[test]
    fn test_countdown_steps() {
        assert_eq!(countdown(2)["text"], "*2*...");
        assert_eq!(countdown(0)["text"], ":rocket: Lift off!");
    }
}
