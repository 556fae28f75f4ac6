//! Block Kit payloads built with `serde_json::json!`.

pub mod app_home;
pub mod greeting;
pub mod rocket;
