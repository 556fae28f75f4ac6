//! Application handlers.
//!
//! Each controller registers its handlers on the [`RegistryBuilder`]
//! during startup; nothing is registered once the dispatcher runs.

pub mod app_home;
pub mod greeting;
pub mod lifecycle;
pub mod shortcut;
pub mod slash_command;

use sockmode_core::RegistryBuilder;
use sockmode_core::events::EventSender;
use std::sync::Arc;

use greeting::UserDirectory;

/// Register every controller.
pub fn register_all(
    builder: &mut RegistryBuilder,
    inbound: &EventSender,
    users: Arc<dyn UserDirectory>,
) {
    lifecycle::register(builder);
    app_home::register(builder, inbound);
    greeting::register(builder, users);
    slash_command::register(builder);
    shortcut::register(builder);
}
