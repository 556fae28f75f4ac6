pub mod envelope;
pub mod events_api;
pub mod interaction;
pub mod slash_command;
pub mod view;

pub use envelope::{Ack, EnvelopeType, SocketEnvelope};
pub use events_api::{
    AppHomeOpenedEvent, AppMentionEvent, EventCallback, EventsApiPayload, InnerEvent, ParseError,
    ParseOptions, parse_events_api,
};
pub use interaction::{BlockAction, InteractionCallback, InteractionType, InteractionUser};
pub use slash_command::SlashCommand;
pub use view::{BlockActionValue, View, ViewState};
