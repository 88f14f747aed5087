pub mod anon;
pub mod service;
pub mod title;

pub use anon::{AnonReply, AnonymousTurnService};
pub use service::{ConversationService, TurnExchange};
pub use title::derive_title;
