//! Conversation sessions.
//!
//! - `core`: conversation model, identifiers and errors
//! - `prompt`: prompt composition with trailing context
//! - `manager`: lifecycle, persistence and agent exchange

pub mod core;
pub mod manager;
pub mod prompt;

pub use self::core::{
    Conversation, ConversationId, ConversationSummary, Message, MessageId, Role, SessionError,
    SessionResult, UserId, derive_title,
};
pub use manager::{ConversationSessionManager, SendOutcome, SessionSnapshot};
pub use prompt::build_prompt;
