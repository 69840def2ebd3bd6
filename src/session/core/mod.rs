//! Core conversation types and identifiers.

pub mod conversation;
pub mod errors;
pub mod ids;

pub use conversation::{Conversation, ConversationSummary, Message, Role, derive_title};
pub use errors::{SessionError, SessionResult};
pub use ids::{ConversationId, MessageId, UserId};
