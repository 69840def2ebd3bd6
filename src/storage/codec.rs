//! Serialized form of the conversation list.
//!
//! The list is stored as a JSON array of conversation records with
//! RFC 3339 timestamps, most recent conversation first.

use crate::session::core::conversation::Conversation;

use super::store::StoreResult;

/// Serialize the whole conversation list.
///
/// # Errors
/// Returns an error if a conversation cannot be encoded.
pub fn encode_conversations(conversations: &[Conversation]) -> StoreResult<String> {
    Ok(serde_json::to_string(conversations)?)
}

/// Rehydrate a conversation list previously produced by [`encode_conversations`].
///
/// # Errors
/// Returns an error if the payload is not a valid conversation list.
pub fn decode_conversations(serialized: &str) -> StoreResult<Vec<Conversation>> {
    Ok(serde_json::from_str(serialized)?)
}
