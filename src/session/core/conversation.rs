//! Conversation and message model.
//!
//! Conversations are treated as values: every change produces a new
//! `Conversation` that replaces the old one by ID in the session list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::core::ids::{ConversationId, MessageId};

/// Author of a chat message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Produced by the agent.
    Assistant,
}

impl Role {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Speaker label used when rendering history into a prompt.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// A single chat bubble.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier within its conversation.
    pub id: MessageId,
    /// Author of the message.
    pub role: Role,
    /// Text body.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a user message stamped with the current time.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Build an assistant message stamped with the current time.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A titled, ordered thread of messages.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier, fixed at creation.
    pub id: ConversationId,
    /// Sidebar label.
    pub title: String,
    /// Messages in append order.
    pub messages: Vec<Message>,
    /// Creation time, fixed at creation.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation with a placeholder title.
    #[must_use]
    pub fn new(placeholder_title: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            title: placeholder_title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Copy of this conversation with `message` appended.
    #[must_use]
    pub fn with_message(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    /// Copy of this conversation without the message identified by `id`.
    #[must_use]
    pub fn without_message(&self, id: MessageId) -> Self {
        Self {
            id: self.id,
            title: self.title.clone(),
            messages: self
                .messages
                .iter()
                .filter(|m| m.id != id)
                .cloned()
                .collect(),
            created_at: self.created_at,
        }
    }

    /// Copy of this conversation with a new title.
    #[must_use]
    pub fn with_title(&self, title: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.title = title.into();
        next
    }

    /// Number of stored messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// The last `window` messages, oldest first.
    #[must_use]
    pub fn recent_messages(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}

/// Sidebar entry for a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Number of messages in the conversation.
    pub message_count: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title.clone(),
            message_count: conversation.message_count(),
            created_at: conversation.created_at,
        }
    }
}

/// Derive a conversation title from the first user message.
///
/// Keeps the first `max_chars` characters and appends `ellipsis` when
/// the text was longer.
#[must_use]
pub fn derive_title(text: &str, max_chars: usize, ellipsis: &str) -> String {
    let mut title: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        title.push_str(ellipsis);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title_short_text_untouched() {
        assert_eq!(derive_title("Hello world", 50, "..."), "Hello world");
    }

    #[test]
    fn test_derive_title_exact_limit_has_no_ellipsis() {
        let text = "a".repeat(50);
        assert_eq!(derive_title(&text, 50, "..."), text);
    }

    #[test]
    fn test_derive_title_truncates_long_text() {
        let text: String = ('a'..='z').cycle().take(60).collect();
        let title = derive_title(&text, 50, "...");
        assert_eq!(title, format!("{}...", &text[..50]));
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn test_derive_title_counts_characters_not_bytes() {
        let text = "é".repeat(51);
        let title = derive_title(&text, 50, "...");
        assert_eq!(title, format!("{}...", "é".repeat(50)));
    }

    #[test]
    fn test_without_message_removes_by_id() {
        let first = Message::user("one");
        let second = Message::assistant("two");
        let conversation = Conversation::new("New Conversation")
            .with_message(first.clone())
            .with_message(second.clone());

        let trimmed = conversation.without_message(first.id);
        assert_eq!(trimmed.messages, vec![second]);
        assert_eq!(trimmed.id, conversation.id);
        assert_eq!(conversation.message_count(), 2);
    }

    #[test]
    fn test_recent_messages_window() {
        let mut conversation = Conversation::new("t");
        for i in 0..15 {
            conversation = conversation.with_message(Message::user(format!("m{i}")));
        }
        let recent = conversation.recent_messages(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m5");
        assert_eq!(conversation.recent_messages(100).len(), 15);
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("assistant".parse::<Role>(), Ok(Role::Assistant));
        assert!("tool".parse::<Role>().is_err());
        assert_eq!(Role::User.label(), "User");
    }
}
