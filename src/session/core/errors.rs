//! Error types for the conversation session subsystem.

use thiserror::Error;

use crate::storage::StoreError;

/// Session subsystem error type.
///
/// The validation variants are returned when a command is rejected before
/// any state changes; agent failures never surface here, they are recorded
/// in the session error state instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Message text was empty or whitespace only.
    #[error("message is empty")]
    EmptyMessage,
    /// No conversation is selected.
    #[error("no active conversation")]
    NoActiveConversation,
    /// No agent identifier is configured.
    #[error("no agent configured")]
    NoAgentConfigured,
    /// A send is still waiting for the agent.
    #[error("request already in flight")]
    RequestInFlight,
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Durable store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether the error is a rejected command rather than an infrastructure fault.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyMessage
                | Self::NoActiveConversation
                | Self::NoAgentConfigured
                | Self::RequestInFlight
        )
    }
}

/// Convenience result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
