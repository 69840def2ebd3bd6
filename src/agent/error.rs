//! Error types for agent calls.

use thiserror::Error;

/// Text shown when the agent fails without saying why.
pub const GENERIC_AGENT_FAILURE: &str = "Failed to get response from AI";

/// Text shown when the transport fails without a description.
pub const GENERIC_TRANSPORT_FAILURE: &str = "Network error";

/// Errors that can occur while talking to the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Connection refused, timeout, or other transport failure.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with a body that was not an agent envelope.
    #[error("agent endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// Body could not be parsed as an agent envelope.
    #[error("malformed agent response: {0}")]
    MalformedPayload(String),

    /// Agent reported `success: false` or returned no usable reply.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_AGENT_FAILURE))]
    Rejected(Option<String>),

    /// Endpoint URL could not be built.
    #[error("invalid agent URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AgentError {
    /// Check whether the failure happened below the agent protocol.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::HttpStatus(_) | Self::MalformedPayload(_)
        )
    }

    /// User-visible error text.
    ///
    /// Agent-reported failures use the agent's own message, falling back
    /// to a generic one; transport failures use the underlying error text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(Some(message)) if !message.trim().is_empty() => message.clone(),
            Self::Rejected(_) => GENERIC_AGENT_FAILURE.to_string(),
            other => {
                let text = other.to_string();
                if text.trim().is_empty() {
                    GENERIC_TRANSPORT_FAILURE.to_string()
                } else {
                    text
                }
            }
        }
    }
}

/// Convenience result alias for agent calls.
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_uses_agent_message() {
        let err = AgentError::Rejected(Some("quota exceeded".to_string()));
        assert_eq!(err.user_message(), "quota exceeded");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_rejected_without_message_is_generic() {
        assert_eq!(
            AgentError::Rejected(None).user_message(),
            GENERIC_AGENT_FAILURE
        );
        assert_eq!(
            AgentError::Rejected(Some("   ".to_string())).user_message(),
            GENERIC_AGENT_FAILURE
        );
    }

    #[test]
    fn test_transport_like_errors_use_their_text() {
        let err = AgentError::HttpStatus(502);
        assert!(err.is_transport());
        assert_eq!(err.user_message(), "agent endpoint returned HTTP 502");

        let err = AgentError::MalformedPayload("expected value".to_string());
        assert_eq!(err.user_message(), "malformed agent response: expected value");
    }
}
