//! Agent client abstraction and wire types.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{AgentError, AgentResult};

/// Boxed future type for agent calls.
pub type AgentFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request/response interface to the remote conversational agent.
pub trait AgentClient: Send + Sync {
    /// Submit one prompt and wait for the agent envelope.
    ///
    /// Only transport-level failures are errors here; an envelope with
    /// `success: false` is returned as-is and judged by
    /// [`AgentResponse::into_reply_text`].
    ///
    /// # Errors
    /// Returns an error if the agent cannot be reached or its reply cannot be parsed.
    fn submit(&self, request: AgentRequest) -> AgentFuture<'_, AgentResult<AgentResponse>>;
}

/// Body sent to the agent endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Composed prompt, including any conversation context.
    pub message: String,
    /// Deployment-wide agent identifier.
    pub agent_id: String,
    /// Per-request caller identifier.
    pub user_id: String,
    /// Conversation the request belongs to.
    pub session_id: String,
}

/// Envelope returned by the agent endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Application-level success flag.
    #[serde(default)]
    pub success: bool,
    /// Reply payload: a string or an object carrying `result` / `response`.
    #[serde(default)]
    pub response: Option<Value>,
    /// Human-readable failure description.
    #[serde(default)]
    pub error: Option<String>,
}

impl AgentResponse {
    /// Successful envelope carrying a plain-text reply.
    #[must_use]
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(Value::String(reply.into())),
            error: None,
        }
    }

    /// Failed envelope with an optional message.
    #[must_use]
    pub fn failure(error: Option<String>) -> Self {
        Self {
            success: false,
            response: None,
            error,
        }
    }

    /// Extract the reply text.
    ///
    /// A plain string payload is used as-is. For structured payloads the
    /// `result` field is probed first, then `response`, and the whole
    /// payload is serialized when neither holds a usable value.
    ///
    /// # Errors
    /// Returns [`AgentError::Rejected`] when the envelope is not successful
    /// or carries no usable payload.
    pub fn into_reply_text(self) -> AgentResult<String> {
        match self.response {
            Some(payload) if self.success && is_present(&payload) => Ok(extract_text(&payload)),
            _ => Err(AgentError::Rejected(
                self.error.filter(|e| !e.trim().is_empty()),
            )),
        }
    }
}

fn extract_text(payload: &Value) -> String {
    if let Value::String(text) = payload {
        return text.clone();
    }

    ["result", "response"]
        .into_iter()
        .filter_map(|field| payload.get(field))
        .find(|value| is_present(value))
        .map_or_else(|| payload.to_string(), value_text)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Whether a payload value carries anything worth showing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
