//! Remote conversational agent access.
//!
//! - `client`: the `AgentClient` trait and request/response envelopes
//! - `http`: JSON-over-HTTP implementation
//! - `error`: transport vs agent-reported failures

pub mod client;
pub mod error;
pub mod http;

pub use client::{AgentClient, AgentFuture, AgentRequest, AgentResponse};
pub use error::{AgentError, AgentResult, GENERIC_AGENT_FAILURE, GENERIC_TRANSPORT_FAILURE};
pub use http::HttpAgentClient;
