//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::agent::HttpAgentClient;
use crate::config::AssistantConfig;
use crate::session::{ConversationSessionManager, SessionError};
use crate::storage::open_store;

/// Shared application state.
pub struct AppState {
    /// Conversation session behind the API.
    pub session: ConversationSessionManager,
}

impl AppState {
    /// Wrap an existing session manager.
    #[must_use]
    pub fn new(session: ConversationSessionManager) -> Arc<Self> {
        Arc::new(Self { session })
    }

    /// Build the store, agent client and session from configuration.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened or restored, or the
    /// agent client cannot be built.
    pub fn from_config(config: &AssistantConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let store = open_store(&config.storage).map_err(SessionError::from)?;
        let agent = HttpAgentClient::new(&config.agent)
            .map_err(|e| format!("Failed to create agent client: {e}"))?;
        tracing::info!("Agent endpoint: {}", agent.endpoint());

        let session = ConversationSessionManager::open(
            config.session.clone(),
            config.agent.agent_id.clone(),
            store,
            Arc::new(agent),
        )?;
        Ok(Self::new(session))
    }
}
