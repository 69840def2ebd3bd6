//! Startup helpers for the knowledge assistant server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::AssistantConfig;
use crate::server::{self, AppState};

/// Run the server until it exits.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting knowledge assistant v{}", env!("CARGO_PKG_VERSION"));

    let config = AssistantConfig::from_env();
    let state = match initialize(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server(state, config.server.port)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Validate configuration and build application state without serving.
///
/// # Errors
/// Returns an error if the configuration is invalid or state creation fails.
pub fn initialize(config: &AssistantConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;
    tracing::info!(
        "Agent {} via {}, {:?} store",
        config.agent.agent_id,
        config.agent.base_url,
        config.storage.backend
    );

    AppState::from_config(config).map_err(|e| format!("Failed to create state: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;

    #[tokio::test]
    async fn test_initialize_with_memory_store() {
        let mut config = AssistantConfig::default();
        config.storage.backend = StorageBackend::Memory;

        let state = initialize(&config).unwrap();
        let snapshot = state.session.snapshot().await;
        assert!(snapshot.conversations.is_empty());
        assert_eq!(snapshot.active_conversation_id, None);
        assert_eq!(snapshot.agent_id, config.agent.agent_id);
    }

    #[test]
    fn test_initialize_rejects_invalid_config() {
        let mut config = AssistantConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.agent.base_url = "not a url".to_string();

        assert!(initialize(&config).is_err());
    }
}
