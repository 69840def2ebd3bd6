//! HTTP agent client.

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::AgentConfig;

use super::client::{AgentClient, AgentFuture, AgentRequest, AgentResponse};
use super::error::{AgentError, AgentResult};

/// Agent client posting JSON requests to a single endpoint.
#[derive(Clone, Debug)]
pub struct HttpAgentClient {
    client: Client,
    endpoint: Url,
}

impl HttpAgentClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> AgentResult<Self> {
        let endpoint = endpoint_url(&config.base_url, &config.endpoint_path)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, request: AgentRequest) -> AgentResult<AgentResponse> {
        debug!(
            "Posting agent request for session {} to {}",
            request.session_id, self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // An error status with an agent envelope still carries the agent's message.
        match serde_json::from_str::<AgentResponse>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(AgentError::HttpStatus(status.as_u16())),
            Err(e) => Err(AgentError::MalformedPayload(e.to_string())),
        }
    }
}

/// Resolve `endpoint_path` under `base_url`, keeping any base path prefix.
fn endpoint_url(base_url: &str, endpoint_path: &str) -> AgentResult<Url> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(endpoint_path.trim_start_matches('/'))?)
}

impl AgentClient for HttpAgentClient {
    fn submit(&self, request: AgentRequest) -> AgentFuture<'_, AgentResult<AgentResponse>> {
        Box::pin(self.post(request))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::{Value, json};

    use super::*;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String) -> HttpAgentClient {
        let config = AgentConfig::default()
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5));
        HttpAgentClient::new(&config).unwrap()
    }

    fn request() -> AgentRequest {
        AgentRequest {
            message: "Hello".to_string(),
            agent_id: "agent-1".to_string(),
            user_id: "user-1".to_string(),
            session_id: "session-1".to_string(),
        }
    }

    #[test]
    fn test_endpoint_joins_path() {
        let client = client_for("http://localhost:8000".to_string());
        assert_eq!(client.endpoint().as_str(), "http://localhost:8000/api/agent");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let client = client_for("http://localhost:8000/v1".to_string());
        assert_eq!(client.endpoint().as_str(), "http://localhost:8000/v1/api/agent");

        let url = endpoint_url("http://gateway/agents/", "/api/agent").unwrap();
        assert_eq!(url.as_str(), "http://gateway/agents/api/agent");
    }

    #[tokio::test]
    async fn test_posts_request_and_parses_envelope() {
        let router = Router::new().route(
            "/api/agent",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "success": true,
                    "response": {"result": format!("echo: {}", body["message"].as_str().unwrap_or(""))},
                    "session": body["session_id"],
                }))
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let envelope = client.submit(request()).await.unwrap();
        assert_eq!(envelope.into_reply_text().unwrap(), "echo: Hello");
    }

    #[tokio::test]
    async fn test_error_status_with_envelope_keeps_agent_message() {
        let router = Router::new().route(
            "/api/agent",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "agent crashed"})),
                )
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let envelope = client.submit(request()).await.unwrap();
        let err = envelope.into_reply_text().unwrap_err();
        assert_eq!(err.user_message(), "agent crashed");
    }

    #[tokio::test]
    async fn test_error_status_without_envelope() {
        let router = Router::new().route(
            "/api/agent",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let client = client_for(spawn_stub(router).await);

        let err = client.submit(request()).await.unwrap_err();
        assert!(matches!(err, AgentError::HttpStatus(502)));
    }

    #[tokio::test]
    async fn test_non_json_success_is_malformed() {
        let router = Router::new().route("/api/agent", post(|| async { "plain text" }));
        let client = client_for(spawn_stub(router).await);

        let err = client.submit(request()).await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{addr}"));
        let err = client.submit(request()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!err.user_message().is_empty());
    }
}
