//! HTTP route handlers for the knowledge assistant API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::session::{
    Conversation, ConversationId, ConversationSummary, SendOutcome, SessionError,
    SessionSnapshot,
};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/state", get(session_state))
        .route("/api/suggestions", get(suggestions))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route("/api/conversations/{id}", delete(delete_conversation))
        .route("/api/conversations/{id}/select", post(select_conversation))
        .route("/api/messages", post(send_message))
        .route("/api/error", delete(dismiss_error))
        .route("/api/agent", put(set_agent))
        .with_state(state)
}

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Rejected session operation.
    Session(SessionError),
    /// Unknown conversation.
    NotFound(ConversationId),
    /// The send task did not complete.
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Session(SessionError::RequestInFlight) => {
                (StatusCode::CONFLICT, SessionError::RequestInFlight.to_string())
            }
            Self::Session(err) if err.is_validation() => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Session(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::NotFound(id) => (StatusCode::NOT_FOUND, format!("conversation {id} not found")),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "knowledge-assistant",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Full session view.
async fn session_state(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

/// Starter prompts.
async fn suggestions(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.session.suggested_prompts().to_vec())
}

async fn list_conversations(State(state): State<Arc<AppState>>) -> Json<Vec<ConversationSummary>> {
    Json(state.session.summaries().await)
}

async fn create_conversation(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Conversation>) {
    (StatusCode::CREATED, Json(state.session.create_conversation().await))
}

async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> Result<StatusCode, ApiError> {
    if state.session.delete_conversation(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}

async fn select_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    if state.session.select_conversation(id).await {
        Ok(Json(state.session.snapshot().await))
    } else {
        Err(ApiError::NotFound(id))
    }
}

/// Send message request.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Text typed by the user.
    pub message: String,
}

/// Handle a send in the active conversation.
///
/// The exchange runs on its own task so a dropped client connection
/// cannot abandon it between the optimistic append and the rollback.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendOutcome>, ApiError> {
    let outcome = tokio::spawn(async move { state.session.send_message(&request.message).await })
        .await
        .map_err(|e| ApiError::Internal(format!("send task failed: {e}")))??;
    Ok(Json(outcome))
}

async fn dismiss_error(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.dismiss_error().await;
    StatusCode::NO_CONTENT
}

/// Agent selection request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSelection {
    /// Agent identifier for subsequent sends.
    pub agent_id: String,
}

async fn set_agent(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<AgentSelection>,
) -> StatusCode {
    state.session.set_agent_id(selection.agent_id).await;
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::agent::{AgentClient, AgentFuture, AgentRequest, AgentResponse, AgentResult};
    use crate::config::{DEFAULT_AGENT_ID, SessionConfig};
    use crate::session::ConversationSessionManager;
    use crate::storage::InMemoryStore;

    /// Replies with the last line of the prompt, or fails on "fail".
    struct EchoAgent;

    impl AgentClient for EchoAgent {
        fn submit(&self, request: AgentRequest) -> AgentFuture<'_, AgentResult<AgentResponse>> {
            Box::pin(async move {
                if request.message.ends_with("fail") {
                    return Ok(AgentResponse::failure(Some("agent refused".to_string())));
                }
                Ok(AgentResponse::text(format!("echo: {}", request.message)))
            })
        }
    }

    fn router() -> Router {
        let session = ConversationSessionManager::open(
            SessionConfig::default(),
            DEFAULT_AGENT_ID,
            Arc::new(InMemoryStore::new("conversations")),
            Arc::new(EchoAgent),
        )
        .unwrap();
        create_router(AppState::new(session))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&router(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_conversation_flow() {
        let router = router();

        let (status, created) = call(&router, "POST", "/api/conversations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "New Conversation");

        let (status, outcome) = call(
            &router,
            "POST",
            "/api/messages",
            Some(json!({"message": "What is ML?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["status"], "replied");
        assert_eq!(outcome["message"]["content"], "echo: What is ML?");
        assert_eq!(outcome["message"]["role"], "assistant");

        let (_, snapshot) = call(&router, "GET", "/api/state", None).await;
        assert_eq!(snapshot["activeConversationId"], created["id"]);
        assert_eq!(snapshot["conversations"][0]["title"], "What is ML?");
        assert_eq!(snapshot["pending"], false);

        let (_, summaries) = call(&router, "GET", "/api/conversations", None).await;
        assert_eq!(summaries[0]["messageCount"], 2);
    }

    #[tokio::test]
    async fn test_failed_send_reports_and_dismisses_error() {
        let router = router();
        call(&router, "POST", "/api/conversations", None).await;

        let (status, outcome) = call(
            &router,
            "POST",
            "/api/messages",
            Some(json!({"message": "please fail"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome, json!({"status": "failed", "error": "agent refused"}));

        let (_, snapshot) = call(&router, "GET", "/api/state", None).await;
        assert_eq!(snapshot["error"], "agent refused");
        assert_eq!(snapshot["conversations"][0]["messages"], json!([]));

        let (status, _) = call(&router, "DELETE", "/api/error", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, snapshot) = call(&router, "GET", "/api/state", None).await;
        assert_eq!(snapshot["error"], Value::Null);
    }

    #[tokio::test]
    async fn test_validation_errors_map_to_bad_request() {
        let router = router();

        let (status, body) = call(
            &router,
            "POST",
            "/api/messages",
            Some(json!({"message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        call(&router, "POST", "/api/conversations", None).await;
        let (status, _) = call(&router, "POST", "/api/messages", Some(json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&router, "PUT", "/api/agent", Some(json!({"agentId": ""}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, "POST", "/api/messages", Some(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_select_and_delete() {
        let router = router();
        let (_, first) = call(&router, "POST", "/api/conversations", None).await;
        let (_, second) = call(&router, "POST", "/api/conversations", None).await;
        let first_id = first["id"].as_str().unwrap().to_string();
        let second_id = second["id"].as_str().unwrap().to_string();

        let (status, snapshot) = call(
            &router,
            "POST",
            &format!("/api/conversations/{first_id}/select"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["activeConversationId"], first_id.as_str());

        let (status, _) = call(&router, "DELETE", &format!("/api/conversations/{first_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, snapshot) = call(&router, "GET", "/api/state", None).await;
        assert_eq!(snapshot["activeConversationId"], second_id.as_str());

        let (status, _) = call(&router, "DELETE", &format!("/api/conversations/{first_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let unknown = ConversationId::new();
        let (status, _) = call(&router, "POST", &format!("/api/conversations/{unknown}/select"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let (status, body) = call(&router(), "GET", "/api/suggestions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 4);
        assert_eq!(body[0], "What is machine learning?");
    }
}
