//! Conversation session manager.
//!
//! Owns the conversation list, mirrors it to the durable store after every
//! mutation and mediates every call to the agent. A send appends the user
//! message optimistically and removes it again if the agent call fails.
//!
//! All updates replace the matching conversation by ID, never by position,
//! and a reply is always applied to the conversation it was sent from, even
//! if the user has switched or deleted conversations in the meantime.
//! Dropping a send before the agent answers also rolls the user message back.
//!
//! Store writes run on the blocking pool while the session lock is held, so
//! they stay ordered without stalling the async workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::agent::{AgentClient, AgentRequest, AgentResponse};
use crate::config::SessionConfig;
use crate::session::core::conversation::{Conversation, ConversationSummary, Message, derive_title};
use crate::session::core::errors::{SessionError, SessionResult};
use crate::session::core::ids::{ConversationId, MessageId, UserId};
use crate::session::prompt::build_prompt;
use crate::storage::{DurableStore, StoreError, StoreResult, decode_conversations, encode_conversations};

/// Result of a send that reached the agent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The agent answered; the reply has been appended.
    Replied {
        /// The assistant message.
        message: Message,
    },
    /// The agent call failed; the user message has been rolled back.
    Failed {
        /// User-visible error text, also held as the session error.
        error: String,
    },
}

/// Point-in-time view of the session, for rendering.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Conversations, most recent first.
    pub conversations: Vec<Conversation>,
    /// Currently displayed conversation.
    pub active_conversation_id: Option<ConversationId>,
    /// Whether a send is waiting for the agent.
    pub pending: bool,
    /// Latest undismissed error.
    pub error: Option<String>,
    /// Agent identifier used for sends.
    pub agent_id: String,
}

#[derive(Clone, Debug, Default)]
struct SessionState {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    error: Option<String>,
    agent_id: String,
    revision: u64,
}

impl SessionState {
    fn find(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn contains(&self, id: ConversationId) -> bool {
        self.find(id).is_some()
    }

    fn replace(&mut self, updated: Conversation) {
        if let Some(slot) = self.conversations.iter_mut().find(|c| c.id == updated.id) {
            *slot = updated;
        }
    }

    fn remove_message(&mut self, conversation_id: ConversationId, message_id: MessageId) {
        if let Some(conversation) = self.find(conversation_id).cloned() {
            self.replace(conversation.without_message(message_id));
        }
    }
}

/// Clears the pending flag when dropped, whichever way the send exits.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Durable mirror of the conversation list.
///
/// Writes carry the state revision they were taken at; a write older than
/// the last applied one is skipped.
#[derive(Clone)]
struct Mirror {
    store: Arc<dyn DurableStore>,
    written: Arc<std::sync::Mutex<u64>>,
}

impl Mirror {
    fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            written: Arc::new(std::sync::Mutex::new(0)),
        }
    }

    fn write(&self, revision: u64, raw: &str) -> StoreResult<()> {
        let mut written = self.written.lock().map_err(|_| StoreError::Poisoned)?;
        if *written >= revision {
            debug!("Skipping stale write of revision {revision}");
            return Ok(());
        }
        self.store.save(raw)?;
        *written = revision;
        Ok(())
    }
}

/// Removes the optimistic user message if the send is dropped before the
/// agent outcome has been applied.
struct RollbackGuard {
    state: Arc<Mutex<SessionState>>,
    mirror: Mirror,
    conversation_id: ConversationId,
    message_id: MessageId,
    armed: bool,
}

impl RollbackGuard {
    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let (conversation_id, message_id) = (self.conversation_id, self.message_id);
        warn!("Send in conversation {conversation_id} dropped before the agent answered, rolling back");

        let state = Arc::clone(&self.state);
        let mirror = self.mirror.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let mut guard = state.lock().await;
                guard.remove_message(conversation_id, message_id);
                persist(&mirror, &mut guard).await;
            });
        } else if let Ok(mut guard) = state.try_lock() {
            guard.remove_message(conversation_id, message_id);
            persist_now(&mirror, &mut guard);
        } else {
            warn!("Could not roll back message {message_id}, session state is locked");
        }
    }
}

/// Manages conversation lifecycle, history and agent exchanges.
pub struct ConversationSessionManager {
    config: SessionConfig,
    mirror: Mirror,
    agent: Arc<dyn AgentClient>,
    state: Arc<Mutex<SessionState>>,
    pending: AtomicBool,
}

impl ConversationSessionManager {
    /// Restore the conversation list from `store` and build the manager.
    ///
    /// The most recent stored conversation becomes active.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or holds an invalid payload.
    pub fn open(
        config: SessionConfig,
        agent_id: impl Into<String>,
        store: Arc<dyn DurableStore>,
        agent: Arc<dyn AgentClient>,
    ) -> SessionResult<Self> {
        let conversations = match store.load()? {
            Some(raw) => dedupe_by_id(decode_conversations(&raw)?),
            None => Vec::new(),
        };
        let active = conversations.first().map(|c| c.id);
        info!("Restored {} conversations", conversations.len());

        Ok(Self {
            config,
            mirror: Mirror::new(store),
            agent,
            state: Arc::new(Mutex::new(SessionState {
                conversations,
                active,
                error: None,
                agent_id: agent_id.into(),
                revision: 0,
            })),
            pending: AtomicBool::new(false),
        })
    }

    /// Start a new conversation, make it active and clear any error.
    pub async fn create_conversation(&self) -> Conversation {
        let mut state = self.state.lock().await;

        let mut conversation = Conversation::new(self.config.placeholder_title.as_str());
        while state.contains(conversation.id) {
            conversation = Conversation::new(self.config.placeholder_title.as_str());
        }

        state.conversations.insert(0, conversation.clone());
        state.active = Some(conversation.id);
        state.error = None;
        persist(&self.mirror, &mut state).await;

        info!("Created conversation {}", conversation.id);
        conversation
    }

    /// Delete a conversation. Returns `false` if it did not exist.
    ///
    /// Deleting the active conversation activates the most recent remaining
    /// one, or none when the list becomes empty.
    pub async fn delete_conversation(&self, id: ConversationId) -> bool {
        let mut state = self.state.lock().await;

        let before = state.conversations.len();
        state.conversations.retain(|c| c.id != id);
        if state.conversations.len() == before {
            debug!("Delete ignored, unknown conversation {id}");
            return false;
        }

        if state.active == Some(id) {
            state.active = state.conversations.first().map(|c| c.id);
        }
        persist(&self.mirror, &mut state).await;

        info!("Deleted conversation {id}");
        true
    }

    /// Make `id` the active conversation. Returns `false` if it does not exist.
    pub async fn select_conversation(&self, id: ConversationId) -> bool {
        let mut state = self.state.lock().await;
        if !state.contains(id) {
            return false;
        }
        state.active = Some(id);
        debug!("Switched to conversation {id}");
        true
    }

    /// Send `text` in the active conversation and wait for the agent.
    ///
    /// The user message is visible as soon as the call starts. On failure it
    /// is removed again and the error is recorded in the session; agent and
    /// transport failures are reported as [`SendOutcome::Failed`], never as
    /// `Err`.
    ///
    /// # Errors
    /// Returns a validation error, with no state change, if the text is
    /// blank, no conversation is active, no agent is configured, or another
    /// send is still pending.
    pub async fn send_message(&self, text: &str) -> SessionResult<SendOutcome> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let (_pending, mut rollback, request) = {
            let mut state = self.state.lock().await;

            let conversation = state
                .active
                .and_then(|id| state.find(id))
                .cloned()
                .ok_or(SessionError::NoActiveConversation)?;
            if state.agent_id.trim().is_empty() {
                return Err(SessionError::NoAgentConfigured);
            }
            let pending =
                PendingGuard::claim(&self.pending).ok_or(SessionError::RequestInFlight)?;

            state.error = None;

            let prompt = build_prompt(
                conversation.recent_messages(self.config.context_window),
                text,
            );
            let user_message = Message::user(text);
            let rollback = RollbackGuard {
                state: Arc::clone(&self.state),
                mirror: self.mirror.clone(),
                conversation_id: conversation.id,
                message_id: user_message.id,
                armed: true,
            };
            state.replace(conversation.with_message(user_message));
            persist(&self.mirror, &mut state).await;

            let request = AgentRequest {
                message: prompt,
                agent_id: state.agent_id.clone(),
                user_id: UserId::new().to_string(),
                session_id: conversation.id.to_string(),
            };
            (pending, rollback, request)
        };
        let conversation_id = rollback.conversation_id;

        let reply = self
            .agent
            .submit(request)
            .await
            .and_then(AgentResponse::into_reply_text);

        let mut state = self.state.lock().await;
        rollback.disarm();
        match reply {
            Ok(reply) => {
                let message = Message::assistant(reply);
                if let Some(conversation) = state.find(conversation_id).cloned() {
                    let mut updated = conversation.with_message(message.clone());
                    if conversation.message_count() == 1 {
                        updated = updated.with_title(derive_title(
                            text,
                            self.config.title_max_chars,
                            &self.config.title_ellipsis,
                        ));
                    }
                    state.replace(updated);
                    persist(&self.mirror, &mut state).await;
                    info!("Agent replied in conversation {conversation_id}");
                } else {
                    debug!("Conversation {conversation_id} deleted while awaiting the agent, reply dropped");
                }
                Ok(SendOutcome::Replied { message })
            }
            Err(err) => {
                let error = err.user_message();
                warn!("Agent request for conversation {conversation_id} failed: {err}");

                state.error = Some(error.clone());
                state.remove_message(conversation_id, rollback.message_id);
                persist(&self.mirror, &mut state).await;
                Ok(SendOutcome::Failed { error })
            }
        }
    }

    /// Clear the session error.
    pub async fn dismiss_error(&self) {
        self.state.lock().await.error = None;
    }

    /// Change the agent identifier used for subsequent sends.
    pub async fn set_agent_id(&self, agent_id: impl Into<String>) {
        let agent_id = agent_id.into();
        debug!("Agent identifier set to {agent_id}");
        self.state.lock().await.agent_id = agent_id;
    }

    /// Whether a send is waiting for the agent.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Starter prompts for an empty conversation.
    #[must_use]
    pub fn suggested_prompts(&self) -> &[String] {
        &self.config.suggested_prompts
    }

    /// Conversations, most recent first.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().await.conversations.clone()
    }

    /// Sidebar entries, most recent first.
    pub async fn summaries(&self) -> Vec<ConversationSummary> {
        self.state
            .lock()
            .await
            .conversations
            .iter()
            .map(ConversationSummary::from)
            .collect()
    }

    /// Identifier of the active conversation.
    pub async fn active_conversation_id(&self) -> Option<ConversationId> {
        self.state.lock().await.active
    }

    /// The active conversation.
    pub async fn active_conversation(&self) -> Option<Conversation> {
        let state = self.state.lock().await;
        state.active.and_then(|id| state.find(id)).cloned()
    }

    /// Latest undismissed error.
    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    /// Full view of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            conversations: state.conversations.clone(),
            active_conversation_id: state.active,
            pending: self.is_pending(),
            error: state.error.clone(),
            agent_id: state.agent_id.clone(),
        }
    }
}

/// Overwrite the durable mirror on the blocking pool; failures are logged, never raised.
async fn persist(mirror: &Mirror, state: &mut SessionState) {
    state.revision += 1;
    let (revision, count) = (state.revision, state.conversations.len());
    let raw = match encode_conversations(&state.conversations) {
        Ok(raw) => raw,
        Err(e) => return log_save(Err(e), count),
    };
    let mirror = mirror.clone();
    match tokio::task::spawn_blocking(move || mirror.write(revision, &raw)).await {
        Ok(result) => log_save(result, count),
        Err(e) => warn!("Persistence task failed: {e}"),
    }
}

/// Synchronous variant for when no runtime is available.
fn persist_now(mirror: &Mirror, state: &mut SessionState) {
    state.revision += 1;
    let result = encode_conversations(&state.conversations)
        .and_then(|raw| mirror.write(state.revision, &raw));
    log_save(result, state.conversations.len());
}

fn log_save(result: StoreResult<()>, count: usize) {
    match result {
        Ok(()) => debug!("Persisted {count} conversations"),
        Err(e) => warn!("Failed to persist conversations: {e}"),
    }
}

/// Keep the first occurrence of each conversation ID.
fn dedupe_by_id(conversations: Vec<Conversation>) -> Vec<Conversation> {
    let mut seen = std::collections::HashSet::new();
    let total = conversations.len();
    let unique: Vec<Conversation> = conversations
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect();
    if unique.len() != total {
        warn!(
            "Dropped {} stored conversations with duplicate IDs",
            total - unique.len()
        );
    }
    unique
}
