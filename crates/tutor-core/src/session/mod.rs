//! Per-user chat session: active conversation, turn sequencing and the
//! busy flag that allows one outstanding turn at a time.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::context::log_preview;
use crate::error::{Result, TutorError};
use crate::store::{ChatMessage, Conversation, ConversationStore, NewMessage, Subscription};
use crate::tutor::{should_generate_title, TurnService};

/// Error shown locally after a failed turn. Never written to the store.
#[derive(Debug, Clone)]
pub struct LocalNotice {
    pub conversation_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// What a successful turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
    /// Set when this turn titled the conversation.
    pub title: Option<String>,
}

/// Releases the busy flag when the turn ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatSession {
    owner: String,
    store: Arc<dyn ConversationStore>,
    tutor: Arc<dyn TurnService>,
    active: RwLock<Option<Conversation>>,
    busy: AtomicBool,
    notices: Mutex<Vec<LocalNotice>>,
}

impl ChatSession {
    /// Open a session and select the owner's most recent conversation,
    /// creating one when the owner has none.
    pub async fn open(
        owner: impl Into<String>,
        store: Arc<dyn ConversationStore>,
        tutor: Arc<dyn TurnService>,
    ) -> Result<Self> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(TutorError::validation("owner id is required"));
        }
        let session = Self {
            owner,
            store,
            tutor,
            active: RwLock::new(None),
            busy: AtomicBool::new(false),
            notices: Mutex::new(Vec::new()),
        };
        session.select_most_recent().await?;
        Ok(session)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn active_conversation(&self) -> Option<Conversation> {
        self.active.read().await.clone()
    }

    async fn active_id(&self) -> Result<String> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|c| c.id.clone())
            .ok_or_else(|| TutorError::validation("no conversation is selected"))
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        self.store.list_conversations(&self.owner).await
    }

    pub async fn subscribe_conversations(&self) -> Result<Subscription<Vec<Conversation>>> {
        self.store.subscribe_conversations(&self.owner).await
    }

    /// Live message window of the active conversation.
    pub async fn subscribe_messages(&self) -> Result<Subscription<Vec<ChatMessage>>> {
        let id = self.active_id().await?;
        self.store.select_conversation(&id).await
    }

    pub async fn messages(&self) -> Result<Vec<ChatMessage>> {
        let id = self.active_id().await?;
        self.store.messages(&id).await
    }

    pub async fn select(&self, conversation_id: &str) -> Result<Conversation> {
        let conversation = self.store.get_conversation(conversation_id).await?;
        if conversation.owner != self.owner {
            return Err(TutorError::ConversationNotFound(conversation_id.to_string()));
        }
        *self.active.write().await = Some(conversation.clone());
        tracing::debug!(conversation_id, "Selected conversation");
        Ok(conversation)
    }

    pub async fn new_conversation(&self) -> Result<Conversation> {
        let conversation = self.store.create_conversation(&self.owner).await?;
        *self.active.write().await = Some(conversation.clone());
        Ok(conversation)
    }

    /// Delete a conversation. When it was the active one, fall back to the
    /// most recent remaining conversation or create a fresh one.
    pub async fn delete(&self, conversation_id: &str) -> Result<Conversation> {
        let conversation = self.store.get_conversation(conversation_id).await?;
        if conversation.owner != self.owner {
            return Err(TutorError::ConversationNotFound(conversation_id.to_string()));
        }
        self.store.delete_conversation(conversation_id).await?;

        let was_active = self
            .active
            .read()
            .await
            .as_ref()
            .map(|c| c.id == conversation_id)
            .unwrap_or(false);

        if was_active {
            tracing::info!(conversation_id, "Active conversation deleted, selecting fallback");
            self.select_most_recent().await
        } else {
            self.refresh_active().await
        }
    }

    async fn select_most_recent(&self) -> Result<Conversation> {
        let conversations = self.store.list_conversations(&self.owner).await?;
        let conversation = match conversations.into_iter().next() {
            Some(conversation) => conversation,
            None => self.store.create_conversation(&self.owner).await?,
        };
        *self.active.write().await = Some(conversation.clone());
        Ok(conversation)
    }

    /// Re-read the active conversation. If it was deleted elsewhere, fall
    /// back the same way [`delete`](Self::delete) does.
    async fn refresh_active(&self) -> Result<Conversation> {
        let id = self.active_id().await?;
        match self.store.get_conversation(&id).await {
            Ok(conversation) => {
                *self.active.write().await = Some(conversation.clone());
                Ok(conversation)
            }
            Err(TutorError::ConversationNotFound(_)) => {
                tracing::info!(conversation_id = %id, "Active conversation disappeared, selecting fallback");
                self.select_most_recent().await
            }
            Err(e) => Err(e),
        }
    }

    /// Local-only error entries recorded by failed turns.
    pub fn notices(&self) -> Vec<LocalNotice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_notices(&self) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn push_notice(&self, conversation_id: &str, error: &TutorError) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LocalNotice {
                conversation_id: conversation_id.to_string(),
                text: error.user_message(),
                timestamp: Utc::now(),
            });
    }

    /// Run one turn on the active conversation.
    ///
    /// Surrounding whitespace is trimmed from `text` before it is stored and
    /// sent; text that is empty after trimming is rejected. The user message is persisted first; a failed write aborts before any
    /// completion call. History is captured once at turn start, so live
    /// updates arriving mid-turn cannot change the prompt. A failed
    /// completion persists nothing further and leaves a local notice.
    pub async fn send(&self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TutorError::validation("message must not be empty"));
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TutorError::TurnInProgress);
        }
        let _busy = BusyGuard(&self.busy);

        let selected_id = self.active_id().await?;
        let conversation = self.refresh_active().await?;
        if conversation.id != selected_id {
            return Err(TutorError::ConversationNotFound(selected_id));
        }
        let conversation_id = conversation.id.clone();
        let history = self.store.messages(&conversation_id).await?;
        let title_due = should_generate_title(history.is_empty(), &conversation.title);

        tracing::info!(
            conversation_id = %conversation_id,
            history = history.len(),
            message = %log_preview(text),
            "Starting turn"
        );

        let user_message = self
            .store
            .append_message(&conversation_id, NewMessage::user(text))
            .await
            .map_err(|e| {
                tracing::error!(conversation_id = %conversation_id, error = %e, "Failed to persist user message");
                self.push_notice(&conversation_id, &e);
                e
            })?;

        let reply_text = match self.tutor.reply(&history, text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(conversation_id = %conversation_id, code = e.code(), "Turn failed");
                self.push_notice(&conversation_id, &e);
                return Err(e);
            }
        };

        let reply = self
            .store
            .append_message(&conversation_id, NewMessage::assistant(reply_text))
            .await
            .map_err(|e| {
                self.push_notice(&conversation_id, &e);
                e
            })?;

        let title = if title_due {
            self.apply_title(&conversation_id, text).await
        } else {
            None
        };

        Ok(TurnOutcome {
            user_message,
            reply,
            title,
        })
    }

    /// Title failures are logged and never fail the turn.
    async fn apply_title(&self, conversation_id: &str, first_message: &str) -> Option<String> {
        let title = match self.tutor.generate_title(first_message).await {
            Ok(title) if !title.is_empty() => title,
            Ok(_) => {
                tracing::warn!(conversation_id, "Empty title generated, keeping placeholder");
                return None;
            }
            Err(e) => {
                tracing::warn!(conversation_id, error = %e, "Title generation failed, keeping placeholder");
                return None;
            }
        };

        if let Err(e) = self.store.update_title(conversation_id, &title).await {
            tracing::warn!(conversation_id, error = %e, "Failed to store generated title");
            return None;
        }

        let mut active = self.active.write().await;
        if let Some(conversation) = active.as_mut().filter(|c| c.id == conversation_id) {
            conversation.title = title.clone();
        }
        Some(title)
    }
}
