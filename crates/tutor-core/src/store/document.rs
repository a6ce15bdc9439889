use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    placeholder_title, ChangeHub, ChatMessage, Conversation, ConversationStore, NewMessage,
    Subscription,
};
use crate::constants::conversation::HISTORY_LIMIT;
use crate::error::{Result, TutorError};

/// A conversation together with every message it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation: Conversation,
    pub messages: Vec<ChatMessage>,
}

impl ConversationRecord {
    /// Insert keeping timestamp order; equal timestamps keep insertion order.
    fn insert_ordered(&mut self, message: ChatMessage) {
        let pos = self
            .messages
            .partition_point(|m| m.timestamp <= message.timestamp);
        self.messages.insert(pos, message);
    }

    fn window(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = if limit == 0 {
            0
        } else {
            self.messages.len().saturating_sub(limit)
        };
        self.messages[skip..].to_vec()
    }
}

/// Durable side of a [`DocumentStore`].
///
/// Every write must land before the in-memory documents change. An operation
/// touching both the index and a record writes the index first and puts the
/// old index back when the record write fails, so a failed operation leaves
/// the store exactly as it was.
pub trait Backend: Send + Sync {
    fn load(&self) -> Result<Vec<ConversationRecord>>;

    fn save_record(&self, record: &ConversationRecord) -> Result<()>;

    /// Persist the list of every conversation, newest first.
    fn save_index(&self, conversations: &[Conversation]) -> Result<()>;

    /// Remove a conversation and all of its messages.
    fn remove_record(&self, conversation_id: &str) -> Result<()>;
}

#[derive(Default)]
struct Documents {
    records: HashMap<String, ConversationRecord>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Documents {
    fn from_records(records: Vec<ConversationRecord>) -> Self {
        let last_created_at = records.iter().map(|r| r.conversation.created_at).max();
        Self {
            records: records
                .into_iter()
                .map(|r| (r.conversation.id.clone(), r))
                .collect(),
            last_created_at,
        }
    }

    /// Creation times strictly increase even when the clock does not.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_created_at {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        }
    }

    fn list(&self, owner: &str) -> Vec<Conversation> {
        let mut conversations: Vec<Conversation> = self
            .records
            .values()
            .filter(|r| r.conversation.owner == owner)
            .map(|r| r.conversation.clone())
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        conversations
    }

    fn all(&self) -> Vec<Conversation> {
        let mut conversations: Vec<Conversation> = self
            .records
            .values()
            .map(|r| r.conversation.clone())
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        conversations
    }

    fn record(&self, conversation_id: &str) -> Result<&ConversationRecord> {
        self.records
            .get(conversation_id)
            .ok_or_else(|| TutorError::ConversationNotFound(conversation_id.to_string()))
    }
}

/// Conversation store over in-memory documents with pluggable durability.
pub struct DocumentStore<B: Backend> {
    docs: RwLock<Documents>,
    hub: ChangeHub,
    backend: B,
    history_limit: usize,
}

impl<B: Backend> DocumentStore<B> {
    /// Load existing documents from `backend`.
    pub fn with_backend(backend: B) -> Result<Self> {
        let records = backend.load()?;
        tracing::debug!(conversations = records.len(), "Loaded conversation documents");
        Ok(Self::from_loaded(backend, records))
    }

    pub(crate) fn from_loaded(backend: B, records: Vec<ConversationRecord>) -> Self {
        Self {
            docs: RwLock::new(Documents::from_records(records)),
            hub: ChangeHub::new(),
            backend,
            history_limit: HISTORY_LIMIT,
        }
    }

    /// Bound the live message window; 0 means unbounded.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    fn restore_index(&self, previous: &[Conversation]) {
        if let Err(e) = self.backend.save_index(previous) {
            tracing::error!(error = %e, "Failed to restore conversation index");
        }
    }
}

#[async_trait::async_trait]
impl<B: Backend> ConversationStore for DocumentStore<B> {
    async fn create_conversation(&self, owner: &str) -> Result<Conversation> {
        if owner.trim().is_empty() {
            return Err(TutorError::validation("owner id is required"));
        }

        let mut docs = self.docs.write().await;
        let created_at = docs.next_created_at();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: placeholder_title(created_at),
            created_at,
        };
        let record = ConversationRecord {
            conversation: conversation.clone(),
            messages: Vec::new(),
        };

        let previous = docs.all();
        let mut index = previous.clone();
        index.insert(0, conversation.clone());
        self.backend
            .save_index(&index)
            .map_err(|e| TutorError::StoreUnavailable(e.to_string()))?;
        if let Err(e) = self.backend.save_record(&record) {
            self.restore_index(&previous);
            return Err(TutorError::StoreUnavailable(e.to_string()));
        }

        docs.records.insert(conversation.id.clone(), record);
        docs.last_created_at = Some(created_at);
        self.hub.publish_conversations(owner, docs.list(owner));

        tracing::info!(conversation_id = %conversation.id, owner, "Created conversation");
        Ok(conversation)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let docs = self.docs.read().await;
        Ok(docs.record(conversation_id)?.conversation.clone())
    }

    async fn list_conversations(&self, owner: &str) -> Result<Vec<Conversation>> {
        let docs = self.docs.read().await;
        Ok(docs.list(owner))
    }

    async fn subscribe_conversations(
        &self,
        owner: &str,
    ) -> Result<Subscription<Vec<Conversation>>> {
        let docs = self.docs.read().await;
        Ok(self.hub.subscribe_conversations(owner, docs.list(owner)))
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let docs = self.docs.read().await;
        Ok(docs.record(conversation_id)?.window(self.history_limit))
    }

    async fn select_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Subscription<Vec<ChatMessage>>> {
        let docs = self.docs.read().await;
        let window = docs.record(conversation_id)?.window(self.history_limit);
        Ok(self.hub.subscribe_messages(conversation_id, window))
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<ChatMessage> {
        let mut docs = self.docs.write().await;
        let mut record = docs
            .record(conversation_id)?
            .clone();

        let stored = ChatMessage {
            id: Uuid::new_v4().to_string(),
            text: message.text,
            sender: message.sender,
            timestamp: message.timestamp,
        };
        record.insert_ordered(stored.clone());

        self.backend
            .save_record(&record)
            .map_err(|e| TutorError::WriteFailed(e.to_string()))?;

        let window = record.window(self.history_limit);
        docs.records.insert(conversation_id.to_string(), record);
        self.hub.publish_messages(conversation_id, window);

        tracing::debug!(conversation_id, sender = ?stored.sender, "Appended message");
        Ok(stored)
    }

    async fn update_title(&self, conversation_id: &str, title: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        let mut record = docs
            .record(conversation_id)?
            .clone();
        if record.conversation.title == title {
            return Ok(());
        }
        record.conversation.title = title.to_string();

        let previous = docs.all();
        let index: Vec<Conversation> = previous
            .iter()
            .map(|c| {
                if c.id == conversation_id {
                    record.conversation.clone()
                } else {
                    c.clone()
                }
            })
            .collect();
        self.backend
            .save_index(&index)
            .map_err(|e| TutorError::WriteFailed(e.to_string()))?;
        if let Err(e) = self.backend.save_record(&record) {
            self.restore_index(&previous);
            return Err(TutorError::WriteFailed(e.to_string()));
        }

        let owner = record.conversation.owner.clone();
        docs.records.insert(conversation_id.to_string(), record);
        self.hub.publish_conversations(&owner, docs.list(&owner));

        tracing::info!(conversation_id, "Updated conversation title");
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        let owner = docs.record(conversation_id)?.conversation.owner.clone();
        let message_count = docs.record(conversation_id)?.messages.len();

        let previous = docs.all();
        let index: Vec<Conversation> = previous
            .iter()
            .filter(|c| c.id != conversation_id)
            .cloned()
            .collect();
        self.backend
            .save_index(&index)
            .map_err(|e| TutorError::WriteFailed(e.to_string()))?;
        if let Err(e) = self.backend.remove_record(conversation_id) {
            self.restore_index(&previous);
            return Err(TutorError::WriteFailed(e.to_string()));
        }

        docs.records.remove(conversation_id);
        self.hub.close_messages(conversation_id);
        self.hub.publish_conversations(&owner, docs.list(&owner));

        tracing::info!(conversation_id, message_count, "Deleted conversation and its messages");
        Ok(())
    }
}
