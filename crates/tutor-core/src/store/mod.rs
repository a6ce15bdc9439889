//! Conversation Store Adapter.
//!
//! Conversations are owned by one account and exclusively own their messages.
//! Every backend keeps messages ordered by timestamp (ties keep insertion
//! order) and pushes full snapshots to live subscribers after each change.

mod document;
mod file;
mod hub;
mod memory;
mod subscription;

pub use document::{Backend, ConversationRecord, DocumentStore};
pub use file::{FileStore, JsonFiles};
pub use hub::ChangeHub;
pub use memory::{MemoryStore, Volatile};
pub use subscription::Subscription;

use chrono::{DateTime, Local, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constants::conversation::{PLACEHOLDER_PREFIX, PLACEHOLDER_TIME_FORMAT};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_placeholder_title(&self) -> bool {
        is_placeholder_title(&self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "bot")]
    Assistant,
    /// Anything else found in storage; never sent to the model.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// A message not yet written; the store assigns its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl NewMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Title a conversation carries until its first exchange is titled.
pub fn placeholder_title(created_at: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        PLACEHOLDER_PREFIX,
        created_at
            .with_timezone(&Local)
            .format(PLACEHOLDER_TIME_FORMAT)
    )
}

pub fn is_placeholder_title(title: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&format!(
                r"^{} \d{{4}}-\d{{2}}-\d{{2}} \d{{2}}:\d{{2}}:\d{{2}}$",
                regex::escape(PLACEHOLDER_PREFIX)
            ))
            .expect("placeholder pattern is valid")
        })
        .is_match(title)
}

/// CRUD and live reads over conversations and their messages.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation with a placeholder title.
    async fn create_conversation(&self, owner: &str) -> Result<Conversation>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation>;

    /// Current conversations of `owner`, newest first.
    async fn list_conversations(&self, owner: &str) -> Result<Vec<Conversation>>;

    /// Live version of [`list_conversations`](Self::list_conversations).
    async fn subscribe_conversations(&self, owner: &str)
        -> Result<Subscription<Vec<Conversation>>>;

    /// Current message window of a conversation, oldest first.
    async fn messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;

    /// Live message window of a conversation. Ends when it is deleted.
    async fn select_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Subscription<Vec<ChatMessage>>>;

    async fn append_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<ChatMessage>;

    /// Set only the title; every other field is preserved.
    async fn update_title(&self, conversation_id: &str, title: &str) -> Result<()>;

    /// Remove a conversation together with all of its messages.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
}
