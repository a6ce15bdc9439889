use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

use super::{ChatMessage, Conversation, Subscription};

type Channels<T> = Mutex<HashMap<String, watch::Sender<T>>>;

/// Fan-out of store snapshots to live subscribers.
///
/// Callers publish while holding the store's write lock and subscribe while
/// holding its read lock, so a new subscriber never starts from a stale
/// snapshot.
#[derive(Default)]
pub struct ChangeHub {
    conversations: Channels<Vec<Conversation>>,
    messages: Channels<Vec<ChatMessage>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_conversations(
        &self,
        owner: &str,
        current: Vec<Conversation>,
    ) -> Subscription<Vec<Conversation>> {
        subscribe(&self.conversations, owner, current)
    }

    pub fn publish_conversations(&self, owner: &str, snapshot: Vec<Conversation>) {
        publish(&self.conversations, owner, snapshot);
    }

    pub fn subscribe_messages(
        &self,
        conversation_id: &str,
        current: Vec<ChatMessage>,
    ) -> Subscription<Vec<ChatMessage>> {
        subscribe(&self.messages, conversation_id, current)
    }

    pub fn publish_messages(&self, conversation_id: &str, snapshot: Vec<ChatMessage>) {
        publish(&self.messages, conversation_id, snapshot);
    }

    /// End every message subscription of a conversation.
    pub fn close_messages(&self, conversation_id: &str) {
        let mut channels = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        if channels.remove(conversation_id).is_some() {
            tracing::debug!(conversation_id, "Closed message subscriptions");
        }
    }

    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        let channels = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .get(conversation_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

fn subscribe<T: Clone>(channels: &Channels<T>, key: &str, current: T) -> Subscription<T> {
    let mut channels = channels.lock().unwrap_or_else(|e| e.into_inner());
    let rx = match channels.get(key) {
        // Every change since the channel was opened has been published to it.
        Some(tx) => tx.subscribe(),
        None => {
            let (tx, rx) = watch::channel(current);
            channels.insert(key.to_string(), tx);
            rx
        }
    };
    Subscription::new(rx)
}

fn publish<T>(channels: &Channels<T>, key: &str, snapshot: T) {
    let mut channels = channels.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(tx) = channels.get(key) {
        if tx.receiver_count() == 0 {
            channels.remove(key);
        } else {
            tx.send_replace(snapshot);
        }
    }
}
