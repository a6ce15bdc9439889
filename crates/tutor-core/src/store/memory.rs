use super::{Backend, Conversation, ConversationRecord, DocumentStore};
use crate::error::Result;

/// Backend that keeps nothing beyond the process lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct Volatile;

impl Backend for Volatile {
    fn load(&self) -> Result<Vec<ConversationRecord>> {
        Ok(Vec::new())
    }

    fn save_record(&self, _record: &ConversationRecord) -> Result<()> {
        Ok(())
    }

    fn save_index(&self, _conversations: &[Conversation]) -> Result<()> {
        Ok(())
    }

    fn remove_record(&self, _conversation_id: &str) -> Result<()> {
        Ok(())
    }
}

pub type MemoryStore = DocumentStore<Volatile>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_loaded(Volatile, Vec::new())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
