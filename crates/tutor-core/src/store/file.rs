use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Backend, Conversation, ConversationRecord, DocumentStore};
use crate::constants::storage::{CONVERSATIONS_DIR, INDEX_FILE};
use crate::error::{Result, TutorError};

/// Index of all conversations, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConversationIndex {
    conversations: Vec<Conversation>,
}

/// JSON documents on disk: one index file plus one file per conversation
/// holding the conversation and all of its messages.
pub struct JsonFiles {
    base_dir: PathBuf,
}

impl JsonFiles {
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| {
            TutorError::StoreUnavailable(format!(
                "Failed to create conversations directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE)
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", id))
    }

    fn load_index(&self) -> Result<ConversationIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(ConversationIndex::default());
        }
        let contents = fs::read_to_string(&path).map_err(|e| {
            TutorError::StoreUnavailable(format!("Failed to read index file: {}", e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            TutorError::StoreUnavailable(format!("Failed to parse index file: {}", e))
        })
    }
}

/// Write through a temporary file so readers never see a partial document.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).map_err(|e| {
        TutorError::WriteFailed(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        TutorError::WriteFailed(format!("Failed to rename {}: {}", tmp_path.display(), e))
    })
}

impl Backend for JsonFiles {
    fn load(&self) -> Result<Vec<ConversationRecord>> {
        let index = self.load_index()?;
        let mut records = Vec::with_capacity(index.conversations.len());

        for conversation in index.conversations {
            let path = self.conversation_path(&conversation.id);
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conversation.id,
                        error = %e,
                        "Skipping conversation with unreadable document"
                    );
                    continue;
                }
            };
            match serde_json::from_str::<ConversationRecord>(&contents) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    conversation_id = %conversation.id,
                    error = %e,
                    "Skipping conversation with corrupt document"
                ),
            }
        }

        Ok(records)
    }

    fn save_record(&self, record: &ConversationRecord) -> Result<()> {
        let contents = serde_json::to_string_pretty(record)?;
        write_atomic(&self.conversation_path(&record.conversation.id), &contents)
    }

    fn save_index(&self, conversations: &[Conversation]) -> Result<()> {
        let index = ConversationIndex {
            conversations: conversations.to_vec(),
        };
        let contents = serde_json::to_string_pretty(&index)?;
        write_atomic(&self.index_path(), &contents)
    }

    fn remove_record(&self, conversation_id: &str) -> Result<()> {
        let path = self.conversation_path(conversation_id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                TutorError::WriteFailed(format!("Failed to delete conversation file: {}", e))
            })?;
        }
        Ok(())
    }
}

pub type FileStore = DocumentStore<JsonFiles>;

impl FileStore {
    /// Open (or create) a store rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let backend = JsonFiles::open(data_dir.as_ref().join(CONVERSATIONS_DIR))?;
        Self::with_backend(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{placeholder_title, ChatMessage, Sender};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(id: &str) -> ConversationRecord {
        let created_at = Utc::now();
        ConversationRecord {
            conversation: Conversation {
                id: id.to_string(),
                owner: "owner".to_string(),
                title: placeholder_title(created_at),
                created_at,
            },
            messages: vec![ChatMessage {
                id: "m1".to_string(),
                text: "hello".to_string(),
                sender: Sender::User,
                timestamp: created_at,
            }],
        }
    }

    #[test]
    fn test_save_and_load_records() {
        let dir = TempDir::new().unwrap();
        let files = JsonFiles::open(dir.path()).unwrap();

        let rec = record("c1");
        files.save_record(&rec).unwrap();
        files.save_index(&[rec.conversation.clone()]).unwrap();

        let loaded = files.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].conversation, rec.conversation);
        assert_eq!(loaded[0].messages, rec.messages);
        assert!(!dir.path().join("index.json.tmp").exists());
    }

    #[test]
    fn test_remove_record_deletes_messages_document() {
        let dir = TempDir::new().unwrap();
        let files = JsonFiles::open(dir.path()).unwrap();
        let rec = record("c1");
        files.save_record(&rec).unwrap();

        files.remove_record("c1").unwrap();
        assert!(!dir.path().join("c1.json").exists());
        // Removing twice is fine.
        files.remove_record("c1").unwrap();
    }

    #[test]
    fn test_load_skips_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let files = JsonFiles::open(dir.path()).unwrap();
        let good = record("good");
        let bad = record("bad");
        files.save_record(&good).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        files
            .save_index(&[good.conversation.clone(), bad.conversation.clone()])
            .unwrap();

        let loaded = files.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].conversation.id, "good");
    }
}
