pub mod error;
pub mod constants;
pub mod config;
pub mod llm;
pub mod context;
pub mod store;
pub mod tutor;
pub mod session;
pub mod proxy;

// Re-export key types
pub use error::{Result, TutorError};
pub use config::Settings;
pub use llm::{CompletionOptions, LlmClient, LlmResponse, Message, OpenAIClient, Role};
pub use context::{build_prompt, strip_html, PromptBuilder};
pub use store::{
    ChatMessage, Conversation, ConversationStore, FileStore, MemoryStore, NewMessage, Sender,
    Subscription,
};
pub use tutor::{should_generate_title, TurnService, Tutor};
pub use session::{ChatSession, LocalNotice, TurnOutcome};
pub use proxy::{ContextEntry, ProxyFailure, ProxyReply, ProxyRequest, RemoteTutor};
