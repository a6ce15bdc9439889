/// Chat Tutor — centralized constants.
/// All magic numbers, strings, and limits live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const COMPLETION_BASE_URL: &str = "https://llmapi.thalarislabs.com";
    pub const COMPLETIONS_PATH: &str = "/chat/completions";
    pub const API_KEY_ENV: &str = "THALARIS_API_KEY";

    /// Route the proxy serves and the remote client posts to.
    pub const PROXY_ROUTE: &str = "/api/chat-tutor";
    pub const PROXY_ROUTE_ALIAS: &str = "/api/chat";
    pub const PROXY_BIND_ADDR: &str = "127.0.0.1:3000";
    pub const PROXY_URL: &str = "http://127.0.0.1:3000/api/chat-tutor";
}

// ─── Completion Parameters ────────────────────────────────────────────────────

pub mod completion {
    pub const TEMPERATURE: f32 = 0.7;
    pub const MAX_TOKENS: u32 = 500;
    /// Budget for longer tutoring answers.
    pub const LONG_MAX_TOKENS: u32 = 2000;

    pub const TITLE_TEMPERATURE: f32 = 0.5;
    pub const TITLE_MAX_TOKENS: u32 = 20;
}

// ─── Prompts ──────────────────────────────────────────────────────────────────

pub mod prompts {
    pub const TUTOR_SYSTEM_PROMPT: &str = "You are a very kind and patient academic tutor. \
Your goal is to explain complex concepts simply, resolve doubts and guide the student in their learning. \
Always offer clear examples and encourage curiosity. \
Adapt your explanations to the user's level and to the topic. Be concise but complete.";

    pub const TITLE_SYSTEM_PROMPT: &str = "Produce a title of at most 5 to 7 words that summarizes \
the student's message. Reply with the title only, without quotes or trailing punctuation.";
}

// ─── Conversations ────────────────────────────────────────────────────────────

pub mod conversation {
    /// Prefix of the title a conversation carries until it is titled.
    pub const PLACEHOLDER_PREFIX: &str = "New conversation";
    pub const PLACEHOLDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Most recent messages kept in a conversation's live window.
    pub const HISTORY_LIMIT: usize = 50;
}

// ─── Storage ──────────────────────────────────────────────────────────────────

pub mod storage {
    pub const APP_DIR: &str = "chat-tutor";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const CONVERSATIONS_DIR: &str = "conversations";
    pub const INDEX_FILE: &str = "index.json";
}

// ─── Logging ──────────────────────────────────────────────────────────────────

pub mod logging {
    /// Longest slice of user text that may appear in a log line.
    pub const MAX_PREVIEW_CHARS: usize = 100;
}
