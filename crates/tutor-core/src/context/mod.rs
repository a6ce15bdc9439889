mod prompt;
pub mod sanitize;

pub use prompt::{build_prompt, PromptBuilder};
pub use sanitize::{log_preview, strip_html};
