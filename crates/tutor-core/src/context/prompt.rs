use crate::context::sanitize::strip_html;
use crate::llm::Message;
use crate::store::{ChatMessage, Sender};

/// Builds the ordered prompt for one completion request.
///
/// The result always holds exactly one leading system entry and exactly one
/// trailing user entry, with the filtered history in between.
pub struct PromptBuilder<'a> {
    system_prompt: &'a str,
    history: &'a [ChatMessage],
}

impl<'a> PromptBuilder<'a> {
    pub fn new(system_prompt: &'a str) -> Self {
        Self {
            system_prompt,
            history: &[],
        }
    }

    /// History in timestamp order, as captured at turn start.
    pub fn with_history(mut self, history: &'a [ChatMessage]) -> Self {
        self.history = history;
        self
    }

    pub fn build(self, new_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.system_prompt));
        messages.extend(self.history.iter().filter_map(history_entry));
        messages.push(Message::user(strip_html(new_message)));
        messages
    }
}

fn history_entry(message: &ChatMessage) -> Option<Message> {
    let content = strip_html(&message.text);
    match message.sender {
        Sender::User => Some(Message::user(content)),
        Sender::Assistant => Some(Message::assistant(content)),
        Sender::Unknown => None,
    }
}

/// Shorthand for `PromptBuilder::new(system).with_history(history).build(new)`.
pub fn build_prompt(system_prompt: &str, history: &[ChatMessage], new_message: &str) -> Vec<Message> {
    PromptBuilder::new(system_prompt)
        .with_history(history)
        .build(new_message)
}
