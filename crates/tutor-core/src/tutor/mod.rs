//! Context Assembler & Completion Client.

use std::sync::Arc;

use crate::config::Settings;
use crate::context::{build_prompt, log_preview};
use crate::error::{Result, TutorError};
use crate::llm::{CompletionOptions, LlmClient, Message};
use crate::store::{is_placeholder_title, ChatMessage};

/// Produces replies and titles for a chat session.
///
/// Implemented in-process by [`Tutor`] and over HTTP by
/// [`RemoteTutor`](crate::proxy::RemoteTutor).
#[async_trait::async_trait]
pub trait TurnService: Send + Sync {
    /// Reply to `message` given the history captured at turn start.
    async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String>;

    /// Short title summarizing a conversation's first message.
    async fn generate_title(&self, first_message: &str) -> Result<String>;
}

/// Title generation runs only for a conversation's first exchange.
pub fn should_generate_title(history_was_empty: bool, current_title: &str) -> bool {
    history_was_empty && is_placeholder_title(current_title)
}

pub struct Tutor {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    title_prompt: String,
    turn_options: CompletionOptions,
    title_options: CompletionOptions,
}

impl Tutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_settings(llm, &Settings::default())
    }

    pub fn with_settings(llm: Arc<dyn LlmClient>, settings: &Settings) -> Self {
        Self {
            llm,
            system_prompt: settings.tutor.system_prompt.clone(),
            title_prompt: settings.tutor.title_prompt.clone(),
            turn_options: settings.llm.turn_options(),
            title_options: settings.llm.title_options(),
        }
    }

    /// Build a tutor backed by the configured completion service.
    /// Fails with [`TutorError::Unconfigured`] when the credential is absent.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let client = settings.build_llm_client()?;
        tracing::info!(model = client.model(), "Completion client initialized");
        Ok(Self::with_settings(Arc::new(client), settings))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_turn_options(mut self, options: CompletionOptions) -> Self {
        self.turn_options = options;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn turn_options(&self) -> CompletionOptions {
        self.turn_options
    }

    pub fn build_prompt(&self, history: &[ChatMessage], new_message: &str) -> Vec<Message> {
        build_prompt(&self.system_prompt, history, new_message)
    }

    /// Dispatch a prompt. Every failure is terminal for the turn.
    pub async fn send_turn(
        &self,
        prompt: &[Message],
        options: &CompletionOptions,
    ) -> Result<String> {
        let response = self.llm.complete(prompt, options).await.map_err(|e| {
            tracing::error!(error = %e, code = e.code(), "Completion request failed");
            e
        })?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Completion usage"
            );
        }

        if response.text.trim().is_empty() {
            return Err(TutorError::service("The tutor returned an empty answer"));
        }
        Ok(response.text)
    }

    /// Ask for a short title. Any failure comes back as
    /// [`TutorError::TitleGenerationFailed`].
    pub async fn generate_title(&self, first_message: &str) -> Result<String> {
        let prompt = build_prompt(&self.title_prompt, &[], first_message);
        let text = self
            .send_turn(&prompt, &self.title_options)
            .await
            .map_err(|e| TutorError::TitleGenerationFailed(e.to_string()))?;

        let title = text.trim().to_string();
        tracing::debug!(title = %log_preview(&title), "Generated conversation title");
        Ok(title)
    }
}

#[async_trait::async_trait]
impl TurnService for Tutor {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String> {
        let prompt = self.build_prompt(history, message);
        tracing::debug!(
            entries = prompt.len(),
            message = %log_preview(message),
            "Assembled prompt"
        );
        self.send_turn(&prompt, &self.turn_options).await
    }

    async fn generate_title(&self, first_message: &str) -> Result<String> {
        Tutor::generate_title(self, first_message).await
    }
}
