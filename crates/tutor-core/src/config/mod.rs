use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{completion, conversation, endpoints, models, prompts, storage};
use crate::error::TutorError;
use crate::llm::{CompletionOptions, OpenAIClient};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub tutor: TutorSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    /// Name of the environment variable holding the credential.
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub title_temperature: f32,
    pub title_max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorSettings {
    pub system_prompt: String,
    pub title_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Where the file store keeps conversations. `None` uses the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Live message window per conversation; 0 means unbounded.
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub bind_addr: String,
    /// Endpoint the remote client posts turns to.
    pub endpoint_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: models::DEFAULT_MODEL.to_string(),
            api_key_env: endpoints::API_KEY_ENV.to_string(),
            base_url: None,
            temperature: completion::TEMPERATURE,
            max_tokens: completion::MAX_TOKENS,
            title_temperature: completion::TITLE_TEMPERATURE,
            title_max_tokens: completion::TITLE_MAX_TOKENS,
        }
    }
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            system_prompt: prompts::TUTOR_SYSTEM_PROMPT.to_string(),
            title_prompt: prompts::TITLE_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            history_limit: conversation::HISTORY_LIMIT,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            bind_addr: endpoints::PROXY_BIND_ADDR.to_string(),
            endpoint_url: endpoints::PROXY_URL.to_string(),
        }
    }
}

impl LlmSettings {
    pub fn turn_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn title_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.title_temperature,
            max_tokens: self.title_max_tokens,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(storage::APP_DIR)
            .join(storage::CONFIG_FILE)
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(settings) => return settings,
                Err(e) => tracing::warn!(path = %config_path.display(), error = %e, "Ignoring config file"),
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self, TutorError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings =
            toml::from_str(&content).map_err(|e| TutorError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), TutorError> {
        if self.tutor.system_prompt.trim().is_empty() {
            return Err(TutorError::Config("tutor.system_prompt must not be empty".into()));
        }
        if self.tutor.title_prompt.trim().is_empty() {
            return Err(TutorError::Config("tutor.title_prompt must not be empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(TutorError::Config("llm.model must not be empty".into()));
        }
        Ok(())
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(endpoints::COMPLETION_BASE_URL)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.store.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(storage::APP_DIR)
        })
    }

    /// Build the completion client. Fails when the credential is absent.
    pub fn build_llm_client(&self) -> Result<OpenAIClient, TutorError> {
        let api_key = self.api_key().ok_or_else(|| {
            TutorError::Unconfigured(format!(
                "Set the {} environment variable",
                self.llm.api_key_env
            ))
        })?;
        Ok(OpenAIClient::new(api_key)
            .with_model(&self.llm.model)
            .with_base_url(self.base_url()))
    }
}
