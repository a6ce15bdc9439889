use crate::constants::{endpoints, models};
use crate::error::TutorError;
use crate::llm::traits::*;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: models::DEFAULT_MODEL.to_string(),
            base_url: endpoints::COMPLETION_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url, endpoints::COMPLETIONS_PATH)
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: Option<String>,
}

/// Map a non-success status and its body onto the error taxonomy.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> TutorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TutorError::Auth {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => TutorError::RateLimited,
        _ => {
            let upstream = serde_json::from_str::<OpenAIErrorBody>(body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_default();
            TutorError::Service(upstream)
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<LlmResponse, TutorError> {
        let url = self.completions_url();
        let request_body = OpenAIRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            max_tokens = options.max_tokens,
            "Dispatching completion request"
        );

        // No response at all is the only case classified as unreachable.
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| TutorError::Unreachable(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| TutorError::service(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Completion service returned an error");
            return Err(classify_failure(status, &response_text));
        }

        let api_response: OpenAIResponse = serde_json::from_str(&response_text)
            .map_err(|e| TutorError::service(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TutorError::service("No response from API"))?;

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            usage: api_response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_statuses() {
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, ""),
            TutorError::Auth { status: 401 }
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, ""),
            TutorError::Auth { status: 403 }
        ));
    }

    #[test]
    fn test_classify_extracts_upstream_message() {
        let body = r#"{"error":{"message":"model overloaded","type":"server_error"}}"#;
        match classify_failure(StatusCode::SERVICE_UNAVAILABLE, body) {
            TutorError::Service(msg) => assert_eq!(msg, "model overloaded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_unparseable_body_has_empty_message() {
        match classify_failure(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") {
            TutorError::Service(msg) => assert!(msg.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_request_serializes_roles_lowercase() {
        let messages = vec![Message::system("s"), Message::user("u")];
        let body = OpenAIRequest {
            model: "m",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 500,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenAIClient::new("k").with_base_url("http://localhost:9/");
        assert_eq!(client.completions_url(), "http://localhost:9/chat/completions");
    }
}
