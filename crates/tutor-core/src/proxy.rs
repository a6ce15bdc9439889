//! Wire format of the proxy endpoint and an HTTP client for it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};
use crate::store::{ChatMessage, Sender};
use crate::tutor::TurnService;

/// One history entry as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextEntry {
    pub sender: Sender,
    pub text: String,
}

impl From<&ChatMessage> for ContextEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            sender: message.sender,
            text: message.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_context: Vec<ContextEntry>,
    #[serde(default)]
    pub generate_title: bool,
}

impl ProxyRequest {
    /// The required message, rejected when missing or blank.
    pub fn validated_message(&self) -> Result<&str> {
        match self.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => Ok(message),
            _ => Err(TutorError::validation("The user message is required.")),
        }
    }

    /// Submitted context as messages in the order given.
    pub fn history(&self) -> Vec<ChatMessage> {
        let base = chrono::Utc::now();
        self.conversation_context
            .iter()
            .enumerate()
            .map(|(i, entry)| ChatMessage {
                id: format!("ctx-{i}"),
                text: entry.text.clone(),
                sender: entry.sender,
                timestamp: base + chrono::Duration::milliseconds(i as i64),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyReply {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyFailure {
    pub message: String,
    /// Error code from [`TutorError::code`]; absent for transport-level errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProxyFailure {
    pub fn from_error(error: &TutorError) -> Self {
        Self {
            message: error.user_message(),
            error: Some(error.code().to_string()),
        }
    }

    pub fn into_error(self, status: u16) -> TutorError {
        match self.error.as_deref() {
            Some(code) => TutorError::from_code(code, self.message),
            None if status == 400 => TutorError::Validation(self.message),
            None => TutorError::Service(self.message),
        }
    }
}

/// [`TurnService`] that relays turns to a proxy endpoint.
pub struct RemoteTutor {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteTutor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &ProxyRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TutorError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TutorError::service(format!("Failed to read proxy response: {e}")))?;

        if status.is_success() {
            let reply: ProxyReply = serde_json::from_str(&body)
                .map_err(|e| TutorError::service(format!("Malformed proxy response: {e}")))?;
            return Ok(reply.text);
        }

        tracing::warn!(status = status.as_u16(), "Proxy returned an error");
        let failure = serde_json::from_str::<ProxyFailure>(&body).unwrap_or(ProxyFailure {
            message: format!("Server error ({})", status.as_u16()),
            error: None,
        });
        Err(failure.into_error(status.as_u16()))
    }
}

#[async_trait::async_trait]
impl TurnService for RemoteTutor {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String> {
        let request = ProxyRequest {
            message: Some(message.to_string()),
            conversation_context: history.iter().map(ContextEntry::from).collect(),
            generate_title: false,
        };
        self.post(&request).await
    }

    async fn generate_title(&self, first_message: &str) -> Result<String> {
        let request = ProxyRequest {
            message: Some(first_message.to_string()),
            conversation_context: Vec::new(),
            generate_title: true,
        };
        self.post(&request)
            .await
            .map(|title| title.trim().to_string())
            .map_err(|e| TutorError::TitleGenerationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_camel_case_with_bot_sender() {
        let json = r#"{
            "message": "And the second derivative?",
            "conversationContext": [
                {"sender": "user", "text": "What is a derivative?"},
                {"sender": "bot", "text": "<p>A rate of change.</p>"}
            ]
        }"#;
        let request: ProxyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.validated_message().unwrap(), "And the second derivative?");
        assert!(!request.generate_title);

        let history = request.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sender, Sender::Assistant);
        assert!(history[0].timestamp < history[1].timestamp);
    }

    #[test]
    fn test_missing_or_blank_message_is_validation_error() {
        let missing: ProxyRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            missing.validated_message(),
            Err(TutorError::Validation(_))
        ));

        let blank: ProxyRequest = serde_json::from_str(r#"{"message":"   "}"#).unwrap();
        assert!(blank.validated_message().is_err());
    }

    #[test]
    fn test_failure_without_code_maps_by_status() {
        let failure = ProxyFailure {
            message: "bad".into(),
            error: None,
        };
        assert!(matches!(failure.clone().into_error(400), TutorError::Validation(_)));
        assert!(matches!(failure.into_error(500), TutorError::Service(_)));
    }

    #[test]
    fn test_failure_round_trips_rate_limit() {
        let failure = ProxyFailure::from_error(&TutorError::RateLimited);
        let json = serde_json::to_string(&failure).unwrap();
        let parsed: ProxyFailure = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.into_error(500), TutorError::RateLimited));
    }
}
