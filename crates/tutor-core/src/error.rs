use thiserror::Error;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Completion service rejected credentials (HTTP {status})")]
    Auth { status: u16 },

    #[error("Completion service rate limit reached")]
    RateLimited,

    #[error("Completion service unreachable: {0}")]
    Unreachable(String),

    #[error("Completion service error: {0}")]
    Service(String),

    #[error("Completion service is not configured: {0}")]
    Unconfigured(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store write failed: {0}")]
    WriteFailed(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Title generation failed: {0}")]
    TitleGenerationFailed(String),

    #[error("A turn is already in progress for this conversation")]
    TurnInProgress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TutorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Stable identifier carried in proxy error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Auth { .. } => "auth",
            Self::RateLimited => "rate_limited",
            Self::Unreachable(_) => "unreachable",
            Self::Service(_) => "service",
            Self::Unconfigured(_) => "unconfigured",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::WriteFailed(_) => "write_failed",
            Self::ConversationNotFound(_) => "not_found",
            Self::TitleGenerationFailed(_) => "title_failed",
            Self::TurnInProgress => "busy",
            Self::Config(_) | Self::Io(_) | Self::Json(_) => "internal",
        }
    }

    /// Rebuild an error from a proxy error body.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "validation" => Self::Validation(message),
            "auth" => Self::Auth { status: 401 },
            "rate_limited" => Self::RateLimited,
            "unreachable" => Self::Unreachable(message),
            "unconfigured" => Self::Unconfigured(message),
            _ => Self::Service(message),
        }
    }

    /// True for failures of the completion service itself.
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::RateLimited | Self::Unreachable(_) | Self::Service(_)
        )
    }

    /// Message suitable for showing to the person chatting.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Auth { .. } => {
                "Authentication with the tutor service failed. Please contact the administrator."
                    .to_string()
            }
            Self::RateLimited => {
                "Too many requests to the tutor. Please wait a moment and try again.".to_string()
            }
            Self::Unreachable(_) => {
                "Could not reach the tutor service. Check your connection or try again later."
                    .to_string()
            }
            Self::Service(msg) if !msg.is_empty() => format!("Service error: {msg}"),
            Self::Service(_) => {
                "Something went wrong talking to the tutor. Please try again later.".to_string()
            }
            Self::Unconfigured(_) => {
                "Internal error: the tutor service is not configured correctly.".to_string()
            }
            Self::TurnInProgress => {
                "The tutor is still answering your previous message.".to_string()
            }
            Self::StoreUnavailable(_) | Self::WriteFailed(_) => {
                "Could not save the conversation. Please try again.".to_string()
            }
            Self::ConversationNotFound(_) => "That conversation no longer exists.".to_string(),
            Self::TitleGenerationFailed(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => {
                "Something went wrong while preparing the answer. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_for_completion_failures() {
        for err in [
            TutorError::Auth { status: 403 },
            TutorError::RateLimited,
            TutorError::Unreachable("refused".into()),
            TutorError::service("boom"),
        ] {
            let rebuilt = TutorError::from_code(err.code(), "x");
            assert_eq!(rebuilt.code(), err.code());
            assert!(rebuilt.is_completion_failure());
        }
    }

    #[test]
    fn test_user_messages() {
        assert!(TutorError::RateLimited.user_message().contains("wait"));
        assert!(TutorError::Auth { status: 401 }
            .user_message()
            .contains("administrator"));
        assert_eq!(
            TutorError::service("quota exhausted").user_message(),
            "Service error: quota exhausted"
        );
        assert!(!TutorError::WriteFailed("disk".into()).is_completion_failure());
    }
}
