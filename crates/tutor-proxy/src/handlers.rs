use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tutor_core::context::log_preview;
use tutor_core::{ProxyFailure, ProxyReply, ProxyRequest, TutorError};

use crate::state::AppState;

const METHOD_NOT_ALLOWED: &str = "Method not allowed. Only POST is accepted.";

/// Error body plus the status it is served with.
pub struct ApiError {
    status: StatusCode,
    body: ProxyFailure,
}

impl ApiError {
    fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ProxyFailure {
                message: message.into(),
                error: None,
            },
        }
    }
}

impl From<TutorError> for ApiError {
    fn from(error: TutorError) -> Self {
        let status = match error {
            TutorError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ProxyFailure::from_error(&error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[tracing::instrument(skip_all, fields(generate_title = tracing::field::Empty))]
pub async fn chat_tutor_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyReply>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed chat request");
        ApiError::message(StatusCode::BAD_REQUEST, "The user message is required.")
    })?;
    tracing::Span::current().record("generate_title", request.generate_title);

    let message = request.validated_message()?;

    let Some(tutor) = state.tutor.as_ref() else {
        tracing::error!("Chat request received but the completion service is not configured");
        return Err(TutorError::Unconfigured("missing API key".into()).into());
    };

    tracing::debug!(
        message = %log_preview(message),
        context = request.conversation_context.len(),
        "Processing chat request"
    );

    let result = if request.generate_title {
        tutor.generate_title(message).await
    } else {
        tutor.reply(&request.history(), message).await
    };
    let text = result.map_err(|e| {
        tracing::error!(error = %e, code = e.code(), "Chat request failed");
        ApiError::from(e)
    })?;

    Ok(Json(ProxyReply { text }))
}

pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::message(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub configured: bool,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            configured: state.is_configured(),
        }),
    )
}
