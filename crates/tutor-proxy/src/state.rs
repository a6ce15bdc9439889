use std::sync::Arc;

use tutor_core::{Settings, TurnService, Tutor, TutorError};

/// Shared handler state.
///
/// `tutor` is `None` when no API key was available at startup; the endpoint
/// still serves and answers every valid request with a configuration error.
#[derive(Clone)]
pub struct AppState {
    pub tutor: Option<Arc<dyn TurnService>>,
}

impl AppState {
    pub fn with_tutor(tutor: Arc<dyn TurnService>) -> Self {
        Self { tutor: Some(tutor) }
    }

    pub fn unconfigured() -> Self {
        Self { tutor: None }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TutorError> {
        match Tutor::from_settings(settings) {
            Ok(tutor) => Ok(Self::with_tutor(Arc::new(tutor))),
            Err(TutorError::Unconfigured(reason)) => {
                tracing::warn!(%reason, "Completion service not configured; chat requests will fail");
                Ok(Self::unconfigured())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.tutor.is_some()
    }
}
