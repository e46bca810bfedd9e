use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storyteller_core::StoryError;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Story(#[from] StoryError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Story(e) => match e {
                StoryError::MissingField(_) => StatusCode::BAD_REQUEST,
                StoryError::SceneNotFound(_) => StatusCode::NOT_FOUND,
                StoryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                StoryError::RemoteCallFailed(_)
                | StoryError::GenerationFailed(_)
                | StoryError::NoAssistantReply
                | StoryError::MalformedReply { .. }
                | StoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        let body = match &self {
            ApiError::Story(StoryError::GenerationFailed(state)) => {
                json!({ "error": self.to_string(), "status": state.as_str() })
            }
            ApiError::Story(StoryError::MalformedReply { raw, .. }) => {
                json!({ "error": self.to_string(), "raw": raw })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
