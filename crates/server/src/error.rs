//! Maps the shared error taxonomy onto HTTP status codes (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use orchestrator_core::Error;
use serde_json::json;

/// Wraps [`orchestrator_core::Error`] so it can be returned directly from a
/// handler's `Result`.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            Error::TransportUnavailable(_) | Error::TransportLost(_) => StatusCode::BAD_GATEWAY,
            Error::TranscriptionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::LlmFailed(_) => StatusCode::BAD_GATEWAY,
            Error::SearchUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::SearchTimeout => StatusCode::GATEWAY_TIMEOUT,
            Error::InvalidToolCall(_) => StatusCode::BAD_REQUEST,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::UnknownRoom(_) | Error::UnknownSession(_) => StatusCode::NOT_FOUND,
            Error::TerminationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Stalled { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.to_string(), "kind": self.0.kind() }))).into_response()
    }
}
