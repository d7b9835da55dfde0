//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use repsense_common::error::RepsenseError;

/// Message returned for a missing or unknown live session id.
pub const INVALID_SESSION_MESSAGE: &str = "Invalid or missing session ID";

/// An error rendered as `{"error": message}` with a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RepsenseError> for ApiError {
    fn from(err: RepsenseError) -> Self {
        match err {
            RepsenseError::InputMissing { message } | RepsenseError::InvalidInput { message } => {
                Self::bad_request(message)
            }
            RepsenseError::SessionNotFound { .. } => Self::bad_request(INVALID_SESSION_MESSAGE),
            RepsenseError::InputUnreadable { message } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.message, "Request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RepsenseError::input_missing("No video file provided"), StatusCode::BAD_REQUEST),
            (RepsenseError::invalid_input("bad weight"), StatusCode::BAD_REQUEST),
            (RepsenseError::session_not_found("x"), StatusCode::BAD_REQUEST),
            (
                RepsenseError::input_unreadable("not a video"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (RepsenseError::resource("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
            (RepsenseError::classifier("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_client_messages_are_unprefixed() {
        let err = ApiError::from(RepsenseError::input_missing("No frame data provided"));
        assert_eq!(err.message(), "No frame data provided");

        let err = ApiError::from(RepsenseError::session_not_found("abc"));
        assert_eq!(err.message(), INVALID_SESSION_MESSAGE);
    }
}
