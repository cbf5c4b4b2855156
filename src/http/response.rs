//! Mapping of relay errors to HTTP responses.
//!
//! | Error                                       | Status |
//! |---------------------------------------------|--------|
//! | `LimitReached`                              | 429    |
//! | `UnsupportedTransaction` / `InvalidPayload` | 422    |
//! | `Provider`                                  | 502    |
//! | `ServiceUnavailable`                        | 503    |
//!
//! Bodies are `{"message": ...}`; limit errors also carry the counts.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::relay::RelayError;

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::LimitReached { .. } => StatusCode::TOO_MANY_REQUESTS,
            RelayError::UnsupportedTransaction(_) | RelayError::InvalidPayload(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RelayError::Provider(_) => StatusCode::BAD_GATEWAY,
            RelayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            RelayError::LimitReached {
                address,
                current_count,
                limit,
            } => json!({
                "message": self.to_string(),
                "address": address,
                "currentCount": current_count,
                "limit": limit,
            }),
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// A 4xx response for requests rejected before reaching the relay engine.
pub fn bad_request(message: impl Into<String>) -> Response {
    let message: String = message.into();
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}
