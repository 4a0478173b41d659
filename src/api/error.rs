use crate::error::{MalformedEntityError, SourceError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

/// Errors a request handler can end with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Malformed(#[from] MalformedEntityError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Lookups the explorer cannot answer render as `null`, like a
            // missing document.
            ApiError::NotFound => (StatusCode::NOT_FOUND, Json(Value::Null)).into_response(),
            ApiError::BadRequest(message) => {
                warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Malformed(e) => {
                warn!("Rejected malformed input: {}", e);
                (StatusCode::BAD_REQUEST, Json(json!({ "message": e.to_string() }))).into_response()
            }
            ApiError::Source(e) => {
                error!("Entity source failure: {}", e);
                (StatusCode::BAD_GATEWAY, Json(json!({ "message": e.to_string() }))).into_response()
            }
        }
    }
}
