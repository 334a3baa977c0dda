use crate::services::image_service::ImageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Error returned by the image handlers: a status code plus the message the
/// client sees in `{"error", "status"}`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Storage or database failure; `msg` must not carry internal detail.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// No record for the requested id.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Malformed upload, e.g. no `image` file part.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Map a service error for the client.
    ///
    /// Missing records become 404. Anything else is logged here and
    /// reported as a 500 carrying only `public_msg`.
    pub fn from_image_error(err: ImageError, public_msg: &str) -> Self {
        match err {
            ImageError::ImageNotFound(_) => Self::not_found("Image not found"),
            other => {
                tracing::error!("{}: {}", public_msg, other);
                Self::internal(public_msg)
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}
