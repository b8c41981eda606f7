//! Response mapping.
//!
//! # Responsibilities
//! - Map cart errors to HTTP status codes
//! - Render errors as `{"error": message}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{CartError, ErrorKind};

/// HTTP wrapper around [`CartError`].
#[derive(Debug)]
pub struct ApiError(pub CartError);

impl From<CartError> for ApiError {
    fn from(e: CartError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
