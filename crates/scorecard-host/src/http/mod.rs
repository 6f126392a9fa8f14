//! HTTP handlers for the publication service.

pub mod badge;
pub mod meta;
pub mod publish;
pub mod results;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub const GENERIC_ERROR_MESSAGE: &str = "something went wrong and we are looking into it.";

/// The JSON error envelope shared by every endpoint.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "code": status.as_u16(),
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
}
