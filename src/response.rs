//! JSON response envelopes.
//!
//! Handlers answer with `{success, message, data?}`. The auth gate answers
//! rejected requests with the bare `{error: "Unauthorized"}` shape, which
//! existing clients of the gated routes match on.

use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        success: true,
        message: message.to_string(),
        data,
    })
}

/// Success envelope without a payload.
pub fn ok(status: StatusCode, message: &str) -> HttpResponse {
    success::<()>(status, message, None)
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::<()> {
        success: false,
        message: message.into(),
        data: None,
    })
}

pub fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({ "error": "Unauthorized" }))
}
