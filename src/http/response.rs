//! Rejection bodies and protection headers.
//!
//! # Responsibilities
//! - Uniform JSON error shape `{error, message, ...}` for every rejection
//! - `X-RateLimit-*` and `Retry-After` header plumbing
//!
//! # Design Decisions
//! - Rejection bodies are machine-readable; the `error` field is stable,
//!   `message` is for humans
//! - Rate-limit reset values are reported as seconds-until-reset, rounded
//!   up, so a client sleeping that long always lands in a fresh window

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::protection::rate_limit::RateLimitDecision;

pub const X_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Build a rejection response with the uniform JSON error shape.
pub fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

pub fn cors_violation() -> Response {
    error_response(
        StatusCode::FORBIDDEN,
        "CORS policy violation",
        "Origin not allowed",
    )
}

pub fn csrf_missing() -> Response {
    error_response(
        StatusCode::FORBIDDEN,
        "CSRF validation failed",
        "CSRF token missing from request",
    )
}

pub fn csrf_invalid() -> Response {
    error_response(
        StatusCode::FORBIDDEN,
        "CSRF validation failed",
        "Invalid or expired CSRF token",
    )
}

pub fn no_session() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "CSRF validation failed",
        "No session identity could be resolved",
    )
}

pub fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Request could not be processed",
    )
}

/// 429 with retry hints in both headers and body.
pub fn too_many_requests(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.reset_secs();
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "too_many_requests",
            "message": format!("Rate limit exceeded. Retry in {} seconds.", retry_after),
            "retryAfter": retry_after,
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    set_rate_limit_headers(headers, decision);
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        headers.insert("retry-after", value);
    }
    response
}

/// Attach `X-RateLimit-Limit/-Remaining/-Reset` for a decision.
pub fn set_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let pairs = [
        (X_RATE_LIMIT_LIMIT, decision.limit.to_string()),
        (X_RATE_LIMIT_REMAINING, decision.remaining.to_string()),
        (X_RATE_LIMIT_RESET, decision.reset_secs().to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
