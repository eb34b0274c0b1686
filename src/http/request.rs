//! Request identification.
//!
//! # Responsibilities
//! - Ensure every request carries a unique `X-Request-ID` (UUID v4)
//! - Echo the ID on the response for client-side correlation
//!
//! # Design Decisions
//! - An inbound ID from the client is preserved so upstream correlation
//!   survives the hop; otherwise one is generated as early as possible

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Attach a request ID to the request and mirror it on the response.
pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(X_REQUEST_ID, value);
    }

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
