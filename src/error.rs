//! Protection-layer error taxonomy.
//!
//! Each class of denial has a fixed HTTP mapping:
//! - `PolicyViolation` — CORS origin rejected (403), logged as a security event
//! - `NoSession` (401) vs `CsrfMissing`/`CsrfInvalid` (403), kept distinct
//!   so logged-out users get a clear signal
//! - `QuotaExceeded` — rate limit tripped (429), never a 5xx
//! - `Internal` — unexpected failure inside the protection layer (500);
//!   denies the request, never fails open

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response;
use crate::protection::rate_limit::RateLimitDecision;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("origin not allowed by CORS policy")]
    PolicyViolation,

    #[error("no session identity could be resolved")]
    NoSession,

    #[error("CSRF token missing from request")]
    CsrfMissing,

    #[error("invalid or expired CSRF token")]
    CsrfInvalid,

    #[error("rate limit exceeded")]
    QuotaExceeded(RateLimitDecision),

    #[error("internal protection failure: {0}")]
    Internal(String),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            GuardError::PolicyViolation => response::cors_violation(),
            GuardError::NoSession => response::no_session(),
            GuardError::CsrfMissing => response::csrf_missing(),
            GuardError::CsrfInvalid => response::csrf_invalid(),
            GuardError::QuotaExceeded(decision) => response::too_many_requests(&decision),
            GuardError::Internal(detail) => {
                // Full detail stays server-side; the client gets a generic body.
                tracing::error!(detail = %detail, "Internal failure in protection layer");
                response::internal_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn status_mapping() {
        assert_eq!(
            GuardError::PolicyViolation.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GuardError::NoSession.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GuardError::CsrfMissing.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GuardError::CsrfInvalid.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GuardError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
