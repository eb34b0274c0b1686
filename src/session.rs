//! Session identity resolution.
//!
//! # Responsibilities
//! - Derive the caller's session identity from request credentials
//! - Give unauthenticated ("guest") callers a stable per-browser identity
//!   so CSRF protection still applies to guest-mutating flows
//!
//! # Design Decisions
//! - The auth/session subsystem is an external collaborator; this module
//!   only defines the seam (`SessionResolver`) and a header/cookie-based
//!   default. Swapping in a real session store is an implementation
//!   substitution behind the same trait.

use axum::http::HeaderMap;

/// How the identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Authenticated,
    Guest,
}

/// A resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub id: String,
    pub kind: SessionKind,
}

impl SessionIdentity {
    pub fn authenticated(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SessionKind::Authenticated,
        }
    }

    pub fn guest(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SessionKind::Guest,
        }
    }
}

/// Seam to the auth/session subsystem.
pub trait SessionResolver: Send + Sync {
    /// Resolve the request's session identity, or `None` when the caller
    /// presents no usable credentials at all.
    fn resolve(&self, headers: &HeaderMap) -> Option<SessionIdentity>;
}

/// Default resolver: session cookie or bearer token for authenticated
/// callers, guest cookie for everyone else.
pub struct CookieSessionResolver {
    session_cookie: String,
    guest_cookie: String,
}

impl CookieSessionResolver {
    pub fn new() -> Self {
        Self {
            session_cookie: "session_id".to_string(),
            guest_cookie: "guest_id".to_string(),
        }
    }
}

impl Default for CookieSessionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionResolver for CookieSessionResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<SessionIdentity> {
        if let Some(id) = cookie_value(headers, &self.session_cookie) {
            return Some(SessionIdentity::authenticated(id));
        }

        if let Some(token) = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            if !token.is_empty() {
                return Some(SessionIdentity::authenticated(token));
            }
        }

        cookie_value(headers, &self.guest_cookie).map(SessionIdentity::guest)
    }
}

/// Extract a named cookie from the `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}
