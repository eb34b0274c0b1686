//! CSRF token issuance and validation.
//!
//! # Responsibilities
//! - Issue high-entropy tokens bound to a session identity with a TTL
//! - Validate a presented token against the presenting session
//! - Extract tokens from request headers or, as a fallback, body fields
//!
//! # Design Decisions
//! - Tokens are reusable within their validity window, not single-use;
//!   binding to the exact session is the security boundary
//! - Expiry is lazy (validation fails past `expires_at`); the sweeper only
//!   exists for memory hygiene
//! - Several header and body-field aliases are accepted for client
//!   compatibility; headers win over body fields

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Header names checked for a token, in order.
pub const TOKEN_HEADER_ALIASES: [&str; 3] = ["x-csrf-token", "x-xsrf-token", "csrf-token"];

/// Body fields checked when no header carries a token, in order.
pub const TOKEN_BODY_FIELDS: [&str; 3] = ["csrfToken", "_csrf", "__csrf"];

const TOKEN_LEN: usize = 48;

/// Why a token failed validation. All variants collapse to the same
/// client-facing message; the distinction is for logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfRejection {
    #[error("token unknown")]
    UnknownToken,
    #[error("token expired")]
    Expired,
    #[error("token bound to a different session")]
    SessionMismatch,
}

#[derive(Debug)]
struct TokenBinding {
    session_id: String,
    expires_at: Instant,
}

/// In-memory CSRF token service.
///
/// Bindings are process-local; a shared store can replace the map behind
/// `issue`/`validate` without changing the contract.
pub struct CsrfTokenService {
    tokens: DashMap<String, TokenBinding>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CsrfTokenService {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            clock,
            ttl,
        }
    }

    /// Generate a token bound to `session_id`, valid for the service TTL.
    pub fn issue(&self, session_id: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        self.tokens.insert(
            token.clone(),
            TokenBinding {
                session_id: session_id.to_string(),
                expires_at: self.clock.now() + self.ttl,
            },
        );
        metrics::record_csrf_issued();
        token
    }

    /// Validate `token` for `session_id`.
    ///
    /// Fails if the token is unknown, past its expiry, or bound to a
    /// different session.
    pub fn validate(&self, token: &str, session_id: &str) -> Result<(), CsrfRejection> {
        let binding = match self.tokens.get(token) {
            Some(binding) => binding,
            None => return Err(CsrfRejection::UnknownToken),
        };

        if self.clock.now() > binding.expires_at {
            drop(binding);
            self.tokens.remove(token);
            return Err(CsrfRejection::Expired);
        }

        if binding.session_id != session_id {
            return Err(CsrfRejection::SessionMismatch);
        }

        Ok(())
    }

    /// Remove expired bindings. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.tokens.len();
        self.tokens.retain(|_, binding| now <= binding.expires_at);
        before - self.tokens.len()
    }

    /// Number of live bindings.
    pub fn tracked(&self) -> usize {
        self.tokens.len()
    }

    /// Spawn the background sweep task; exits on the shutdown signal.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, shutdown: &Shutdown) -> JoinHandle<()> {
        let mut rx = shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, tracked = self.tracked(), "Swept expired CSRF tokens");
                            metrics::record_swept("csrf", removed as u64);
                        }
                    }
                    _ = rx.recv() => {
                        tracing::debug!("CSRF sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// Find a token in the request headers, checking aliases in order.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    TOKEN_HEADER_ALIASES.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// Find a token in a buffered request body.
///
/// Understands JSON objects and form-urlencoded bodies; anything else
/// yields no token.
pub fn token_from_body(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    let content_type = content_type.unwrap_or("");

    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        return TOKEN_BODY_FIELDS
            .iter()
            .find_map(|field| value.get(*field).and_then(|v| v.as_str()).map(str::to_string));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        return url::form_urlencoded::parse(body)
            .find(|(key, _)| TOKEN_BODY_FIELDS.contains(&key.as_ref()))
            .map(|(_, value)| value.into_owned());
    }

    None
}
