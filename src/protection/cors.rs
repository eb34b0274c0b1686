//! CORS policy resolution and preflight handling.
//!
//! # Responsibilities
//! - Map a request path to a named policy by longest-prefix match
//! - Decide whether an origin is permitted by that policy
//! - Answer preflight (OPTIONS) requests terminally
//! - Decorate real responses with `Access-Control-*` headers
//!
//! # Design Decisions
//! - The policy table is static configuration, read-only at request time;
//!   no locking needed
//! - A credentialed policy never emits a wildcard origin; the validated
//!   origin is echoed with `Vary: Origin` (the incompatibility is rejected
//!   at config-validation time, see `config::validation`)
//! - Disallowed origins on API paths get an active 403 body rather than
//!   silently omitted headers, so API clients see a diagnosable error

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::schema::{CorsConfig, CorsPolicyConfig};

/// Which origins a policy admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// The wildcard-all marker (`"*"` in config).
    Any,
    /// An explicit allow-list of origin strings.
    List(Vec<String>),
}

/// A resolved, immutable CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allowed_origins: AllowedOrigins,
    pub allow_credentials: bool,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<String>,
    pub max_age_secs: u64,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsPolicyConfig) -> Self {
        let allowed_origins = if config.allowed_origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(config.allowed_origins.clone())
        };

        Self {
            allowed_origins,
            allow_credentials: config.allow_credentials,
            allowed_methods: config
                .allowed_methods
                .iter()
                .filter_map(|m| m.parse().ok())
                .collect(),
            allowed_headers: config.allowed_headers.clone(),
            max_age_secs: config.max_age_secs,
        }
    }

    /// True if the policy admits `origin`: wildcard, or a literal match
    /// against the allow-list.
    pub fn allows_origin(&self, origin: &str) -> bool {
        match &self.allowed_origins {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(origins) => origins.iter().any(|o| o == origin),
        }
    }
}

/// Path-keyed CORS policy table.
pub struct CorsEngine {
    /// `(path_prefix, policy)` pairs; resolution picks the longest match.
    routes: Vec<(String, CorsPolicy)>,
    default_policy: CorsPolicy,
    api_prefix: String,
}

impl CorsEngine {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            routes: config
                .routes
                .iter()
                .map(|r| (r.path_prefix.clone(), CorsPolicy::from_config(&r.policy)))
                .collect(),
            default_policy: CorsPolicy::from_config(&config.default_policy),
            api_prefix: config.api_prefix.clone(),
        }
    }

    /// Longest-prefix match against the route table, falling back to the
    /// default policy.
    pub fn resolve(&self, path: &str) -> &CorsPolicy {
        self.routes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, policy)| policy)
            .unwrap_or(&self.default_policy)
    }

    /// API paths reject disallowed origins with a 403 body; other paths
    /// fall back to the browser's same-origin default by omitting headers.
    pub fn is_api_path(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    /// Build the terminal response for a preflight whose origin has already
    /// been validated (or which carried no origin at all).
    pub fn preflight_response(&self, policy: &CorsPolicy, origin: Option<&str>) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if let Some(origin) = origin {
            let headers = response.headers_mut();
            apply_origin_headers(headers, origin, policy);

            if let Ok(value) = HeaderValue::from_str(&join_methods(&policy.allowed_methods)) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
            }
            if !policy.allowed_headers.is_empty() {
                if let Ok(value) = HeaderValue::from_str(&policy.allowed_headers.join(", ")) {
                    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
                }
            }
            if let Ok(value) = HeaderValue::from_str(&policy.max_age_secs.to_string()) {
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, value);
            }
        }
        response
    }

    /// Attach CORS headers to a real (non-preflight) response for a
    /// validated origin.
    pub fn decorate(&self, headers: &mut HeaderMap, origin: &str, policy: &CorsPolicy) {
        apply_origin_headers(headers, origin, policy);
    }
}

/// Echo the validated origin and credentials flag.
///
/// The origin is always echoed, never `*`: credentialed wildcard responses
/// are forbidden by the CORS spec, and echoing is harmless for the
/// non-credentialed case.
fn apply_origin_headers(headers: &mut HeaderMap, origin: &str, policy: &CorsPolicy) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        if policy.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
