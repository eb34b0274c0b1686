//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! protection gateway. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting rules and sweep interval.
    pub rate_limit: RateLimitConfig,

    /// CSRF protection scoping and token lifetime.
    pub csrf: CsrfConfig,

    /// CORS policy table.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Stale-window sweep interval in seconds.
    pub sweep_interval_secs: u64,

    /// Per-route rules. Routes matching no rule are not limited.
    pub rules: Vec<RateLimitRule>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            rules: vec![
                RateLimitRule {
                    name: "signin".to_string(),
                    path_prefix: "/api/auth/signin".to_string(),
                    methods: vec!["POST".to_string()],
                    limit: 20,
                    window_secs: 900,
                },
                RateLimitRule {
                    name: "password_reset".to_string(),
                    path_prefix: "/api/auth/password-reset".to_string(),
                    methods: vec!["POST".to_string()],
                    limit: 5,
                    window_secs: 3600,
                },
            ],
        }
    }
}

/// One operation-scoped rate limit.
///
/// The identity charged is `client_ip + ":" + name`, so sign-in attempts
/// and password resets from one IP draw from separate quotas.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitRule {
    /// Rule identifier; part of the tracked identity and of log fields.
    pub name: String,

    /// Path prefix this rule applies to.
    pub path_prefix: String,

    /// Methods this rule applies to. Empty = all methods.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Maximum requests per window.
    pub limit: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

/// CSRF protection configuration.
///
/// Only mutating requests under `protected_prefixes` are checked; prefixes
/// on `exempt_prefixes` always bypass. A path on neither list is NOT
/// protected, so every sensitive mutating route must be listed here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Token validity in minutes.
    pub token_ttl_minutes: u64,

    /// Path prefixes whose mutating requests require a token.
    pub protected_prefixes: Vec<String>,

    /// Path prefixes that always bypass the guard (auth callbacks,
    /// webhook receivers with their own signing).
    pub exempt_prefixes: Vec<String>,

    /// Expired-binding sweep interval in seconds.
    pub sweep_interval_secs: u64,

    /// Cap on bodies buffered for the body-field token fallback.
    pub max_body_bytes: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 60,
            protected_prefixes: vec![
                "/api/admin/".to_string(),
                "/api/cart/".to_string(),
                "/api/checkout/".to_string(),
                "/api/orders/".to_string(),
                "/api/account/".to_string(),
            ],
            exempt_prefixes: vec![
                "/api/auth/callback".to_string(),
                "/api/security/csrf-token".to_string(),
                "/api/webhooks/".to_string(),
            ],
            sweep_interval_secs: 300,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Paths under this prefix reject disallowed origins with a 403 body;
    /// other paths just omit CORS headers.
    pub api_prefix: String,

    /// Policy applied when no route entry matches.
    pub default_policy: CorsPolicyConfig,

    /// Path-prefix keyed policy entries; longest prefix wins.
    pub routes: Vec<CorsRouteConfig>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_string(),
            default_policy: CorsPolicyConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// One path-prefix policy entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsRouteConfig {
    /// Path prefix this policy applies to.
    pub path_prefix: String,

    #[serde(flatten)]
    pub policy: CorsPolicyConfig,
}

/// A single CORS policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsPolicyConfig {
    /// Allowed origins; the entry "*" means any origin.
    pub allowed_origins: Vec<String>,

    /// Whether credentialed requests are allowed. Incompatible with a
    /// wildcard origin list; rejected at validation time.
    pub allow_credentials: bool,

    /// Allowed methods, in preflight-response order.
    pub allowed_methods: Vec<String>,

    /// Allowed request headers, in preflight-response order.
    pub allowed_headers: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsPolicyConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["content-type".to_string()],
            max_age_secs: 600,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
