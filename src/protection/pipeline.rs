//! Request protection pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (resolve policy, reject disallowed origins)
//!     → preflight short-circuit (OPTIONS answered terminally)
//!     → csrf.rs (mutating methods on protected prefixes only)
//!     → rate_limit.rs (routes with a matching rule only)
//!     → business handler
//!     → response decoration (X-RateLimit-*, CORS headers)
//! ```
//!
//! # Design Decisions
//! - Check order is cheapest-first: CORS terminates browser-originated
//!   cross-origin abuse before any state is touched; the rate limiter runs
//!   last so its counters are only charged for requests that passed the
//!   cheaper gates
//! - Fail closed: any failure inside the pipeline denies the request
//! - Preflights never reach the CSRF guard or the limiter

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::protection::cors::CorsEngine;
use crate::protection::csrf::{self, CsrfTokenService};
use crate::protection::rate_limit::RateLimiter;
use crate::session::{CookieSessionResolver, SessionResolver};

/// A rate-limit rule with parsed methods and window.
struct CompiledRateRule {
    name: String,
    path_prefix: String,
    /// Empty = all methods.
    methods: Vec<Method>,
    limit: u32,
    window: Duration,
}

/// The protection pipeline: CORS engine, CSRF guard, and rate limiter,
/// plus the route scoping that decides which checks apply where.
///
/// Built once at startup and shared across requests; all request-time
/// state lives inside the injected services.
pub struct ProtectionPipeline {
    pub limiter: Arc<RateLimiter>,
    pub csrf: Arc<CsrfTokenService>,
    pub cors: CorsEngine,
    pub resolver: Arc<dyn SessionResolver>,
    rate_rules: Vec<CompiledRateRule>,
    protected_prefixes: Vec<String>,
    exempt_prefixes: Vec<String>,
    max_body_bytes: usize,
    rate_sweep_interval: Duration,
    csrf_sweep_interval: Duration,
}

impl ProtectionPipeline {
    /// Build the pipeline with the default clock and session resolver.
    pub fn new(config: &GuardConfig) -> Self {
        Self::with_services(
            config,
            Arc::new(SystemClock),
            Arc::new(CookieSessionResolver::new()),
        )
    }

    /// Build the pipeline with injected clock and session resolver.
    ///
    /// Tests inject a `ManualClock` here to drive window and expiry math
    /// deterministically.
    pub fn with_services(
        config: &GuardConfig,
        clock: Arc<dyn Clock>,
        resolver: Arc<dyn SessionResolver>,
    ) -> Self {
        let rate_rules = config
            .rate_limit
            .rules
            .iter()
            .map(|rule| CompiledRateRule {
                name: rule.name.clone(),
                path_prefix: rule.path_prefix.clone(),
                methods: rule.methods.iter().filter_map(|m| m.parse().ok()).collect(),
                limit: rule.limit,
                window: Duration::from_secs(rule.window_secs),
            })
            .collect();

        Self {
            limiter: Arc::new(RateLimiter::new(clock.clone())),
            csrf: Arc::new(CsrfTokenService::new(
                clock,
                Duration::from_secs(config.csrf.token_ttl_minutes * 60),
            )),
            cors: CorsEngine::from_config(&config.cors),
            resolver,
            rate_rules,
            protected_prefixes: config.csrf.protected_prefixes.clone(),
            exempt_prefixes: config.csrf.exempt_prefixes.clone(),
            max_body_bytes: config.csrf.max_body_bytes,
            rate_sweep_interval: Duration::from_secs(config.rate_limit.sweep_interval_secs),
            csrf_sweep_interval: Duration::from_secs(config.csrf.sweep_interval_secs),
        }
    }

    /// Spawn the background sweepers for both stateful services.
    pub fn spawn_sweepers(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        vec![
            self.limiter
                .clone()
                .spawn_sweeper(self.rate_sweep_interval, shutdown),
            self.csrf
                .clone()
                .spawn_sweeper(self.csrf_sweep_interval, shutdown),
        ]
    }

    /// Whether a mutating request to `path` must present a CSRF token.
    ///
    /// Exempt prefixes win over protected ones; a path on neither list is
    /// not protected.
    fn requires_csrf(&self, method: &Method, path: &str) -> bool {
        if !is_mutating(method) {
            return false;
        }
        if self.exempt_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return false;
        }
        self.protected_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }

    /// First rule matching the path and method, in config order.
    fn match_rate_rule(&self, method: &Method, path: &str) -> Option<&CompiledRateRule> {
        self.rate_rules.iter().find(|rule| {
            path.starts_with(rule.path_prefix.as_str())
                && (rule.methods.is_empty() || rule.methods.contains(method))
        })
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Client address for rate-limit identities: first `X-Forwarded-For` hop
/// when present, else the socket peer address.
fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The pipeline middleware. Wraps every route behind the protection checks
/// and decorates successful responses.
pub async fn protection_middleware(
    State(pipeline): State<Arc<ProtectionPipeline>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let policy = pipeline.cors.resolve(&path);

    // CORS first: reject disallowed origins before anything else runs.
    let origin_allowed = match &origin {
        Some(origin) if !policy.allows_origin(origin) => {
            if method == Method::OPTIONS || pipeline.cors.is_api_path(&path) {
                tracing::warn!(%origin, %path, "CORS policy violation");
                metrics::record_denied("cors");
                return GuardError::PolicyViolation.into_response();
            }
            // Non-API path: same-origin default applies, no decoration.
            false
        }
        Some(_) => true,
        None => false,
    };

    // Preflights are answered terminally; they never reach the CSRF guard
    // or the limiter.
    if method == Method::OPTIONS {
        let validated = origin_allowed.then_some(origin.as_deref()).flatten();
        return pipeline.cors.preflight_response(policy, validated);
    }

    // CSRF for mutating methods on protected prefixes.
    let req = if pipeline.requires_csrf(&method, &path) {
        let identity = match pipeline.resolver.resolve(req.headers()) {
            Some(identity) => identity,
            None => {
                tracing::warn!(%method, %path, "CSRF check with no resolvable session");
                metrics::record_denied("csrf");
                return GuardError::NoSession.into_response();
            }
        };

        let (token, mut req) = match extract_token(req, pipeline.max_body_bytes).await {
            Ok(found) => found,
            Err(rejection) => return rejection,
        };

        let token = match token {
            Some(token) => token,
            None => {
                tracing::warn!(%method, %path, session = %identity.id, "CSRF token missing");
                metrics::record_denied("csrf");
                return GuardError::CsrfMissing.into_response();
            }
        };

        if let Err(reason) = pipeline.csrf.validate(&token, &identity.id) {
            tracing::warn!(%method, %path, session = %identity.id, %reason, "CSRF token rejected");
            metrics::record_denied("csrf");
            return GuardError::CsrfInvalid.into_response();
        }

        req.extensions_mut().insert(identity);
        req
    } else {
        req
    };

    // Rate limit, scoped to routes with a matching rule.
    let mut decision = None;
    if let Some(rule) = pipeline.match_rate_rule(&method, &path) {
        let identity = format!("{}:{}", client_ip(&req), rule.name);
        let d = pipeline.limiter.check(&identity, rule.limit, rule.window);
        if !d.allowed {
            tracing::warn!(
                client = %identity,
                rule = %rule.name,
                retry_after = d.reset_secs(),
                "Rate limit exceeded"
            );
            metrics::record_denied("rate_limit");
            return GuardError::QuotaExceeded(d).into_response();
        }
        decision = Some(d);
    }

    let mut resp = next.run(req).await;

    if let Some(d) = decision {
        response::set_rate_limit_headers(resp.headers_mut(), &d);
    }
    if origin_allowed {
        if let Some(origin) = &origin {
            pipeline.cors.decorate(resp.headers_mut(), origin, policy);
        }
    }
    resp
}

/// Pull the CSRF token out of the request: headers first, then the
/// buffered body. The body is replayed into the returned request.
async fn extract_token(
    req: Request,
    max_body_bytes: usize,
) -> Result<(Option<String>, Request), Response> {
    if let Some(token) = csrf::token_from_headers(req.headers()) {
        return Ok((Some(token), req));
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let inspectable = content_type
        .as_deref()
        .map(|ct| {
            ct.starts_with("application/json") || ct.starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or(false);
    if !inspectable {
        return Ok((None, req));
    }

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // An unreadable body denies the request; the guard never fails open.
            return Err(GuardError::Internal(format!("body read failed: {e}")).into_response());
        }
    };

    let token = csrf::token_from_body(content_type.as_deref(), &bytes);
    let req = Request::from_parts(parts, Body::from(bytes));
    Ok((token, req))
}
