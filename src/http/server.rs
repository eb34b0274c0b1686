//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the Axum router: built-in endpoints (token issuance, health),
//!   the injected business router, and the protection middleware
//! - Bind the server to a listener and serve with graceful shutdown
//!
//! # Design Decisions
//! - Business handlers are an injected `Router`; this crate owns only the
//!   protection layer in front of them
//! - Every route, built-in or injected, sits behind the protection
//!   middleware; there is no unprotected mount point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GuardConfig;
use crate::http::request;
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::protection::{protection_middleware, ProtectionPipeline};

/// State injected into the built-in handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProtectionPipeline>,
}

/// HTTP server for the protection gateway.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
    pipeline: Arc<ProtectionPipeline>,
}

impl HttpServer {
    /// Create a server with the default pipeline services.
    pub fn new(config: GuardConfig, business: Router) -> Self {
        let pipeline = Arc::new(ProtectionPipeline::new(&config));
        Self::with_pipeline(config, business, pipeline)
    }

    /// Create a server around an already-built pipeline (tests inject one
    /// with a manual clock here).
    pub fn with_pipeline(
        config: GuardConfig,
        business: Router,
        pipeline: Arc<ProtectionPipeline>,
    ) -> Self {
        let router = build_router(&config, pipeline.clone(), business);
        Self {
            router,
            config,
            pipeline,
        }
    }

    /// The assembled router; tests drive this directly with `oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Sweepers start here and stop when `shutdown` fires; the serve loop
    /// drains on the same signal.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.pipeline.spawn_sweepers(&shutdown);

        let mut rx = shutdown.subscribe();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                tracing::info!("Shutdown signal received, draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with all middleware layers.
pub fn build_router(
    config: &GuardConfig,
    pipeline: Arc<ProtectionPipeline>,
    business: Router,
) -> Router {
    let state = AppState {
        pipeline: pipeline.clone(),
    };

    Router::new()
        .route("/api/security/csrf-token", get(issue_csrf_token))
        .route("/health", get(health))
        .with_state(state)
        .merge(business)
        .layer(middleware::from_fn_with_state(
            pipeline,
            protection_middleware,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )))
        .layer(middleware::from_fn(request::request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Token issuance for front-end forms.
///
/// Returns the fresh token and the session it is bound to, or 401 when no
/// session identity resolves.
async fn issue_csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.pipeline.resolver.resolve(&headers) {
        Some(identity) => {
            let token = state.pipeline.csrf.issue(&identity.id);
            tracing::debug!(session = %identity.id, "Issued CSRF token");
            Json(json!({ "csrfToken": token, "sessionId": identity.id })).into_response()
        }
        None => response::no_session(),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
