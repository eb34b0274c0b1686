//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use storefront_guard::clock::ManualClock;
use storefront_guard::config::schema::{CorsPolicyConfig, CorsRouteConfig};
use storefront_guard::config::GuardConfig;
use storefront_guard::http::build_router;
use storefront_guard::protection::ProtectionPipeline;
use storefront_guard::session::CookieSessionResolver;

/// A gateway wired with a manual clock, ready to receive `oneshot` requests.
pub struct TestGateway {
    pub clock: Arc<ManualClock>,
    pub pipeline: Arc<ProtectionPipeline>,
    pub router: Router,
}

impl TestGateway {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router call is infallible")
    }
}

/// Default storefront configuration: credentialed allow-list policies for
/// the API and admin trees, wildcard for public content.
pub fn storefront_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.cors.routes = vec![
        CorsRouteConfig {
            path_prefix: "/api/".to_string(),
            policy: CorsPolicyConfig {
                allowed_origins: vec!["https://shop.example".to_string()],
                allow_credentials: true,
                allowed_methods: vec![
                    "GET".into(),
                    "POST".into(),
                    "PUT".into(),
                    "PATCH".into(),
                    "DELETE".into(),
                ],
                allowed_headers: vec!["content-type".into(), "x-csrf-token".into()],
                max_age_secs: 300,
            },
        },
        CorsRouteConfig {
            path_prefix: "/api/admin/".to_string(),
            policy: CorsPolicyConfig {
                allowed_origins: vec!["https://admin.shop.example".to_string()],
                allow_credentials: true,
                allowed_methods: vec![
                    "GET".into(),
                    "POST".into(),
                    "PUT".into(),
                    "PATCH".into(),
                    "DELETE".into(),
                ],
                allowed_headers: vec!["content-type".into(), "x-csrf-token".into()],
                max_age_secs: 300,
            },
        },
    ];
    config
}

pub fn gateway() -> TestGateway {
    gateway_with(storefront_config())
}

pub fn gateway_with(config: GuardConfig) -> TestGateway {
    let clock = Arc::new(ManualClock::new());
    let pipeline = Arc::new(ProtectionPipeline::with_services(
        &config,
        clock.clone(),
        Arc::new(CookieSessionResolver::new()),
    ));
    let router = build_router(&config, pipeline.clone(), business_router());
    TestGateway {
        clock,
        pipeline,
        router,
    }
}

/// Stand-in business handlers; real ones live outside this crate.
fn business_router() -> Router {
    Router::new()
        .route("/api/auth/signin", post(|| async { "signed in" }))
        .route(
            "/api/admin/products",
            get(|| async { "product list" }).post(|| async { "product created" }),
        )
        .route("/api/cart/items", post(|| async { "item added" }))
        .route("/api/checkout/submit", post(|| async { "order placed" }))
        .route("/api/newsletter/subscribe", post(|| async { "subscribed" }))
        .route("/api/products", get(|| async { "catalog" }))
        .route("/blog/latest", get(|| async { "latest posts" }))
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
