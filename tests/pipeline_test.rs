//! End-to-end pipeline behavior: CORS decisions, preflights, rate limits,
//! and response decoration.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use common::{body_json, gateway, gateway_with, storefront_config};

fn signin_request(ip: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/signin")
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn signin_limit_allows_twenty_then_denies() {
    let gw = gateway();

    for i in 0..20 {
        let response = gw.send(signin_request("1.2.3.4")).await;
        assert_eq!(response.status(), StatusCode::OK, "call {} should pass", i + 1);
    }

    let response = gw.send(signin_request("1.2.3.4")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let headers = response.headers().clone();
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "20");
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
    assert!(headers.contains_key("retry-after"));

    let body = body_json(response).await;
    assert_eq!(body["error"], "too_many_requests");
    assert!(body["retryAfter"].as_u64().unwrap() <= 900);
}

#[tokio::test]
async fn limit_is_per_identity() {
    let gw = gateway();

    for _ in 0..21 {
        gw.send(signin_request("1.2.3.4")).await;
    }
    // A different client is unaffected.
    let response = gw.send(signin_request("5.6.7.8")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn fresh_window_after_reset_boundary() {
    let gw = gateway();

    for _ in 0..21 {
        gw.send(signin_request("1.2.3.4")).await;
    }
    assert_eq!(
        gw.send(signin_request("1.2.3.4")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    gw.clock.advance(Duration::from_secs(901));
    let response = gw.send(signin_request("1.2.3.4")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "19");
}

#[tokio::test]
async fn allowed_requests_carry_rate_limit_headers() {
    let gw = gateway();

    let response = gw.send(signin_request("9.9.9.9")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "20");
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "19");
    assert!(response.headers().contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn unlimited_route_has_no_rate_headers() {
    let gw = gateway();

    let response = gw
        .send(
            Request::builder()
                .uri("/api/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn concurrent_burst_never_exceeds_limit() {
    let gw = gateway();

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let router = gw.router.clone();
            tokio::spawn(async move {
                use tower::ServiceExt;
                router
                    .oneshot(signin_request("7.7.7.7"))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::OK {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 20);
}

#[tokio::test]
async fn preflight_from_allowed_origin_is_answered() {
    let gw = gateway();

    let response = gw
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/cart/items")
                .header(header::ORIGIN, "https://shop.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://shop.example"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "300");
    assert_eq!(headers.get(header::VARY).unwrap(), "Origin");
}

#[tokio::test]
async fn preflight_from_disallowed_origin_is_rejected_without_cors_headers() {
    let gw = gateway();

    let response = gw
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/admin/products")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let body = body_json(response).await;
    assert_eq!(body["error"], "CORS policy violation");
    assert_eq!(body["message"], "Origin not allowed");
}

#[tokio::test]
async fn preflights_bypass_rate_limiting_and_csrf() {
    let gw = gateway();

    // Well past the signin limit; preflights must not be charged.
    for _ in 0..30 {
        let response = gw
            .send(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/auth/signin")
                    .header(header::ORIGIN, "https://shop.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    // No CSRF session was needed above either; a real signin still passes.
    assert_eq!(gw.send(signin_request("1.2.3.4")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn disallowed_origin_on_api_path_gets_403_body() {
    let gw = gateway();

    let response = gw
        .send(
            Request::builder()
                .uri("/api/products")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "CORS policy violation");
}

#[tokio::test]
async fn disallowed_origin_on_content_path_passes_without_cors_headers() {
    let mut config = storefront_config();
    // Restrict the default policy so /blog has an allow-list.
    config.cors.default_policy.allowed_origins = vec!["https://shop.example".to_string()];
    let gw = gateway_with(config);

    let response = gw
        .send(
            Request::builder()
                .uri("/blog/latest")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    // Handler runs; the browser's same-origin default does the enforcement.
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn allowed_origin_decorates_real_responses() {
    let gw = gateway();

    let response = gw
        .send(
            Request::builder()
                .uri("/api/products")
                .header(header::ORIGIN, "https://shop.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://shop.example"
    );
    assert_eq!(headers.get(header::VARY).unwrap(), "Origin");
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn public_read_route_needs_nothing() {
    let gw = gateway();

    let response = gw
        .send(
            Request::builder()
                .uri("/api/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn health_endpoint_responds() {
    let gw = gateway();

    let response = gw
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}
