//! End-to-end tests over the assembled router, driving it with
//! `tower::ServiceExt::oneshot` instead of a live listener.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use storefront_api::{
    build_router,
    config::AppConfig,
    db::{establish_connection_with_config, run_migrations, DbConfig},
    events, AppState,
};

async fn test_router() -> axum::Router {
    let db_config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let db = Arc::new(
        establish_connection_with_config(&db_config)
            .await
            .expect("sqlite connection"),
    );
    run_migrations(&db).await.expect("migrations");

    let config = AppConfig::new(
        db_config.url.clone(),
        "a_test_session_secret_that_is_long_enough".to_string(),
        "127.0.0.1".to_string(),
        0,
    );
    let (event_sender, mut receiver) = events::channel(64);
    tokio::spawn(async move { while receiver.recv().await.is_some() {} });

    build_router(Arc::new(AppState::new(db, config, event_sender)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn session_endpoint_issues_a_cookie_and_csrf_token() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/auth/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("storefront_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = json_body(response).await;
    assert_eq!(body["authenticated"], false);
    assert!(!body["csrf_token"].as_str().unwrap_or("").is_empty());
}

#[tokio::test]
async fn cart_requires_authentication() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_anonymous_sessions() {
    let app = test_router().await;
    let response = app
        .oneshot(
            Request::get("/admin/reports/sales")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_without_a_valid_csrf_token_is_rejected() {
    let app = test_router().await;
    let payload = serde_json::json!({
        "username": "newuser",
        "email": "newuser@example.com",
        "password": "passw0rd123",
        "csrf_token": "not-the-real-token",
    });
    let response = app
        .oneshot(
            Request::post("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = test_router().await;

    // Obtain a session cookie and its CSRF token.
    let session = app
        .clone()
        .oneshot(Request::get("/auth/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = session
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let csrf = json_body(session).await["csrf_token"]
        .as_str()
        .unwrap()
        .to_string();

    let payload = serde_json::json!({
        "username": "firstbuyer",
        "email": "firstbuyer@example.com",
        "password": "passw0rd123",
        "csrf_token": csrf,
    });
    let response = app
        .oneshot(
            Request::post("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, cookie)
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(!body["user_id"].as_str().unwrap_or("").is_empty());
}

#[tokio::test]
async fn product_listing_is_empty_on_a_fresh_database() {
    let app = test_router().await;
    let response = app
        .oneshot(Request::get("/products").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["meta"]["total"], 0);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unknown_product_slug_redirects_to_the_storefront_root() {
    let app = test_router().await;
    let response = app
        .oneshot(
            Request::get("/products/no-such-slug")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
}
