pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod sessions;

use axum::{routing::get, Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    config::AppConfig, db::DbPool, events::EventSender, handlers::AppServices,
    sessions::SessionStore,
};

/// Shared application state injected into every handler.
///
/// The database pool, event channel and session store are all constructed
/// once at startup and passed in, so tests can assemble the same state
/// over an in-memory database.
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub event_sender: Arc<EventSender>,
    pub sessions: Arc<SessionStore>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, event_sender: EventSender) -> Self {
        let event_sender = Arc::new(event_sender);
        let sessions = Arc::new(SessionStore::new(
            &config.session_secret,
            config.session_ttl_secs,
        ));
        let services = AppServices::build(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            sessions,
            services,
        }
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_spec))
        .nest("/auth", handlers::auth::auth_routes())
        .merge(handlers::products::product_routes())
        .merge(handlers::carts::cart_routes())
        .merge(handlers::checkout::checkout_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::admin::admin_routes())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
