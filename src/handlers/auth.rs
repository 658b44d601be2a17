use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    auth::RegisterInput,
    errors::ServiceError,
    events::Event,
    handlers::common::success_response,
    services::activity_log::{ActivityEntry, RequestMeta},
    sessions::{Session, SESSION_COOKIE},
    AppState,
};

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(session_info))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Attach the session cookie when this request minted a fresh session.
pub fn with_session_cookie(session: &Session, mut response: Response) -> Response {
    if let Some(cookie) = session.set_cookie_header() {
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(http::header::SET_COOKIE, value);
        }
    }
    response
}

/// Reject state-changing requests whose CSRF token does not match the
/// session's issued token, before anything touches the database.
pub fn require_csrf(session: &Session, candidate: &str) -> Result<(), ServiceError> {
    if session.store.verify_csrf(&session.id, candidate) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Invalid CSRF token".into()))
    }
}

/// Current session state: authentication flag, CSRF token for forms, and
/// any pending flash messages (read-once).
async fn session_info(
    State(_state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, ServiceError> {
    let flash = session.store.take_flash(&session.id);
    let csrf_token = session
        .store
        .csrf_token(&session.id)
        .unwrap_or_default();
    let body = json!({
        "authenticated": session.is_authenticated(),
        "user_id": session.user_id(),
        "csrf_token": csrf_token,
        "flash": flash,
    });
    Ok(with_session_cookie(&session, success_response(body)))
}

#[derive(Debug, Deserialize, ToSchema)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    birthdate: Option<NaiveDate>,
    csrf_token: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&session, &payload.csrf_token)?;

    let user = state
        .services
        .auth
        .register(RegisterInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            birthdate: payload.birthdate,
        })
        .await?;

    state
        .event_sender
        .send_or_log(Event::UserRegistered(user.id))
        .await;
    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: None,
            user_id: Some(user.id),
            action: "user_registered".into(),
            entity_type: "user".into(),
            entity_id: Some(user.id),
            old_value: None,
            new_value: Some(json!({ "username": user.username })),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    session.store.login(&session.id, user.id, user.role);
    let body = json!({ "success": true, "user_id": user.id });
    Ok(with_session_cookie(&session, success_response(body)))
}

#[derive(Debug, Deserialize, ToSchema)]
struct LoginRequest {
    username: String,
    password: String,
    csrf_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&session, &payload.csrf_token)?;

    let meta = RequestMeta::from_headers(&headers);
    let user = state
        .services
        .auth
        .login(&payload.username, &payload.password, &meta.ip)
        .await?;

    session.store.login(&session.id, user.id, user.role);
    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: user.role.is_admin().then_some(user.id),
            user_id: Some(user.id),
            action: "user_login".into(),
            entity_type: "user".into(),
            entity_id: Some(user.id),
            old_value: None,
            new_value: None,
            meta,
        })
        .await;

    let body = json!({ "success": true, "user_id": user.id });
    Ok(with_session_cookie(&session, success_response(body)))
}

#[derive(Debug, Deserialize, ToSchema)]
struct LogoutRequest {
    csrf_token: String,
}

async fn logout(
    State(_state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LogoutRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&session, &payload.csrf_token)?;
    session.store.destroy(&session.id);

    let mut response = success_response(json!({ "success": true })).into_response();
    let clear = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    if let Ok(value) = clear.parse() {
        response.headers_mut().append(http::header::SET_COOKIE, value);
    }
    Ok(response)
}
