use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    errors::ServiceError,
    events::Event,
    handlers::admin::require_csrf_header,
    handlers::common::{paged_response, success_response, PaginationParams},
    services::activity_log::{ActivityEntry, RequestMeta},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users).post(grant_admin))
        .route("/admin/users/:id/moderate", post(moderate_user))
}

#[derive(Debug, Deserialize)]
struct UserListQuery {
    page: Option<u64>,
    per_page: Option<u64>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> Result<Response, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (users, total) = state
        .services
        .users
        .list(pagination.page, pagination.per_page)
        .await?;
    Ok(paged_response(users, &pagination, total))
}

#[derive(Debug, Deserialize, ToSchema)]
struct ModerateRequest {
    is_active: bool,
}

/// Suspend or reinstate an account. Admins cannot moderate themselves.
async fn moderate_user(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ModerateRequest>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let (before, after) = state
        .services
        .users
        .moderate(admin.admin_id, user_id, payload.is_active)
        .await?;

    state
        .event_sender
        .send_or_log(Event::UserModerated {
            user_id: after.id,
            is_active: after.is_active,
        })
        .await;
    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: Some(admin.admin_id),
            user_id: Some(after.id),
            action: "user_moderated".into(),
            entity_type: "user".into(),
            entity_id: Some(after.id),
            old_value: Some(json!({ "is_active": before.is_active })),
            new_value: Some(json!({ "is_active": after.is_active })),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    Ok(success_response(json!({ "success": true, "user": after })))
}

#[derive(Debug, Deserialize, ToSchema)]
struct GrantAdminRequest {
    user_id: Uuid,
}

/// Promote an existing account to admin. Restricted to super admins
/// inside the service, so a plain admin gets a 403 here.
async fn grant_admin(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Json(payload): Json<GrantAdminRequest>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let after = state
        .services
        .users
        .grant_admin(admin.role, payload.user_id)
        .await?;

    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: Some(admin.admin_id),
            user_id: Some(after.id),
            action: "admin_granted".into(),
            entity_type: "user".into(),
            entity_id: Some(after.id),
            old_value: None,
            new_value: Some(json!({ "role": after.role })),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    Ok(success_response(json!({ "success": true, "user": after })))
}
