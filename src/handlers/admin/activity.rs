use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    auth::AdminUser,
    errors::ServiceError,
    handlers::common::{paged_response, PaginationParams},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/activity", get(list_activity))
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    page: Option<u64>,
    per_page: Option<u64>,
}

/// The audit trail, newest first.
async fn list_activity(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Response, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (rows, total) = state
        .services
        .activity_log
        .list(pagination.page, pagination.per_page)
        .await?;
    Ok(paged_response(rows, &pagination, total))
}
