//! Back-office routes. Every handler here takes the [`AdminUser`]
//! extractor, so a non-admin session is rejected before the handler body
//! runs. State-changing requests additionally carry the session's CSRF
//! token in an `X-CSRF-Token` header.

use axum::{http::HeaderMap, Router};
use std::sync::Arc;

use crate::{auth::AdminUser, errors::ServiceError, AppState};

pub mod activity;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(orders::routes())
        .merge(products::routes())
        .merge(users::routes())
        .merge(activity::routes())
        .merge(reports::routes())
}

pub(crate) fn require_csrf_header(
    admin: &AdminUser,
    headers: &HeaderMap,
) -> Result<(), ServiceError> {
    let candidate = headers
        .get("x-csrf-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if admin.session.store.verify_csrf(&admin.session.id, candidate) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Invalid CSRF token".into()))
    }
}
