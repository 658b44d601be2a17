use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::{paged_response, success_response, PaginationParams},
    AppState,
};

pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:order_number", get(get_order))
}

#[derive(Debug, Deserialize)]
struct OrderListQuery {
    page: Option<u64>,
    per_page: Option<u64>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Response, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (orders, total) = state
        .services
        .orders
        .list_for_user(user.user_id, pagination.page, pagination.per_page)
        .await?;
    Ok(paged_response(orders, &pagination, total))
}

/// Order detail by order number, scoped to the signed-in user. An order
/// number that does not exist for this user bounces to the storefront
/// root instead of leaking whether the number exists at all.
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(order_number): Path<String>,
) -> Result<Response, ServiceError> {
    match state
        .services
        .orders
        .find_for_user_by_number(user.user_id, &order_number)
        .await
    {
        Ok((order, items)) => Ok(success_response(json!({
            "order": order,
            "items": items,
        }))),
        Err(ServiceError::NotFound(_)) => Ok(Redirect::to("/").into_response()),
        Err(err) => Err(err),
    }
}
