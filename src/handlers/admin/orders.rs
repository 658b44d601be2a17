use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    entities::order::OrderStatus,
    errors::ServiceError,
    handlers::admin::require_csrf_header,
    handlers::common::{paged_response, success_response, PaginationParams},
    services::activity_log::RequestMeta,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/orders", get(list_orders).post(mutate_order))
}

#[derive(Debug, Deserialize)]
struct AdminOrderQuery {
    page: Option<u64>,
    per_page: Option<u64>,
    status: Option<OrderStatus>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Response, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (orders, total) = state
        .services
        .orders
        .list_all(pagination.page, pagination.per_page, query.status)
        .await?;
    Ok(paged_response(orders, &pagination, total))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
enum OrderAction {
    UpdateStatus {
        order_id: Uuid,
        status: OrderStatus,
    },
    AddTracking {
        order_id: Uuid,
        tracking_number: String,
    },
}

/// Single mutation endpoint for the order workbench. The `action` field
/// selects between a status change and attaching a tracking number; both
/// answer `{ success, message }` so the admin UI can surface the outcome
/// inline.
async fn mutate_order(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Json(action): Json<OrderAction>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let meta = RequestMeta::from_headers(&headers);

    let (order, message) = match action {
        OrderAction::UpdateStatus { order_id, status } => {
            let order = state
                .services
                .order_status
                .update_status(order_id, status, admin.admin_id, meta)
                .await?;
            let message = format!(
                "Order {} is now {}",
                order.order_number,
                order.status.as_str()
            );
            (order, message)
        }
        OrderAction::AddTracking {
            order_id,
            tracking_number,
        } => {
            let order = state
                .services
                .order_status
                .add_tracking(order_id, tracking_number, admin.admin_id, meta)
                .await?;
            let message = format!("Tracking number added to order {}", order.order_number);
            (order, message)
        }
    };

    Ok(success_response(json!({
        "success": true,
        "message": message,
        "order": order,
    })))
}
