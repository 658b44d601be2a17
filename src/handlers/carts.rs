use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::auth::{require_csrf, with_session_cookie},
    handlers::common::{no_content_response, success_response},
    services::cart::AddToCartInput,
    AppState,
};

pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(view_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", put(update_item).delete(remove_item))
}

/// The cart with live catalog pricing, a subtotal, and per-line stock
/// availability so the client can flag lines that can no longer be bought.
async fn view_cart(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Response, ServiceError> {
    let lines = state.services.cart.priced_lines(user.user_id).await?;
    let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
    let all_purchasable = lines.iter().all(|l| l.is_purchasable());
    let csrf_token = user
        .session
        .store
        .csrf_token(&user.session.id)
        .unwrap_or_default();

    let body = json!({
        "lines": lines,
        "subtotal": subtotal,
        "all_purchasable": all_purchasable,
        "csrf_token": csrf_token,
    });
    Ok(with_session_cookie(&user.session, success_response(body)))
}

#[derive(Debug, Deserialize, ToSchema)]
struct AddItemRequest {
    variant_id: Uuid,
    quantity: i32,
    csrf_token: String,
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&user.session, &payload.csrf_token)?;
    let item = state
        .services
        .cart
        .add_item(
            user.user_id,
            AddToCartInput {
                variant_id: payload.variant_id,
                quantity: payload.quantity,
            },
        )
        .await?;
    Ok(success_response(json!({ "success": true, "item": item })))
}

#[derive(Debug, Deserialize, ToSchema)]
struct UpdateItemRequest {
    quantity: i32,
    csrf_token: String,
}

/// Quantities of zero or less remove the line instead of erroring.
async fn update_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&user.session, &payload.csrf_token)?;
    let updated = state
        .services
        .cart
        .update_quantity(user.user_id, item_id, payload.quantity)
        .await?;
    match updated {
        Some(item) => Ok(success_response(json!({ "success": true, "item": item }))),
        None => Ok(no_content_response()),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
struct RemoveItemRequest {
    csrf_token: String,
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<RemoveItemRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&user.session, &payload.csrf_token)?;
    state
        .services
        .cart
        .remove_item(user.user_id, item_id)
        .await?;
    Ok(no_content_response())
}
