use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    handlers::auth::require_csrf,
    handlers::common::{validation_failure, validation_messages},
    auth::CurrentUser,
    services::activity_log::RequestMeta,
    services::checkout::PlaceOrderInput,
    sessions::FlashLevel,
    AppState,
};

pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/checkout", post(place_order))
}

#[derive(Debug, Deserialize, ToSchema)]
struct CheckoutRequest {
    #[serde(flatten)]
    input: PlaceOrderInput,
    csrf_token: String,
}

/// Submit the cart as an order.
///
/// Field validation failures come back as a 400 with the full list of
/// messages so the form can show all of them at once. A successful
/// placement redirects to the new order's detail page; a stock conflict
/// sends the shopper back to the cart with a flash explaining which line
/// failed.
async fn place_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Response, ServiceError> {
    require_csrf(&user.session, &payload.csrf_token)?;

    use validator::Validate;
    if let Err(errors) = payload.input.validate() {
        return Ok(validation_failure(validation_messages(&errors)));
    }

    let meta = RequestMeta::from_headers(&headers);
    match state
        .services
        .checkout
        .place_order(user.user_id, payload.input, meta)
        .await
    {
        Ok(order) => {
            user.session.store.push_flash(
                &user.session.id,
                FlashLevel::Info,
                format!("Order {} placed", order.order_number),
            );
            Ok(Redirect::to(&format!("/orders/{}", order.order_number)).into_response())
        }
        Err(ServiceError::InsufficientStock(message)) => {
            user.session
                .store
                .push_flash(&user.session.id, FlashLevel::Error, message);
            Ok(Redirect::to("/cart").into_response())
        }
        Err(err) => Err(err),
    }
}
