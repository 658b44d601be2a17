use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    errors::ServiceError,
    handlers::common::{paged_response, success_response, PaginationParams},
    AppState,
};

pub fn product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
        .route("/categories", get(list_categories))
}

#[derive(Debug, Deserialize)]
struct ProductListQuery {
    page: Option<u64>,
    per_page: Option<u64>,
    category: Option<String>,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Response, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (products, total) = state
        .services
        .catalog
        .list_products(pagination.page, pagination.per_page, query.category)
        .await?;
    Ok(paged_response(products, &pagination, total))
}

/// Product detail with all variants. An unknown or inactive slug bounces
/// back to the storefront root rather than surfacing a 404 page.
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ServiceError> {
    match state.services.catalog.get_product_by_slug(&slug).await {
        Ok((product, variants)) => Ok(success_response(json!({
            "product": product,
            "variants": variants,
        }))),
        Err(ServiceError::NotFound(_)) => Ok(Redirect::to("/").into_response()),
        Err(err) => Err(err),
    }
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories).into_response())
}
