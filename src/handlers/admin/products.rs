use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    errors::ServiceError,
    handlers::admin::require_csrf_header,
    handlers::common::{created_response, paged_response, success_response, PaginationParams},
    services::activity_log::{ActivityEntry, RequestMeta},
    services::catalog::{
        CreateProductInput, CreateVariantInput, UpdateProductInput, UpdateVariantInput,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/products", get(list_products).post(create_product))
        .route("/admin/products/:id", put(update_product))
        .route("/admin/products/:id/variants", post(create_variant))
        .route("/admin/variants/:id", put(update_variant))
}

#[derive(Debug, Deserialize)]
struct ProductListQuery {
    page: Option<u64>,
    per_page: Option<u64>,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ProductListQuery>,
) -> Result<Response, ServiceError> {
    let pagination = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (products, total) = state
        .services
        .catalog
        .list_all_products(pagination.page, pagination.per_page)
        .await?;
    Ok(paged_response(products, &pagination, total))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Json(input): Json<CreateProductInput>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let created = state.services.catalog.create_product(input).await?;

    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: Some(admin.admin_id),
            user_id: None,
            action: "product_created".into(),
            entity_type: "product".into(),
            entity_id: Some(created.id),
            old_value: None,
            new_value: serde_json::to_value(&created).ok(),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    Ok(created_response(json!({ "success": true, "product": created })))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let (before, after) = state
        .services
        .catalog
        .update_product(product_id, input)
        .await?;

    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: Some(admin.admin_id),
            user_id: None,
            action: "product_updated".into(),
            entity_type: "product".into(),
            entity_id: Some(after.id),
            old_value: serde_json::to_value(&before).ok(),
            new_value: serde_json::to_value(&after).ok(),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    Ok(success_response(json!({ "success": true, "product": after })))
}

async fn create_variant(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
    Json(input): Json<CreateVariantInput>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let created = state
        .services
        .catalog
        .create_variant(product_id, input)
        .await?;

    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: Some(admin.admin_id),
            user_id: None,
            action: "variant_created".into(),
            entity_type: "product_variant".into(),
            entity_id: Some(created.id),
            old_value: None,
            new_value: serde_json::to_value(&created).ok(),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    Ok(created_response(json!({ "success": true, "variant": created })))
}

async fn update_variant(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    headers: HeaderMap,
    Path(variant_id): Path<Uuid>,
    Json(input): Json<UpdateVariantInput>,
) -> Result<Response, ServiceError> {
    require_csrf_header(&admin, &headers)?;
    let (before, after) = state
        .services
        .catalog
        .update_variant(variant_id, input)
        .await?;

    state
        .services
        .activity_log
        .record(ActivityEntry {
            admin_id: Some(admin.admin_id),
            user_id: None,
            action: "variant_updated".into(),
            entity_type: "product_variant".into(),
            entity_id: Some(after.id),
            old_value: serde_json::to_value(&before).ok(),
            new_value: serde_json::to_value(&after).ok(),
            meta: RequestMeta::from_headers(&headers),
        })
        .await;

    Ok(success_response(json!({ "success": true, "variant": after })))
}
