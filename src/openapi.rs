use utoipa::OpenApi;

use crate::{
    entities::{order::OrderStatus, user::UserRole},
    errors::ErrorResponse,
    services::cart::AddToCartInput,
    services::catalog::{
        CreateProductInput, CreateVariantInput, UpdateProductInput, UpdateVariantInput,
    },
    services::checkout::PlaceOrderInput,
    services::reports::{SalesReport, StatusBreakdown},
};

/// Machine-readable API description served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "storefront-api",
        description = "Storefront and back-office API: catalog, carts, checkout, order workflow, moderation and reporting.",
        version = "0.1.0",
    ),
    components(schemas(
        ErrorResponse,
        OrderStatus,
        UserRole,
        AddToCartInput,
        PlaceOrderInput,
        CreateProductInput,
        UpdateProductInput,
        CreateVariantInput,
        UpdateVariantInput,
        SalesReport,
        StatusBreakdown,
    )),
    tags(
        (name = "storefront", description = "Catalog browsing, cart and checkout"),
        (name = "admin", description = "Back-office order workflow, catalog CRUD, moderation and reports"),
    )
)]
pub struct ApiDoc;
