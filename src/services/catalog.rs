use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        category, product, product_variant, Category, Product, ProductModel, ProductVariant,
        ProductVariantModel,
    },
    errors::ServiceError,
};

/// Catalog read model plus the admin-facing product/variant CRUD.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

/// A product with its stock aggregate across variants.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: ProductModel,
    pub total_stock: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub description: Option<String>,
    pub base_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariantInput {
    #[validate(length(min = 1, max = 50))]
    pub size: String,
    #[validate(length(min = 1, max = 50))]
    pub color: String,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    pub price_adjustment: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVariantInput {
    pub size: Option<String>,
    pub color: Option<String>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    pub price_adjustment: Option<Decimal>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Active products with their stock aggregates, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        category_slug: Option<String>,
    ) -> Result<(Vec<ProductSummary>, u64), ServiceError> {
        let per_page = per_page.clamp(1, 100);

        let mut query = Product::find().filter(product::Column::IsActive.eq(true));
        if let Some(slug) = category_slug {
            let cat = Category::find()
                .filter(category::Column::Slug.eq(slug.clone()))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Category '{slug}' not found")))?;
            query = query.filter(product::Column::CategoryId.eq(cat.id));
        }

        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut summaries = Vec::with_capacity(products.len());
        for p in products {
            let total_stock = self.stock_for_product(p.id).await?;
            summaries.push(ProductSummary {
                product: p,
                total_stock,
            });
        }
        Ok((summaries, total))
    }

    /// Back-office listing: includes inactive products.
    #[instrument(skip(self))]
    pub async fn list_all_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductSummary>, u64), ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let paginator = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut summaries = Vec::with_capacity(products.len());
        for p in products {
            let total_stock = self.stock_for_product(p.id).await?;
            summaries.push(ProductSummary {
                product: p,
                total_stock,
            });
        }
        Ok((summaries, total))
    }

    async fn stock_for_product(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;
        Ok(variants.iter().map(|v| v.stock_quantity as i64).sum())
    }

    /// Storefront detail lookup by slug, with all variants.
    #[instrument(skip(self))]
    pub async fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<(ProductModel, Vec<ProductVariantModel>), ServiceError> {
        let product = Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product '{slug}' not found")))?;

        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product.id))
            .order_by_asc(product_variant::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok((product, variants))
    }

    pub async fn get_variant(&self, variant_id: Uuid) -> Result<ProductVariantModel, ServiceError> {
        ProductVariant::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {variant_id} not found")))
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if input.base_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Base price cannot be negative".into(),
            ));
        }

        let exists = Product::find()
            .filter(product::Column::Slug.eq(input.slug.clone()))
            .one(&*self.db)
            .await?;
        if exists.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product slug '{}' already exists",
                input.slug
            )));
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(input.category_id),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            base_price: Set(input.base_price),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// Partial update; returns (before, after) so callers can audit both.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<(ProductModel, ProductModel), ServiceError> {
        input.validate()?;
        let before = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let mut active: product::ActiveModel = before.clone().into();
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(base_price) = input.base_price {
            if base_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Base price cannot be negative".into(),
                ));
            }
            active.base_price = Set(base_price);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        let after = active.update(&*self.db).await?;
        Ok((before, after))
    }

    #[instrument(skip(self, input))]
    pub async fn create_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let now = Utc::now();
        let model = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            size: Set(input.size),
            color: Set(input.color),
            stock_quantity: Set(input.stock_quantity),
            price_adjustment: Set(input.price_adjustment),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        info!(variant_id = %created.id, %product_id, "variant created");
        Ok(created)
    }

    /// Partial update; returns (before, after) for auditing.
    #[instrument(skip(self, input))]
    pub async fn update_variant(
        &self,
        variant_id: Uuid,
        input: UpdateVariantInput,
    ) -> Result<(ProductVariantModel, ProductVariantModel), ServiceError> {
        input.validate()?;
        let before = self.get_variant(variant_id).await?;

        let mut active: product_variant::ActiveModel = before.clone().into();
        if let Some(size) = input.size {
            active.size = Set(size);
        }
        if let Some(color) = input.color {
            active.color = Set(color);
        }
        if let Some(stock_quantity) = input.stock_quantity {
            active.stock_quantity = Set(stock_quantity);
        }
        if let Some(price_adjustment) = input.price_adjustment {
            active.price_adjustment = Set(price_adjustment);
        }
        active.updated_at = Set(Utc::now());
        let after = active.update(&*self.db).await?;
        Ok((before, after))
    }
}
