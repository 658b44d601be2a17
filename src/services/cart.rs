use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{cart_item, CartItem, CartItemModel, Product, ProductVariant},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Per-user cart lines. A line references a variant and a quantity; prices
/// are resolved from the catalog whenever the cart is priced.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartInput {
    pub variant_id: Uuid,
    pub quantity: i32,
}

/// A cart line joined with its catalog data for display and pricing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricedCartLine {
    pub item: CartItemModel,
    pub product_name: String,
    pub size: String,
    pub color: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub stock_quantity: i32,
}

impl PricedCartLine {
    /// A line is purchasable only while its quantity fits current stock.
    pub fn is_purchasable(&self) -> bool {
        self.item.quantity <= self.stock_quantity
    }
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Add a variant to the user's cart, merging into an existing line for
    /// the same variant. The merged quantity must fit current stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartItemModel, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".into(),
            ));
        }

        let variant = ProductVariant::find_by_id(input.variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", input.variant_id))
            })?;

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::VariantId.eq(input.variant_id))
            .one(&*self.db)
            .await?;

        let requested = existing.as_ref().map_or(0, |i| i.quantity) + input.quantity;
        if requested > variant.stock_quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} left in stock",
                variant.stock_quantity
            )));
        }

        let saved = if let Some(item) = existing {
            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(requested);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?
        } else {
            let now = Utc::now();
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                variant_id: Set(input.variant_id),
                quantity: Set(input.quantity),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&*self.db)
            .await?
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                variant_id: input.variant_id,
            })
            .await;

        info!(%user_id, variant_id = %input.variant_id, quantity = requested, "cart line saved");
        Ok(saved)
    }

    /// Set a line's quantity; zero or less removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {item_id} not found")))?;

        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Cart item belongs to another user".into(),
            ));
        }

        if quantity <= 0 {
            item.delete(&*self.db).await?;
            return Ok(None);
        }

        let variant = ProductVariant::find_by_id(item.variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", item.variant_id))
            })?;
        if quantity > variant.stock_quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} left in stock",
                variant.stock_quantity
            )));
        }

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        Ok(Some(active.update(&*self.db).await?))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {item_id} not found")))?;
        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Cart item belongs to another user".into(),
            ));
        }
        item.delete(&*self.db).await?;
        Ok(())
    }

    /// The user's cart joined with catalog data, oldest line first.
    #[instrument(skip(self))]
    pub async fn priced_lines(&self, user_id: Uuid) -> Result<Vec<PricedCartLine>, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let variant = ProductVariant::find_by_id(item.variant_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Variant {} not found", item.variant_id))
                })?;
            let product = variant
                .find_related(Product)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", variant.product_id))
                })?;

            let unit_price = product.base_price + variant.price_adjustment;
            let line_total = unit_price * Decimal::from(item.quantity);
            lines.push(PricedCartLine {
                item,
                product_name: product.name,
                size: variant.size,
                color: variant.color,
                unit_price,
                line_total,
                stock_quantity: variant.stock_quantity,
            });
        }
        Ok(lines)
    }
}
