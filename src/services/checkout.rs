use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        cart_item, order, order_item, payment_transaction, product_variant, shipping_rate,
        CartItem, Order, OrderModel, ShippingRate,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        activity_log::{ActivityEntry, ActivityLogService, RequestMeta},
        cart::{CartService, PricedCartLine},
    },
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;
const PAYMENT_METHODS: &[&str] = &["cod", "card", "bank_transfer"];

/// Shipping form fields submitted at checkout.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderInput {
    #[validate(length(min = 1, max = 100, message = "Receiver name is required"))]
    pub receiver_name: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "Continent is required"))]
    pub continent: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub postal_code: Option<String>,
    pub landmark_notes: Option<String>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}

/// The checkout / order placement workflow.
///
/// Everything that can be rejected is rejected before the transaction
/// begins; once the transaction starts, the order header, line-item
/// snapshots, stock decrements, cart clearing and the payment stub all
/// commit or roll back together.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    cart_service: Arc<CartService>,
    activity_log: Arc<ActivityLogService>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        cart_service: Arc<CartService>,
        activity_log: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            cart_service,
            activity_log,
        }
    }

    /// Convert the user's cart into an order.
    #[instrument(skip(self, input, meta), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
        meta: RequestMeta,
    ) -> Result<OrderModel, ServiceError> {
        input.validate()?;
        crate::auth::validate_phone(&input.phone_number)?;
        if !PAYMENT_METHODS.contains(&input.payment_method.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown payment method '{}'",
                input.payment_method
            )));
        }

        let lines = self.cart_service.priced_lines(user_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".into()));
        }

        // Stock is re-checked here at submit time, not trusted from
        // page-load time. One failing line rejects the whole checkout.
        for line in &lines {
            if !line.is_purchasable() {
                return Err(ServiceError::InsufficientStock(format!(
                    "'{}' ({}/{}) has only {} left in stock",
                    line.product_name, line.size, line.color, line.stock_quantity
                )));
            }
        }

        let rate = ShippingRate::find()
            .filter(shipping_rate::Column::Continent.eq(input.continent.clone()))
            .filter(shipping_rate::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "No active shipping rate for '{}'",
                    input.continent
                ))
            })?;

        let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
        let shipping_fee = rate.base_rate;
        let total_amount = subtotal + shipping_fee;

        let order = match self
            .commit_order(user_id, &input, &lines, subtotal, shipping_fee, total_amount)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // Rollback already happened; the caller surfaces a generic
                // message while the cause lands in the log.
                error!(%user_id, error = %e, "checkout transaction failed");
                return Err(e);
            }
        };

        // Post-commit, best-effort.
        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;
        self.event_sender
            .send_or_log(Event::CartCleared(user_id))
            .await;
        for line in &lines {
            if line.item.quantity == line.stock_quantity {
                self.event_sender
                    .send_or_log(Event::StockDepleted {
                        variant_id: line.item.variant_id,
                    })
                    .await;
            }
        }
        self.activity_log
            .record(ActivityEntry {
                admin_id: None,
                user_id: Some(user_id),
                action: "order_created".into(),
                entity_type: "order".into(),
                entity_id: Some(order.id),
                old_value: None,
                new_value: Some(json!({
                    "order_number": order.order_number,
                    "subtotal": order.subtotal,
                    "shipping_fee": order.shipping_fee,
                    "total_amount": order.total_amount,
                    "status": order.status.as_str(),
                })),
                meta,
            })
            .await;

        info!(order_number = %order.order_number, %total_amount, "order placed");
        Ok(order)
    }

    /// The all-or-nothing portion of checkout. Any error here rolls the
    /// transaction back, leaving cart, stock and order tables untouched.
    async fn commit_order(
        &self,
        user_id: Uuid,
        input: &PlaceOrderInput,
        lines: &[PricedCartLine],
        subtotal: Decimal,
        shipping_fee: Decimal,
        total_amount: Decimal,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let order_number = generate_unique_order_number(&txn).await?;

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            user_id: Set(user_id),
            receiver_name: Set(input.receiver_name.clone()),
            phone_number: Set(input.phone_number.clone()),
            continent: Set(input.continent.clone()),
            country: Set(input.country.clone()),
            city: Set(input.city.clone()),
            address: Set(input.address.clone()),
            postal_code: Set(input.postal_code.clone()),
            landmark_notes: Set(input.landmark_notes.clone()),
            subtotal: Set(subtotal),
            shipping_fee: Set(shipping_fee),
            total_amount: Set(total_amount),
            payment_method: Set(input.payment_method.clone()),
            status: Set(order::OrderStatus::Pending),
            tracking_number: Set(None),
            created_at: Set(now),
            shipped_at: Set(None),
            delivered_at: Set(None),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in lines {
            // Snapshot of what was actually sold, decoupled from future
            // catalog edits.
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                variant_id: Set(line.item.variant_id),
                product_name: Set(line.product_name.clone()),
                size: Set(line.size.clone()),
                color: Set(line.color.clone()),
                quantity: Set(line.item.quantity),
                unit_price: Set(line.unit_price),
                line_total: Set(line.line_total),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            // Guarded decrement: only succeeds while enough stock remains,
            // so concurrent checkouts cannot oversell the variant.
            let result = product_variant::Entity::update_many()
                .col_expr(
                    product_variant::Column::StockQuantity,
                    Expr::col(product_variant::Column::StockQuantity).sub(line.item.quantity),
                )
                .filter(product_variant::Column::Id.eq(line.item.variant_id))
                .filter(product_variant::Column::StockQuantity.gte(line.item.quantity))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "'{}' ({}/{}) sold out during checkout",
                    line.product_name, line.size, line.color
                )));
            }
        }

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        payment_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            transaction_code: Set(generate_transaction_code()),
            amount: Set(total_amount),
            payment_method: Set(input.payment_method.clone()),
            status: Set("pending".to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(order)
    }
}

/// Time-stamped, human-readable order number with a short random suffix.
/// Regenerated on collision; the unique index on `orders.order_number` is
/// the backstop.
async fn generate_unique_order_number<C: sea_orm::ConnectionTrait>(
    conn: &C,
) -> Result<String, ServiceError> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = format!(
            "ORD-{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S"),
            random_suffix(4)
        );
        let taken = Order::find()
            .filter(order::Column::OrderNumber.eq(candidate.clone()))
            .one(conn)
            .await?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
    }
    Err(ServiceError::InternalError(
        "could not generate a unique order number".into(),
    ))
}

fn generate_transaction_code() -> String {
    format!("TXN-{}", random_suffix(12))
}

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}
