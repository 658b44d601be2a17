use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{order, order_item, Order, OrderItem, OrderItemModel, OrderModel},
    errors::ServiceError,
};

/// Order read model: tracking lookups and history listings. Mutation goes
/// through checkout and the status state machine, never through here.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Tracking lookup scoped to the owning user.
    #[instrument(skip(self))]
    pub async fn find_for_user_by_number(
        &self,
        user_id: Uuid,
        order_number: &str,
    ) -> Result<(OrderModel, Vec<OrderItemModel>), ServiceError> {
        let found = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order '{order_number}' not found")))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(found.id))
            .all(&*self.db)
            .await?;
        Ok((found, items))
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Admin listing with optional status filter.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        page: u64,
        per_page: u64,
        status: Option<order::OrderStatus>,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let mut query = Order::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    pub async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, ServiceError> {
        Ok(OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }
}
