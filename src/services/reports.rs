use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    entities::{order, Order},
    errors::ServiceError,
};

/// Dashboard aggregates for the admin back office.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SalesReport {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub by_status: Vec<StatusBreakdown>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusBreakdown {
    pub status: String,
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(FromQueryResult)]
struct StatusRow {
    status: String,
    orders: i64,
    revenue: Option<Decimal>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn sales(&self) -> Result<SalesReport, ServiceError> {
        let rows: Vec<StatusRow> = Order::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(order::Column::Id.count(), "orders")
            .column_as(order::Column::TotalAmount.sum(), "revenue")
            .group_by(order::Column::Status)
            .into_model::<StatusRow>()
            .all(&*self.db)
            .await?;

        let mut by_status = Vec::with_capacity(rows.len());
        let mut total_orders = 0u64;
        let mut total_revenue = Decimal::ZERO;
        for row in rows {
            let revenue = row.revenue.unwrap_or(Decimal::ZERO);
            total_orders += row.orders as u64;
            total_revenue += revenue;
            by_status.push(StatusBreakdown {
                status: row.status,
                orders: row.orders as u64,
                revenue,
            });
        }
        by_status.sort_by(|a, b| a.status.cmp(&b.status));

        Ok(SalesReport {
            total_orders,
            total_revenue,
            by_status,
        })
    }
}
