use chrono::Utc;
use http::HeaderMap;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::entities::{activity_log, ActivityLog, ActivityLogModel};
use crate::errors::ServiceError;

/// Request metadata attached to every audit row.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: String,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: client_ip(headers),
            user_agent: headers
                .get(http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string(),
        }
    }
}

/// Resolve the client IP from forwarding headers in fixed priority order:
/// first `X-Forwarded-For` entry that parses as an address, then
/// `X-Real-IP`, falling back to the literal "0.0.0.0".
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        for candidate in forwarded.split(',') {
            let candidate = candidate.trim();
            if candidate.parse::<IpAddr>().is_ok() {
                return candidate.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if real_ip.trim().parse::<IpAddr>().is_ok() {
            return real_ip.trim().to_string();
        }
    }
    "0.0.0.0".to_string()
}

/// One audit entry. Old/new snapshots are opaque structured values,
/// serialized to text on write.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub admin_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub meta: RequestMeta,
}

#[derive(Clone)]
pub struct ActivityLogService {
    db: Arc<DatabaseConnection>,
}

impl ActivityLogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append one audit row. Fire-and-forget: a failure here is logged and
    /// swallowed so it can never roll back or fail the business operation
    /// that triggered it.
    pub async fn record(&self, entry: ActivityEntry) {
        let model = activity_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            admin_id: Set(entry.admin_id),
            user_id: Set(entry.user_id),
            action: Set(entry.action.clone()),
            entity_type: Set(entry.entity_type),
            entity_id: Set(entry.entity_id),
            old_value: Set(entry.old_value.map(|v| v.to_string())),
            new_value: Set(entry.new_value.map(|v| v.to_string())),
            ip_address: Set(entry.meta.ip),
            user_agent: Set(entry.meta.user_agent),
            created_at: Set(Utc::now()),
        };

        if let Err(e) = model.insert(&*self.db).await {
            warn!(action = %entry.action, error = %e, "failed to write activity log entry");
        }
    }

    /// Paginated view for the admin log viewer, newest first.
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ActivityLogModel>, u64), ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let paginator = ActivityLog::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}
