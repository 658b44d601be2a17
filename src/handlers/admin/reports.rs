use axum::{extract::State, response::Response, routing::get, Router};
use std::sync::Arc;

use crate::{
    auth::AdminUser, errors::ServiceError, handlers::common::success_response, AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/reports/sales", get(sales_report))
}

async fn sales_report(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Response, ServiceError> {
    let report = state.services.reports.sales().await?;
    Ok(success_response(report))
}
