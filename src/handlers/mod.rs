use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::{
    auth::AuthService,
    config::AppConfig,
    events::EventSender,
    services::{
        ActivityLogService, CartService, CatalogService, CheckoutService, OrderService,
        OrderStatusService, ReportService, UserService,
    },
};

pub mod admin;
pub mod auth;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod products;

/// All services wired with their shared dependencies, built once at
/// startup and handed to handlers through [`crate::AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub users: Arc<UserService>,
    pub reports: Arc<ReportService>,
    pub activity_log: Arc<ActivityLogService>,
}

impl AppServices {
    pub fn build(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let activity_log = Arc::new(ActivityLogService::new(db.clone()));
        let cart = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            cart.clone(),
            activity_log.clone(),
        ));
        let order_status = Arc::new(OrderStatusService::new(
            db.clone(),
            event_sender.clone(),
            activity_log.clone(),
        ));
        let auth = Arc::new(AuthService::new(
            db.clone(),
            config.login_attempts_per_window,
            Duration::from_secs(config.login_window_secs),
        ));

        Self {
            auth,
            catalog: Arc::new(CatalogService::new(db.clone())),
            cart,
            checkout,
            orders: Arc::new(OrderService::new(db.clone())),
            order_status,
            users: Arc::new(UserService::new(db.clone())),
            reports: Arc::new(ReportService::new(db)),
            activity_log,
        }
    }
}
