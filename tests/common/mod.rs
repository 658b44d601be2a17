//! Shared harness for integration tests: an in-memory SQLite database
//! with the production migrations applied, plus the full service set
//! wired the same way the server wires it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use storefront_api::{
    db::{establish_connection_with_config, run_migrations, DbConfig},
    entities::{
        product, product_variant, shipping_rate,
        user::{self, UserRole},
    },
    events::{self, Event, EventSender},
    handlers::AppServices,
    services::activity_log::RequestMeta,
};

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub event_sender: Arc<EventSender>,
    pub events: tokio::sync::mpsc::Receiver<Event>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = Arc::new(
            establish_connection_with_config(&config)
                .await
                .expect("sqlite connection"),
        );
        run_migrations(&db).await.expect("migrations");

        let (event_sender, events) = events::channel(64);
        let event_sender = Arc::new(event_sender);

        let app_config = storefront_api::config::AppConfig::new(
            config.url.clone(),
            "a_test_session_secret_that_is_long_enough".to_string(),
            "127.0.0.1".to_string(),
            0,
        );
        let services = AppServices::build(db.clone(), event_sender.clone(), &app_config);

        Self {
            db,
            services,
            event_sender,
            events,
        }
    }

    pub async fn seed_user(&self, username: &str, role: UserRole) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            password_hash: Set("x".to_string()),
            role: Set(role),
            is_active: Set(true),
            birthdate: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed user")
    }

    pub async fn seed_product(&self, name: &str, base_price: Decimal) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(None),
            name: Set(name.to_string()),
            slug: Set(name.to_lowercase().replace(' ', "-")),
            description: Set(None),
            base_price: Set(base_price),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_variant(
        &self,
        product_id: Uuid,
        size: &str,
        color: &str,
        stock: i32,
        price_adjustment: Decimal,
    ) -> product_variant::Model {
        let now = Utc::now();
        product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            size: Set(size.to_string()),
            color: Set(color.to_string()),
            stock_quantity: Set(stock),
            price_adjustment: Set(price_adjustment),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed variant")
    }

    pub async fn seed_shipping_rate(&self, continent: &str, base_rate: Decimal) {
        shipping_rate::ActiveModel {
            id: Set(Uuid::new_v4()),
            continent: Set(continent.to_string()),
            base_rate: Set(base_rate),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed shipping rate");
    }
}

pub fn test_meta() -> RequestMeta {
    RequestMeta {
        ip: "203.0.113.7".to_string(),
        user_agent: "integration-test".to_string(),
    }
}
