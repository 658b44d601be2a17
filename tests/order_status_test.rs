mod common;

use common::{test_meta, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use storefront_api::{
    entities::{activity_log, order::OrderStatus, user::UserRole, OrderModel},
    errors::ServiceError,
    services::cart::AddToCartInput,
    services::checkout::PlaceOrderInput,
};

async fn place_test_order(app: &TestApp) -> OrderModel {
    let user = app.seed_user("shopper", UserRole::User).await;
    let product = app.seed_product("Field Jacket", dec!(700)).await;
    let variant = app
        .seed_variant(product.id, "L", "olive", 5, dec!(0))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    app.services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    app.services
        .checkout
        .place_order(
            user.id,
            PlaceOrderInput {
                receiver_name: "Sami".to_string(),
                phone_number: "+201005550102".to_string(),
                continent: "Africa".to_string(),
                country: "Egypt".to_string(),
                city: "Giza".to_string(),
                address: "4 Pyramid Road".to_string(),
                postal_code: None,
                landmark_notes: None,
                payment_method: "cod".to_string(),
            },
            test_meta(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn forward_transitions_stamp_timestamps() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;
    let admin = app.seed_user("ops", UserRole::Admin).await;

    let confirmed = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Confirmed, admin.id, test_meta())
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert!(confirmed.shipped_at.is_none());

    let processing = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Processing, admin.id, test_meta())
        .await
        .unwrap();
    assert_eq!(processing.status, OrderStatus::Processing);

    let shipped = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Shipped, admin.id, test_meta())
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.shipped_at.is_some());
    assert!(shipped.delivered_at.is_none());

    let delivered = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Delivered, admin.id, test_meta())
        .await
        .unwrap();
    assert!(delivered.delivered_at.is_some());
}

#[tokio::test]
async fn illegal_transition_is_rejected() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;
    let admin = app.seed_user("ops", UserRole::Admin).await;

    let err = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Delivered, admin.id, test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatusTransition(_)));

    app.services
        .order_status
        .update_status(order.id, OrderStatus::Cancelled, admin.id, test_meta())
        .await
        .unwrap();
    let err = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Pending, admin.id, test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatusTransition(_)));
}

#[tokio::test]
async fn repeating_the_current_status_is_a_noop() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;
    let admin = app.seed_user("ops", UserRole::Admin).await;

    let unchanged = app
        .services
        .order_status
        .update_status(order.id, OrderStatus::Pending, admin.id, test_meta())
        .await
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
    assert_eq!(unchanged.updated_at, order.updated_at);
}

#[tokio::test]
async fn adding_tracking_forces_shipped_and_stamps_shipped_at() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;
    let admin = app.seed_user("ops", UserRole::Admin).await;

    let updated = app
        .services
        .order_status
        .add_tracking(order.id, "TRK123".to_string(), admin.id, test_meta())
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.tracking_number.as_deref(), Some("TRK123"));
    assert!(updated.shipped_at.is_some());

    let err = app
        .services
        .order_status
        .add_tracking(order.id, "   ".to_string(), admin.id, test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn status_changes_leave_an_audit_trail_with_before_and_after() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;
    let admin = app.seed_user("ops", UserRole::Admin).await;

    app.services
        .order_status
        .update_status(order.id, OrderStatus::Confirmed, admin.id, test_meta())
        .await
        .unwrap();

    let rows = activity_log::Entity::find()
        .filter(activity_log::Column::Action.eq("order_status_updated"))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.admin_id, Some(admin.id));
    assert_eq!(row.entity_id, Some(order.id));
    assert!(row.old_value.as_deref().unwrap_or("").contains("pending"));
    assert!(row.new_value.as_deref().unwrap_or("").contains("confirmed"));
    assert_eq!(row.ip_address, "203.0.113.7");
}
