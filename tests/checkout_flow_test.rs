mod common;

use common::{test_meta, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use storefront_api::{
    entities::{
        cart_item, order, order_item, payment_transaction, product_variant,
        user::UserRole,
    },
    errors::ServiceError,
    events::Event,
    services::cart::AddToCartInput,
    services::catalog::UpdateProductInput,
    services::checkout::PlaceOrderInput,
};

fn shipping_form(payment_method: &str) -> PlaceOrderInput {
    PlaceOrderInput {
        receiver_name: "Amina Hassan".to_string(),
        phone_number: "+201005550101".to_string(),
        continent: "Africa".to_string(),
        country: "Egypt".to_string(),
        city: "Cairo".to_string(),
        address: "12 Tahrir Square".to_string(),
        postal_code: Some("11511".to_string()),
        landmark_notes: None,
        payment_method: payment_method.to_string(),
    }
}

#[tokio::test]
async fn placing_an_order_snapshots_prices_and_clears_the_cart() {
    let mut app = TestApp::new().await;
    let user = app.seed_user("amina", UserRole::User).await;
    let product = app.seed_product("Linen Shirt", dec!(450)).await;
    let variant = app
        .seed_variant(product.id, "M", "white", 5, dec!(50))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    app.services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    let placed = app
        .services
        .checkout
        .place_order(user.id, shipping_form("cod"), test_meta())
        .await
        .unwrap();

    assert!(placed.order_number.starts_with("ORD-"));
    assert_eq!(placed.status, order::OrderStatus::Pending);
    assert_eq!(placed.subtotal, dec!(1000));
    assert_eq!(placed.shipping_fee, dec!(150));
    assert_eq!(placed.total_amount, dec!(1150));

    // Line item snapshot carries name, attributes and the effective price.
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(placed.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, "Linen Shirt");
    assert_eq!(items[0].size, "M");
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].unit_price, dec!(500));
    assert_eq!(items[0].line_total, dec!(1000));

    // Stock decremented, cart emptied, payment stub recorded.
    let fresh = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.stock_quantity, 3);

    let cart = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(cart.is_empty());

    let txns = payment_transaction::Entity::find()
        .filter(payment_transaction::Column::OrderId.eq(placed.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(txns.len(), 1);
    assert!(txns[0].transaction_code.starts_with("TXN-"));
    assert_eq!(txns[0].amount, dec!(1150));
    assert_eq!(txns[0].status, "pending");

    // Post-commit events.
    let first = app.events.recv().await.unwrap();
    assert!(matches!(first, Event::CartItemAdded { .. }));
    let created = app.events.recv().await.unwrap();
    assert!(matches!(created, Event::OrderCreated(id) if id == placed.id));
    let cleared = app.events.recv().await.unwrap();
    assert!(matches!(cleared, Event::CartCleared(id) if id == user.id));
}

#[tokio::test]
async fn order_snapshot_survives_later_catalog_edits() {
    let app = TestApp::new().await;
    let user = app.seed_user("buyer", UserRole::User).await;
    let product = app.seed_product("Wool Scarf", dec!(200)).await;
    let variant = app
        .seed_variant(product.id, "one-size", "red", 10, dec!(0))
        .await;
    app.seed_shipping_rate("Europe", dec!(25)).await;

    let mut form = shipping_form("card");
    form.continent = "Europe".to_string();
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
    let placed = app
        .services
        .checkout
        .place_order(user.id, form, test_meta())
        .await
        .unwrap();

    app.services
        .catalog
        .update_product(
            product.id,
            UpdateProductInput {
                category_id: None,
                name: Some("Wool Scarf Deluxe".to_string()),
                description: None,
                base_price: Some(dec!(999)),
                is_active: None,
            },
        )
        .await
        .unwrap();

    let items = app.services.orders.items_for_order(placed.id).await.unwrap();
    assert_eq!(items[0].product_name, "Wool Scarf");
    assert_eq!(items[0].unit_price, dec!(200));
}

#[tokio::test]
async fn insufficient_stock_rejects_the_checkout_and_leaves_state_untouched() {
    let app = TestApp::new().await;
    let user = app.seed_user("hopeful", UserRole::User).await;
    let product = app.seed_product("Canvas Tote", dec!(100)).await;
    let variant = app
        .seed_variant(product.id, "one-size", "natural", 3, dec!(0))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    app.services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 3,
            },
        )
        .await
        .unwrap();

    // Someone else buys the stock out from under the cart.
    let rival = app.seed_user("rival", UserRole::User).await;
    app.services
        .cart
        .add_item(
            rival.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    app.services
        .checkout
        .place_order(rival.id, shipping_form("cod"), test_meta())
        .await
        .unwrap();

    let err = app
        .services
        .checkout
        .place_order(user.id, shipping_form("cod"), test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // Nothing moved: the cart line survives and stock reflects only the
    // rival's purchase.
    let cart = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 3);

    let fresh = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.stock_quantity, 1);

    let orders = order::Entity::find()
        .filter(order::Column::UserId.eq(user.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let app = TestApp::new().await;
    let user = app.seed_user("empty", UserRole::User).await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    let err = app
        .services
        .checkout
        .place_order(user.id, shipping_form("cod"), test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn unknown_payment_method_is_rejected() {
    let app = TestApp::new().await;
    let user = app.seed_user("payer", UserRole::User).await;

    let err = app
        .services
        .checkout
        .place_order(user.id, shipping_form("bitcoin"), test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn missing_shipping_rate_is_rejected() {
    let app = TestApp::new().await;
    let user = app.seed_user("antarctic", UserRole::User).await;
    let product = app.seed_product("Parka", dec!(800)).await;
    let variant = app
        .seed_variant(product.id, "L", "navy", 2, dec!(0))
        .await;
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

    let mut form = shipping_form("cod");
    form.continent = "Antarctica".to_string();
    let err = app
        .services
        .checkout
        .place_order(user.id, form, test_meta())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("owner", UserRole::User).await;
    let snoop = app.seed_user("snoop", UserRole::User).await;
    let product = app.seed_product("Desk Lamp", dec!(300)).await;
    let variant = app
        .seed_variant(product.id, "one-size", "black", 4, dec!(0))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    app.services
        .cart
        .add_item(
            buyer.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    let placed = app
        .services
        .checkout
        .place_order(buyer.id, shipping_form("cod"), test_meta())
        .await
        .unwrap();

    assert!(app
        .services
        .orders
        .find_for_user_by_number(buyer.id, &placed.order_number)
        .await
        .is_ok());
    let err = app
        .services
        .orders
        .find_for_user_by_number(snoop.id, &placed.order_number)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn depleting_a_variant_emits_a_stock_depleted_event() {
    let mut app = TestApp::new().await;
    let user = app.seed_user("lastone", UserRole::User).await;
    let product = app.seed_product("Limited Print", dec!(90)).await;
    let variant = app
        .seed_variant(product.id, "A3", "mono", 2, dec!(0))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    app.services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    app.services
        .checkout
        .place_order(user.id, shipping_form("cod"), test_meta())
        .await
        .unwrap();

    let mut saw_depleted = false;
    while let Ok(event) = app.events.try_recv() {
        if matches!(event, Event::StockDepleted { variant_id } if variant_id == variant.id) {
            saw_depleted = true;
        }
    }
    assert!(saw_depleted);

    let fresh = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.stock_quantity, 0);
}

#[tokio::test]
async fn order_numbers_are_unique_across_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("Mug", dec!(40)).await;
    let variant = app
        .seed_variant(product.id, "one-size", "blue", 50, dec!(0))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    let mut seen = std::collections::HashSet::new();
    for i in 0..3 {
        let user = app
            .seed_user(&format!("shopper{i}"), UserRole::User)
            .await;
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
        let placed = app
            .services
            .checkout
            .place_order(user.id, shipping_form("cod"), test_meta())
            .await
            .unwrap();
        assert!(seen.insert(placed.order_number));
    }
}

#[tokio::test]
async fn racing_checkouts_for_the_last_unit_commit_at_most_one_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Limited Print", dec!(300)).await;
    let variant = app
        .seed_variant(product.id, "one-size", "black", 1, dec!(0))
        .await;
    app.seed_shipping_rate("Africa", dec!(150)).await;

    let first = app.seed_user("fast", UserRole::User).await;
    let second = app.seed_user("faster", UserRole::User).await;
    for buyer in [&first, &second] {
        app.services
            .cart
            .add_item(
                buyer.id,
                AddToCartInput {
                    variant_id: variant.id,
                    quantity: 1,
                },
            )
            .await
            .unwrap();
    }

    // Both checkouts pass the cart pre-check while the unit is still in
    // stock; the conditional decrement inside the transaction decides the
    // winner and rolls the loser back.
    let (a, b) = tokio::join!(
        app.services
            .checkout
            .place_order(first.id, shipping_form("cod"), test_meta()),
        app.services
            .checkout
            .place_order(second.id, shipping_form("cod"), test_meta()),
    );

    let results = [(first.id, a), (second.id, b)];
    let winners: Vec<_> = results.iter().filter(|(_, r)| r.is_ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one checkout may commit");
    for (_, result) in &results {
        if let Err(err) = result {
            assert!(matches!(err, ServiceError::InsufficientStock(_)));
        }
    }

    let fresh = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.stock_quantity, 0);

    let orders = order::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    let transactions = payment_transaction::Entity::find()
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1);

    // The losing cart line is preserved so the shopper can retry later.
    let (loser_id, _) = results
        .iter()
        .find(|(_, r)| r.is_err())
        .expect("one checkout must lose");
    let leftover = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(*loser_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(leftover.len(), 1);
    assert_eq!(leftover[0].quantity, 1);
}
