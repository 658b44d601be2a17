mod common;

use common::TestApp;
use rust_decimal_macros::dec;

use storefront_api::{
    entities::user::UserRole, errors::ServiceError, services::cart::AddToCartInput,
};

#[tokio::test]
async fn adding_the_same_variant_twice_merges_into_one_line() {
    let app = TestApp::new().await;
    let user = app.seed_user("merger", UserRole::User).await;
    let product = app.seed_product("Tee", dec!(120)).await;
    let variant = app
        .seed_variant(product.id, "S", "black", 10, dec!(0))
        .await;

    let add = |qty| AddToCartInput {
        variant_id: variant.id,
        quantity: qty,
    };
    app.services.cart.add_item(user.id, add(2)).await.unwrap();
    let merged = app.services.cart.add_item(user.id, add(3)).await.unwrap();
    assert_eq!(merged.quantity, 5);

    let lines = app.services.cart.priced_lines(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].line_total, dec!(600));
}

#[tokio::test]
async fn merged_quantity_cannot_exceed_stock() {
    let app = TestApp::new().await;
    let user = app.seed_user("greedy", UserRole::User).await;
    let product = app.seed_product("Cap", dec!(60)).await;
    let variant = app
        .seed_variant(product.id, "one-size", "red", 4, dec!(0))
        .await;

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
    let err = app
        .services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 2,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
}

#[tokio::test]
async fn zero_quantity_update_removes_the_line() {
    let app = TestApp::new().await;
    let user = app.seed_user("undecided", UserRole::User).await;
    let product = app.seed_product("Socks", dec!(30)).await;
    let variant = app
        .seed_variant(product.id, "M", "grey", 10, dec!(0))
        .await;

    let item = app
        .services
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

    let result = app
        .services
        .cart
        .update_quantity(user.id, item.id, 0)
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(app
        .services
        .cart
        .priced_lines(user.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn cart_lines_are_owner_scoped() {
    let app = TestApp::new().await;
    let owner = app.seed_user("cartowner", UserRole::User).await;
    let intruder = app.seed_user("intruder", UserRole::User).await;
    let product = app.seed_product("Belt", dec!(80)).await;
    let variant = app
        .seed_variant(product.id, "90cm", "brown", 5, dec!(0))
        .await;

    let item = app
        .services
        .cart
        .add_item(
            owner.id,
            AddToCartInput {
                variant_id: variant.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let err = app
        .services
        .cart
        .update_quantity(intruder.id, item.id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = app
        .services
        .cart
        .remove_item(intruder.id, item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn priced_lines_reflect_current_catalog_prices() {
    let app = TestApp::new().await;
    let user = app.seed_user("watcher", UserRole::User).await;
    let product = app.seed_product("Hoodie", dec!(250)).await;
    let variant = app
        .seed_variant(product.id, "XL", "green", 8, dec!(25))
        .await;

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

    let lines = app.services.cart.priced_lines(user.id).await.unwrap();
    assert_eq!(lines[0].unit_price, dec!(275));
    assert_eq!(lines[0].line_total, dec!(550));
    assert!(lines[0].is_purchasable());
}
