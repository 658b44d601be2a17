use proptest::prelude::*;
use rust_decimal::Decimal;

use storefront_api::entities::order::OrderStatus;

fn any_status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Confirmed),
        Just(OrderStatus::Processing),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
        Just(OrderStatus::Refunded),
    ]
}

proptest! {
    // Totals are plain decimal sums, so they must be exact regardless of
    // line count and magnitudes.
    #[test]
    fn order_total_is_subtotal_plus_shipping(
        cents in proptest::collection::vec(0i64..=10_000_000, 1..20),
        quantities in proptest::collection::vec(1i64..=50, 1..20),
        shipping_cents in 0i64..=1_000_000,
    ) {
        let lines: Vec<(Decimal, i64)> = cents
            .iter()
            .zip(quantities.iter().cycle())
            .map(|(&c, &q)| (Decimal::new(c, 2), q))
            .collect();

        let line_totals: Vec<Decimal> =
            lines.iter().map(|(price, qty)| price * Decimal::from(*qty)).collect();
        let subtotal: Decimal = line_totals.iter().copied().sum();
        let shipping = Decimal::new(shipping_cents, 2);
        let total = subtotal + shipping;

        prop_assert_eq!(total - shipping, subtotal);
        let resummed: Decimal = line_totals.iter().copied().sum();
        prop_assert_eq!(resummed, subtotal);
        prop_assert!(total >= shipping);
    }

    // Nothing ever transitions back to pending, and refunded is terminal.
    #[test]
    fn pending_is_unreachable_and_refunded_is_terminal(status in any_status()) {
        if status != OrderStatus::Pending {
            prop_assert!(!status.can_transition_to(OrderStatus::Pending));
        }
        if status != OrderStatus::Refunded {
            prop_assert!(!OrderStatus::Refunded.can_transition_to(status));
        }
    }

    // Legality is stable: a legal move stays legal when repeated from the
    // same starting point, and same-status moves are always accepted.
    #[test]
    fn same_status_moves_are_always_legal(status in any_status()) {
        prop_assert!(status.can_transition_to(status));
    }
}
