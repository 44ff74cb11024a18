use chrono::Utc;
use polycart_rs::config::PricingConfig;
use polycart_rs::models::{
    item_count, savings, subtotal, validate_quantity, CartItem, CartSummary, MinimalCartItem,
    MAX_CART_QUANTITY,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// Property-based test strategies
prop_compose! {
    fn arb_price()(cents in 0u32..100000) -> Decimal {
        // Generate prices as cents so every value has exactly 2 decimal places
        Decimal::from_parts(cents, 0, 0, false, 2)
    }
}

prop_compose! {
    fn arb_markup()(cents in 0u32..5000) -> Decimal {
        Decimal::from_parts(cents, 0, 0, false, 2)
    }
}

prop_compose! {
    fn arb_cart_item()(
        id in "[A-Z][0-9]{1,4}",
        name in "[a-zA-Z0-9 ]{3,40}",
        price in arb_price(),
        markup in arb_markup(),
        quantity in 1u32..50,
        category in prop::option::of("[a-z]{3,12}"),
    ) -> CartItem {
        let now = Utc::now();
        CartItem {
            id,
            name,
            price,
            original_price: price + markup,
            image: None,
            category,
            quantity,
            added_at: now,
            updated_at: now,
        }
    }
}

fn arb_cart() -> impl Strategy<Value = Vec<CartItem>> {
    prop::collection::vec(arb_cart_item(), 0..8)
}

proptest! {
    #[test]
    fn prop_subtotal_is_sum_of_line_totals(items in arb_cart()) {
        let expected: Decimal = items.iter().map(CartItem::line_total).sum();
        prop_assert_eq!(subtotal(&items), expected);
        prop_assert!(subtotal(&items) >= Decimal::ZERO);
    }

    #[test]
    fn prop_item_count_is_sum_of_quantities(items in arb_cart()) {
        let expected: u32 = items.iter().map(|item| item.quantity).sum();
        prop_assert_eq!(item_count(&items), expected);
    }

    #[test]
    fn prop_savings_never_negative(items in arb_cart()) {
        prop_assert!(savings(&items) >= Decimal::ZERO);
    }

    #[test]
    fn prop_summary_total_is_consistent(items in arb_cart()) {
        let pricing = PricingConfig::default();
        let summary = CartSummary::compute(&items, &pricing);

        prop_assert_eq!(summary.total, summary.subtotal + summary.shipping + summary.tax);
        prop_assert_eq!(summary.item_count, item_count(&items));
        prop_assert_eq!(summary.unique_items, items.len());
    }

    #[test]
    fn prop_summary_shipping_rules(items in arb_cart()) {
        let pricing = PricingConfig::default();
        let summary = CartSummary::compute(&items, &pricing);

        if items.is_empty() {
            prop_assert_eq!(summary.shipping, Decimal::ZERO);
        } else if summary.subtotal >= pricing.free_shipping_threshold {
            prop_assert_eq!(summary.shipping, Decimal::ZERO);
            prop_assert!(summary.qualifies_for_free_shipping);
        } else {
            prop_assert_eq!(summary.shipping, pricing.standard_rate);
            prop_assert!(!summary.qualifies_for_free_shipping);
        }
    }

    #[test]
    fn prop_normalize_is_idempotent(mut item in arb_cart_item()) {
        item.normalize();
        let once = item.clone();
        item.normalize();

        prop_assert_eq!(&item, &once);
        prop_assert!(item.original_price >= item.price);
    }

    #[test]
    fn prop_cart_item_serde_round_trip(item in arb_cart_item()) {
        let json = serde_json::to_string(&item)?;
        let parsed: CartItem = serde_json::from_str(&json)?;
        prop_assert_eq!(parsed, item);
    }

    #[test]
    fn prop_minimal_shape_preserves_identity(item in arb_cart_item()) {
        let minimal = MinimalCartItem::from(&item);
        let json = serde_json::to_string(&minimal)?;
        let parsed: MinimalCartItem = serde_json::from_str(&json)?;

        let placeholder = parsed.into_placeholder_item();
        prop_assert_eq!(&placeholder.id, &item.id);
        prop_assert_eq!(placeholder.quantity, item.quantity);
    }

    #[test]
    fn prop_quantity_bounds(quantity in 0u32..5000) {
        let valid = (1..=MAX_CART_QUANTITY).contains(&quantity);
        prop_assert_eq!(validate_quantity(quantity).is_ok(), valid);
    }
}
