use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;

use super::CartItem;

/// Shipping method selected at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Standard,
    Express,
    Overnight,
    Free,
}

impl std::fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingMethod::Standard => write!(f, "standard"),
            ShippingMethod::Express => write!(f, "express"),
            ShippingMethod::Overnight => write!(f, "overnight"),
            ShippingMethod::Free => write!(f, "free"),
        }
    }
}

impl Default for ShippingMethod {
    fn default() -> Self {
        ShippingMethod::Standard
    }
}

/// Aggregate totals derived from the cart contents, all rounded to two
/// decimal places. Never stored; recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub item_count: u32,
    pub unique_items: usize,
    pub free_shipping_threshold: Decimal,
    pub qualifies_for_free_shipping: bool,
    pub savings: Decimal,
}

/// Category and age breakdown of the cart contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartAnalytics {
    pub categories: HashMap<String, u32>,
    pub total_value: Decimal,
    pub oldest_item: Option<DateTime<Utc>>,
    pub newest_item: Option<DateTime<Utc>>,
    pub average_item_value: Decimal,
    pub cart_age_days: i64,
}

/// Sum of unit price times quantity across all items
pub fn subtotal(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Sum of per-line savings across all items
pub fn savings(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_savings).sum()
}

/// Total number of units across all items
pub fn item_count(items: &[CartItem]) -> u32 {
    items.iter().map(|item| item.quantity).sum()
}

impl CartSummary {
    /// Compute the summary for the given items under the given pricing
    /// policy, using the standard shipping method
    pub fn compute(items: &[CartItem], pricing: &PricingConfig) -> Self {
        let subtotal = subtotal(items);
        let shipping = if items.is_empty() {
            Decimal::ZERO
        } else {
            pricing.shipping_cost(subtotal, ShippingMethod::Standard)
        };
        let tax = (subtotal * pricing.tax_rate).round_dp(2);
        let total = subtotal + shipping + tax;

        Self {
            subtotal: subtotal.round_dp(2),
            shipping: shipping.round_dp(2),
            tax,
            total: total.round_dp(2),
            item_count: item_count(items),
            unique_items: items.len(),
            free_shipping_threshold: pricing.free_shipping_threshold,
            qualifies_for_free_shipping: subtotal >= pricing.free_shipping_threshold,
            savings: savings(items).round_dp(2),
        }
    }

    pub fn empty(pricing: &PricingConfig) -> Self {
        Self::compute(&[], pricing)
    }
}

impl CartAnalytics {
    /// Compute the category breakdown, value stats and cart age for the
    /// given items
    pub fn compute(items: &[CartItem], now: DateTime<Utc>) -> Self {
        let mut categories: HashMap<String, u32> = HashMap::new();
        for item in items {
            let category = item
                .category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string());
            *categories.entry(category).or_insert(0) += item.quantity;
        }

        let total_value = subtotal(items);
        let oldest_item = items.iter().map(|item| item.added_at).min();
        let newest_item = items.iter().map(|item| item.added_at).max();

        let average_item_value = if items.is_empty() {
            Decimal::ZERO
        } else {
            (total_value / Decimal::from(items.len() as u64)).round_dp(2)
        };

        let cart_age_days = oldest_item
            .map(|oldest| (now - oldest).num_days())
            .unwrap_or(0);

        Self {
            categories,
            total_value: total_value.round_dp(2),
            oldest_item,
            newest_item,
            average_item_value,
            cart_age_days,
        }
    }
}
