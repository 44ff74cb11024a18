use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Product;

/// One line entry in the shopping cart, uniquely keyed by product id.
///
/// Prices are copied from the product at the time of addition and are not
/// re-fetched, so later catalog price changes do not retroactively affect
/// items already in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: u32,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Reduced persistence shape used when a full save fails under storage
/// pressure. Preserves cart identity (which products, how many) only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalCartItem {
    pub id: String,
    pub quantity: u32,
}

impl CartItem {
    /// Create a cart item by copying the product's fields at add time
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            original_price: product.effective_original_price(),
            image: product.image.clone(),
            category: product.category.clone(),
            quantity,
            added_at: now,
            updated_at: now,
        }
    }

    /// Total price for this line (unit price times quantity)
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Savings for this line, zero unless the original price exceeds the
    /// current price
    pub fn line_savings(&self) -> Decimal {
        if self.original_price > self.price {
            (self.original_price - self.price) * Decimal::from(self.quantity)
        } else {
            Decimal::ZERO
        }
    }

    /// Repair fields that may be missing or inconsistent after a
    /// deserialization round-trip (`original_price` is never below `price`)
    pub fn normalize(&mut self) {
        if self.original_price < self.price {
            self.original_price = self.price;
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl From<&CartItem> for MinimalCartItem {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            quantity: item.quantity,
        }
    }
}

impl MinimalCartItem {
    /// Rebuild a placeholder cart item from the reduced persistence shape.
    /// Name and prices are unknown at this point; the caller is expected to
    /// re-hydrate them from the catalog before display.
    pub fn into_placeholder_item(self) -> CartItem {
        let now = Utc::now();
        CartItem {
            id: self.id,
            name: String::new(),
            price: Decimal::ZERO,
            original_price: Decimal::ZERO,
            image: None,
            category: None,
            quantity: self.quantity.max(1),
            added_at: now,
            updated_at: now,
        }
    }
}
