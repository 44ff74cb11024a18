use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product record as supplied by the catalog.
///
/// Only `id`, `name` and `price` are required; everything else defaults
/// sensibly (`original_price` falls back to `price`, meaning zero savings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Product {
    /// Create a product with the required fields only
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            original_price: None,
            image: None,
            category: None,
        }
    }

    pub fn with_original_price(mut self, original_price: Decimal) -> Self {
        self.original_price = Some(original_price);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Effective pre-discount price, defaulting to the current price
    pub fn effective_original_price(&self) -> Decimal {
        match self.original_price {
            Some(original) if original > self.price => original,
            _ => self.price,
        }
    }
}
