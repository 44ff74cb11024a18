use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartItem, CartSummary};

/// Notification payload delivered to every registered listener on each
/// successful cart mutation. Carries a snapshot, not live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEvent {
    pub cart: Vec<CartItem>,
    pub total: Decimal,
    pub subtotal: Decimal,
    pub item_count: u32,
    pub summary: CartSummary,
    pub timestamp: DateTime<Utc>,
}
