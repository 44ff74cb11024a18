use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Kind of promotional adjustment a discount code grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percentage,
    Fixed,
    Shipping,
}

/// Descriptor for a named promotional adjustment, looked up by code.
///
/// The service validates and describes codes but does not fold them into
/// the computed summary; combining the two is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: String,
}

impl Discount {
    pub fn new(
        code: impl Into<String>,
        kind: DiscountKind,
        value: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            kind,
            value,
            description: description.into(),
        }
    }
}

/// Built-in discount code table, keyed by uppercase code
pub fn builtin_discounts() -> HashMap<String, Discount> {
    let table = [
        Discount::new(
            "WELCOME10",
            DiscountKind::Percentage,
            dec!(10),
            "10% off your first order",
        ),
        Discount::new(
            "SAVE5",
            DiscountKind::Fixed,
            dec!(5.00),
            "5.00 off your order",
        ),
        Discount::new(
            "FREESHIP",
            DiscountKind::Shipping,
            dec!(0),
            "Free standard shipping",
        ),
    ];

    table
        .into_iter()
        .map(|discount| (discount.code.clone(), discount))
        .collect()
}
