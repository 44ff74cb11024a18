use rust_decimal::Decimal;

use super::{CartItem, Product, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_CART_QUANTITY: u32 = 1000;
pub const MIN_CART_QUANTITY: u32 = 1;
pub const MAX_PRICE: Decimal = Decimal::from_parts(99999999, 0, 0, false, 2); // 999999.99

impl Validate for Product {
    fn validate(&self) -> ValidationResult<()> {
        validate_product_id(&self.id)?;
        validate_name(&self.name)?;
        validate_price(&self.price)?;
        if let Some(original) = &self.original_price {
            validate_price(original)?;
        }
        Ok(())
    }
}

/// Validate a product id
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "id".to_string(),
        });
    }
    Ok(())
}

/// Validate a product or item name
pub fn validate_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "name".to_string(),
        });
    }
    Ok(())
}

/// Validate a unit price
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    if *price < Decimal::ZERO || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: "0".to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }
    Ok(())
}

/// Validate a cart quantity
pub fn validate_quantity(quantity: u32) -> ValidationResult<()> {
    if quantity < MIN_CART_QUANTITY || quantity > MAX_CART_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_CART_QUANTITY.to_string(),
            max: MAX_CART_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }
    Ok(())
}

/// Validate an item arriving through import or restore. Items failing this
/// check are filtered out individually rather than failing the whole import.
pub fn validate_import_item(item: &CartItem) -> ValidationResult<()> {
    validate_product_id(&item.id)?;
    validate_name(&item.name)?;
    validate_price(&item.price)?;
    validate_quantity(item.quantity)?;
    Ok(())
}
