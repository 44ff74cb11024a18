use thiserror::Error;

/// Service-level errors surfaced by cart operations
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product is missing an id")]
    MissingProductId,

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("Item not found in cart: {product_id}")]
    ItemNotFound { product_id: String },

    #[error("Invalid discount code: {code}")]
    InvalidDiscountCode { code: String },

    #[error("Backup not found: {id}")]
    BackupNotFound { id: String },

    #[error("Invalid import payload: {message}")]
    InvalidImport { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Store-level errors for key-value persistence operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage quota exceeded: needed {needed} bytes, capacity {capacity}")]
    QuotaExceeded { needed: usize, capacity: usize },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for CartError {
    fn from(err: ValidationError) -> Self {
        CartError::Validation {
            message: err.to_string(),
        }
    }
}

/// Result type alias for cart operations
pub type CartResult<T> = Result<T, CartError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
