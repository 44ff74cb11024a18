use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{builtin_discounts, Discount, ShippingMethod};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// Full configuration for the cart engine
#[derive(Debug, Clone)]
pub struct CartConfig {
    pub storage: StorageConfig,
    pub pricing: PricingConfig,
    pub persistence: PersistenceConfig,
    pub discounts: HashMap<String, Discount>,
}

/// Keys under which cart state and backups are persisted
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_cart_key")]
    pub cart_key: String,
    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,
}

/// Pricing policy: tax rate, shipping rates and free-shipping thresholds.
/// All values are tunable; the defaults mirror the storefront's policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,
    #[serde(default = "default_always_free_threshold")]
    pub always_free_threshold: Decimal,
    #[serde(default = "default_standard_rate")]
    pub standard_rate: Decimal,
    #[serde(default = "default_express_rate")]
    pub express_rate: Decimal,
    #[serde(default = "default_overnight_rate")]
    pub overnight_rate: Decimal,
}

/// Persistence behavior: debounce window and backup retention
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_backup_keep_count")]
    pub backup_keep_count: usize,
}

impl CartConfig {
    /// Load configuration from `POLYCART_*` environment variables, falling
    /// back to defaults for anything unset
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading cart configuration from environment");

        let storage = StorageConfig::from_env()?;
        let pricing = PricingConfig::from_env()?;
        let persistence = PersistenceConfig::from_env()?;

        let config = CartConfig {
            storage,
            pricing,
            persistence,
            discounts: builtin_discounts(),
        };

        config.validate()?;

        info!("Cart configuration loaded");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.cart_key.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Cart storage key cannot be empty".to_string(),
            });
        }

        if self.storage.backup_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Backup key prefix cannot be empty".to_string(),
            });
        }

        if self.pricing.tax_rate < Decimal::ZERO || self.pricing.tax_rate >= Decimal::ONE {
            return Err(ConfigError::ValidationError {
                message: format!("Tax rate out of range: {}", self.pricing.tax_rate),
            });
        }

        if self.pricing.free_shipping_threshold > self.pricing.always_free_threshold {
            return Err(ConfigError::ValidationError {
                message: "Standard free-shipping threshold cannot exceed the unconditional threshold"
                    .to_string(),
            });
        }

        if self.persistence.debounce_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "Persistence debounce window cannot be 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            pricing: PricingConfig::default(),
            persistence: PersistenceConfig::default(),
            discounts: builtin_discounts(),
        }
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("POLYCART"))
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load storage config: {}", e),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to deserialize storage config: {}", e),
            })
    }

    /// Storage key for a backup with the given id
    pub fn backup_key(&self, backup_id: &str) -> String {
        format!("{}{}", self.backup_prefix, backup_id)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cart_key: default_cart_key(),
            backup_prefix: default_backup_prefix(),
        }
    }
}

impl PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("POLYCART"))
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load pricing config: {}", e),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to deserialize pricing config: {}", e),
            })
    }

    /// Shipping cost for the given subtotal and method. Standard shipping
    /// is free at or above the free-shipping threshold; every method is
    /// free at or above the unconditional threshold.
    pub fn shipping_cost(&self, subtotal: Decimal, method: ShippingMethod) -> Decimal {
        if subtotal >= self.always_free_threshold {
            return Decimal::ZERO;
        }

        match method {
            ShippingMethod::Free => Decimal::ZERO,
            ShippingMethod::Standard => {
                if subtotal >= self.free_shipping_threshold {
                    Decimal::ZERO
                } else {
                    self.standard_rate
                }
            }
            ShippingMethod::Express => self.express_rate,
            ShippingMethod::Overnight => self.overnight_rate,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            free_shipping_threshold: default_free_shipping_threshold(),
            always_free_threshold: default_always_free_threshold(),
            standard_rate: default_standard_rate(),
            express_rate: default_express_rate(),
            overnight_rate: default_overnight_rate(),
        }
    }
}

impl PersistenceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("POLYCART"))
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load persistence config: {}", e),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to deserialize persistence config: {}", e),
            })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            backup_keep_count: default_backup_keep_count(),
        }
    }
}

// Default value functions
pub(crate) fn default_cart_key() -> String {
    "polymershop-cart-v2".to_string()
}

pub(crate) fn default_backup_prefix() -> String {
    "polymershop-backup-".to_string()
}

pub(crate) fn default_tax_rate() -> Decimal {
    Decimal::new(8, 2) // 0.08
}

pub(crate) fn default_free_shipping_threshold() -> Decimal {
    Decimal::from(75)
}

pub(crate) fn default_always_free_threshold() -> Decimal {
    Decimal::from(100)
}

pub(crate) fn default_standard_rate() -> Decimal {
    Decimal::new(599, 2) // 5.99
}

pub(crate) fn default_express_rate() -> Decimal {
    Decimal::new(1299, 2) // 12.99
}

pub(crate) fn default_overnight_rate() -> Decimal {
    Decimal::new(2499, 2) // 24.99
}

pub(crate) fn default_debounce_ms() -> u64 {
    300
}

pub(crate) fn default_backup_keep_count() -> usize {
    5
}
