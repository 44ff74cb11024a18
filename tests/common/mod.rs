use std::sync::Arc;
use std::time::Duration;

use polycart_rs::config::{CartConfig, PersistenceConfig};
use polycart_rs::models::Product;
use polycart_rs::stores::MemoryStore;
use polycart_rs::CartService;
use rust_decimal::Decimal;

/// Configuration with a short debounce window so persistence-related
/// assertions do not slow the suite down
pub fn fast_config() -> CartConfig {
    CartConfig {
        persistence: PersistenceConfig {
            debounce_ms: 20,
            ..PersistenceConfig::default()
        },
        ..CartConfig::default()
    }
}

pub async fn new_cart_service() -> (CartService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = CartService::new(store.clone(), fast_config()).await;
    (service, store)
}

/// Product priced in cents, so tests never construct inexact decimals
pub fn product(id: &str, name: &str, price_cents: i64) -> Product {
    Product::new(id, name, Decimal::new(price_cents, 2))
}

/// Wait long enough for any pending debounced save or cross-instance
/// reload to complete
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(120)).await;
}
