//! Cart state engine for the PolymerShop storefront.
//!
//! Owns the single authoritative in-memory cart, persists it through a
//! pluggable key-value store with debounced saves, keeps concurrent
//! instances sharing a store in sync, and computes pricing summaries
//! (shipping, tax, savings) for display.

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod stores;

pub use config::CartConfig;
pub use models::{CartError, CartResult};
pub use services::{AddToCartOptions, CartService, ListenerId};
pub use stores::{FileStore, KeyValueStore, MemoryStore};
