// Re-export all model types
pub use self::cart::*;
pub use self::discount::*;
pub use self::errors::*;
pub use self::events::*;
pub use self::export::*;
pub use self::product::*;
pub use self::summary::*;
pub use self::validation::*;

mod cart;
mod discount;
mod errors;
mod events;
mod export;
mod product;
mod summary;
mod validation;
