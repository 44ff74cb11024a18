use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartAnalytics, CartItem, CartSummary};

/// Current cart export format version
pub const EXPORT_VERSION: u32 = 2;

/// Versioned snapshot of the full cart state, used by export and backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
    pub analytics: CartAnalytics,
    pub app: ExportMetadata,
}

/// Basic environment metadata attached to exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub name: String,
    pub version: String,
}

impl Default for ExportMetadata {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Summary of one stored backup, as returned by backup enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub item_count: u32,
    pub total: Decimal,
}
