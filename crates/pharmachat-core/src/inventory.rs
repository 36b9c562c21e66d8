//! Inventory domain model.

use serde::{Deserialize, Serialize};

/// A medicine SKU as stored in the backend inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub medicine_id: String,
    pub medicine_name: String,
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub stock_level: i64,
    #[serde(default)]
    pub prescription_required: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub max_quantity_per_order: u32,
    #[serde(default)]
    pub controlled_substance: bool,
}

/// Aggregate inventory statistics for the admin view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InventoryStats {
    #[serde(default)]
    pub total_skus: u64,
    #[serde(default)]
    pub unique_medicines: u64,
    #[serde(default)]
    pub out_of_stock: u64,
    #[serde(default)]
    pub low_stock: u64,
    #[serde(default)]
    pub prescription_required: u64,
    #[serde(default)]
    pub discontinued: u64,
}
