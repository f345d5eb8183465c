//! Entity identity, observations and persisted change-log rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format used when timestamps are persisted or printed (`YYYY-MM-DD HH:MM:SS`, UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable identity of one SKU across polling cycles.
///
/// Displayed (and parsed) as `"<product>: <item>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub product_name: String,
    pub item_name: String,
}

impl EntityId {
    pub fn new(product_name: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            item_name: item_name.into(),
        }
    }

    /// Parse the display form back into an id.
    ///
    /// Splits on the first `": "`, so item names may themselves contain the separator.
    pub fn parse(s: &str) -> Option<Self> {
        let (product, item) = s.split_once(": ")?;
        let product = product.trim();
        let item = item.trim();
        if product.is_empty() || item.is_empty() {
            return None;
        }
        Some(Self::new(product, item))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.product_name, self.item_name)
    }
}

/// One entity's state as seen by a single poll. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockObservation {
    pub entity_id: EntityId,
    pub in_stock: bool,
    pub price: String,
}

/// A persisted transition. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLogRow {
    pub entity_id: EntityId,
    pub in_stock: bool,
    pub price: String,
    pub recorded_at: DateTime<Utc>,
}

impl StockLogRow {
    pub fn from_observation(observation: &StockObservation, recorded_at: DateTime<Utc>) -> Self {
        Self {
            entity_id: observation.entity_id.clone(),
            in_stock: observation.in_stock,
            price: observation.price.clone(),
            recorded_at,
        }
    }
}
