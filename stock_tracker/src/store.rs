//! The append-only stock log interface and an in-memory implementation.

use crate::error::Result;
use std::collections::HashMap;
use stock_common::{EntityId, StockLogRow};

/// Durable, append-only log of stock transitions keyed by entity.
///
/// Rows are returned in append order. For a healthy log that is also
/// `recorded_at` order; a clock that stepped backwards shows up as a
/// non-monotonic sequence instead of being silently reordered.
pub trait StockLogStore {
    /// The most recent row of every entity that has at least one row
    fn most_recent_row_per_entity(&self) -> Result<HashMap<EntityId, StockLogRow>>;

    /// The most recent row of one entity
    fn latest_row_for_entity(&self, entity_id: &EntityId) -> Result<Option<StockLogRow>>;

    /// Every row of one entity, oldest first
    fn all_rows_for_entity(&self, entity_id: &EntityId) -> Result<Vec<StockLogRow>>;

    /// Append one row. Existing rows are never touched.
    fn append(&mut self, row: &StockLogRow) -> Result<()>;

    /// All entities with history, sorted
    fn entities(&self) -> Result<Vec<EntityId>>;
}

/// Vec-backed log for tests and dry runs. Lookups scan the whole log.
#[derive(Debug, Default, Clone)]
pub struct MemoryStockLog {
    rows: Vec<StockLogRow>,
}

impl MemoryStockLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from rows already in append order
    pub fn from_rows(rows: Vec<StockLogRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[StockLogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl StockLogStore for MemoryStockLog {
    fn most_recent_row_per_entity(&self) -> Result<HashMap<EntityId, StockLogRow>> {
        let mut latest = HashMap::new();
        for row in &self.rows {
            latest.insert(row.entity_id.clone(), row.clone());
        }
        Ok(latest)
    }

    fn latest_row_for_entity(&self, entity_id: &EntityId) -> Result<Option<StockLogRow>> {
        Ok(self
            .rows
            .iter()
            .rev()
            .find(|r| &r.entity_id == entity_id)
            .cloned())
    }

    fn all_rows_for_entity(&self, entity_id: &EntityId) -> Result<Vec<StockLogRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| &r.entity_id == entity_id)
            .cloned()
            .collect())
    }

    fn append(&mut self, row: &StockLogRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn entities(&self) -> Result<Vec<EntityId>> {
        let mut ids: Vec<EntityId> = self.rows.iter().map(|r| r.entity_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
