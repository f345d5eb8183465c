//! SQLite-backed stock log
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Each append is its own autocommit insert: when a batch fails half way,
//! the rows written before the failure stay in the log.

use crate::error::Result;
use crate::store::StockLogStore;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::path::Path;
use stock_common::{EntityId, StockLogRow, TIMESTAMP_FORMAT};

/// Result type for raw database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Initialize the database schema
///
/// Creates the `stock` table if it doesn't exist. The composite index makes
/// "latest row per entity" and "all rows of one entity" index lookups.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stock (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT NOT NULL,
            item_name TEXT NOT NULL,
            price TEXT,
            in_stock INTEGER NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_stock_entity ON stock(product_name, item_name);
        CREATE INDEX IF NOT EXISTS idx_stock_recorded_at ON stock(recorded_at);
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

/// Stock log stored in a SQLite `stock` table
pub struct SqliteStockLog {
    conn: Connection,
}

impl SqliteStockLog {
    /// Open (or create) the database file and initialise the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Created directory: {}", parent.display());
            }
        }
        let conn = Connection::open(path)?;
        log::info!("Opened database: {}", path.display());
        Self::from_connection(conn)
    }

    /// In-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Total number of rows in the log
    pub fn row_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM stock", [], |row| row.get(0))?)
    }
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Map a `product_name, item_name, price, in_stock, recorded_at` row
fn map_row(row: &Row<'_>) -> DbResult<StockLogRow> {
    let raw_ts: String = row.get(4)?;
    let recorded_at = parse_timestamp(&raw_ts)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let price: Option<String> = row.get(2)?;
    Ok(StockLogRow {
        entity_id: EntityId::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
        price: price.unwrap_or_default(),
        in_stock: row.get(3)?,
        recorded_at,
    })
}

impl StockLogStore for SqliteStockLog {
    fn most_recent_row_per_entity(&self) -> Result<HashMap<EntityId, StockLogRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT product_name, item_name, price, in_stock, recorded_at
             FROM stock
             WHERE id IN (
                 SELECT MAX(id) FROM stock GROUP BY product_name, item_name
             )",
        )?;

        let rows = stmt
            .query_map([], map_row)?
            .collect::<DbResult<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .map(|r| (r.entity_id.clone(), r))
            .collect())
    }

    fn latest_row_for_entity(&self, entity_id: &EntityId) -> Result<Option<StockLogRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT product_name, item_name, price, in_stock, recorded_at
             FROM stock
             WHERE product_name = ?1 AND item_name = ?2
             ORDER BY id DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query(params![&entity_id.product_name, &entity_id.item_name])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_row(row)?)),
            None => Ok(None),
        }
    }

    fn all_rows_for_entity(&self, entity_id: &EntityId) -> Result<Vec<StockLogRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT product_name, item_name, price, in_stock, recorded_at
             FROM stock
             WHERE product_name = ?1 AND item_name = ?2
             ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map(
                params![&entity_id.product_name, &entity_id.item_name],
                map_row,
            )?
            .collect::<DbResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn append(&mut self, row: &StockLogRow) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO stock (product_name, item_name, price, in_stock, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        stmt.execute(params![
            &row.entity_id.product_name,
            &row.entity_id.item_name,
            &row.price,
            row.in_stock,
            format_timestamp(&row.recorded_at),
        ])?;
        Ok(())
    }

    fn entities(&self) -> Result<Vec<EntityId>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT product_name, item_name
             FROM stock
             ORDER BY product_name, item_name",
        )?;
        let ids = stmt
            .query_map([], |row| {
                Ok(EntityId::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<DbResult<Vec<_>>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_log() -> SqliteStockLog {
        SqliteStockLog::open_in_memory().unwrap()
    }

    fn row(item: &str, in_stock: bool, day: u32, hour: u32) -> StockLogRow {
        StockLogRow {
            entity_id: EntityId::new("Rogue Fleck Plates", item),
            in_stock,
            price: "$85.00".to_string(),
            recorded_at: Utc.with_ymd_and_hms(2021, 1, day, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn init_schema_creates_table() {
        let log = test_log();
        let count: i64 = log
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='stock'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn init_schema_is_idempotent() {
        let log = test_log();
        init_schema(log.connection()).unwrap();
        assert_eq!(log.row_count().unwrap(), 0);
    }

    #[test]
    fn append_then_read_round_trips_fields() {
        let mut log = test_log();
        let written = row("10LB Fleck", true, 5, 14);
        log.append(&written).unwrap();

        let rows = log.all_rows_for_entity(&written.entity_id).unwrap();
        assert_eq!(rows, vec![written]);
    }

    #[test]
    fn all_rows_come_back_in_append_order() {
        let mut log = test_log();
        log.append(&row("10LB Fleck", false, 1, 0)).unwrap();
        log.append(&row("25LB Fleck", true, 1, 1)).unwrap();
        log.append(&row("10LB Fleck", true, 2, 0)).unwrap();
        log.append(&row("10LB Fleck", false, 3, 0)).unwrap();

        let id = EntityId::new("Rogue Fleck Plates", "10LB Fleck");
        let states: Vec<bool> = log
            .all_rows_for_entity(&id)
            .unwrap()
            .iter()
            .map(|r| r.in_stock)
            .collect();
        assert_eq!(states, vec![false, true, false]);
    }

    #[test]
    fn most_recent_row_per_entity_picks_latest() {
        let mut log = test_log();
        log.append(&row("10LB Fleck", false, 1, 0)).unwrap();
        log.append(&row("25LB Fleck", true, 1, 1)).unwrap();
        log.append(&row("10LB Fleck", true, 2, 0)).unwrap();

        let latest = log.most_recent_row_per_entity().unwrap();
        assert_eq!(latest.len(), 2);

        let ten = &latest[&EntityId::new("Rogue Fleck Plates", "10LB Fleck")];
        assert!(ten.in_stock);
        assert_eq!(ten.recorded_at, Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn latest_row_for_entity_matches_index() {
        let mut log = test_log();
        log.append(&row("10LB Fleck", false, 1, 0)).unwrap();
        log.append(&row("10LB Fleck", true, 2, 0)).unwrap();

        let id = EntityId::new("Rogue Fleck Plates", "10LB Fleck");
        let single = log.latest_row_for_entity(&id).unwrap().unwrap();
        let indexed = log.most_recent_row_per_entity().unwrap().remove(&id).unwrap();
        assert_eq!(single, indexed);

        let missing = EntityId::new("Rogue Fleck Plates", "55LB Fleck");
        assert!(log.latest_row_for_entity(&missing).unwrap().is_none());
    }

    #[test]
    fn entities_lists_each_key_once() {
        let mut log = test_log();
        log.append(&row("25LB Fleck", true, 1, 0)).unwrap();
        log.append(&row("10LB Fleck", true, 1, 0)).unwrap();
        log.append(&row("25LB Fleck", false, 2, 0)).unwrap();

        let ids = log.entities().unwrap();
        assert_eq!(
            ids,
            vec![
                EntityId::new("Rogue Fleck Plates", "10LB Fleck"),
                EntityId::new("Rogue Fleck Plates", "25LB Fleck"),
            ]
        );
    }

    #[test]
    fn null_price_reads_as_empty() {
        let log = test_log();
        log.connection()
            .execute(
                "INSERT INTO stock (product_name, item_name, price, in_stock, recorded_at)
                 VALUES ('P', 'I', NULL, 1, '2021-01-01 00:00:00')",
                [],
            )
            .unwrap();
        let rows = log.all_rows_for_entity(&EntityId::new("P", "I")).unwrap();
        assert_eq!(rows[0].price, "");
    }

    #[test]
    fn malformed_timestamp_is_storage_error() {
        let log = test_log();
        log.connection()
            .execute(
                "INSERT INTO stock (product_name, item_name, price, in_stock, recorded_at)
                 VALUES ('P', 'I', '$1', 1, 'yesterday')",
                [],
            )
            .unwrap();
        let err = log.all_rows_for_entity(&EntityId::new("P", "I")).unwrap_err();
        assert!(matches!(err, crate::error::TrackerError::Storage(_)));
    }

    #[test]
    fn open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("stock.db");
        let mut log = SqliteStockLog::open(&path).unwrap();
        log.append(&row("10LB Fleck", true, 1, 0)).unwrap();
        drop(log);

        let reopened = SqliteStockLog::open(&path).unwrap();
        assert_eq!(reopened.row_count().unwrap(), 1);
    }
}
