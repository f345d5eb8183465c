//! Shared types for the stock tracker crates.
//!
//! Entity identity, per-poll observations, persisted change-log rows and the
//! product catalogue types live here so that fetching, storage and analysis
//! agree on one model.

pub mod error;
pub mod model;
pub mod product;

pub use error::{FetchError, FetchResult};
pub use model::{EntityId, StockLogRow, StockObservation, TIMESTAMP_FORMAT};
pub use product::{is_available, Product, ProductLayout, RawItem, Vendor};
