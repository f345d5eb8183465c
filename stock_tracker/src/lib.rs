//! Stock Tracker - gym equipment availability history
//!
//! Polls vendor product pages, keeps a change-only log of every item's
//! availability in SQLite and derives how long items tend to stay in and
//! out of stock.

pub mod analytics;
pub mod config;
pub mod cycle;
pub mod database;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod history;
pub mod notify;
pub mod state;
pub mod store;
pub mod vendors;
pub mod watch;
pub mod web;

pub use analytics::{analyze, analyze_entity, TimelineReport};
pub use config::Config;
pub use cycle::{record_batch, run_cycle, CycleContext, CycleSummary};
pub use database::{init_schema, SqliteStockLog};
pub use error::{Result, TrackerError};
pub use fetch::{collect_items, download_test_files, PageSource};
pub use formatters::format_report;
pub use history::{append_transitions, AppendStats};
pub use notify::TelegramNotifier;
pub use state::{FileStateStore, MemoryStateStore, StateStore};
pub use store::{MemoryStockLog, StockLogStore};
pub use watch::Watchlist;
