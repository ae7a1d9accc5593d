//! Storage module for persisting scraped records
//!
//! This module handles all database operations, including:
//! - Per-site table generation from a [`SiteSchema`]
//! - Transactional upsert (merge) of auctions and profiles
//! - Reading records back by id

mod schema;
mod sqlite;
mod traits;

pub use schema::{
    auction_table_sql, initialize_schema, profile_table_sql, ColumnSpec, ColumnType, SiteSchema,
    AUCTION_BASE_COLUMNS, PROFILE_BASE_COLUMNS,
};
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StorageError, StorageResult};
