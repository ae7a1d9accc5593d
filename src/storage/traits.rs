//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::models::{AuctionRecord, ProfileRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Column '{column}' is not declared for table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record store implementations
///
/// Records are keyed by their id. A merge inserts the record when the id is
/// new and otherwise replaces every non-identity field with the incoming
/// values, explicit `None`s included. `date_created` is kept from the first
/// insert and `date_modified` is bumped on every merge; both are written back
/// into the record passed in.
///
/// Each merge either fully commits or leaves the store untouched.
pub trait RecordStore {
    /// Inserts or replaces an auction
    fn merge_auction(&mut self, auction: &mut AuctionRecord) -> StorageResult<()>;

    /// Inserts or replaces a profile
    fn merge_profile(&mut self, profile: &mut ProfileRecord) -> StorageResult<()>;

    /// Gets an auction by id
    fn get_auction(&self, id: &str) -> StorageResult<Option<AuctionRecord>>;

    /// Gets a profile by id
    fn get_profile(&self, id: &str) -> StorageResult<Option<ProfileRecord>>;

    /// Counts stored auctions
    fn count_auctions(&self) -> StorageResult<u64>;

    /// Counts stored profiles
    fn count_profiles(&self) -> StorageResult<u64>;
}
