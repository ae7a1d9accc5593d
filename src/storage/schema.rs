//! Database schema definitions
//!
//! Every site gets its own pair of tables, `{backend}_profiles` and
//! `{backend}_auctions`, built from a [`SiteSchema`]. Both share a fixed set
//! of base columns and add whatever site-specific columns the adapter
//! declares.

use crate::storage::{StorageError, StorageResult};

/// SQL storage class of a site-specific column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Stored as INTEGER 0/1
    Boolean,
    /// Stored as RFC 3339 TEXT
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Text | Self::Timestamp => "TEXT",
        }
    }
}

/// A site-specific column declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind }
    }
}

/// Table names and extra columns for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSchema {
    pub auction_table: String,
    pub profile_table: String,
    pub auction_columns: Vec<ColumnSpec>,
    pub profile_columns: Vec<ColumnSpec>,
}

impl SiteSchema {
    /// Builds the schema for a backend, naming its tables
    /// `{backend}_auctions` and `{backend}_profiles`
    pub fn for_backend(
        backend: &str,
        auction_columns: &[ColumnSpec],
        profile_columns: &[ColumnSpec],
    ) -> Self {
        Self {
            auction_table: format!("{}_auctions", backend),
            profile_table: format!("{}_profiles", backend),
            auction_columns: auction_columns.to_vec(),
            profile_columns: profile_columns.to_vec(),
        }
    }

    /// Checks that every table and column name is a plain SQL identifier
    /// that does not shadow a base column
    pub fn validate(&self) -> StorageResult<()> {
        validate_identifier(&self.auction_table)?;
        validate_identifier(&self.profile_table)?;

        for column in &self.auction_columns {
            validate_identifier(column.name)?;
            if AUCTION_BASE_COLUMNS.contains(&column.name) {
                return Err(StorageError::InvalidSchema(format!(
                    "column '{}' of {} shadows a base column",
                    column.name, self.auction_table
                )));
            }
        }

        for column in &self.profile_columns {
            validate_identifier(column.name)?;
            if PROFILE_BASE_COLUMNS.contains(&column.name) {
                return Err(StorageError::InvalidSchema(format!(
                    "column '{}' of {} shadows a base column",
                    column.name, self.profile_table
                )));
            }
        }

        Ok(())
    }
}

/// Base columns of every auction table, in storage order
pub const AUCTION_BASE_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "uri",
    "start_time",
    "end_time",
    "n_bids",
    "currency",
    "latest_price",
    "starting_price",
    "image_urls",
    "image_paths",
    "seller_id",
    "winner_id",
    "date_created",
    "date_modified",
];

/// Base columns of every profile table, in storage order
pub const PROFILE_BASE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "description",
    "uri",
    "date_created",
    "date_modified",
];

fn validate_identifier(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidSchema(format!(
            "'{}' is not a valid SQL identifier",
            name
        )))
    }
}

fn extra_columns_sql(columns: &[ColumnSpec]) -> String {
    columns
        .iter()
        .map(|c| format!(",\n    {} {}", c.name, c.kind.sql_type()))
        .collect()
}

/// SQL creating the profile table of a site
pub fn profile_table_sql(schema: &SiteSchema) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    name TEXT,
    description TEXT,
    uri TEXT,
    date_created TEXT NOT NULL,
    date_modified TEXT NOT NULL{extra}
);",
        table = schema.profile_table,
        extra = extra_columns_sql(&schema.profile_columns),
    )
}

/// SQL creating the auction table of a site
///
/// `seller_id` and `winner_id` reference the site's profile table.
pub fn auction_table_sql(schema: &SiteSchema) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    title TEXT,
    description TEXT,
    uri TEXT,
    start_time TEXT,
    end_time TEXT,
    n_bids INTEGER,
    currency TEXT,
    latest_price TEXT,
    starting_price TEXT,
    image_urls TEXT,
    image_paths TEXT NOT NULL DEFAULT '',
    seller_id TEXT REFERENCES {profiles}(id),
    winner_id TEXT REFERENCES {profiles}(id),
    date_created TEXT NOT NULL,
    date_modified TEXT NOT NULL{extra}
);

CREATE INDEX IF NOT EXISTS idx_{table}_seller ON {table}(seller_id);
CREATE INDEX IF NOT EXISTS idx_{table}_winner ON {table}(winner_id);",
        table = schema.auction_table,
        profiles = schema.profile_table,
        extra = extra_columns_sql(&schema.auction_columns),
    )
}

/// Initializes the tables of a site
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `schema` - The site's table layout
pub fn initialize_schema(conn: &rusqlite::Connection, schema: &SiteSchema) -> StorageResult<()> {
    schema.validate()?;
    conn.execute_batch(&profile_table_sql(schema))?;
    conn.execute_batch(&auction_table_sql(schema))?;
    Ok(())
}
