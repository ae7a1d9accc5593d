//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::models::{AuctionRecord, FieldValue, ProfileRecord, SiteFields};
use crate::storage::schema::{
    initialize_schema, ColumnSpec, ColumnType, SiteSchema, AUCTION_BASE_COLUMNS,
    PROFILE_BASE_COLUMNS,
};
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

/// SQLite record store for one site
pub struct SqliteStore {
    conn: Connection,
    schema: SiteSchema,
}

impl SqliteStore {
    /// Opens or creates the database at `path` and makes sure the site's
    /// tables exist
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `schema` - Table layout of the site
    pub fn open(path: &Path, schema: SiteSchema) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Foreign keys stay off: seller_id/winner_id are weak references and
        // a seller's profile is stored after the auctions naming it.
        conn.execute_batch(
            "
            PRAGMA foreign_keys = OFF;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(20))?;

        initialize_schema(&conn, &schema)?;

        Ok(Self { conn, schema })
    }

    /// Creates an in-memory store
    pub fn open_in_memory(schema: SiteSchema) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        initialize_schema(&conn, &schema)?;
        Ok(Self { conn, schema })
    }

    pub fn schema(&self) -> &SiteSchema {
        &self.schema
    }
}

impl RecordStore for SqliteStore {
    fn merge_auction(&mut self, auction: &mut AuctionRecord) -> StorageResult<()> {
        let table = &self.schema.auction_table;
        let extra = &self.schema.auction_columns;
        check_site_fields(table, extra, &auction.site)?;

        let now = Utc::now();
        let mut columns: Vec<&str> = AUCTION_BASE_COLUMNS.to_vec();
        columns.extend(extra.iter().map(|c| c.name));

        let mut values = vec![
            Value::Text(auction.id().to_string()),
            text(&auction.title),
            text(&auction.description),
            text(&auction.uri),
            timestamp(&auction.start_time),
            timestamp(&auction.end_time),
            auction
                .n_bids
                .map(|n| Value::Integer(i64::from(n)))
                .unwrap_or(Value::Null),
            text(&auction.currency),
            text(&auction.latest_price),
            text(&auction.starting_price),
            if auction.image_urls.is_empty() {
                Value::Null
            } else {
                Value::Text(auction.image_urls_wire())
            },
            Value::Text(auction.image_paths_wire()),
            text(&auction.seller_id),
            text(&auction.winner_id),
            Value::Text(now.to_rfc3339()),
            Value::Text(now.to_rfc3339()),
        ];
        values.extend(extra.iter().map(|c| field(auction.site.get(c.name))));

        let (created, modified) = merge_row(&mut self.conn, table, &columns, values, auction.id())?;
        auction.date_created = Some(created);
        auction.date_modified = Some(modified);
        Ok(())
    }

    fn merge_profile(&mut self, profile: &mut ProfileRecord) -> StorageResult<()> {
        let table = &self.schema.profile_table;
        let extra = &self.schema.profile_columns;
        check_site_fields(table, extra, &profile.site)?;

        let now = Utc::now();
        let mut columns: Vec<&str> = PROFILE_BASE_COLUMNS.to_vec();
        columns.extend(extra.iter().map(|c| c.name));

        let mut values = vec![
            Value::Text(profile.id().to_string()),
            text(&profile.name),
            text(&profile.description),
            text(&profile.uri),
            Value::Text(now.to_rfc3339()),
            Value::Text(now.to_rfc3339()),
        ];
        values.extend(extra.iter().map(|c| field(profile.site.get(c.name))));

        let (created, modified) = merge_row(&mut self.conn, table, &columns, values, profile.id())?;
        profile.date_created = Some(created);
        profile.date_modified = Some(modified);
        Ok(())
    }

    fn get_auction(&self, id: &str) -> StorageResult<Option<AuctionRecord>> {
        let extra = &self.schema.auction_columns;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            select_list(AUCTION_BASE_COLUMNS, extra),
            self.schema.auction_table
        );

        let auction = self
            .conn
            .query_row(&sql, params![id], |row| {
                let mut auction = AuctionRecord::new(row.get::<_, String>(0)?);
                auction.title = row.get(1)?;
                auction.description = row.get(2)?;
                auction.uri = row.get(3)?;
                auction.start_time = timestamp_at(row, 4)?;
                auction.end_time = timestamp_at(row, 5)?;
                auction.n_bids = row.get(6)?;
                auction.currency = row.get(7)?;
                auction.latest_price = row.get(8)?;
                auction.starting_price = row.get(9)?;
                if let Some(urls) = row.get::<_, Option<String>>(10)? {
                    auction.set_image_urls_wire(&urls);
                }
                auction.set_image_paths_wire(&row.get::<_, String>(11)?);
                auction.seller_id = row.get(12)?;
                auction.winner_id = row.get(13)?;
                auction.date_created = timestamp_at(row, 14)?;
                auction.date_modified = timestamp_at(row, 15)?;
                auction.site = site_fields_at(row, AUCTION_BASE_COLUMNS.len(), extra)?;
                Ok(auction)
            })
            .optional()?;

        Ok(auction)
    }

    fn get_profile(&self, id: &str) -> StorageResult<Option<ProfileRecord>> {
        let extra = &self.schema.profile_columns;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            select_list(PROFILE_BASE_COLUMNS, extra),
            self.schema.profile_table
        );

        let profile = self
            .conn
            .query_row(&sql, params![id], |row| {
                let mut profile = ProfileRecord::new(row.get::<_, String>(0)?);
                profile.name = row.get(1)?;
                profile.description = row.get(2)?;
                profile.uri = row.get(3)?;
                profile.date_created = timestamp_at(row, 4)?;
                profile.date_modified = timestamp_at(row, 5)?;
                profile.site = site_fields_at(row, PROFILE_BASE_COLUMNS.len(), extra)?;
                Ok(profile)
            })
            .optional()?;

        Ok(profile)
    }

    fn count_auctions(&self) -> StorageResult<u64> {
        count_rows(&self.conn, &self.schema.auction_table)
    }

    fn count_profiles(&self) -> StorageResult<u64> {
        count_rows(&self.conn, &self.schema.profile_table)
    }
}

/// Upserts one row inside its own transaction and returns the stored
/// `(date_created, date_modified)` pair
///
/// `date_created` is only written on insert; every other column is replaced
/// on conflict.
fn merge_row(
    conn: &mut Connection,
    table: &str,
    columns: &[&str],
    values: Vec<Value>,
    id: &str,
) -> StorageResult<(DateTime<Utc>, DateTime<Utc>)> {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !matches!(**c, "id" | "date_created"))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    );

    // Dropping the transaction without commit rolls it back
    let tx = conn.transaction()?;
    tx.execute(&sql, params_from_iter(values.iter()))?;

    let stamps = tx.query_row(
        &format!(
            "SELECT date_created, date_modified FROM {} WHERE id = ?1",
            table
        ),
        params![id],
        |row| Ok((timestamp_at(row, 0)?, timestamp_at(row, 1)?)),
    )?;
    tx.commit()?;

    match stamps {
        (Some(created), Some(modified)) => Ok((created, modified)),
        _ => Err(StorageError::InvalidSchema(format!(
            "{} row {} has no timestamps",
            table, id
        ))),
    }
}

fn check_site_fields(table: &str, columns: &[ColumnSpec], fields: &SiteFields) -> StorageResult<()> {
    for (name, value) in fields.iter() {
        let column = columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| StorageError::UnknownColumn {
                table: table.to_string(),
                column: name.to_string(),
            })?;

        let compatible = match (column.kind, value) {
            (_, FieldValue::Null) => true,
            (ColumnType::Integer, FieldValue::Integer(_)) => true,
            (ColumnType::Real, FieldValue::Real(_) | FieldValue::Integer(_)) => true,
            (ColumnType::Text, FieldValue::Text(_)) => true,
            (ColumnType::Boolean, FieldValue::Bool(_)) => true,
            (ColumnType::Timestamp, FieldValue::Timestamp(_)) => true,
            _ => false,
        };
        if !compatible {
            return Err(StorageError::InvalidSchema(format!(
                "value {:?} does not fit column {}.{} of type {:?}",
                value, table, name, column.kind
            )));
        }
    }
    Ok(())
}

fn count_rows(conn: &Connection, table: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}

fn select_list(base: &[&str], extra: &[ColumnSpec]) -> String {
    base.iter()
        .copied()
        .chain(extra.iter().map(|c| c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn timestamp(value: &Option<DateTime<Utc>>) -> Value {
    value
        .map(|t| Value::Text(t.to_rfc3339()))
        .unwrap_or(Value::Null)
}

fn field(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Real(r) => Value::Real(*r),
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Timestamp(t) => Value::Text(t.to_rfc3339()),
    }
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn site_fields_at(
    row: &Row<'_>,
    offset: usize,
    columns: &[ColumnSpec],
) -> rusqlite::Result<SiteFields> {
    let mut fields = SiteFields::new();
    for (i, column) in columns.iter().enumerate() {
        let idx = offset + i;
        let value: FieldValue = match column.kind {
            ColumnType::Integer => row.get::<_, Option<i64>>(idx)?.into(),
            ColumnType::Real => row.get::<_, Option<f64>>(idx)?.into(),
            ColumnType::Text => row.get::<_, Option<String>>(idx)?.into(),
            ColumnType::Boolean => row.get::<_, Option<bool>>(idx)?.into(),
            ColumnType::Timestamp => timestamp_at(row, idx)?.into(),
        };
        fields.set(column.name, value);
    }
    Ok(fields)
}
