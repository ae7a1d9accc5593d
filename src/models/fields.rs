//! Site-specific record fields
//!
//! Every site stores a few columns beyond the shared auction/profile base
//! columns (reputation scores, lot numbers, estimates...). Adapters declare
//! those columns in their [`SiteSchema`](crate::storage::SiteSchema) and fill
//! them through [`SiteFields`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A typed value for a site-specific column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Site-specific column values keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteFields(BTreeMap<String, FieldValue>);

impl SiteFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value, replacing any previous one
    pub fn set(&mut self, column: &str, value: impl Into<FieldValue>) {
        self.0.insert(column.to_string(), value.into());
    }

    /// Returns the value for a column; unset columns read as `Null`
    pub fn get(&self, column: &str) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.0.get(column).unwrap_or(&NULL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
