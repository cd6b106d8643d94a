//! Database-agnostic type mappings.
//!
//! This module converts driver rows into JSON objects keyed by column name.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! Decoders return `Result` so a value the driver cannot decode surfaces as a
//! row scan failure instead of silently becoming `null`. Only SQL NULL becomes
//! `null`. Columns of unclassified types (arrays, intervals, network addresses,
//! user enums) are returned in their text form: raw statements travel over the
//! text protocol, so the wire bytes are the server's own rendering.

use crate::models::{DatabaseType, Row as JsonRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    /// DATE, DATETIME, TIMESTAMP and TIMESTAMPTZ
    Timestamp,
    Time,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();
    // "INT UNSIGNED", "VARCHAR(255)" and friends
    let base = lower
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .split('(')
        .next()
        .unwrap_or_default();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if base == "decimal" || base == "numeric" {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && base == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if matches!(
        base,
        "int"
            | "integer"
            | "tinyint"
            | "smallint"
            | "mediumint"
            | "bigint"
            | "int2"
            | "int4"
            | "int8"
            | "serial"
            | "smallserial"
            | "bigserial"
    ) {
        return TypeCategory::Integer;
    }

    if base == "bool" || base == "boolean" {
        return TypeCategory::Boolean;
    }

    if matches!(base, "float" | "double" | "real" | "float4" | "float8") {
        return TypeCategory::Float;
    }

    if base == "json" || base == "jsonb" {
        return TypeCategory::Json;
    }

    // UUID (PostgreSQL)
    if base == "uuid" {
        return TypeCategory::Uuid;
    }

    if base.starts_with("timestamp") || base == "datetime" || base == "date" {
        return TypeCategory::Timestamp;
    }

    if base == "time" {
        return TypeCategory::Time;
    }

    if base.contains("blob") || base.contains("binary") || base == "bytea" {
        return TypeCategory::Binary;
    }

    if base.contains("char")
        || base.contains("text")
        || matches!(base, "name" | "citext" | "enum" | "set" | "string")
    {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    // Raw statements run over the text protocol, so NUMERIC arrives as its
    // literal digits.
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Shared Value Helpers
// =============================================================================

/// Binary payloads are returned as (lossy) UTF-8 text.
pub fn binary_text(bytes: &[u8]) -> JsonValue {
    JsonValue::String(String::from_utf8_lossy(bytes).into_owned())
}

/// Finite floats become JSON numbers; NaN and infinities become strings.
pub fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// RFC 3339 with second precision and a `Z` suffix.
pub fn rfc3339(ts: DateTime<Utc>) -> JsonValue {
    JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn decode_float<'r, R>(row: &'r R, idx: usize) -> Result<JsonValue, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    f64: Decode<'r, R::Database> + Type<R::Database>,
    f32: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<f64, _>(idx) {
        Ok(v) => Ok(float_value(v)),
        Err(_) => row
            .try_get::<f32, _>(idx)
            .map(|v| float_value(f64::from(v))),
    }
}

/// Zoned timestamps first, then naive ones (read as UTC), then bare dates
/// (midnight UTC).
fn decode_timestamp<'r, R>(row: &'r R, idx: usize) -> Result<JsonValue, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return Ok(rfc3339(v));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Ok(rfc3339(v.and_utc()));
    }
    let date = row.try_get::<NaiveDate, _>(idx)?;
    Ok(rfc3339(date.and_time(NaiveTime::default()).and_utc()))
}

/// Read a non-null value as text without checking its declared type, falling
/// back to lossy UTF-8 of the raw bytes.
fn decode_text<'r, R>(row: &'r R, idx: usize, type_name: &str) -> Result<JsonValue, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    &'r str: Decode<'r, R::Database>,
    &'r [u8]: Decode<'r, R::Database>,
{
    match row.try_get_unchecked::<&str, _>(idx) {
        Ok(v) => Ok(JsonValue::String(v.to_string())),
        Err(e) => {
            debug!(type_name = %type_name, error = %e, "Value is not valid UTF-8, decoding lossily");
            row.try_get_unchecked::<&[u8], _>(idx).map(binary_text)
        }
    }
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn column_names(&self) -> Vec<String>;

    /// Convert every column of the row. Keys are sorted by column name.
    fn to_json_map(&self) -> Result<JsonRow, sqlx::Error>;
}

impl RowToJson for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_json_map(&self) -> Result<JsonRow, sqlx::Error> {
        let mut map = JsonRow::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let value = mysql::decode_column(self, idx, col.type_info().name())?;
            map.insert(col.name().to_string(), value);
        }
        Ok(map)
    }
}

impl RowToJson for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_json_map(&self) -> Result<JsonRow, sqlx::Error> {
        let mut map = JsonRow::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let value = postgres::decode_column(self, idx, col.type_info().name())?;
            map.insert(col.name().to_string(), value);
        }
        Ok(map)
    }
}

impl RowToJson for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_json_map(&self) -> Result<JsonRow, sqlx::Error> {
        let mut map = JsonRow::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let value = sqlite::decode_column(self, idx, col.type_info().name())?;
            map.insert(col.name().to_string(), value);
        }
        Ok(map)
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
    ) -> Result<JsonValue, sqlx::Error> {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(JsonValue::Null);
        }

        let value = match categorize_type(type_name, DatabaseType::MySQL) {
            TypeCategory::Integer => decode_integer(row, idx, type_name)?,
            TypeCategory::Boolean => JsonValue::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float => decode_float(row, idx)?,
            TypeCategory::Decimal => JsonValue::String(row.try_get::<RawDecimal, _>(idx)?.0),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx)?,
            TypeCategory::Binary => binary_text(&row.try_get::<Vec<u8>, _>(idx)?),
            TypeCategory::Timestamp => decode_timestamp(row, idx)?,
            TypeCategory::Time => JsonValue::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
            TypeCategory::Text | TypeCategory::Uuid | TypeCategory::Unknown => {
                decode_text(row, idx, type_name)?
            }
        };
        Ok(value)
    }

    fn decode_integer(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
    ) -> Result<JsonValue, sqlx::Error> {
        if type_name.to_uppercase().contains("UNSIGNED") {
            return Ok(JsonValue::from(row.try_get::<u64, _>(idx)?));
        }
        match row.try_get::<i64, _>(idx) {
            Ok(v) => Ok(JsonValue::from(v)),
            Err(e) => row.try_get::<u64, _>(idx).map(JsonValue::from).map_err(|_| e),
        }
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<JsonValue, sqlx::Error> {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(JsonValue::Null);
        }

        let value = match categorize_type(type_name, DatabaseType::PostgreSQL) {
            TypeCategory::Integer => decode_integer(row, idx, type_name)?,
            TypeCategory::Boolean => JsonValue::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float => decode_float(row, idx)?,
            TypeCategory::Decimal => JsonValue::String(row.try_get::<RawDecimal, _>(idx)?.0),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx)?,
            TypeCategory::Uuid => JsonValue::String(row.try_get::<uuid::Uuid, _>(idx)?.to_string()),
            TypeCategory::Binary => binary_text(&row.try_get::<Vec<u8>, _>(idx)?),
            TypeCategory::Timestamp => decode_timestamp(row, idx)?,
            TypeCategory::Time => JsonValue::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
            TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx, type_name)?,
        };
        Ok(value)
    }

    fn decode_integer(row: &PgRow, idx: usize, type_name: &str) -> Result<JsonValue, sqlx::Error> {
        let value = match type_name.to_uppercase().as_str() {
            "INT2" | "SMALLINT" | "SMALLSERIAL" => JsonValue::from(row.try_get::<i16, _>(idx)?),
            "INT4" | "INT" | "INTEGER" | "SERIAL" => JsonValue::from(row.try_get::<i32, _>(idx)?),
            _ => JsonValue::from(row.try_get::<i64, _>(idx)?),
        };
        Ok(value)
    }
}

mod sqlite {
    use super::*;

    /// SQLite values carry their own storage class, which may differ from the
    /// declared column type. The declared type only refines stored values into
    /// timestamps or booleans.
    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        declared: &str,
    ) -> Result<JsonValue, sqlx::Error> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(JsonValue::Null);
        }
        let storage = raw.type_info().name().to_string();

        match (categorize_type(declared, DatabaseType::SQLite), storage.as_str()) {
            (TypeCategory::Timestamp, "TEXT" | "INTEGER" | "REAL") => {
                if let Ok(v) = decode_timestamp(row, idx) {
                    return Ok(v);
                }
            }
            (TypeCategory::Boolean, "INTEGER") => {
                return Ok(JsonValue::Bool(row.try_get::<bool, _>(idx)?));
            }
            _ => {}
        }

        let value = match storage.as_str() {
            "INTEGER" => JsonValue::from(row.try_get::<i64, _>(idx)?),
            "REAL" => float_value(row.try_get::<f64, _>(idx)?),
            "BLOB" => binary_text(&row.try_get::<Vec<u8>, _>(idx)?),
            _ => decode_text(row, idx, declared)?,
        };
        Ok(value)
    }
}
