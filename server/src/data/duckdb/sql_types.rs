//! SQL type conversions for DuckDB
//!
//! Bound parameters go in through [`SqlScalar`]; result cells come out
//! through [`value_to_json`].

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat};
use duckdb::ToSql;
use duckdb::types::{TimeUnit, ToSqlOutput, Value, ValueRef};
use serde_json::Value as JsonValue;

use crate::domain::query::Scalar;

/// Wrapper binding a [`Scalar`] as a DuckDB parameter
pub struct SqlScalar<'a>(pub &'a Scalar);

impl ToSql for SqlScalar<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Scalar::Bool(b) => ToSqlOutput::Owned(Value::Boolean(*b)),
            Scalar::Int(i) => ToSqlOutput::Owned(Value::BigInt(*i)),
            Scalar::Float(f) => ToSqlOutput::Owned(Value::Double(*f)),
            Scalar::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn unit_to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Convert a DuckDB cell into JSON
///
/// Dates render as `YYYY-MM-DD`, timestamps as RFC 3339 UTC and decimals as
/// strings so no precision is lost.
pub fn value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(i) => JsonValue::from(i),
        Value::SmallInt(i) => JsonValue::from(i),
        Value::Int(i) => JsonValue::from(i),
        Value::BigInt(i) => JsonValue::from(i),
        Value::UTinyInt(i) => JsonValue::from(i),
        Value::USmallInt(i) => JsonValue::from(i),
        Value::UInt(i) => JsonValue::from(i),
        Value::UBigInt(i) => JsonValue::from(i),
        Value::HugeInt(i) => i64::try_from(i)
            .map(JsonValue::from)
            .unwrap_or_else(|_| JsonValue::String(i.to_string())),
        Value::Float(f) => JsonValue::from(f64::from(f)),
        Value::Double(f) => JsonValue::from(f),
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        Value::Text(s) | Value::Enum(s) => JsonValue::String(s),
        Value::Date32(days) => {
            let date = epoch_date() + Duration::days(i64::from(days));
            JsonValue::String(date.format("%Y-%m-%d").to_string())
        }
        Value::Timestamp(unit, v) => DateTime::from_timestamp_micros(unit_to_micros(unit, v))
            .map(|dt| JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::Micros, true)))
            .unwrap_or(JsonValue::Null),
        Value::List(items) | Value::Array(items) => {
            JsonValue::Array(items.into_iter().map(value_to_json).collect())
        }
        other => JsonValue::String(format!("{:?}", other)),
    }
}
