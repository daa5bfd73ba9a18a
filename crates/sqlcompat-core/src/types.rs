//! Core value types

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value bound to a statement parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
        }
    }
}

/// Outcome of executing a single statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementResult {
    /// Whether the statement produced a result set
    pub is_query: bool,
    /// Rows returned (if is_query is true)
    pub returned_rows: u64,
    /// Rows affected (if is_query is false)
    pub affected_rows: u64,
}

impl StatementResult {
    /// Result of a statement that returned rows
    pub fn rows(returned_rows: u64) -> Self {
        Self {
            is_query: true,
            returned_rows,
            affected_rows: 0,
        }
    }

    /// Result of a command (INSERT/UPDATE/DELETE/DDL)
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            is_query: false,
            returned_rows: 0,
            affected_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Null, "NULL")]
    #[case(Value::Bool(true), "true")]
    #[case(Value::Int64(42), "42")]
    #[case(Value::Decimal("1.50".into()), "1.50")]
    #[case(Value::Bytes(vec![0, 1, 2]), "<3 bytes>")]
    #[case(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()), "2024-01-31")]
    fn displays_as_text_literal(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }
}
