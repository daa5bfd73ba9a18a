//! Bind parameter conversion
//!
//! Sample values arrive as loosely typed [`Value`]s. Before binding they are
//! coerced to the parameter type the server inferred while preparing, so
//! tokio-postgres writes the binary width and format the server expects.

use std::error::Error;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_types::{IsNull, ToSql, Type, to_sql_checked};
use sqlcompat_core::Value;

type BoxError = Box<dyn Error + Sync + Send>;

/// An owned, bindable parameter value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl PgValue {
    /// Convert `value` for a parameter slot of type `target`
    pub(crate) fn for_type(value: &Value, target: &Type) -> Self {
        if is_textual(target) && !matches!(value, Value::Null | Value::Bytes(_)) {
            return match value {
                Value::String(s) | Value::Decimal(s) => PgValue::Text(s.clone()),
                other => PgValue::Text(other.to_string()),
            };
        }

        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int16(v) => Self::coerce_int(i64::from(*v), target),
            Value::Int32(v) => Self::coerce_int(i64::from(*v), target),
            Value::Int64(v) => Self::coerce_int(*v, target),
            Value::Float64(v) => match *target {
                Type::FLOAT4 => PgValue::Float32(*v as f32),
                Type::NUMERIC => PgValue::Numeric(v.to_string()),
                _ => PgValue::Float64(*v),
            },
            Value::Decimal(v) => match *target {
                Type::FLOAT4 | Type::FLOAT8 => v
                    .parse::<f64>()
                    .map(|f| Self::for_type(&Value::Float64(f), target))
                    .unwrap_or_else(|_| PgValue::Numeric(v.clone())),
                Type::INT2 | Type::INT4 | Type::INT8 => v
                    .parse::<i64>()
                    .map(|i| Self::coerce_int(i, target))
                    .unwrap_or_else(|_| PgValue::Numeric(v.clone())),
                _ => PgValue::Numeric(v.clone()),
            },
            Value::String(v) => Self::coerce_string(v, target),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Date(v) => match *target {
                Type::TIMESTAMP => PgValue::Timestamp(v.and_time(NaiveTime::MIN)),
                Type::TIMESTAMPTZ => PgValue::TimestampTz(v.and_time(NaiveTime::MIN).and_utc()),
                _ => PgValue::Date(*v),
            },
            Value::Time(v) => PgValue::Time(*v),
            Value::DateTime(v) => match *target {
                Type::TIMESTAMPTZ => PgValue::TimestampTz(v.and_utc()),
                Type::DATE => PgValue::Date(v.date()),
                Type::TIME => PgValue::Time(v.time()),
                _ => PgValue::Timestamp(*v),
            },
            Value::DateTimeUtc(v) => match *target {
                Type::TIMESTAMP => PgValue::Timestamp(v.naive_utc()),
                Type::DATE => PgValue::Date(v.date_naive()),
                Type::TIME => PgValue::Time(v.time()),
                _ => PgValue::TimestampTz(*v),
            },
        }
    }

    fn coerce_int(value: i64, target: &Type) -> Self {
        match *target {
            Type::INT2 => i16::try_from(value)
                .map(PgValue::Int16)
                .unwrap_or(PgValue::Int64(value)),
            Type::INT4 => i32::try_from(value)
                .map(PgValue::Int32)
                .unwrap_or(PgValue::Int64(value)),
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::FLOAT8 => PgValue::Float64(value as f64),
            Type::NUMERIC => PgValue::Numeric(value.to_string()),
            Type::BOOL => PgValue::Bool(value != 0),
            _ => PgValue::Int64(value),
        }
    }

    /// Parse strings into typed values where the slot demands it. Strings
    /// that do not parse are sent as text and rejected by the server.
    fn coerce_string(value: &str, target: &Type) -> Self {
        let text = || PgValue::Text(value.to_string());
        match *target {
            Type::JSON | Type::JSONB => serde_json::from_str(value)
                .map(PgValue::Json)
                .unwrap_or_else(|_| PgValue::Json(serde_json::Value::String(value.to_string()))),
            Type::INT2 | Type::INT4 | Type::INT8 => value
                .trim()
                .parse::<i64>()
                .map(|i| Self::coerce_int(i, target))
                .unwrap_or_else(|_| text()),
            Type::NUMERIC => PgValue::Numeric(value.to_string()),
            Type::BOOL => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => PgValue::Bool(true),
                "false" | "f" | "0" | "no" => PgValue::Bool(false),
                _ => text(),
            },
            Type::UUID => uuid::Uuid::parse_str(value.trim())
                .map(PgValue::Uuid)
                .unwrap_or_else(|_| text()),
            Type::DATE => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(PgValue::Date)
                .unwrap_or_else(|_| text()),
            Type::TIME => NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
                .map(PgValue::Time)
                .unwrap_or_else(|_| text()),
            Type::TIMESTAMP => parse_naive_timestamp(value)
                .map(PgValue::Timestamp)
                .unwrap_or_else(text),
            Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(value)
                .map(|ts| ts.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_naive_timestamp(value).map(|ts| ts.and_utc()))
                .map(PgValue::TimestampTz)
                .unwrap_or_else(text),
            Type::BYTEA => PgValue::Bytes(value.as_bytes().to_vec()),
            _ => text(),
        }
    }
}

fn is_textual(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn parse_naive_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Write a decimal literal in PostgreSQL's binary NUMERIC format:
/// digit count, weight, sign and display scale, then base-10000 digits.
pub(crate) fn encode_numeric(literal: &str, out: &mut BytesMut) -> Result<(), BoxError> {
    const POSITIVE: u16 = 0x0000;
    const NEGATIVE: u16 = 0x4000;
    const NAN: u16 = 0xC000;

    let literal = literal.trim();
    if literal.eq_ignore_ascii_case("nan") {
        out.put_i16(0);
        out.put_i16(0);
        out.put_u16(NAN);
        out.put_i16(0);
        return Ok(());
    }

    let (negative, body) = match literal.as_bytes().first() {
        Some(b'-') => (true, &literal[1..]),
        Some(b'+') => (false, &literal[1..]),
        _ => (false, literal),
    };
    let (integer, fraction) = body.split_once('.').unwrap_or((body, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (integer.is_empty() && fraction.is_empty()) || !all_digits(integer) || !all_digits(fraction)
    {
        return Err(format!("invalid numeric literal '{}'", literal).into());
    }

    let integer = integer.trim_start_matches('0');
    let mut padded = "0".repeat((4 - integer.len() % 4) % 4);
    padded.push_str(integer);
    let integer_groups = padded.len() / 4;
    padded.push_str(fraction);
    padded.push_str(&"0".repeat((4 - fraction.len() % 4) % 4));

    let mut groups: Vec<i16> = padded
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0i16, |acc, digit| acc * 10 + i16::from(digit - b'0'))
        })
        .collect();

    let leading_zeros = groups.iter().take_while(|g| **g == 0).count();
    groups.drain(..leading_zeros);
    while groups.last() == Some(&0) {
        groups.pop();
    }

    let weight = if groups.is_empty() {
        0
    } else {
        integer_groups as i64 - 1 - leading_zeros as i64
    };
    let sign = if negative && !groups.is_empty() {
        NEGATIVE
    } else {
        POSITIVE
    };

    let to_i16 = |n: usize| i16::try_from(n).map_err(|_| "numeric literal too long");
    out.put_i16(to_i16(groups.len())?);
    out.put_i16(i16::try_from(weight).map_err(|_| "numeric literal out of range")?);
    out.put_u16(sign);
    out.put_i16(to_i16(fraction.len())?);
    for group in groups {
        out.put_i16(group);
    }
    Ok(())
}

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            PgValue::Null => Ok(IsNull::Yes),
            PgValue::Bool(v) => v.to_sql_checked(ty, out),
            PgValue::Int16(v) => v.to_sql_checked(ty, out),
            PgValue::Int32(v) => v.to_sql_checked(ty, out),
            PgValue::Int64(v) => v.to_sql_checked(ty, out),
            PgValue::Float32(v) => v.to_sql_checked(ty, out),
            PgValue::Float64(v) => v.to_sql_checked(ty, out),
            PgValue::Numeric(v) if *ty == Type::NUMERIC => {
                encode_numeric(v, out)?;
                Ok(IsNull::No)
            }
            PgValue::Numeric(v) | PgValue::Text(v) => v.to_sql_checked(ty, out),
            PgValue::Bytes(v) => v.to_sql_checked(ty, out),
            PgValue::Uuid(v) => v.to_sql_checked(ty, out),
            PgValue::Json(v) => v.to_sql_checked(ty, out),
            PgValue::Date(v) => v.to_sql_checked(ty, out),
            PgValue::Time(v) => v.to_sql_checked(ty, out),
            PgValue::Timestamp(v) => v.to_sql_checked(ty, out),
            PgValue::TimestampTz(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
