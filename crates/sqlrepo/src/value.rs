//! Dialect-neutral scalar values.
//!
//! Parameters and result cells travel between the SQL layer and the drivers as
//! [`Value`]. Rust types go in through `From<T> for Value` and come back out
//! through [`FromValue`].

use crate::error::{RepoError, RepoResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    /// Exact numeric (`NUMERIC` / `DECIMAL`).
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "integer",
            Value::F64(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Json(_) => "json",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Decimal(v) if v.fract().is_zero() => i64::try_from(*v).ok(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::I64(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F64(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Clone + Into<Value>> From<&Option<T>> for Value {
    fn from(v: &Option<T>) -> Self {
        v.clone().into()
    }
}

/// Conversion out of a [`Value`].
///
/// Integer widths convert into each other with a range check, integers widen
/// into floats, and `Option<T>` maps `Null` to `None`.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> RepoResult<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> RepoResult<T> {
    Err(RepoError::decode(
        "",
        format!("expected {expected}, got {}", value.kind()),
    ))
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> RepoResult<Self> {
                    match value.as_i64() {
                        Some(v) => <$t>::try_from(v).map_err(|_| {
                            RepoError::decode(
                                "",
                                format!("value {v} out of range for {}", stringify!($t)),
                            )
                        }),
                        None => mismatch(stringify!($t), &value),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for bool {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            // SQLite and MySQL store booleans as integers.
            Value::I64(v) => Ok(v != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::F64(v) => Ok(v),
            Value::I64(v) => Ok(v as f64),
            Value::Decimal(v) => f64::try_from(v)
                .map_err(|e| RepoError::decode("", format!("decimal {v} as float: {e}"))),
            other => mismatch("float", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> RepoResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Uuid(v) => Ok(v.to_string()),
            Value::Decimal(v) => Ok(v.to_string()),
            other => mismatch("text", &other),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Decimal(v) => Ok(v),
            Value::I64(v) => Ok(Decimal::from(v)),
            Value::F64(v) => Decimal::try_from(v)
                .map_err(|e| RepoError::decode("", format!("float {v} as decimal: {e}"))),
            // SQLite stores decimals as text.
            Value::Text(s) => Decimal::from_str(s.trim())
                .map_err(|e| RepoError::decode("", format!("invalid decimal: {e}"))),
            other => mismatch("decimal", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => mismatch("bytes", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(s) => Uuid::parse_str(&s)
                .map_err(|e| RepoError::decode("", format!("invalid uuid: {e}"))),
            Value::Bytes(b) => Uuid::from_slice(&b)
                .map_err(|e| RepoError::decode("", format!("invalid uuid: {e}"))),
            other => mismatch("uuid", &other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.date()),
            Value::Text(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| RepoError::decode("", format!("invalid date: {e}"))),
            other => mismatch("date", &other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            Value::Text(s) => parse_naive_datetime(&s),
            other => mismatch("timestamp", &other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            Value::Text(s) => match DateTime::parse_from_rfc3339(&s) {
                Ok(v) => Ok(v.with_timezone(&Utc)),
                Err(_) => parse_naive_datetime(&s).map(|v| v.and_utc()),
            },
            other => mismatch("timestamptz", &other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(s) => serde_json::from_str(&s)
                .map_err(|e| RepoError::decode("", format!("invalid json: {e}"))),
            other => mismatch("json", &other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> RepoResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// SQLite has no native timestamp type; `CURRENT_TIMESTAMP` yields "YYYY-MM-DD HH:MM:SS".
fn parse_naive_datetime(s: &str) -> RepoResult<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| RepoError::decode("", format!("invalid timestamp: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_are_range_checked() {
        assert_eq!(i32::from_value(Value::I64(42)).unwrap(), 42);
        assert!(i8::from_value(Value::I64(1_000)).is_err());
        assert!(u32::from_value(Value::I64(-1)).is_err());
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::Text("a".into())).unwrap(),
            Some("a".to_string())
        );
        assert!(i64::from_value(Value::Null).is_err());
    }

    #[test]
    fn sqlite_style_values_decode() {
        assert!(bool::from_value(Value::I64(1)).unwrap());
        assert_eq!(f64::from_value(Value::I64(3)).unwrap(), 3.0);
        let ts = NaiveDateTime::from_value(Value::Text("2024-05-01 10:20:30".into())).unwrap();
        assert_eq!(ts.to_string(), "2024-05-01 10:20:30");
    }

    #[test]
    fn decimals_convert_exactly() {
        let price = Decimal::from_str("19.99").unwrap();
        assert_eq!(Decimal::from_value(Value::Text("19.99".into())).unwrap(), price);
        assert_eq!(Decimal::from_value(Value::I64(3)).unwrap(), Decimal::from(3));
        assert_eq!(String::from_value(Value::Decimal(price)).unwrap(), "19.99");
        assert!((f64::from_value(Value::Decimal(price)).unwrap() - 19.99).abs() < 1e-9);
        assert_eq!(Value::Decimal(Decimal::from(42)).as_i64(), Some(42));
        assert_eq!(Value::Decimal(price).as_i64(), None);
        assert_eq!(u64::from_value(Value::Decimal(Decimal::from(25))).unwrap(), 25);
    }

    #[test]
    fn option_into_value() {
        let none: Option<i32> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
