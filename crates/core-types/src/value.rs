use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The generic representation of a single SQL parameter or result cell.
///
/// Every value bound into a statement passes through this type, so native
/// numeric kinds (`f32`, `i32`, `u64`, ...) are normalized once, here, into
/// the handful of representations the MySQL wire protocol understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Converts any supported native value into its generic `SqlValue` form.
pub fn normalize<T: Into<SqlValue>>(value: T) -> SqlValue {
    value.into()
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Returns the value as text, rendering non-text variants with `Display`.
    /// `Null` has no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::UInt(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Decimal(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v}"),
            SqlValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            SqlValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// --- Floating point ---

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        // MySQL has no NaN or infinity.
        if value.is_finite() {
            SqlValue::Float(value)
        } else {
            SqlValue::Null
        }
    }
}

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        if !value.is_finite() {
            return SqlValue::Null;
        }
        // Widen through the shortest decimal representation so 3.14f32 stays 3.14
        // instead of becoming 3.140000104904175.
        match value.to_string().parse::<f64>() {
            Ok(widened) => SqlValue::Float(widened),
            Err(_) => SqlValue::Float(f64::from(value)),
        }
    }
}

// --- Integers ---

macro_rules! signed_into_int {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(value: $t) -> Self {
                SqlValue::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! unsigned_into_uint {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(value: $t) -> Self {
                SqlValue::UInt(u64::from(value))
            }
        })*
    };
}

signed_into_int!(i8, i16, i32, i64);
unsigned_into_uint!(u8, u16, u32, u64);

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

// --- Everything else ---

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

/// Timezone-aware timestamps are stored as their wall-clock time in that zone.
impl<Tz: TimeZone> From<DateTime<Tz>> for SqlValue {
    fn from(value: DateTime<Tz>) -> Self {
        SqlValue::DateTime(value.naive_local())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}
