//! The dynamic value type exchanged with the preferences store.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// A dynamically typed preference value.
///
/// `Null` is the absent value: it has no native encoding, and writing it
/// removes the key from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    /// Descriptive name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Value for a number from a host with a single number type.
    ///
    /// Integral numbers within the exactly representable range become `Int`.
    /// Everything else stays `Float`, including `-0.0`, whose sign an
    /// integer cannot carry.
    pub fn from_number(n: f64) -> Self {
        let negative_zero = n == 0.0 && n.is_sign_negative();
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER && !negative_zero {
            Value::Int(n as i64)
        } else {
            Value::Float(n)
        }
    }

    /// Date value for milliseconds since the Unix epoch.
    ///
    /// A non-finite time (an invalid host date) is `UnsupportedType`; a
    /// finite time outside the representable range is `ValueTooLarge`.
    pub fn from_timestamp_millis(millis: f64) -> Result<Self> {
        if !millis.is_finite() {
            return Err(Error::UnsupportedType("invalid date".into()));
        }
        let out_of_range = || Error::ValueTooLarge(format!("date {millis} ms is out of range"));
        if millis < i64::MIN as f64 || millis >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        DateTime::from_timestamp_millis(millis as i64)
            .map(Value::Date)
            .ok_or_else(out_of_range)
    }
}

/// Largest integer an IEEE 754 double represents exactly, 2^53 - 1.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

// Widths that may not fit the signed 64-bit representation.
macro_rules! impl_try_from_int {
    ($($t:ty),*) => {
        $(impl TryFrom<$t> for Value {
            type Error = Error;

            fn try_from(v: $t) -> Result<Self> {
                i64::try_from(v).map(Value::Int).map_err(|_| {
                    Error::ValueTooLarge(format!("integer {v} does not fit in 64 signed bits"))
                })
            }
        })*
    };
}

impl_try_from_int!(u64, usize, isize, i128, u128);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Object(v)
    }
}

/// Convert a JSON value to a preference value.
///
/// Integers that fit `i64` become `Int`; larger unsigned integers are
/// rejected rather than silently turned into floats.
impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(val: serde_json::Value) -> Result<Self> {
        Ok(match val {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if n.is_u64() {
                    return Err(Error::ValueTooLarge(format!(
                        "integer {n} does not fit in 64 signed bits"
                    )));
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    return Err(Error::UnsupportedType(format!("number {n}")));
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(
                arr.into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_>>()?,
            ),
            serde_json::Value::Object(map) => {
                let mut obj = HashMap::with_capacity(map.len());
                for (k, v) in map {
                    let v = Value::try_from(v).map_err(|e| e.context(format!("key {k:?}")))?;
                    obj.insert(k, v);
                }
                Value::Object(obj)
            }
        })
    }
}

/// Convert a preference value to JSON.
///
/// Bytes become an array of numbers and dates an RFC 3339 string, so this
/// direction is lossy for those two shapes.
impl From<Value> for serde_json::Value {
    fn from(val: Value) -> Self {
        match val {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Bytes(b) => {
                serde_json::Value::Array(b.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => {
                let obj: serde_json::Map<String, serde_json::Value> = map
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect();
                serde_json::Value::Object(obj)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::error::ErrorKind;

    #[test]
    fn host_numbers() {
        assert_eq!(Value::from_number(42.0), Value::Int(42));
        assert_eq!(Value::from_number(-7.0), Value::Int(-7));
        assert_eq!(Value::from_number(0.0), Value::Int(0));
        assert_eq!(Value::from_number(0.5), Value::Float(0.5));
        assert_eq!(Value::from_number(1e300), Value::Float(1e300));

        match Value::from_number(-0.0) {
            Value::Float(f) => assert!(f == 0.0 && f.is_sign_negative()),
            other => panic!("expected float, got {other:?}"),
        }
        assert!(matches!(Value::from_number(f64::NAN), Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn host_timestamps() {
        assert_eq!(
            Value::from_timestamp_millis(1_682_942_400_000.0).unwrap(),
            Value::Date(Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(
            Value::from_timestamp_millis(0.0).unwrap(),
            Value::Date(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap())
        );
        for invalid in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Value::from_timestamp_millis(invalid).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        }
        let err = Value::from_timestamp_millis(1e300).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueTooLarge);
    }

    #[test]
    fn integer_widths_widen_to_i64() {
        assert_eq!(Value::from(42u8), Value::Int(42));
        assert_eq!(Value::from(-7i16), Value::Int(-7));
        assert_eq!(Value::from(u32::MAX), Value::Int(4_294_967_295));
        assert_eq!(Value::try_from(i64::MAX as u64), Ok(Value::Int(i64::MAX)));
        assert_eq!(Value::try_from(-3isize), Ok(Value::Int(-3)));
    }

    #[test]
    fn integers_beyond_i64_are_too_large() {
        let err = Value::try_from(u64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueTooLarge);
        let err = Value::try_from(i128::MIN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueTooLarge);
    }

    #[test]
    fn floats_widen_to_f64() {
        assert_eq!(Value::from(1.5f32), Value::Float(1.5));
    }

    #[test]
    fn json_numbers_keep_integer_intent() {
        let value = Value::try_from(json!({"age": 30, "ratio": 0.25})).unwrap();
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["age"], Value::Int(30));
        assert_eq!(map["ratio"], Value::Float(0.25));
    }

    #[test]
    fn json_rejects_unsigned_overflow() {
        let err = Value::try_from(json!({"big": u64::MAX})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueTooLarge);
        assert!(err.to_string().starts_with("key \"big\""));
    }

    #[test]
    fn json_output_for_bytes_and_dates() {
        let date = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        let value = Value::Array(vec![
            Value::Bytes(vec![1, 2, 255]),
            Value::Date(date),
            Value::Float(f64::NAN),
        ]);
        assert_eq!(
            serde_json::Value::from(value),
            json!([[1, 2, 255], "2023-05-01T12:00:00Z", null])
        );
    }
}
