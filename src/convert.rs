//! Conversion between [`Value`] and native object graphs.
//!
//! Encoding builds a graph of [`Owned`] handles; every intermediate handle
//! is dropped (and so released) as soon as the aggregate holding it has
//! been built, or as soon as an error unwinds the call. Decoding only
//! borrows the graph it walks.

use std::collections::HashMap;
use std::ffi::CString;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::native::{NativeType, NumberKind, ObjectSystem, Owned};
use crate::value::Value;

/// Seconds between the Unix epoch and the native reference date,
/// 2001-01-01T00:00:00Z.
pub const ABSOLUTE_TIME_EPOCH_OFFSET: i64 = 978_307_200;

/// Largest byte buffer the native 32-bit length field can describe.
pub const MAX_DATA_LEN: u64 = u32::MAX as u64;

/// Encode a value as a native object.
///
/// `Value::Null` encodes to `Ok(None)`, the "no value" sentinel.
pub fn encode<'a, S: ObjectSystem + ?Sized>(
    objects: &'a S,
    value: &Value,
) -> Result<Option<Owned<'a, S>>> {
    let owned = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => Owned::adopt(objects, objects.boolean(*b)),
        Value::Int(i) => created(objects, objects.create_integer(*i), "number")?,
        Value::Float(f) => created(objects, objects.create_float(*f), "number")?,
        Value::String(s) => encode_string(objects, s)?,
        Value::Bytes(bytes) => encode_data(objects, bytes)?,
        Value::Date(date) => created(objects, objects.create_date(absolute_time(date)), "date")?,
        Value::Array(items) => encode_array(objects, items)?,
        Value::Object(map) => encode_dictionary(objects, map)?,
    };
    Ok(Some(owned))
}

/// Encode a string as a native string object.
pub fn encode_string<'a, S: ObjectSystem + ?Sized>(
    objects: &'a S,
    s: &str,
) -> Result<Owned<'a, S>> {
    let c_string = CString::new(s).map_err(|e| {
        Error::EncodingError(format!(
            "string contains a NUL byte at offset {}",
            e.nul_position()
        ))
    })?;
    objects
        .create_string(&c_string)
        .map(|raw| Owned::adopt(objects, raw))
        .ok_or_else(|| Error::EncodingError("native string construction failed".into()))
}

fn check_data_len(len: usize) -> Result<()> {
    if len as u64 > MAX_DATA_LEN {
        return Err(Error::ValueTooLarge(format!(
            "byte buffer of {len} bytes exceeds {MAX_DATA_LEN}"
        )));
    }
    Ok(())
}

fn encode_data<'a, S: ObjectSystem + ?Sized>(objects: &'a S, bytes: &[u8]) -> Result<Owned<'a, S>> {
    check_data_len(bytes.len())?;
    objects
        .create_data(bytes)
        .map(|raw| Owned::adopt(objects, raw))
        .ok_or_else(|| Error::EncodingError("native data construction failed".into()))
}

fn encode_array<'a, S: ObjectSystem + ?Sized>(
    objects: &'a S,
    items: &[Value],
) -> Result<Owned<'a, S>> {
    let members = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            encode_member(objects, item).map_err(|e| e.context(format!("array item at index {i}")))
        })
        .collect::<Result<Vec<_>>>()?;
    let raws: Vec<S::Raw> = members.iter().map(Owned::as_raw).collect();
    // The array retains its members; `members` releases ours on return.
    created(objects, objects.create_array(&raws), "array")
}

fn encode_dictionary<'a, S: ObjectSystem + ?Sized>(
    objects: &'a S,
    map: &HashMap<String, Value>,
) -> Result<Owned<'a, S>> {
    let mut keys = Vec::with_capacity(map.len());
    let mut values = Vec::with_capacity(map.len());
    for (key, value) in map {
        keys.push(
            encode_string(objects, key)
                .map_err(|e| e.context(format!("dictionary key {key:?}")))?,
        );
        values.push(
            encode_member(objects, value)
                .map_err(|e| e.context(format!("dictionary value for key {key:?}")))?,
        );
    }
    let key_raws: Vec<S::Raw> = keys.iter().map(Owned::as_raw).collect();
    let value_raws: Vec<S::Raw> = values.iter().map(Owned::as_raw).collect();
    created(
        objects,
        objects.create_dictionary(&key_raws, &value_raws),
        "dictionary",
    )
}

/// Encode a value stored inside an aggregate, where the sentinel has no
/// representation.
fn encode_member<'a, S: ObjectSystem + ?Sized>(
    objects: &'a S,
    value: &Value,
) -> Result<Owned<'a, S>> {
    encode(objects, value)?.ok_or_else(|| {
        Error::UnsupportedType("null cannot be stored inside an array or dictionary".into())
    })
}

fn created<'a, S: ObjectSystem + ?Sized>(
    objects: &'a S,
    raw: Option<S::Raw>,
    what: &str,
) -> Result<Owned<'a, S>> {
    raw.map(|raw| Owned::adopt(objects, raw))
        .ok_or_else(|| Error::EncodingError(format!("native {what} construction failed")))
}

/// Decode a native object into a value.
///
/// Dispatch is on the object's runtime type; the handle is only borrowed.
pub fn decode<S: ObjectSystem + ?Sized>(objects: &S, raw: S::Raw) -> Result<Value> {
    match objects.type_of(raw) {
        NativeType::String => decode_string(objects, raw).map(Value::String),
        NativeType::Data => Ok(Value::Bytes(objects.data_bytes(raw))),
        NativeType::Boolean => Ok(Value::Bool(objects.boolean_value(raw))),
        NativeType::Date => date_from_absolute_time(objects.date_value(raw)).map(Value::Date),
        NativeType::Number => match objects.number_kind(raw) {
            NumberKind::Integer => Ok(Value::Int(objects.integer_value(raw))),
            NumberKind::Float => Ok(Value::Float(objects.float_value(raw))),
            NumberKind::Other(kind) => Err(Error::UnsupportedType(format!("number of type {kind}"))),
        },
        NativeType::Array => objects
            .array_items(raw)
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                decode(objects, item).map_err(|e| e.context(format!("array item at index {i}")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        NativeType::Dictionary => {
            let entries = objects.dictionary_entries(raw);
            let mut map = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match objects.type_of(key) {
                    NativeType::String => decode_string(objects, key)?,
                    other => return Err(Error::UnsupportedKeyType(other.to_string())),
                };
                let value = decode(objects, value)
                    .map_err(|e| e.context(format!("dictionary value for key {key:?}")))?;
                map.insert(key, value);
            }
            Ok(Value::Object(map))
        }
        NativeType::Other(name) => {
            tracing::trace!(native_type = %name, "no conversion rule for native type");
            Err(Error::UnsupportedType(name))
        }
    }
}

fn decode_string<S: ObjectSystem + ?Sized>(objects: &S, raw: S::Raw) -> Result<String> {
    objects
        .string_value(raw)
        .ok_or_else(|| Error::EncodingError("native string is not representable as UTF-8".into()))
}

/// Seconds since the native reference date, truncated to whole seconds.
pub fn absolute_time(date: &DateTime<Utc>) -> f64 {
    (date.timestamp() - ABSOLUTE_TIME_EPOCH_OFFSET) as f64
}

/// Inverse of [`absolute_time`], rounding down to a whole-second UTC instant.
pub fn date_from_absolute_time(absolute_time: f64) -> Result<DateTime<Utc>> {
    let out_of_range =
        || Error::ValueTooLarge(format!("date {absolute_time} is outside the supported range"));
    if !absolute_time.is_finite() {
        return Err(out_of_range());
    }
    let seconds = absolute_time.floor() + ABSOLUTE_TIME_EPOCH_OFFSET as f64;
    if seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    DateTime::from_timestamp(seconds as i64, 0).ok_or_else(out_of_range)
}
