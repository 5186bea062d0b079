//! Node.js bindings for cfprefs.
//!
//! This module exposes the preferences store to Node.js via NAPI-RS.

#![deny(clippy::all)]

use std::collections::HashMap;

use napi::{Env, JsBuffer, JsDate, JsObject, JsString, JsUnknown, ValueType};
use napi_derive::napi;

use cfprefs::{Error as PrefsError, Scope, Value};

#[cfg(target_os = "macos")]
type Store = cfprefs::SystemStore;
#[cfg(not(target_os = "macos"))]
type Store = cfprefs::MemoryStore;

/// Convert a JavaScript value to a preference value.
fn js_to_value(val: JsUnknown) -> napi::Result<Value> {
    match val.get_type()? {
        ValueType::Undefined | ValueType::Null => Ok(Value::Null),
        ValueType::Boolean => Ok(Value::Bool(val.coerce_to_bool()?.get_value()?)),
        ValueType::Number => Ok(Value::from_number(val.coerce_to_number()?.get_double()?)),
        ValueType::String => Ok(Value::String(
            val.coerce_to_string()?.into_utf8()?.into_owned()?,
        )),
        ValueType::Object => {
            if val.is_buffer()? {
                let buf = unsafe { val.cast::<JsBuffer>() }.into_value()?;
                Ok(Value::Bytes(buf.to_vec()))
            } else if val.is_date()? {
                let millis = unsafe { val.cast::<JsDate>() }.value_of()?;
                Value::from_timestamp_millis(millis).map_err(to_napi_err)
            } else if val.is_array()? {
                let arr = unsafe { val.cast::<JsObject>() };
                let len = arr.get_array_length()?;
                let mut items = Vec::with_capacity(len as usize);
                for i in 0..len {
                    items.push(js_to_value(arr.get_element::<JsUnknown>(i)?)?);
                }
                Ok(Value::Array(items))
            } else {
                let obj = unsafe { val.cast::<JsObject>() };
                let names = obj.get_property_names()?;
                let len = names.get_array_length()?;
                let mut map = HashMap::with_capacity(len as usize);
                for i in 0..len {
                    let key = names
                        .get_element::<JsString>(i)?
                        .into_utf8()?
                        .into_owned()?;
                    let item = obj.get_named_property_unchecked::<JsUnknown>(&key)?;
                    map.insert(key, js_to_value(item)?);
                }
                Ok(Value::Object(map))
            }
        }
        other => Err(to_napi_err(PrefsError::UnsupportedType(format!(
            "{other:?}"
        )))),
    }
}

/// Convert a preference value to a JavaScript value.
fn value_to_js(env: &Env, val: Value) -> napi::Result<JsUnknown> {
    Ok(match val {
        Value::Null => env.get_null()?.into_unknown(),
        Value::Bool(b) => env.get_boolean(b)?.into_unknown(),
        Value::Int(i) => env.create_int64(i)?.into_unknown(),
        Value::Float(f) => env.create_double(f)?.into_unknown(),
        Value::String(s) => env.create_string_from_std(s)?.into_unknown(),
        Value::Bytes(b) => env.create_buffer_with_data(b)?.into_raw().into_unknown(),
        Value::Date(d) => env.create_date(d.timestamp_millis() as f64)?.into_unknown(),
        Value::Array(items) => {
            let mut arr = env.create_array_with_length(items.len())?;
            for (i, item) in items.into_iter().enumerate() {
                arr.set_element(i as u32, value_to_js(env, item)?)?;
            }
            arr.into_unknown()
        }
        Value::Object(map) => {
            let mut obj = env.create_object()?;
            for (k, v) in map {
                obj.set_named_property(&k, value_to_js(env, v)?)?;
            }
            obj.into_unknown()
        }
    })
}

/// Convert cfprefs error to napi Error.
fn to_napi_err(e: PrefsError) -> napi::Error {
    napi::Error::from_reason(format!("{}", e))
}

/// Preferences of one domain in one scope.
///
/// On macOS this is the system store; elsewhere values live in a
/// process-local store.
#[napi]
pub struct Preferences {
    inner: cfprefs::Preferences<Store>,
    domain: String,
    scope: Scope,
}

#[napi]
impl Preferences {
    /// Open a domain. `scope` is e.g. "current-user/any-host", the default.
    #[napi(constructor)]
    pub fn new(domain: String, scope: Option<String>) -> napi::Result<Self> {
        let scope = match scope {
            Some(s) => s
                .parse::<Scope>()
                .map_err(|e| napi::Error::from_reason(e.to_string()))?,
            None => Scope::default(),
        };
        Ok(Self {
            inner: cfprefs::Preferences::new(Store::default()),
            domain,
            scope,
        })
    }

    /// The domain this handle reads and writes.
    #[napi(getter)]
    pub fn domain(&self) -> String {
        self.domain.clone()
    }

    /// The scope this handle reads and writes.
    #[napi(getter)]
    pub fn scope(&self) -> String {
        self.scope.to_string()
    }

    /// Get a value by key, or null if it is not set.
    #[napi]
    pub fn get(&self, env: Env, key: String) -> napi::Result<JsUnknown> {
        match self
            .inner
            .read(&key, &self.domain, self.scope)
            .map_err(to_napi_err)?
        {
            Some(v) => value_to_js(&env, v),
            None => Ok(env.get_null()?.into_unknown()),
        }
    }

    /// Store a value. Storing null or undefined deletes the key.
    #[napi]
    pub fn set(&self, key: String, value: JsUnknown) -> napi::Result<()> {
        let v = js_to_value(value)?;
        self.inner
            .write(&key, &v, &self.domain, self.scope)
            .map_err(to_napi_err)
    }

    /// Delete a key.
    #[napi]
    pub fn delete(&self, key: String) -> napi::Result<()> {
        self.inner
            .delete(&key, &self.domain, self.scope)
            .map_err(to_napi_err)
    }

    /// Get a value through the application-level calls (current user, any host).
    #[napi(js_name = "getApp")]
    pub fn get_app(&self, env: Env, key: String) -> napi::Result<JsUnknown> {
        match self.inner.read_app(&key, &self.domain).map_err(to_napi_err)? {
            Some(v) => value_to_js(&env, v),
            None => Ok(env.get_null()?.into_unknown()),
        }
    }

    /// Store a value through the application-level calls (current user, any host).
    #[napi(js_name = "setApp")]
    pub fn set_app(&self, key: String, value: JsUnknown) -> napi::Result<()> {
        let v = js_to_value(value)?;
        self.inner
            .write_app(&key, &v, &self.domain)
            .map_err(to_napi_err)
    }
}
