//! Native object lifecycle.
//!
//! An [`ObjectSystem`] is a reference-counted object model with the
//! Core Foundation property-list types. Every handle obtained from a
//! create or copy call is wrapped in an [`Owned`] so it is released exactly
//! once, whichever way the surrounding code exits.

use std::ffi::CStr;
use std::fmt;
use std::mem;

#[cfg(target_os = "macos")]
pub mod cf;
pub mod memory;

/// Runtime type tag of a native object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    String,
    Data,
    Boolean,
    Number,
    Date,
    Array,
    Dictionary,
    /// Any type without a conversion rule, with its descriptive name.
    Other(String),
}

impl NativeType {
    pub fn name(&self) -> &str {
        match self {
            NativeType::String => "string",
            NativeType::Data => "data",
            NativeType::Boolean => "boolean",
            NativeType::Number => "number",
            NativeType::Date => "date",
            NativeType::Array => "array",
            NativeType::Dictionary => "dictionary",
            NativeType::Other(name) => name,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared storage type of a native number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberKind {
    /// One of the signed integer storage types.
    Integer,
    /// One of the floating-point storage types.
    Float,
    /// A storage type outside both families.
    Other(String),
}

/// A reference-counted native object model.
///
/// Raw handles passed to these methods must be live: either owned through an
/// [`Owned`] or borrowed from a live aggregate.
pub trait ObjectSystem {
    /// Non-null, unowned reference to a native object.
    type Raw: Copy + PartialEq + fmt::Debug;

    fn retain(&self, raw: Self::Raw);
    fn release(&self, raw: Self::Raw);
    fn type_of(&self, raw: Self::Raw) -> NativeType;

    /// One of the two process-wide boolean singletons.
    fn boolean(&self, value: bool) -> Self::Raw;

    /// Identity check against the boolean singletons.
    fn is_boolean_singleton(&self, raw: Self::Raw) -> bool {
        raw == self.boolean(true) || raw == self.boolean(false)
    }

    // Constructors follow the create rule: the caller owns one reference.
    // `None` means the native layer refused to build the object.
    fn create_string(&self, value: &CStr) -> Option<Self::Raw>;
    fn create_data(&self, bytes: &[u8]) -> Option<Self::Raw>;
    fn create_integer(&self, value: i64) -> Option<Self::Raw>;
    fn create_float(&self, value: f64) -> Option<Self::Raw>;
    /// `absolute_time` is seconds since 2001-01-01T00:00:00Z.
    fn create_date(&self, absolute_time: f64) -> Option<Self::Raw>;
    /// The array retains each item.
    fn create_array(&self, items: &[Self::Raw]) -> Option<Self::Raw>;
    /// The dictionary retains each key and value.
    fn create_dictionary(&self, keys: &[Self::Raw], values: &[Self::Raw]) -> Option<Self::Raw>;

    // Accessors follow the get rule: returned handles are borrowed from
    // the receiver and stay valid as long as it does.
    /// `None` when the characters cannot be extracted as UTF-8.
    fn string_value(&self, raw: Self::Raw) -> Option<String>;
    fn data_bytes(&self, raw: Self::Raw) -> Vec<u8>;
    fn boolean_value(&self, raw: Self::Raw) -> bool;
    fn number_kind(&self, raw: Self::Raw) -> NumberKind;
    fn integer_value(&self, raw: Self::Raw) -> i64;
    fn float_value(&self, raw: Self::Raw) -> f64;
    fn date_value(&self, raw: Self::Raw) -> f64;
    fn array_items(&self, raw: Self::Raw) -> Vec<Self::Raw>;
    fn dictionary_entries(&self, raw: Self::Raw) -> Vec<(Self::Raw, Self::Raw)>;
}

/// Release a reference unless there is nothing to release.
///
/// `None` and the boolean singletons are no-ops. Releasing a handle that was
/// already released is a caller bug.
pub fn release<S: ObjectSystem + ?Sized>(objects: &S, raw: Option<S::Raw>) {
    if let Some(raw) = raw.filter(|&raw| !objects.is_boolean_singleton(raw)) {
        objects.release(raw);
    }
}

/// A native reference released when dropped.
pub struct Owned<'a, S: ObjectSystem + ?Sized> {
    objects: &'a S,
    raw: S::Raw,
}

impl<'a, S: ObjectSystem + ?Sized> Owned<'a, S> {
    /// Take over a reference obtained from a create or copy call.
    pub fn adopt(objects: &'a S, raw: S::Raw) -> Self {
        Owned { objects, raw }
    }

    /// Take a new reference to a borrowed handle.
    pub fn retain(objects: &'a S, raw: S::Raw) -> Self {
        if !objects.is_boolean_singleton(raw) {
            objects.retain(raw);
        }
        Owned { objects, raw }
    }

    pub fn as_raw(&self) -> S::Raw {
        self.raw
    }

    pub fn objects(&self) -> &'a S {
        self.objects
    }

    /// Give up ownership without releasing; the caller takes over the reference.
    pub fn into_raw(self) -> S::Raw {
        let raw = self.raw;
        mem::forget(self);
        raw
    }
}

impl<S: ObjectSystem + ?Sized> Clone for Owned<'_, S> {
    fn clone(&self) -> Self {
        Owned::retain(self.objects, self.raw)
    }
}

impl<S: ObjectSystem + ?Sized> Drop for Owned<'_, S> {
    fn drop(&mut self) {
        release(self.objects, Some(self.raw));
    }
}

impl<S: ObjectSystem + ?Sized> fmt::Debug for Owned<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryObjects;
    use super::*;

    #[test]
    fn owned_releases_on_drop() {
        let objects = MemoryObjects::new();
        {
            let raw = objects.create_integer(7).unwrap();
            let _owned = Owned::adopt(&objects, raw);
            assert_eq!(objects.live_objects(), 1);
        }
        assert_eq!(objects.live_objects(), 0);
    }

    #[test]
    fn clone_takes_its_own_reference() {
        let objects = MemoryObjects::new();
        let first = Owned::adopt(&objects, objects.create_float(1.0).unwrap());
        let second = first.clone();
        drop(first);
        assert_eq!(objects.live_objects(), 1);
        assert_eq!(objects.float_value(second.as_raw()), 1.0);
        drop(second);
        assert_eq!(objects.live_objects(), 0);
    }

    #[test]
    fn release_ignores_null_and_booleans() {
        let objects = MemoryObjects::new();
        release(&objects, None);
        release(&objects, Some(objects.boolean(true)));
        release(&objects, Some(objects.boolean(false)));
        let yes = Owned::retain(&objects, objects.boolean(true));
        drop(yes);
        assert!(objects.boolean_value(objects.boolean(true)));
        assert_eq!(objects.live_objects(), 0);
    }

    #[test]
    fn into_raw_hands_over_the_reference() {
        let objects = MemoryObjects::new();
        let raw = Owned::adopt(&objects, objects.create_data(b"abc").unwrap()).into_raw();
        assert_eq!(objects.live_objects(), 1);
        release(&objects, Some(raw));
        assert_eq!(objects.live_objects(), 0);
    }
}
