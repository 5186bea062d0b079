//! In-process object system with Core Foundation ownership semantics.
//!
//! Objects live in a slot table and are freed when their reference count
//! drops to zero. Slots are never reused, so touching a released handle
//! panics instead of aliasing a newer object.

use std::cell::RefCell;
use std::ffi::CStr;

use super::{NativeType, NumberKind, ObjectSystem};

/// Handle to an object in a [`MemoryObjects`] heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

const TRUE: Handle = Handle(0);
const FALSE: Handle = Handle(1);

#[derive(Debug)]
enum Object {
    Boolean(bool),
    String(String),
    Data(Vec<u8>),
    Integer(i64),
    Float(f64),
    Date(f64),
    Array(Vec<Handle>),
    Dictionary(Vec<(Handle, Handle)>),
    Foreign(String),
}

#[derive(Debug)]
struct Slot {
    object: Object,
    refs: usize,
}

/// Reference-counted object heap.
#[derive(Debug)]
pub struct MemoryObjects {
    slots: RefCell<Vec<Option<Slot>>>,
}

impl MemoryObjects {
    pub fn new() -> Self {
        let singleton = |value| {
            Some(Slot {
                object: Object::Boolean(value),
                refs: 1,
            })
        };
        Self {
            slots: RefCell::new(vec![singleton(true), singleton(false)]),
        }
    }

    /// Number of objects currently alive, not counting the boolean singletons.
    pub fn live_objects(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .skip(2)
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Create an object of a type the converter has no rule for.
    pub fn create_foreign(&self, type_name: &str) -> Handle {
        self.alloc(Object::Foreign(type_name.to_string()))
    }

    fn alloc(&self, object: Object) -> Handle {
        let mut slots = self.slots.borrow_mut();
        slots.push(Some(Slot { object, refs: 1 }));
        Handle(slots.len() - 1)
    }

    fn with<T>(&self, raw: Handle, f: impl FnOnce(&Object) -> T) -> T {
        let slots = self.slots.borrow();
        match slots.get(raw.0) {
            Some(Some(slot)) => f(&slot.object),
            _ => panic!("use of released object {raw:?}"),
        }
    }

    fn same_key(&self, a: Handle, b: Handle) -> bool {
        if a == b {
            return true;
        }
        match (self.string_value(a), self.string_value(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for MemoryObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSystem for MemoryObjects {
    type Raw = Handle;

    fn retain(&self, raw: Handle) {
        if self.is_boolean_singleton(raw) {
            return;
        }
        let mut slots = self.slots.borrow_mut();
        match slots.get_mut(raw.0) {
            Some(Some(slot)) => slot.refs += 1,
            _ => panic!("retain of released object {raw:?}"),
        }
    }

    fn release(&self, raw: Handle) {
        if self.is_boolean_singleton(raw) {
            return;
        }
        let children = {
            let mut slots = self.slots.borrow_mut();
            let Some(entry) = slots.get_mut(raw.0) else {
                panic!("release of unknown object {raw:?}");
            };
            let Some(slot) = entry.as_mut() else {
                panic!("over-release of object {raw:?}");
            };
            slot.refs -= 1;
            if slot.refs > 0 {
                return;
            }
            match entry.take().map(|slot| slot.object) {
                Some(Object::Array(items)) => items,
                Some(Object::Dictionary(entries)) => {
                    entries.into_iter().flat_map(|(k, v)| [k, v]).collect()
                }
                _ => Vec::new(),
            }
        };
        for child in children {
            super::release(self, Some(child));
        }
    }

    fn type_of(&self, raw: Handle) -> NativeType {
        self.with(raw, |object| match object {
            Object::Boolean(_) => NativeType::Boolean,
            Object::String(_) => NativeType::String,
            Object::Data(_) => NativeType::Data,
            Object::Integer(_) | Object::Float(_) => NativeType::Number,
            Object::Date(_) => NativeType::Date,
            Object::Array(_) => NativeType::Array,
            Object::Dictionary(_) => NativeType::Dictionary,
            Object::Foreign(name) => NativeType::Other(name.clone()),
        })
    }

    fn boolean(&self, value: bool) -> Handle {
        if value {
            TRUE
        } else {
            FALSE
        }
    }

    fn create_string(&self, value: &CStr) -> Option<Handle> {
        let value = value.to_str().ok()?;
        Some(self.alloc(Object::String(value.to_string())))
    }

    fn create_data(&self, bytes: &[u8]) -> Option<Handle> {
        Some(self.alloc(Object::Data(bytes.to_vec())))
    }

    fn create_integer(&self, value: i64) -> Option<Handle> {
        Some(self.alloc(Object::Integer(value)))
    }

    fn create_float(&self, value: f64) -> Option<Handle> {
        Some(self.alloc(Object::Float(value)))
    }

    fn create_date(&self, absolute_time: f64) -> Option<Handle> {
        Some(self.alloc(Object::Date(absolute_time)))
    }

    fn create_array(&self, items: &[Handle]) -> Option<Handle> {
        for &item in items {
            self.retain(item);
        }
        Some(self.alloc(Object::Array(items.to_vec())))
    }

    fn create_dictionary(&self, keys: &[Handle], values: &[Handle]) -> Option<Handle> {
        if keys.len() != values.len() {
            return None;
        }
        let mut entries: Vec<(Handle, Handle)> = Vec::with_capacity(keys.len());
        let mut displaced = Vec::new();
        for (&key, &value) in keys.iter().zip(values) {
            self.retain(key);
            self.retain(value);
            // Later duplicates win, as with a native dictionary built from
            // parallel key and value arrays.
            match entries.iter().position(|&(k, _)| self.same_key(k, key)) {
                Some(i) => displaced.push(std::mem::replace(&mut entries[i], (key, value))),
                None => entries.push((key, value)),
            }
        }
        for (key, value) in displaced {
            super::release(self, Some(key));
            super::release(self, Some(value));
        }
        Some(self.alloc(Object::Dictionary(entries)))
    }

    fn string_value(&self, raw: Handle) -> Option<String> {
        self.with(raw, |object| match object {
            Object::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn data_bytes(&self, raw: Handle) -> Vec<u8> {
        self.with(raw, |object| match object {
            Object::Data(bytes) => bytes.clone(),
            other => panic!("expected data, found {other:?}"),
        })
    }

    fn boolean_value(&self, raw: Handle) -> bool {
        self.with(raw, |object| match object {
            Object::Boolean(b) => *b,
            other => panic!("expected boolean, found {other:?}"),
        })
    }

    fn number_kind(&self, raw: Handle) -> NumberKind {
        self.with(raw, |object| match object {
            Object::Integer(_) => NumberKind::Integer,
            Object::Float(_) => NumberKind::Float,
            other => NumberKind::Other(format!("{other:?}")),
        })
    }

    fn integer_value(&self, raw: Handle) -> i64 {
        self.with(raw, |object| match object {
            Object::Integer(i) => *i,
            Object::Float(f) => *f as i64,
            other => panic!("expected number, found {other:?}"),
        })
    }

    fn float_value(&self, raw: Handle) -> f64 {
        self.with(raw, |object| match object {
            Object::Float(f) => *f,
            Object::Integer(i) => *i as f64,
            other => panic!("expected number, found {other:?}"),
        })
    }

    fn date_value(&self, raw: Handle) -> f64 {
        self.with(raw, |object| match object {
            Object::Date(at) => *at,
            other => panic!("expected date, found {other:?}"),
        })
    }

    fn array_items(&self, raw: Handle) -> Vec<Handle> {
        self.with(raw, |object| match object {
            Object::Array(items) => items.clone(),
            other => panic!("expected array, found {other:?}"),
        })
    }

    fn dictionary_entries(&self, raw: Handle) -> Vec<(Handle, Handle)> {
        self.with(raw, |object| match object {
            Object::Dictionary(entries) => entries.clone(),
            other => panic!("expected dictionary, found {other:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Owned;

    fn string(objects: &MemoryObjects, s: &str) -> Handle {
        let s = std::ffi::CString::new(s).unwrap();
        objects.create_string(&s).unwrap()
    }

    #[test]
    fn aggregates_keep_members_alive() {
        let objects = MemoryObjects::new();
        let item = objects.create_integer(1).unwrap();
        let array = objects.create_array(&[item, objects.boolean(true)]).unwrap();
        objects.release(item);
        assert_eq!(objects.live_objects(), 2);
        assert_eq!(objects.integer_value(objects.array_items(array)[0]), 1);
        objects.release(array);
        assert_eq!(objects.live_objects(), 0);
    }

    #[test]
    fn duplicate_keys_keep_the_last_value() {
        let objects = MemoryObjects::new();
        let keys = [string(&objects, "k"), string(&objects, "k")];
        let values = [
            objects.create_integer(1).unwrap(),
            objects.create_integer(2).unwrap(),
        ];
        let dict = Owned::adopt(&objects, objects.create_dictionary(&keys, &values).unwrap());
        for raw in keys.into_iter().chain(values) {
            objects.release(raw);
        }
        let entries = objects.dictionary_entries(dict.as_raw());
        assert_eq!(entries.len(), 1);
        assert_eq!(objects.integer_value(entries[0].1), 2);
        assert_eq!(objects.live_objects(), 3);
        drop(dict);
        assert_eq!(objects.live_objects(), 0);
    }

    #[test]
    fn mismatched_dictionary_arrays_are_refused() {
        let objects = MemoryObjects::new();
        let key = string(&objects, "k");
        assert_eq!(objects.create_dictionary(&[key], &[]), None);
        objects.release(key);
        assert_eq!(objects.live_objects(), 0);
    }

    #[test]
    #[should_panic(expected = "over-release")]
    fn over_release_is_detected() {
        let objects = MemoryObjects::new();
        let raw = objects.create_data(&[]).unwrap();
        objects.release(raw);
        objects.release(raw);
    }
}
