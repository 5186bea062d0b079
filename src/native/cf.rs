//! Core Foundation object system.

use std::ffi::{c_void, CStr};
use std::ptr::{self, NonNull};

use core_foundation_sys::array::{
    kCFTypeArrayCallBacks, CFArrayCreate, CFArrayGetCount, CFArrayGetTypeID,
    CFArrayGetValueAtIndex, CFArrayRef,
};
use core_foundation_sys::base::{
    kCFAllocatorDefault, CFCopyTypeIDDescription, CFGetTypeID, CFIndex, CFRange, CFRelease,
    CFRetain, CFTypeRef,
};
use core_foundation_sys::data::{
    CFDataCreate, CFDataGetBytePtr, CFDataGetLength, CFDataGetTypeID, CFDataRef,
};
use core_foundation_sys::date::{CFDateCreate, CFDateGetAbsoluteTime, CFDateGetTypeID, CFDateRef};
use core_foundation_sys::dictionary::{
    kCFTypeDictionaryKeyCallBacks, kCFTypeDictionaryValueCallBacks, CFDictionaryCreate,
    CFDictionaryGetCount, CFDictionaryGetKeysAndValues, CFDictionaryGetTypeID, CFDictionaryRef,
};
use core_foundation_sys::number::{
    kCFBooleanFalse, kCFBooleanTrue, kCFNumberCFIndexType, kCFNumberCGFloatType,
    kCFNumberCharType, kCFNumberDoubleType, kCFNumberFloat32Type, kCFNumberFloat64Type,
    kCFNumberFloatType, kCFNumberIntType, kCFNumberLongLongType, kCFNumberLongType,
    kCFNumberNSIntegerType, kCFNumberSInt16Type, kCFNumberSInt32Type, kCFNumberSInt64Type,
    kCFNumberSInt8Type, kCFNumberShortType, CFBooleanGetTypeID, CFBooleanGetValue,
    CFBooleanRef, CFNumberCreate, CFNumberGetType, CFNumberGetTypeID, CFNumberGetValue,
    CFNumberRef,
};
use core_foundation_sys::string::{
    kCFStringEncodingUTF8, CFStringCreateWithCString, CFStringGetBytes, CFStringGetLength,
    CFStringGetTypeID, CFStringRef,
};

use super::{NativeType, NumberKind, ObjectSystem};

/// Non-null `CFTypeRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CfRef(NonNull<c_void>);

impl CfRef {
    pub fn from_ptr(ptr: CFTypeRef) -> Option<Self> {
        NonNull::new(ptr as *mut c_void).map(CfRef)
    }

    pub fn as_ptr(self) -> CFTypeRef {
        self.0.as_ptr() as CFTypeRef
    }
}

/// The process's Core Foundation runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreFoundation;

impl CoreFoundation {
    fn boolean_ref(value: bool) -> CFBooleanRef {
        // SAFETY: reading immutable statics exported by CoreFoundation.
        unsafe {
            if value {
                kCFBooleanTrue
            } else {
                kCFBooleanFalse
            }
        }
    }
}

impl ObjectSystem for CoreFoundation {
    type Raw = CfRef;

    fn retain(&self, raw: CfRef) {
        unsafe { CFRetain(raw.as_ptr()) };
    }

    fn release(&self, raw: CfRef) {
        unsafe { CFRelease(raw.as_ptr()) };
    }

    fn type_of(&self, raw: CfRef) -> NativeType {
        let type_id = unsafe { CFGetTypeID(raw.as_ptr()) };
        unsafe {
            if type_id == CFStringGetTypeID() {
                NativeType::String
            } else if type_id == CFDataGetTypeID() {
                NativeType::Data
            } else if type_id == CFBooleanGetTypeID() {
                NativeType::Boolean
            } else if type_id == CFNumberGetTypeID() {
                NativeType::Number
            } else if type_id == CFDateGetTypeID() {
                NativeType::Date
            } else if type_id == CFArrayGetTypeID() {
                NativeType::Array
            } else if type_id == CFDictionaryGetTypeID() {
                NativeType::Dictionary
            } else {
                let description = CfRef::from_ptr(CFCopyTypeIDDescription(type_id) as CFTypeRef);
                let name = description
                    .and_then(|d| {
                        let name = self.string_value(d);
                        self.release(d);
                        name
                    })
                    .unwrap_or_else(|| format!("CFTypeID {type_id}"));
                NativeType::Other(name)
            }
        }
    }

    fn boolean(&self, value: bool) -> CfRef {
        let ptr = Self::boolean_ref(value) as *mut c_void;
        // SAFETY: the boolean singletons are never null.
        CfRef(unsafe { NonNull::new_unchecked(ptr) })
    }

    fn create_string(&self, value: &CStr) -> Option<CfRef> {
        let s = unsafe {
            CFStringCreateWithCString(kCFAllocatorDefault, value.as_ptr(), kCFStringEncodingUTF8)
        };
        CfRef::from_ptr(s as CFTypeRef)
    }

    fn create_data(&self, bytes: &[u8]) -> Option<CfRef> {
        let data =
            unsafe { CFDataCreate(kCFAllocatorDefault, bytes.as_ptr(), bytes.len() as CFIndex) };
        CfRef::from_ptr(data as CFTypeRef)
    }

    fn create_integer(&self, value: i64) -> Option<CfRef> {
        let number = unsafe {
            CFNumberCreate(
                kCFAllocatorDefault,
                kCFNumberSInt64Type,
                &value as *const i64 as *const c_void,
            )
        };
        CfRef::from_ptr(number as CFTypeRef)
    }

    fn create_float(&self, value: f64) -> Option<CfRef> {
        let number = unsafe {
            CFNumberCreate(
                kCFAllocatorDefault,
                kCFNumberFloat64Type,
                &value as *const f64 as *const c_void,
            )
        };
        CfRef::from_ptr(number as CFTypeRef)
    }

    fn create_date(&self, absolute_time: f64) -> Option<CfRef> {
        let date = unsafe { CFDateCreate(kCFAllocatorDefault, absolute_time) };
        CfRef::from_ptr(date as CFTypeRef)
    }

    fn create_array(&self, items: &[CfRef]) -> Option<CfRef> {
        let values: Vec<*const c_void> = items.iter().map(|item| item.as_ptr()).collect();
        let array = unsafe {
            CFArrayCreate(
                kCFAllocatorDefault,
                values.as_ptr(),
                values.len() as CFIndex,
                &kCFTypeArrayCallBacks,
            )
        };
        CfRef::from_ptr(array as CFTypeRef)
    }

    fn create_dictionary(&self, keys: &[CfRef], values: &[CfRef]) -> Option<CfRef> {
        if keys.len() != values.len() {
            return None;
        }
        let keys: Vec<*const c_void> = keys.iter().map(|k| k.as_ptr()).collect();
        let values: Vec<*const c_void> = values.iter().map(|v| v.as_ptr()).collect();
        let dict = unsafe {
            CFDictionaryCreate(
                kCFAllocatorDefault,
                keys.as_ptr(),
                values.as_ptr(),
                keys.len() as CFIndex,
                &kCFTypeDictionaryKeyCallBacks,
                &kCFTypeDictionaryValueCallBacks,
            )
        };
        CfRef::from_ptr(dict as CFTypeRef)
    }

    fn string_value(&self, raw: CfRef) -> Option<String> {
        let s = raw.as_ptr() as CFStringRef;
        let length = unsafe { CFStringGetLength(s) };
        if length == 0 {
            return Some(String::new());
        }
        let range = CFRange {
            location: 0,
            length,
        };
        let mut used: CFIndex = 0;
        let converted = unsafe {
            CFStringGetBytes(
                s,
                range,
                kCFStringEncodingUTF8,
                0,
                0,
                ptr::null_mut(),
                0,
                &mut used,
            )
        };
        if converted != length {
            return None;
        }
        let mut buffer = vec![0u8; used as usize];
        unsafe {
            CFStringGetBytes(
                s,
                range,
                kCFStringEncodingUTF8,
                0,
                0,
                buffer.as_mut_ptr(),
                buffer.len() as CFIndex,
                &mut used,
            )
        };
        buffer.truncate(used as usize);
        String::from_utf8(buffer).ok()
    }

    fn data_bytes(&self, raw: CfRef) -> Vec<u8> {
        let data = raw.as_ptr() as CFDataRef;
        let len = unsafe { CFDataGetLength(data) } as usize;
        if len == 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(CFDataGetBytePtr(data), len) }.to_vec()
    }

    fn boolean_value(&self, raw: CfRef) -> bool {
        u8::from(unsafe { CFBooleanGetValue(raw.as_ptr() as CFBooleanRef) }) != 0
    }

    fn number_kind(&self, raw: CfRef) -> NumberKind {
        match unsafe { CFNumberGetType(raw.as_ptr() as CFNumberRef) } {
            kCFNumberSInt8Type | kCFNumberSInt16Type | kCFNumberSInt32Type
            | kCFNumberSInt64Type | kCFNumberCharType | kCFNumberShortType | kCFNumberIntType
            | kCFNumberLongType | kCFNumberLongLongType | kCFNumberCFIndexType
            | kCFNumberNSIntegerType => NumberKind::Integer,
            kCFNumberFloat32Type | kCFNumberFloat64Type | kCFNumberFloatType
            | kCFNumberDoubleType | kCFNumberCGFloatType => NumberKind::Float,
            other => NumberKind::Other(format!("CFNumberType {other}")),
        }
    }

    fn integer_value(&self, raw: CfRef) -> i64 {
        let mut value: i64 = 0;
        unsafe {
            CFNumberGetValue(
                raw.as_ptr() as CFNumberRef,
                kCFNumberSInt64Type,
                &mut value as *mut i64 as *mut c_void,
            )
        };
        value
    }

    fn float_value(&self, raw: CfRef) -> f64 {
        let mut value: f64 = 0.0;
        unsafe {
            CFNumberGetValue(
                raw.as_ptr() as CFNumberRef,
                kCFNumberFloat64Type,
                &mut value as *mut f64 as *mut c_void,
            )
        };
        value
    }

    fn date_value(&self, raw: CfRef) -> f64 {
        unsafe { CFDateGetAbsoluteTime(raw.as_ptr() as CFDateRef) }
    }

    fn array_items(&self, raw: CfRef) -> Vec<CfRef> {
        let array = raw.as_ptr() as CFArrayRef;
        let count = unsafe { CFArrayGetCount(array) };
        (0..count)
            .filter_map(|i| CfRef::from_ptr(unsafe { CFArrayGetValueAtIndex(array, i) }))
            .collect()
    }

    fn dictionary_entries(&self, raw: CfRef) -> Vec<(CfRef, CfRef)> {
        let dict = raw.as_ptr() as CFDictionaryRef;
        let count = unsafe { CFDictionaryGetCount(dict) } as usize;
        if count == 0 {
            return Vec::new();
        }
        let mut keys: Vec<*const c_void> = vec![ptr::null(); count];
        let mut values: Vec<*const c_void> = vec![ptr::null(); count];
        unsafe { CFDictionaryGetKeysAndValues(dict, keys.as_mut_ptr(), values.as_mut_ptr()) };
        keys.into_iter()
            .zip(values)
            .filter_map(|(k, v)| Some((CfRef::from_ptr(k)?, CfRef::from_ptr(v)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;
    use crate::native::Owned;

    #[test]
    fn booleans_are_singletons() {
        let cf = CoreFoundation;
        assert!(cf.is_boolean_singleton(cf.boolean(true)));
        assert!(cf.boolean_value(cf.boolean(true)));
        assert!(!cf.boolean_value(cf.boolean(false)));
    }

    #[test]
    fn numbers_report_their_family() {
        let cf = CoreFoundation;
        let int = Owned::adopt(&cf, cf.create_integer(-42).unwrap());
        let float = Owned::adopt(&cf, cf.create_float(2.5).unwrap());
        assert_eq!(cf.number_kind(int.as_raw()), NumberKind::Integer);
        assert_eq!(cf.integer_value(int.as_raw()), -42);
        assert_eq!(cf.number_kind(float.as_raw()), NumberKind::Float);
        assert_eq!(cf.float_value(float.as_raw()), 2.5);
    }

    #[test]
    fn strings_round_trip_utf8() {
        let cf = CoreFoundation;
        let text = CString::new("naïve ☕").unwrap();
        let s = Owned::adopt(&cf, cf.create_string(&text).unwrap());
        assert_eq!(cf.type_of(s.as_raw()), NativeType::String);
        assert_eq!(cf.string_value(s.as_raw()).as_deref(), Some("naïve ☕"));
    }

    #[test]
    fn empty_data_reads_back_empty() {
        let cf = CoreFoundation;
        let data = Owned::adopt(&cf, cf.create_data(&[]).unwrap());
        assert!(cf.data_bytes(data.as_raw()).is_empty());
    }
}
