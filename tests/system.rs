//! Round trips through the real `CFPreferences` store.
#![cfg(target_os = "macos")]

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use cfprefs::{Preferences, Scope, Value};

const TEST_APP_ID: &str = "com.github.cfprefs.test";

#[test]
fn set_then_get() {
    let prefs = Preferences::system();
    let scope = Scope::CURRENT_USER_CURRENT_HOST;
    let person: HashMap<String, Value> = [
        ("name", Value::from("John")),
        ("age", Value::from(30)),
        ("city", Value::from("New York")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let cases = [
        ("TestKey", Value::from("TestValue")),
        ("TestIntKey", Value::from(42)),
        ("TestFloatKey", Value::from(3.25)),
        (
            "TestSliceKey",
            Value::Array(vec!["apple".into(), "banana".into(), "cherry".into()]),
        ),
        ("TestMapKey", Value::Object(person)),
        (
            "TestDateKey",
            Value::Date(Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()),
        ),
        ("TestDataKey", Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef])),
        ("TestEmptyKey", Value::from("")),
    ];

    for (key, value) in cases {
        prefs.write(key, &value, TEST_APP_ID, scope).unwrap();
        assert_eq!(prefs.read(key, TEST_APP_ID, scope).unwrap(), Some(value), "{key}");
        prefs.delete(key, TEST_APP_ID, scope).unwrap();
    }
}

#[test]
fn set_app_then_get_app() {
    let prefs = Preferences::system();
    let value = Value::Array(vec!["foo".into(), "bar".into(), "baz".into()]);
    prefs.write_app("TestAppSliceKey", &value, TEST_APP_ID).unwrap();
    assert_eq!(
        prefs.read_app("TestAppSliceKey", TEST_APP_ID).unwrap(),
        Some(value)
    );
    prefs
        .write_app("TestAppSliceKey", &Value::Null, TEST_APP_ID)
        .unwrap();
    assert_eq!(prefs.read_app("TestAppSliceKey", TEST_APP_ID).unwrap(), None);
}

#[test]
fn get_app_matches_current_user_any_host() {
    let prefs = Preferences::system();
    let scope = Scope::CURRENT_USER_ANY_HOST;
    prefs
        .write("TestAppAgreeKey", &"TestAppAgreeValue".into(), TEST_APP_ID, scope)
        .unwrap();
    assert_eq!(
        prefs.read_app("TestAppAgreeKey", TEST_APP_ID).unwrap(),
        prefs.read("TestAppAgreeKey", TEST_APP_ID, scope).unwrap()
    );
    prefs.delete("TestAppAgreeKey", TEST_APP_ID, scope).unwrap();
    assert_eq!(prefs.read_app("TestAppAgreeKey", TEST_APP_ID).unwrap(), None);
}

#[test]
fn get_non_existent_value() {
    let prefs = Preferences::system();
    assert_eq!(
        prefs
            .read("NonExistentKey", TEST_APP_ID, Scope::CURRENT_USER_CURRENT_HOST)
            .unwrap(),
        None
    );
}

#[test]
fn set_delete_value() {
    let prefs = Preferences::system();
    let scope = Scope::CURRENT_USER_CURRENT_HOST;
    prefs
        .write("TestSetDeleteKey", &"TestSetDeleteValue".into(), TEST_APP_ID, scope)
        .unwrap();
    assert_eq!(
        prefs.read("TestSetDeleteKey", TEST_APP_ID, scope).unwrap(),
        Some("TestSetDeleteValue".into())
    );
    prefs.delete("TestSetDeleteKey", TEST_APP_ID, scope).unwrap();
    assert_eq!(prefs.read("TestSetDeleteKey", TEST_APP_ID, scope).unwrap(), None);
}
