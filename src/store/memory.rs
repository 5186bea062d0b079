//! Process-local preferences store.

use std::cell::RefCell;
use std::collections::HashMap;

use super::PreferenceStore;
use crate::native::memory::{Handle, MemoryObjects};
use crate::native::{release, ObjectSystem, Owned};
use crate::scope::{Scope, User};

type Domain = HashMap<String, Handle>;

/// A [`PreferenceStore`] kept in memory for the life of the process.
///
/// Stored values are retained native objects in a [`MemoryObjects`] heap.
/// An unprivileged store ignores writes to the any-user scopes and rejects
/// their synchronization, the way the system store does for a process
/// without root.
#[derive(Debug)]
pub struct MemoryStore {
    objects: MemoryObjects,
    privileged: bool,
    domains: RefCell<HashMap<(String, Scope), Domain>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_privilege(true)
    }

    pub fn unprivileged() -> Self {
        Self::with_privilege(false)
    }

    fn with_privilege(privileged: bool) -> Self {
        Self {
            objects: MemoryObjects::new(),
            privileged,
            domains: RefCell::new(HashMap::new()),
        }
    }

    /// Number of keys stored in `domain` for `scope`.
    pub fn len(&self, domain: &str, scope: Scope) -> usize {
        self.domains
            .borrow()
            .get(&(domain.to_string(), scope))
            .map_or(0, HashMap::len)
    }

    fn name(&self, raw: Handle) -> String {
        self.objects.string_value(raw).unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for MemoryStore {
    type Objects = MemoryObjects;
    type Raw = Handle;

    fn objects(&self) -> &MemoryObjects {
        &self.objects
    }

    fn copy_value(&self, key: Handle, domain: Handle, scope: Scope) -> Option<Owned<'_, MemoryObjects>> {
        let domains = self.domains.borrow();
        let stored = *domains.get(&(self.name(domain), scope))?.get(&self.name(key))?;
        Some(Owned::retain(&self.objects, stored))
    }

    fn set_value(&self, key: Handle, value: Option<Handle>, domain: Handle, scope: Scope) {
        // Dropped here; the following synchronize reports the denial.
        if !self.privileged && scope.user == User::Any {
            return;
        }
        let key = self.name(key);
        let domain = (self.name(domain), scope);
        let displaced = {
            let mut domains = self.domains.borrow_mut();
            match value {
                Some(value) => {
                    if !self.objects.is_boolean_singleton(value) {
                        self.objects.retain(value);
                    }
                    domains.entry(domain).or_default().insert(key, value)
                }
                None => domains.get_mut(&domain).and_then(|d| d.remove(&key)),
            }
        };
        release(&self.objects, displaced);
    }

    fn synchronize(&self, _domain: Handle, scope: Scope) -> bool {
        self.privileged || scope.user == User::Current
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        let domains = std::mem::take(self.domains.get_mut());
        for stored in domains.into_values().flat_map(HashMap::into_values) {
            release(&self.objects, Some(stored));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Preferences;
    use crate::value::Value;

    const DOMAIN: &str = "com.example.memory";

    #[test]
    fn replaced_values_are_released() {
        let prefs = Preferences::new(MemoryStore::new());
        let scope = Scope::CURRENT_USER_CURRENT_HOST;
        prefs
            .write("k", &Value::Array(vec![Value::Int(1), Value::Int(2)]), DOMAIN, scope)
            .unwrap();
        assert_eq!(prefs.store().objects().live_objects(), 3);
        prefs.write("k", &Value::Bool(true), DOMAIN, scope).unwrap();
        assert_eq!(prefs.store().objects().live_objects(), 0);
        assert_eq!(prefs.read("k", DOMAIN, scope).unwrap(), Some(Value::Bool(true)));
    }

    #[test]
    fn scopes_are_separate() {
        let prefs = Preferences::new(MemoryStore::new());
        prefs
            .write("k", &"here".into(), DOMAIN, Scope::CURRENT_USER_CURRENT_HOST)
            .unwrap();
        assert_eq!(prefs.read("k", DOMAIN, Scope::CURRENT_USER_ANY_HOST).unwrap(), None);
        assert_eq!(prefs.store().len(DOMAIN, Scope::CURRENT_USER_CURRENT_HOST), 1);
    }

    #[test]
    fn read_returns_independent_reference() {
        let prefs = Preferences::new(MemoryStore::new());
        let scope = Scope::CURRENT_USER_ANY_HOST;
        prefs.write("k", &Value::Float(0.5), DOMAIN, scope).unwrap();
        for _ in 0..3 {
            assert_eq!(prefs.read("k", DOMAIN, scope).unwrap(), Some(Value::Float(0.5)));
        }
        assert_eq!(prefs.store().objects().live_objects(), 1);
    }
}
