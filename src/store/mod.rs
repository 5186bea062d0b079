//! Preference access: read, write and delete keys in a domain.

use crate::convert;
use crate::error::{Error, Result};
use crate::native::{ObjectSystem, Owned};
use crate::scope::Scope;
use crate::value::Value;

pub mod memory;
#[cfg(target_os = "macos")]
pub mod system;

/// The native preferences store.
///
/// Keys and domains are passed as native strings. Values handed to
/// [`set_value`](PreferenceStore::set_value) are retained by the store;
/// values returned by [`copy_value`](PreferenceStore::copy_value) belong to
/// the caller.
pub trait PreferenceStore {
    type Objects: ObjectSystem<Raw = Self::Raw>;
    /// Raw handle type of [`Objects`](PreferenceStore::Objects).
    type Raw: Copy + PartialEq + std::fmt::Debug;

    fn objects(&self) -> &Self::Objects;

    fn copy_value(
        &self,
        key: Self::Raw,
        domain: Self::Raw,
        scope: Scope,
    ) -> Option<Owned<'_, Self::Objects>>;

    /// Store `value` under `key`; `None` removes the key.
    fn set_value(&self, key: Self::Raw, value: Option<Self::Raw>, domain: Self::Raw, scope: Scope);

    /// Flush pending changes. `false` when the store rejected the flush.
    fn synchronize(&self, domain: Self::Raw, scope: Scope) -> bool;

    /// Whether the process may write the any-user scopes.
    fn is_privileged(&self) -> bool;

    fn copy_app_value(
        &self,
        key: Self::Raw,
        domain: Self::Raw,
    ) -> Option<Owned<'_, Self::Objects>> {
        self.copy_value(key, domain, Scope::CURRENT_USER_ANY_HOST)
    }

    fn set_app_value(&self, key: Self::Raw, value: Option<Self::Raw>, domain: Self::Raw) {
        self.set_value(key, value, domain, Scope::CURRENT_USER_ANY_HOST)
    }

    fn app_synchronize(&self, domain: Self::Raw) -> bool {
        self.synchronize(domain, Scope::CURRENT_USER_ANY_HOST)
    }
}

/// Typed access to a [`PreferenceStore`].
#[derive(Debug, Default)]
pub struct Preferences<S> {
    store: S,
}

impl<S: PreferenceStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write `value` under `key` and synchronize the domain.
    ///
    /// Writing [`Value::Null`] deletes the key.
    pub fn write(&self, key: &str, value: &Value, domain: &str, scope: Scope) -> Result<()> {
        tracing::debug!(%domain, %scope, key, value_type = value.type_name(), "writing preference");
        let objects = self.store.objects();
        let key_ref = encode_key(objects, key)?;
        let value_ref = convert::encode(objects, value)?;
        let domain_ref = encode_domain(objects, domain)?;

        self.store.set_value(
            key_ref.as_raw(),
            value_ref.as_ref().map(Owned::as_raw),
            domain_ref.as_raw(),
            scope,
        );
        if !self.store.synchronize(domain_ref.as_raw(), scope) {
            return Err(self.sync_error(domain, scope));
        }
        Ok(())
    }

    /// Read the value stored under `key`, or `None` if there is none.
    pub fn read(&self, key: &str, domain: &str, scope: Scope) -> Result<Option<Value>> {
        tracing::debug!(%domain, %scope, key, "reading preference");
        let objects = self.store.objects();
        let key_ref = encode_key(objects, key)?;
        let domain_ref = encode_domain(objects, domain)?;

        match self
            .store
            .copy_value(key_ref.as_raw(), domain_ref.as_raw(), scope)
        {
            Some(value) => convert::decode(objects, value.as_raw()).map(Some),
            None => Ok(None),
        }
    }

    /// Remove `key` from the domain.
    pub fn delete(&self, key: &str, domain: &str, scope: Scope) -> Result<()> {
        self.write(key, &Value::Null, domain, scope)
    }

    /// Write through the application-level calls (current user, any host).
    pub fn write_app(&self, key: &str, value: &Value, domain: &str) -> Result<()> {
        tracing::debug!(%domain, key, value_type = value.type_name(), "writing app preference");
        let objects = self.store.objects();
        let key_ref = encode_key(objects, key)?;
        let value_ref = convert::encode(objects, value)?;
        let domain_ref = encode_domain(objects, domain)?;

        self.store.set_app_value(
            key_ref.as_raw(),
            value_ref.as_ref().map(Owned::as_raw),
            domain_ref.as_raw(),
        );
        if !self.store.app_synchronize(domain_ref.as_raw()) {
            return Err(self.sync_error(domain, Scope::CURRENT_USER_ANY_HOST));
        }
        Ok(())
    }

    /// Read through the application-level calls (current user, any host).
    pub fn read_app(&self, key: &str, domain: &str) -> Result<Option<Value>> {
        tracing::debug!(%domain, key, "reading app preference");
        let objects = self.store.objects();
        let key_ref = encode_key(objects, key)?;
        let domain_ref = encode_domain(objects, domain)?;

        match self.store.copy_app_value(key_ref.as_raw(), domain_ref.as_raw()) {
            Some(value) => convert::decode(objects, value.as_raw()).map(Some),
            None => Ok(None),
        }
    }

    fn sync_error(&self, domain: &str, scope: Scope) -> Error {
        let domain = domain.to_string();
        if scope.is_privileged() && !self.store.is_privileged() {
            tracing::warn!(%domain, %scope, "synchronize rejected, process lacks privilege");
            Error::PermissionDenied { domain, scope }
        } else {
            tracing::warn!(%domain, %scope, "synchronize failed");
            Error::SyncError { domain, scope }
        }
    }
}

fn encode_key<'a, O: ObjectSystem>(objects: &'a O, key: &str) -> Result<Owned<'a, O>> {
    convert::encode_string(objects, key).map_err(|e| e.context("preference key"))
}

fn encode_domain<'a, O: ObjectSystem>(objects: &'a O, domain: &str) -> Result<Owned<'a, O>> {
    convert::encode_string(objects, domain).map_err(|e| e.context("preference domain"))
}
