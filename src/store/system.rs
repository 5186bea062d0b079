//! The system preferences store (`CFPreferences`).

use core_foundation_sys::base::CFTypeRef;
use core_foundation_sys::preferences::{
    kCFPreferencesAnyHost, kCFPreferencesAnyUser, kCFPreferencesCurrentHost,
    kCFPreferencesCurrentUser, CFPreferencesAppSynchronize,
    CFPreferencesCopyValue, CFPreferencesSetAppValue, CFPreferencesSetValue,
    CFPreferencesSynchronize,
};
use core_foundation_sys::string::CFStringRef;

use super::{PreferenceStore, Preferences};
use crate::native::cf::{CfRef, CoreFoundation};
use crate::native::Owned;
use crate::scope::{Host, Scope, User};

/// [`PreferenceStore`] backed by `CFPreferences`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStore {
    objects: CoreFoundation,
}

impl SystemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences<SystemStore> {
    /// Access the preferences of the running user and host.
    pub fn system() -> Self {
        Preferences::new(SystemStore::new())
    }
}

fn string(raw: CfRef) -> CFStringRef {
    raw.as_ptr() as CFStringRef
}

fn user_name(user: User) -> CFStringRef {
    unsafe {
        match user {
            User::Current => kCFPreferencesCurrentUser,
            User::Any => kCFPreferencesAnyUser,
        }
    }
}

fn host_name(host: Host) -> CFStringRef {
    unsafe {
        match host {
            Host::Current => kCFPreferencesCurrentHost,
            Host::Any => kCFPreferencesAnyHost,
        }
    }
}

fn value_ptr(value: Option<CfRef>) -> CFTypeRef {
    value.map_or(std::ptr::null(), CfRef::as_ptr)
}

impl PreferenceStore for SystemStore {
    type Objects = CoreFoundation;
    type Raw = CfRef;

    fn objects(&self) -> &CoreFoundation {
        &self.objects
    }

    fn copy_value(&self, key: CfRef, domain: CfRef, scope: Scope) -> Option<Owned<'_, CoreFoundation>> {
        let value = unsafe {
            CFPreferencesCopyValue(
                string(key),
                string(domain),
                user_name(scope.user),
                host_name(scope.host),
            )
        };
        CfRef::from_ptr(value).map(|raw| Owned::adopt(&self.objects, raw))
    }

    fn set_value(&self, key: CfRef, value: Option<CfRef>, domain: CfRef, scope: Scope) {
        unsafe {
            CFPreferencesSetValue(
                string(key),
                value_ptr(value),
                string(domain),
                user_name(scope.user),
                host_name(scope.host),
            )
        }
    }

    fn synchronize(&self, domain: CfRef, scope: Scope) -> bool {
        let ok = unsafe {
            CFPreferencesSynchronize(string(domain), user_name(scope.user), host_name(scope.host))
        };
        u8::from(ok) != 0
    }

    fn is_privileged(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn set_app_value(&self, key: CfRef, value: Option<CfRef>, domain: CfRef) {
        unsafe { CFPreferencesSetAppValue(string(key), value_ptr(value), string(domain)) }
    }

    fn app_synchronize(&self, domain: CfRef) -> bool {
        u8::from(unsafe { CFPreferencesAppSynchronize(string(domain)) }) != 0
    }
}
