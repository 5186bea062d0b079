//! Lossless value conversion for the Core Foundation preferences store.
//!
//! [`Value`] is the dynamic value exchanged with callers. [`convert`] maps it
//! to and from native property-list objects, [`native`] manages the lifetime
//! of those objects, and [`Preferences`] reads and writes keys through a
//! [`PreferenceStore`].
//!
//! ```
//! use cfprefs::{MemoryStore, Preferences, Scope, Value};
//!
//! let prefs = Preferences::new(MemoryStore::new());
//! let scope = Scope::CURRENT_USER_ANY_HOST;
//! prefs.write("volume", &Value::Int(7), "com.example.player", scope)?;
//! assert_eq!(prefs.read("volume", "com.example.player", scope)?, Some(Value::Int(7)));
//!
//! prefs.delete("volume", "com.example.player", scope)?;
//! assert_eq!(prefs.read("volume", "com.example.player", scope)?, None);
//! # Ok::<(), cfprefs::Error>(())
//! ```

#![deny(clippy::all)]

pub mod config;
pub mod convert;
pub mod error;
pub mod native;
pub mod scope;
pub mod store;
pub mod value;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use scope::{Host, Scope, User};
pub use store::memory::MemoryStore;
#[cfg(target_os = "macos")]
pub use store::system::SystemStore;
pub use store::{PreferenceStore, Preferences};
pub use value::Value;
