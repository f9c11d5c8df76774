//! Vape - form autosave for the browser
//!
//! Saves form fields to LocalStorage (or cookies when LocalStorage is missing)
//! as the user types, restores them after a crash or a closed tab, and clears
//! them once the form is submitted or reset.
//!
//! Core modules:
//! - `guard`: per-form lifecycle (restore, persist, release)
//! - `field`: form/field host traits and field enumeration
//! - `key`: storage key derivation
//! - `storage`: LocalStorage and cookie backends
//! - `settings`: options and ignore selectors
//! - `platform`: browser/in-memory hosts

pub mod error;
pub mod field;
pub mod guard;
pub mod key;
pub mod platform;
pub mod settings;
pub mod storage;

pub use error::VapeError;
pub use field::{FieldElement, FieldInfo, FieldTag, FormElement};
pub use guard::{FormGuard, ProtectedField, protect};
pub use key::StorageKey;
pub use settings::{IgnoreRule, Settings};
pub use storage::{BackendKind, StorageBackend};

/// Storage constants
pub mod consts {
    /// First segment of every storage key
    pub const KEY_NAMESPACE: &str = "vape";
    /// Joins key segments; not expected inside ids or names
    pub const KEY_SEPARATOR: &str = "~";

    /// Milliseconds in a day, for cookie expiry
    pub const MS_PER_DAY: f64 = 86_400_000.0;
    /// Largest name=value pair browsers reliably keep in one cookie
    pub const MAX_COOKIE_BYTES: usize = 4096;

    /// Disposable cookie used to check that cookies work
    pub const PROBE_COOKIE_NAME: &str = "vape_cookie_test";
    pub const PROBE_COOKIE_VALUE: &str = "vape";
}
