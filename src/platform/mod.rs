//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Durable key-value storage (LocalStorage on web)
//! - The document cookie string
//! - Forms, fields and their events (see [`crate::field`])

pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::error::Result;

/// Raw durable key-value store (`window.localStorage` on web)
pub trait KeyValueArea {
    fn get_item(&self, key: &str) -> Option<String>;

    /// Fails when the store refuses the write (quota exceeded)
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str);
}

/// Raw cookie access (`document.cookie` on web)
pub trait CookieJar {
    /// Every visible cookie as a single `a=1; b=2` header string
    fn cookie_string(&self) -> String;

    /// Apply one `Set-Cookie`-style declaration
    fn set_cookie(&self, declaration: &str);

    /// Current wall-clock time in milliseconds since the Unix epoch
    fn now_ms(&self) -> f64;
}

/// What the host offers for persistence
pub trait Environment {
    type Area: KeyValueArea + 'static;
    type Jar: CookieJar + 'static;

    /// `None` when durable storage is unsupported or blocked
    fn local_storage(&self) -> Option<Self::Area>;

    /// `None` when there is no document to hold cookies
    fn cookie_jar(&self) -> Option<Self::Jar>;
}
