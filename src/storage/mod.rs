//! Storage backends
//!
//! Two backends share one capability set:
//! - [`LocalBackend`]: durable key-value storage, bounded by a quota
//! - [`CookieBackend`]: cookies, bounded by size and count, with an expiry
//!
//! Exactly one is picked per `protect` call by [`select_backend`].

pub mod cookie;
pub mod local;
pub mod uri;

use std::rc::Rc;

pub use cookie::{CookieBackend, CookieOptions};
pub use local::LocalBackend;

use crate::error::Result;
use crate::key::StorageKey;
use crate::platform::Environment;
use crate::settings::Settings;

/// Which backend a form ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    LocalStorage,
    Cookies,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::LocalStorage => "localStorage",
            BackendKind::Cookies => "cookies",
        }
    }
}

pub trait StorageBackend {
    fn kind(&self) -> BackendKind;

    /// Store `value` under `key`. `None` or an empty value deletes the entry.
    fn write(&self, key: &StorageKey, value: Option<&str>) -> Result<()>;

    fn read(&self, key: &StorageKey) -> Option<String>;
}

/// Pick durable storage if present, otherwise cookies if allowed and working
pub fn select_backend<E: Environment>(env: &E, settings: &Settings) -> Option<Rc<dyn StorageBackend>> {
    if let Some(area) = env.local_storage() {
        log::debug!("Using localStorage");
        return Some(Rc::new(LocalBackend::new(area)));
    }

    if !settings.fallback_to_cookies {
        log::debug!("localStorage unavailable and cookie fallback disabled");
        return None;
    }

    let jar = env.cookie_jar()?;
    let backend = CookieBackend::new(jar, CookieOptions::from_settings(settings));
    if backend.probe() {
        log::debug!("localStorage unavailable, falling back to cookies");
        Some(Rc::new(backend))
    } else {
        log::debug!("Cookie probe failed, cookies are disabled");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::CookieJar;
    use crate::platform::memory::MemoryEnvironment;

    fn key() -> StorageKey {
        StorageKey::derive("f1", Some("name"), Some("name"))
    }

    #[test]
    fn test_prefers_local_storage() {
        let env = MemoryEnvironment::new();
        let backend = select_backend(&env, &Settings::default()).unwrap();
        assert_eq!(backend.kind(), BackendKind::LocalStorage);
    }

    #[test]
    fn test_falls_back_to_cookies() {
        let env = MemoryEnvironment::cookies_only();
        let backend = select_backend(&env, &Settings::default()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Cookies);
        // probe cookie is cleaned up
        assert_eq!(env.jar().cookie_string(), "");
    }

    #[test]
    fn test_no_fallback_when_disabled() {
        let env = MemoryEnvironment::cookies_only();
        let settings = Settings {
            fallback_to_cookies: false,
            ..Settings::default()
        };
        assert!(select_backend(&env, &settings).is_none());
        assert_eq!(env.jar().writes(), 0);
    }

    #[test]
    fn test_none_when_cookies_blocked() {
        let env = MemoryEnvironment::without_storage();
        assert!(select_backend(&env, &Settings::default()).is_none());
    }

    #[test]
    fn test_round_trip_on_both_backends() {
        for env in [MemoryEnvironment::new(), MemoryEnvironment::cookies_only()] {
            let backend = select_backend(&env, &Settings::default()).unwrap();
            backend.write(&key(), Some("Alice")).unwrap();
            assert_eq!(backend.read(&key()).as_deref(), Some("Alice"), "{}", backend.kind().as_str());

            backend.write(&key(), None).unwrap();
            assert_eq!(backend.read(&key()), None, "{}", backend.kind().as_str());
        }
    }
}
