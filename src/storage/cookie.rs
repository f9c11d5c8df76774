//! Cookie backend
//!
//! Used only when durable storage is missing. Each field becomes one cookie
//! named after its storage key, with a URI-encoded value.

use chrono::DateTime;

use super::uri::{decode_lossy, encode_component};
use super::{BackendKind, StorageBackend};
use crate::consts::{MAX_COOKIE_BYTES, MS_PER_DAY, PROBE_COOKIE_NAME, PROBE_COOKIE_VALUE};
use crate::error::{Result, VapeError};
use crate::key::StorageKey;
use crate::platform::CookieJar;
use crate::settings::Settings;

/// Attributes attached to every written cookie
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieOptions {
    /// `None` writes a session cookie
    pub expires_days: Option<f64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
}

impl CookieOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            expires_days: Some(settings.cookie_expires_days),
            path: settings.cookie_path.clone(),
            domain: settings.cookie_domain.clone(),
            secure: settings.cookie_secure,
        }
    }
}

/// Build a `document.cookie` declaration.
///
/// A missing or empty value produces a deletion: the cookie expires one day
/// before `now_ms` regardless of `options.expires_days`.
pub fn compose_cookie(name: &str, value: Option<&str>, options: &CookieOptions, now_ms: f64) -> String {
    let value = value.filter(|v| !v.is_empty());
    let expires_at = match value {
        Some(_) => options.expires_days.map(|days| now_ms + days * MS_PER_DAY),
        None => Some(now_ms - MS_PER_DAY),
    };

    let mut cookie = format!("{}={}", encode_component(name), encode_component(value.unwrap_or_default()));
    if let Some(date) = expires_at.and_then(format_expiry) {
        cookie.push_str("; expires=");
        cookie.push_str(&date);
    }
    if let Some(path) = &options.path {
        cookie.push_str("; path=");
        cookie.push_str(path);
    }
    if let Some(domain) = &options.domain {
        cookie.push_str("; domain=");
        cookie.push_str(domain);
    }
    if options.secure {
        cookie.push_str("; secure");
    }
    cookie
}

/// Format a timestamp the way `Date.prototype.toUTCString` does
pub fn format_expiry(ms: f64) -> Option<String> {
    if !ms.is_finite() {
        return None;
    }
    let date = DateTime::from_timestamp_millis(ms as i64)?;
    Some(date.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Value of the first cookie named `name` in a `document.cookie` string
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|entry| entry.split_once('='))
        .find(|(cookie_name, _)| decode_lossy(cookie_name) == name)
        .map(|(_, value)| decode_lossy(value))
}

pub struct CookieBackend<J> {
    jar: J,
    options: CookieOptions,
}

impl<J: CookieJar> CookieBackend<J> {
    pub fn new(jar: J, options: CookieOptions) -> Self {
        Self { jar, options }
    }

    /// Write a throwaway session cookie and check it can be read back
    pub fn probe(&self) -> bool {
        let session = CookieOptions::default();
        let now = self.jar.now_ms();
        self.jar
            .set_cookie(&compose_cookie(PROBE_COOKIE_NAME, Some(PROBE_COOKIE_VALUE), &session, now));

        let enabled = find_cookie(&self.jar.cookie_string(), PROBE_COOKIE_NAME).is_some();
        if enabled {
            self.jar.set_cookie(&compose_cookie(PROBE_COOKIE_NAME, None, &session, now));
        }
        enabled
    }
}

impl<J: CookieJar> StorageBackend for CookieBackend<J> {
    fn kind(&self) -> BackendKind {
        BackendKind::Cookies
    }

    fn write(&self, key: &StorageKey, value: Option<&str>) -> Result<()> {
        let declaration = compose_cookie(key.as_str(), value, &self.options, self.jar.now_ms());

        // name=value pair only, attributes do not count against the limit
        let pair_len = declaration.split(';').next().map_or(0, str::len);
        if pair_len > MAX_COOKIE_BYTES {
            return Err(VapeError::QuotaExceeded {
                key: key.to_string(),
                reason: format!("cookie of {pair_len} bytes exceeds {MAX_COOKIE_BYTES}"),
            });
        }

        self.jar.set_cookie(&declaration);
        Ok(())
    }

    fn read(&self, key: &StorageKey) -> Option<String> {
        find_cookie(&self.jar.cookie_string(), key.as_str())
    }
}
