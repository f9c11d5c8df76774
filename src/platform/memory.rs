//! In-memory host
//!
//! Stands in for the browser in native builds: a quota-bounded key-value
//! area, a cookie jar that honours `expires`, and form/field doubles that
//! dispatch their handlers when the "user" types, submits or resets.
//! Handles are cheap `Rc` clones sharing the same state.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::DateTime;

use super::{CookieJar, Environment, KeyValueArea};
use crate::error::{Result, VapeError};
use crate::field::{FieldElement, FieldInfo, FormElement};

type Handlers = Rc<RefCell<Vec<Box<dyn FnMut()>>>>;

fn dispatch(handlers: &Handlers) {
    // Handlers registered while dispatching are kept but not run this time
    let mut running = std::mem::take(&mut *handlers.borrow_mut());
    for handler in running.iter_mut() {
        handler();
    }
    let mut slot = handlers.borrow_mut();
    running.append(&mut slot);
    *slot = running;
}

// === Storage ===

/// Key-value area with an optional quota on the total size of stored values
#[derive(Clone, Default)]
pub struct MemoryArea {
    items: Rc<RefCell<BTreeMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.borrow().keys().cloned().collect()
    }
}

impl KeyValueArea for MemoryArea {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.borrow_mut();
        if let Some(quota) = self.quota {
            let others: usize = items.iter().filter(|(k, _)| *k != key).map(|(_, v)| v.len()).sum();
            if others + value.len() > quota {
                return Err(VapeError::QuotaExceeded {
                    key: key.to_string(),
                    reason: format!("{} of {quota} bytes used", others),
                });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

struct JarState {
    /// name -> (raw value, expiry in ms)
    cookies: BTreeMap<String, (String, Option<f64>)>,
    now_ms: f64,
    enabled: bool,
    writes: usize,
}

/// Cookie jar that behaves like `document.cookie`
#[derive(Clone)]
pub struct MemoryJar {
    state: Rc<RefCell<JarState>>,
}

impl MemoryJar {
    pub fn new(now_ms: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(JarState {
                cookies: BTreeMap::new(),
                now_ms,
                enabled: true,
                writes: 0,
            })),
        }
    }

    /// A jar that silently drops every write, like a browser with cookies off
    pub fn disabled(now_ms: f64) -> Self {
        let jar = Self::new(now_ms);
        jar.state.borrow_mut().enabled = false;
        jar
    }

    /// Move the clock forward
    pub fn advance(&self, ms: f64) {
        self.state.borrow_mut().now_ms += ms;
    }

    /// Number of `set_cookie` calls so far
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }
}

impl CookieJar for MemoryJar {
    fn cookie_string(&self) -> String {
        let state = self.state.borrow();
        state
            .cookies
            .iter()
            .filter(|(_, (_, expires))| expires.is_none_or(|at| at > state.now_ms))
            .map(|(name, (value, _))| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, declaration: &str) {
        let mut state = self.state.borrow_mut();
        state.writes += 1;
        if !state.enabled {
            return;
        }

        let mut parts = declaration.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            log::warn!("Ignoring malformed cookie {declaration:?}");
            return;
        };

        let expires = parts
            .filter_map(|attr| attr.trim().split_once('='))
            .find(|(attr, _)| attr.eq_ignore_ascii_case("expires"))
            .and_then(|(_, date)| DateTime::parse_from_rfc2822(date.trim()).ok())
            .map(|date| date.timestamp_millis() as f64);

        let name = name.trim().to_string();
        if expires.is_some_and(|at| at <= state.now_ms) {
            state.cookies.remove(&name);
        } else {
            state.cookies.insert(name, (value.trim().to_string(), expires));
        }
    }

    fn now_ms(&self) -> f64 {
        self.state.borrow().now_ms
    }
}

/// Host with configurable storage support
pub struct MemoryEnvironment {
    area: Option<MemoryArea>,
    jar: MemoryJar,
}

impl MemoryEnvironment {
    /// 2024-01-01T00:00:00Z
    pub const EPOCH_MS: f64 = 1_704_067_200_000.0;

    /// localStorage and cookies both available
    pub fn new() -> Self {
        Self {
            area: Some(MemoryArea::new()),
            jar: MemoryJar::new(Self::EPOCH_MS),
        }
    }

    /// No localStorage, cookies enabled
    pub fn cookies_only() -> Self {
        Self {
            area: None,
            jar: MemoryJar::new(Self::EPOCH_MS),
        }
    }

    /// No localStorage, cookies disabled
    pub fn without_storage() -> Self {
        Self {
            area: None,
            jar: MemoryJar::disabled(Self::EPOCH_MS),
        }
    }

    pub fn with_area(area: MemoryArea) -> Self {
        Self {
            area: Some(area),
            jar: MemoryJar::new(Self::EPOCH_MS),
        }
    }

    pub fn area(&self) -> Option<&MemoryArea> {
        self.area.as_ref()
    }

    pub fn jar(&self) -> &MemoryJar {
        &self.jar
    }
}

impl Default for MemoryEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for MemoryEnvironment {
    type Area = MemoryArea;
    type Jar = MemoryJar;

    fn local_storage(&self) -> Option<MemoryArea> {
        self.area.clone()
    }

    fn cookie_jar(&self) -> Option<MemoryJar> {
        Some(self.jar.clone())
    }
}

// === Forms ===

struct FieldState {
    info: FieldInfo,
    value: RefCell<String>,
    on_change: Handlers,
}

#[derive(Clone)]
pub struct MemoryField {
    state: Rc<FieldState>,
}

impl MemoryField {
    pub fn new(info: FieldInfo) -> Self {
        Self::with_value(info, "")
    }

    /// Field pre-filled with an HTML default value
    pub fn with_value(info: FieldInfo, value: &str) -> Self {
        Self {
            state: Rc::new(FieldState {
                info,
                value: RefCell::new(value.to_string()),
                on_change: Rc::default(),
            }),
        }
    }

    /// Replace the content as a user would and fire change handlers
    pub fn type_text(&self, text: &str) {
        *self.state.value.borrow_mut() = text.to_string();
        dispatch(&self.state.on_change);
    }

    pub fn listener_count(&self) -> usize {
        self.state.on_change.borrow().len()
    }
}

impl FieldElement for MemoryField {
    fn info(&self) -> FieldInfo {
        self.state.info.clone()
    }

    fn value(&self) -> String {
        self.state.value.borrow().clone()
    }

    fn set_value(&self, value: &str) {
        *self.state.value.borrow_mut() = value.to_string();
    }

    fn on_change(&self, handler: Box<dyn FnMut()>) {
        self.state.on_change.borrow_mut().push(handler);
    }
}

pub struct MemoryForm {
    id: Option<String>,
    fields: Vec<MemoryField>,
    on_release: Handlers,
}

impl MemoryForm {
    pub fn new(id: Option<&str>, fields: Vec<MemoryField>) -> Self {
        Self {
            id: id.map(str::to_string),
            fields,
            on_release: Rc::default(),
        }
    }

    pub fn field(&self, index: usize) -> Option<&MemoryField> {
        self.fields.get(index)
    }

    pub fn submit(&self) {
        dispatch(&self.on_release);
    }

    pub fn reset(&self) {
        dispatch(&self.on_release);
    }

    pub fn listener_count(&self) -> usize {
        self.on_release.borrow().len()
    }
}

impl FormElement for MemoryForm {
    type Field = MemoryField;

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn candidate_fields(&self) -> Vec<MemoryField> {
        self.fields.clone()
    }

    fn on_release(&self, handler: Box<dyn FnMut()>) {
        self.on_release.borrow_mut().push(handler);
    }
}
