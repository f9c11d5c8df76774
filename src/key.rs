//! Storage key derivation

use std::fmt;

use crate::consts::{KEY_NAMESPACE, KEY_SEPARATOR};

/// Key under which one field's value is stored.
///
/// Layout is `vape~<form id>~<field id>~<field name>`. Missing parts are kept
/// as empty segments so the position of each part never shifts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn derive(form_id: &str, field_id: Option<&str>, field_name: Option<&str>) -> Self {
        let parts = [
            KEY_NAMESPACE,
            form_id,
            field_id.unwrap_or_default(),
            field_name.unwrap_or_default(),
        ];
        Self(parts.join(KEY_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
