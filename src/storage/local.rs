//! Durable key-value backend

use super::{BackendKind, StorageBackend};
use crate::error::Result;
use crate::key::StorageKey;
use crate::platform::KeyValueArea;

pub struct LocalBackend<A> {
    area: A,
}

impl<A: KeyValueArea> LocalBackend<A> {
    pub fn new(area: A) -> Self {
        Self { area }
    }
}

impl<A: KeyValueArea> StorageBackend for LocalBackend<A> {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalStorage
    }

    fn write(&self, key: &StorageKey, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) if !value.is_empty() => self.area.set_item(key.as_str(), value),
            _ => {
                self.area.remove_item(key.as_str());
                Ok(())
            }
        }
    }

    fn read(&self, key: &StorageKey) -> Option<String> {
        self.area.get_item(key.as_str())
    }
}
