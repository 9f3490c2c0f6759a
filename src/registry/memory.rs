//! In-memory registry used by unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;
use serde_json::{Map, Value};

use super::Registry;
use crate::package::PackageId;

#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<BTreeMap<PackageId, Map<String, Value>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any property is stored for `id`.
    pub fn contains(&self, id: &PackageId) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }
}

impl Registry for MemoryRegistry {
    fn get(&self, id: &PackageId, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(id).and_then(|props| props.get(key).cloned()))
    }

    fn set(&self, id: &PackageId, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(id.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, id: &PackageId) -> Result<()> {
        self.entries.lock().unwrap().remove(id);
        Ok(())
    }

    fn packages(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .keys()
            .filter(|id| !id.is_plugin())
            .map(|id| id.package.clone())
            .collect())
    }

    fn plugins(&self, package: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .keys()
            .filter(|id| id.package == package)
            .filter_map(|id| id.plugin.clone())
            .collect())
    }
}
