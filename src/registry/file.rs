//! JSON file backed registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde_json::{Map, Value};

use super::Registry;
use crate::package::PackageId;
use crate::runtime::Runtime;

type Entries = BTreeMap<String, Map<String, Value>>;

/// Registry persisted as a single JSON document.
///
/// Structure: `{ "<package>[/<plugin>]": { "<key>": <value>, ... }, ... }`
///
/// Every write reads the current document, applies the change and replaces
/// the file, so concurrent readers (including lifecycle scripts calling back
/// through the CLI) always see the latest state.
pub struct FileRegistry<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> FileRegistry<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries> {
        if !self.runtime.exists(&self.path) {
            return Ok(Entries::new());
        }
        let content = self.runtime.read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry {:?}", self.path))
    }

    fn save(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        self.runtime
            .write(&tmp_path, content.as_bytes())
            .with_context(|| format!("Failed to write registry to {:?}", tmp_path))?;
        self.runtime
            .rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace registry {:?}", self.path))
    }
}

impl<R: Runtime> Registry for FileRegistry<'_, R> {
    fn get(&self, id: &PackageId, key: &str) -> Result<Option<Value>> {
        let entries = self.load()?;
        Ok(entries
            .get(&id.to_string())
            .and_then(|props| props.get(key).cloned()))
    }

    fn set(&self, id: &PackageId, key: &str, value: Value) -> Result<()> {
        debug!("Registry set {} {} = {}", id, key, value);
        let mut entries = self.load()?;
        entries
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.save(&entries)
    }

    fn remove(&self, id: &PackageId) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(&id.to_string()).is_some() {
            debug!("Registry entry {} removed", id);
            self.save(&entries)?;
        }
        Ok(())
    }

    fn packages(&self) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .into_keys()
            .filter(|k| !k.contains('/'))
            .collect())
    }

    fn plugins(&self, package: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", package);
        Ok(self
            .load()?
            .into_keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(String::from))
            .collect())
    }
}
