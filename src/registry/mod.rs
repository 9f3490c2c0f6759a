//! Registry of per-package state.
//!
//! The registry is a property store keyed by [`PackageId`]. Every write is
//! immediately visible to subsequent reads; lifecycle scripts may write to it
//! while an operation is in flight, so callers must never cache values.

mod file;
#[cfg(test)]
pub mod memory;

use anyhow::Result;
use serde_json::Value;

use crate::package::PackageId;

pub use file::FileRegistry;

/// Property keys understood by the lifecycle engine.
pub mod keys {
    pub const INSTALLED: &str = "installed";
    pub const ACTIVE: &str = "active";
    pub const VERSION: &str = "version";
    pub const REQUIRES: &str = "requires";
    pub const INSTALL_MESSAGE: &str = "install-message";
    pub const AUTHOR: &str = "author";
    pub const DESCRIPTION: &str = "description";
}

#[cfg_attr(test, mockall::automock)]
pub trait Registry: Send + Sync {
    /// Read a property. `None` if the package or the key is unknown.
    fn get(&self, id: &PackageId, key: &str) -> Result<Option<Value>>;

    /// Write a property, creating the package entry if needed.
    fn set(&self, id: &PackageId, key: &str, value: Value) -> Result<()>;

    /// Drop every property of a package (its plugins are kept).
    fn remove(&self, id: &PackageId) -> Result<()>;

    /// Names of all available top-level packages, sorted.
    fn packages(&self) -> Result<Vec<String>>;

    /// Names of all available plugins of `package`, sorted.
    fn plugins(&self, package: &str) -> Result<Vec<String>>;
}

/// Typed accessors over the raw property store.
pub trait RegistryExt: Registry {
    fn get_or(&self, id: &PackageId, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(id, key)?.unwrap_or(default))
    }

    fn get_bool(&self, id: &PackageId, key: &str) -> Result<bool> {
        Ok(match self.get(id, key)? {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        })
    }

    fn get_string(&self, id: &PackageId, key: &str) -> Result<Option<String>> {
        Ok(match self.get(id, key)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    fn is_available(&self, name: &str) -> Result<bool> {
        Ok(self.packages()?.iter().any(|p| p == name))
    }

    fn is_installed(&self, id: &PackageId) -> Result<bool> {
        self.get_bool(id, keys::INSTALLED)
    }

    fn set_installed(&self, id: &PackageId, installed: bool) -> Result<()> {
        self.set(id, keys::INSTALLED, Value::Bool(installed))
    }

    fn is_active(&self, id: &PackageId) -> Result<bool> {
        self.get_bool(id, keys::ACTIVE)
    }

    fn set_active(&self, id: &PackageId, active: bool) -> Result<()> {
        self.set(id, keys::ACTIVE, Value::Bool(active))
    }

    fn version(&self, id: &PackageId) -> Result<Option<String>> {
        self.get_string(id, keys::VERSION)
    }

    /// Requirement block; an empty mapping when none is declared.
    fn requires(&self, id: &PackageId) -> Result<Value> {
        self.get_or(id, keys::REQUIRES, Value::Object(Default::default()))
    }

    fn install_message(&self, id: &PackageId) -> Result<String> {
        Ok(self.get_string(id, keys::INSTALL_MESSAGE)?.unwrap_or_default())
    }

    fn set_install_message(&self, id: &PackageId, message: &str) -> Result<()> {
        self.set(id, keys::INSTALL_MESSAGE, Value::String(message.to_string()))
    }
}

impl<T: Registry + ?Sized> RegistryExt for T {}
