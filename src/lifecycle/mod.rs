//! Package lifecycle: install, uninstall, activate, deactivate, delete.
//!
//! The [`LifecycleEngine`] only orchestrates. Every side effect goes through
//! a collaborator trait defined here so the engine can be driven by fakes in
//! tests and by the concrete implementations in `crate::script`,
//! `crate::index`, `crate::cache` and `crate::i18n` in production.

mod engine;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::package::PackageId;
use crate::registry::Registry;

pub use engine::{EngineOptions, LifecycleEngine};

/// What a lifecycle or data script is told about the package it runs for.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptContext {
    pub package: PackageId,
    pub root: PathBuf,
    pub base_dir: PathBuf,
}

/// Executes package-provided scripts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run an install/uninstall script. The script may write to the registry
    /// for its package; the engine reads the outcome back from there.
    async fn run_script(&self, path: &Path, ctx: &ScriptContext) -> Result<()>;

    /// Apply a SQL script. The error carries the executor's diagnostic.
    async fn apply_sql(&self, path: &Path, ctx: &ScriptContext) -> Result<()>;
}

/// Rebuilds the persisted bootstrap index from the registry.
///
/// Must be idempotent; the engine calls it after every state change.
#[cfg_attr(test, mockall::automock)]
pub trait IndexRegenerator: Send + Sync {
    fn regenerate(&self) -> Result<()>;
}

/// Position of a package in the bootstrap include order.
///
/// Moving the first package up, or the last one down, is a no-op. Both
/// operations regenerate the index before returning.
#[cfg_attr(test, mockall::automock)]
pub trait PackageOrdering: Send + Sync {
    fn move_up(&self, id: &PackageId) -> Result<()>;
    fn move_down(&self, id: &PackageId) -> Result<()>;
}

/// Class/definition discovery cache. Invalidation is best effort.
#[cfg_attr(test, mockall::automock)]
pub trait SymbolCache: Send + Sync {
    fn invalidate(&self);
}

/// Renders user-facing messages. Unknown keys render as the key itself.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, args: &[&str]) -> String;
}

/// The set of collaborators a [`LifecycleEngine`] drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub registry: &'a dyn Registry,
    pub scripts: &'a dyn ScriptRunner,
    pub index: &'a dyn IndexRegenerator,
    pub ordering: &'a dyn PackageOrdering,
    pub cache: &'a dyn SymbolCache,
    pub translator: &'a dyn Translator,
}
