//! Cross-process lock serialising mutating commands on one install root.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use log::debug;

/// Exclusive advisory lock on `<root>/.lock`, held until dropped.
#[derive(Debug)]
pub struct RootLock {
    _file: File,
}

impl RootLock {
    /// Block until the lock at `path` is acquired.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        debug!("Waiting for lock {:?}", path);
        // Released when `file` is dropped.
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {:?}", path))?;

        Ok(Self { _file: file })
    }
}
