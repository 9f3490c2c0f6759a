//! On-disk layout of an install root.

use std::path::{Path, PathBuf};

use super::PackageId;

pub const DESCRIPTOR_FILE: &str = "package.yml";
pub const INSTALL_SCRIPT: &str = "install.sh";
pub const UNINSTALL_SCRIPT: &str = "uninstall.sh";
pub const INSTALL_SQL: &str = "install.sql";
pub const UNINSTALL_SQL: &str = "uninstall.sql";
pub const FILES_DIR: &str = "files";
pub const PLUGINS_DIR: &str = "plugins";

/// Resolves every path the lifecycle engine touches.
///
/// ```text
/// <root>/
///   packages/<name>/                  base directory
///   packages/<name>/plugins/<plugin>/ plugin base directory
///   media/<name>/[plugins/<plugin>/]  media location
///   registry.json                     registry store
///   bootstrap.json                    generated bootstrap index
///   cache/                            symbol discovery cache
///   addonctl.yml                      settings
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn media_root(&self) -> PathBuf {
        self.root.join("media")
    }

    /// Returns: `<root>/packages/<name>` or `<root>/packages/<name>/plugins/<plugin>`
    pub fn base_dir(&self, id: &PackageId) -> PathBuf {
        let dir = self.packages_dir().join(&id.package);
        match &id.plugin {
            Some(plugin) => dir.join(PLUGINS_DIR).join(plugin),
            None => dir,
        }
    }

    /// Returns: `<root>/media/<name>` or `<root>/media/<name>/plugins/<plugin>`
    pub fn media_dir(&self, id: &PackageId) -> PathBuf {
        let dir = self.media_root().join(&id.package);
        match &id.plugin {
            Some(plugin) => dir.join(PLUGINS_DIR).join(plugin),
            None => dir,
        }
    }

    pub fn descriptor(&self, id: &PackageId) -> PathBuf {
        self.base_dir(id).join(DESCRIPTOR_FILE)
    }

    pub fn install_script(&self, id: &PackageId) -> PathBuf {
        self.base_dir(id).join(INSTALL_SCRIPT)
    }

    pub fn uninstall_script(&self, id: &PackageId) -> PathBuf {
        self.base_dir(id).join(UNINSTALL_SCRIPT)
    }

    pub fn install_sql(&self, id: &PackageId) -> PathBuf {
        self.base_dir(id).join(INSTALL_SQL)
    }

    pub fn uninstall_sql(&self, id: &PackageId) -> PathBuf {
        self.base_dir(id).join(UNINSTALL_SQL)
    }

    pub fn files_dir(&self, id: &PackageId) -> PathBuf {
        self.base_dir(id).join(FILES_DIR)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("bootstrap.json")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("addonctl.yml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }
}
