//! Package identity.

use anyhow::{Result, anyhow};
use std::str::FromStr;

/// Identifies a package or a plugin (sub-unit) of a package.
///
/// Format: "package" or "package/plugin"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    pub package: String,
    pub plugin: Option<String>,
}

impl PackageId {
    pub fn package(name: impl Into<String>) -> Self {
        Self {
            package: name.into(),
            plugin: None,
        }
    }

    pub fn plugin(package: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            plugin: Some(plugin.into()),
        }
    }

    pub fn is_plugin(&self) -> bool {
        self.plugin.is_some()
    }

    /// The package this id belongs to (itself for top-level packages).
    pub fn parent(&self) -> PackageId {
        PackageId::package(self.package.clone())
    }

    /// Prefix for message catalog keys of this kind of unit.
    pub fn message_prefix(&self) -> &'static str {
        if self.is_plugin() { "plugin_" } else { "addon_" }
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.plugin {
            Some(plugin) => write!(f, "{}/{}", self.package, plugin),
            None => write!(f, "{}", self.package),
        }
    }
}

fn valid_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['\\', ':']) && !s.starts_with('.')
}

impl FromStr for PackageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [package] if valid_segment(package) => Ok(PackageId::package(*package)),
            [package, plugin] if valid_segment(package) && valid_segment(plugin) => {
                Ok(PackageId::plugin(*package, *plugin))
            }
            _ => Err(anyhow!(
                "Invalid package name '{}'. Expected 'package' or 'package/plugin'.",
                s
            )),
        }
    }
}
