//! Bootstrap index: load order and include list of active packages.

use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::lifecycle::{IndexRegenerator, PackageOrdering};
use crate::package::{PackageId, PackageLayout, find_all_packages};
use crate::registry::{Registry, RegistryExt};
use crate::runtime::Runtime;

/// Persisted form of `bootstrap.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapDocument {
    /// Every available package and plugin, in load order.
    #[serde(default)]
    pub order: Vec<String>,
    /// Installed and active entries of `order`, in the same order.
    #[serde(default)]
    pub include: Vec<String>,
}

/// Keeps the registry in step with the packages directory and rewrites the
/// bootstrap index from it.
pub struct BootstrapIndex<'a, R: Runtime> {
    runtime: &'a R,
    layout: &'a PackageLayout,
    registry: &'a dyn Registry,
}

impl<'a, R: Runtime> BootstrapIndex<'a, R> {
    pub fn new(runtime: &'a R, layout: &'a PackageLayout, registry: &'a dyn Registry) -> Self {
        Self {
            runtime,
            layout,
            registry,
        }
    }

    /// Read the current index. Missing file means an empty index.
    pub fn read(&self) -> Result<BootstrapDocument> {
        let path = self.layout.index_path();
        if !self.runtime.exists(&path) {
            return Ok(BootstrapDocument::default());
        }
        let content = self.runtime.read_to_string(&path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse index {:?}", path))
    }

    /// Sync the registry with disk, let `reorder` adjust the load order, then
    /// write the index.
    fn rebuild(&self, reorder: impl FnOnce(&mut Vec<PackageId>) -> Result<()>) -> Result<()> {
        let on_disk: BTreeSet<PackageId> = find_all_packages(self.runtime, self.layout)?
            .into_iter()
            .collect();

        for id in self.registered()? {
            if !on_disk.contains(&id) {
                info!("{} is gone from disk, dropping it from the registry", id);
                self.registry.remove(&id)?;
            }
        }

        let registered: BTreeSet<PackageId> = self.registered()?.into_iter().collect();
        for id in on_disk.difference(&registered) {
            debug!("Registering {}", id);
            self.registry.set_installed(id, false)?;
            self.registry.set_active(id, false)?;
        }

        let mut order: Vec<PackageId> = Vec::with_capacity(on_disk.len());
        for name in self.read()?.order {
            match name.parse::<PackageId>() {
                Ok(id) if on_disk.contains(&id) && !order.contains(&id) => order.push(id),
                _ => debug!("Dropping {} from the load order", name),
            }
        }
        // New arrivals go last, in name order.
        for id in &on_disk {
            if !order.contains(id) {
                order.push(id.clone());
            }
        }

        reorder(&mut order)?;

        let mut include = Vec::new();
        for id in &order {
            if self.registry.is_installed(id)? && self.registry.is_active(id)? {
                include.push(id.to_string());
            }
        }

        let document = BootstrapDocument {
            order: order.iter().map(ToString::to_string).collect(),
            include,
        };
        self.write(&document)
    }

    fn registered(&self) -> Result<Vec<PackageId>> {
        let mut ids = Vec::new();
        for package in self.registry.packages()? {
            for plugin in self.registry.plugins(&package)? {
                ids.push(PackageId::plugin(package.as_str(), plugin));
            }
            ids.push(PackageId::package(package));
        }
        Ok(ids)
    }

    fn write(&self, document: &BootstrapDocument) -> Result<()> {
        let path = self.layout.index_path();
        if let Some(parent) = path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp_path = path.with_extension("json.tmp");
        self.runtime
            .write(&tmp_path, content.as_bytes())
            .with_context(|| format!("Failed to write index to {:?}", tmp_path))?;
        self.runtime.rename(&tmp_path, &path)?;
        debug!("Wrote {} include(s) to {:?}", document.include.len(), path);
        Ok(())
    }

    fn shift(&self, id: &PackageId, earlier: bool) -> Result<()> {
        self.rebuild(|order| {
            let Some(pos) = order.iter().position(|o| o == id) else {
                bail!("{} is not present under {:?}", id, self.layout.packages_dir());
            };
            if earlier && pos > 0 {
                order.swap(pos - 1, pos);
            } else if !earlier && pos + 1 < order.len() {
                order.swap(pos, pos + 1);
            }
            Ok(())
        })
    }
}

impl<R: Runtime> IndexRegenerator for BootstrapIndex<'_, R> {
    #[tracing::instrument(skip(self))]
    fn regenerate(&self) -> Result<()> {
        self.rebuild(|_| Ok(()))
    }
}

impl<R: Runtime> PackageOrdering for BootstrapIndex<'_, R> {
    #[tracing::instrument(skip(self))]
    fn move_up(&self, id: &PackageId) -> Result<()> {
        self.shift(id, true)
    }

    #[tracing::instrument(skip(self))]
    fn move_down(&self, id: &PackageId) -> Result<()> {
        self.shift(id, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::keys;
    use crate::registry::memory::MemoryRegistry;
    use crate::runtime::RealRuntime;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn make_packages(layout: &PackageLayout, names: &[&str]) {
        for name in names {
            let id: PackageId = name.parse().unwrap();
            fs::create_dir_all(layout.base_dir(&id)).unwrap();
        }
    }

    fn order(index: &BootstrapIndex<'_, RealRuntime>) -> Vec<String> {
        index.read().unwrap().order
    }

    #[test]
    fn test_regenerate_registers_new_packages() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["blog", "shop", "shop/invoices"]);
        let registry = MemoryRegistry::new();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);

        index.regenerate().unwrap();

        assert_eq!(order(&index), vec!["blog", "shop", "shop/invoices"]);
        assert!(index.read().unwrap().include.is_empty());
        assert!(registry.is_available("shop").unwrap());
        assert_eq!(registry.plugins("shop").unwrap(), vec!["invoices"]);
        assert!(!registry.is_installed(&PackageId::package("blog")).unwrap());
    }

    #[test]
    fn test_regenerate_includes_only_installed_active() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["a", "b", "c"]);
        let registry = MemoryRegistry::new();
        for (name, installed, active) in [("a", true, true), ("b", true, false), ("c", false, true)] {
            let id = PackageId::package(name);
            registry.set_installed(&id, installed).unwrap();
            registry.set_active(&id, active).unwrap();
        }
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);

        index.regenerate().unwrap();
        assert_eq!(index.read().unwrap().include, vec!["a"]);
    }

    #[test]
    fn test_regenerate_drops_missing_packages() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["keep"]);
        let registry = MemoryRegistry::new();
        registry
            .set(&PackageId::package("gone"), keys::VERSION, json!("1.0"))
            .unwrap();
        registry
            .set(&PackageId::plugin("gone", "extra"), keys::ACTIVE, json!(true))
            .unwrap();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);

        index.regenerate().unwrap();

        assert!(!registry.contains(&PackageId::package("gone")));
        assert!(!registry.contains(&PackageId::plugin("gone", "extra")));
        assert_eq!(order(&index), vec!["keep"]);
    }

    #[test]
    fn test_regenerate_is_idempotent_and_keeps_order() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["a", "b"]);
        let registry = MemoryRegistry::new();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);

        index.move_down(&PackageId::package("a")).unwrap();
        let first = fs::read_to_string(layout.index_path()).unwrap();
        index.regenerate().unwrap();
        let second = fs::read_to_string(layout.index_path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(order(&index), vec!["b", "a"]);
    }

    #[test]
    fn test_new_packages_are_appended() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["m", "z"]);
        let registry = MemoryRegistry::new();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);
        index.move_up(&PackageId::package("z")).unwrap();

        make_packages(&layout, &["a"]);
        index.regenerate().unwrap();

        assert_eq!(order(&index), vec!["z", "m", "a"]);
    }

    #[test]
    fn test_move_at_boundaries_is_noop() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["a", "b", "c"]);
        let registry = MemoryRegistry::new();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);

        index.move_up(&PackageId::package("a")).unwrap();
        assert_eq!(order(&index), vec!["a", "b", "c"]);
        index.move_down(&PackageId::package("c")).unwrap();
        assert_eq!(order(&index), vec!["a", "b", "c"]);

        index.move_up(&PackageId::package("c")).unwrap();
        assert_eq!(order(&index), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_move_unknown_package_fails() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        make_packages(&layout, &["a"]);
        let registry = MemoryRegistry::new();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);

        assert!(index.move_up(&PackageId::package("nope")).is_err());
    }

    #[test]
    fn test_read_without_index() {
        let dir = tempdir().unwrap();
        let layout = PackageLayout::new(dir.path());
        let registry = MemoryRegistry::new();
        let runtime = RealRuntime;
        let index = BootstrapIndex::new(&runtime, &layout, &registry);
        assert_eq!(index.read().unwrap(), BootstrapDocument::default());
    }
}
