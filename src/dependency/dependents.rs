//! Reverse dependency lookup.

use anyhow::Result;
use log::warn;

use super::Requirements;
use crate::package::PackageId;
use crate::registry::{Registry, RegistryExt};

/// Find the first installed package or plugin whose requirements name `target`.
///
/// Packages are visited in registry order, each followed by its plugins; the
/// scan stops at the first hit. Requirement blocks of packages that are no
/// longer installed are ignored, as is a block that cannot be parsed.
pub fn find_dependent(registry: &dyn Registry, target: &PackageId) -> Result<Option<PackageId>> {
    let name = target.to_string();

    for package in registry.packages()? {
        let candidate = PackageId::package(package.as_str());
        if depends_on(registry, &candidate, target, &name)? {
            return Ok(Some(candidate));
        }

        for plugin in registry.plugins(&package)? {
            let candidate = PackageId::plugin(package.as_str(), plugin);
            if depends_on(registry, &candidate, target, &name)? {
                return Ok(Some(candidate));
            }
        }
    }

    Ok(None)
}

fn depends_on(
    registry: &dyn Registry,
    candidate: &PackageId,
    target: &PackageId,
    name: &str,
) -> Result<bool> {
    if candidate == target || !registry.is_installed(candidate)? {
        return Ok(false);
    }
    requires(registry, candidate, name)
}

fn requires(registry: &dyn Registry, candidate: &PackageId, name: &str) -> Result<bool> {
    let raw = registry.requires(candidate)?;
    match Requirements::from_value(&raw) {
        Ok(requirements) => Ok(requirements.names_package(name)),
        Err(e) => {
            warn!("Skipping unreadable requirements of {}: {}", candidate, e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::keys;
    use crate::registry::memory::MemoryRegistry;
    use serde_json::json;

    #[test]
    fn test_no_dependents() {
        let registry = MemoryRegistry::new();
        registry
            .set(&PackageId::package("bar"), keys::REQUIRES, json!({}))
            .unwrap();
        registry
            .set(&PackageId::package("baz"), keys::REQUIRES, json!({"package": {"qux": null}}))
            .unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("bar")).unwrap(),
            None
        );
    }

    #[test]
    fn test_package_dependent() {
        let registry = MemoryRegistry::new();
        registry.set_installed(&PackageId::package("bar"), true).unwrap();
        registry.set_installed(&PackageId::package("baz"), true).unwrap();
        registry
            .set(&PackageId::package("baz"), keys::REQUIRES, json!({"package": {"bar": null}}))
            .unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("bar")).unwrap(),
            Some(PackageId::package("baz"))
        );
    }

    #[test]
    fn test_plugin_dependent() {
        let registry = MemoryRegistry::new();
        let invoices = PackageId::plugin("shop", "invoices");
        registry.set_installed(&PackageId::package("bar"), true).unwrap();
        registry.set_installed(&invoices, true).unwrap();
        registry
            .set(
                &PackageId::plugin("shop", "invoices"),
                keys::REQUIRES,
                json!({"package": {"bar": {"min-version": "1.0"}}}),
            )
            .unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("bar")).unwrap(),
            None,
            "plugins are only visited for available packages"
        );

        registry.set_installed(&PackageId::package("shop"), true).unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("bar")).unwrap(),
            Some(PackageId::plugin("shop", "invoices"))
        );
    }

    #[test]
    fn test_first_hit_wins() {
        let registry = MemoryRegistry::new();
        for name in ["alpha", "beta"] {
            registry.set_installed(&PackageId::package(name), true).unwrap();
            registry
                .set(&PackageId::package(name), keys::REQUIRES, json!({"package": {"core": null}}))
                .unwrap();
        }
        assert_eq!(
            find_dependent(&registry, &PackageId::package("core")).unwrap(),
            Some(PackageId::package("alpha"))
        );
    }

    #[test]
    fn test_malformed_requirements_are_skipped() {
        let registry = MemoryRegistry::new();
        registry.set_installed(&PackageId::package("broken"), true).unwrap();
        registry
            .set(&PackageId::package("broken"), keys::REQUIRES, json!("core"))
            .unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("core")).unwrap(),
            None
        );
    }

    #[test]
    fn test_self_requirement_does_not_block() {
        let registry = MemoryRegistry::new();
        registry.set_installed(&PackageId::package("core"), true).unwrap();
        registry
            .set(&PackageId::package("core"), keys::REQUIRES, json!({"package": {"core": null}}))
            .unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("core")).unwrap(),
            None
        );
    }

    #[test]
    fn test_uninstalled_package_with_stale_requirements_does_not_block() {
        let registry = MemoryRegistry::new();
        let baz = PackageId::package("baz");
        registry.set_installed(&PackageId::package("bar"), true).unwrap();
        registry
            .set(&baz, keys::REQUIRES, json!({"package": {"bar": null}}))
            .unwrap();
        registry.set_installed(&baz, false).unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("bar")).unwrap(),
            None
        );

        let invoices = PackageId::plugin("shop", "invoices");
        registry.set_installed(&PackageId::package("shop"), true).unwrap();
        registry
            .set(&invoices, keys::REQUIRES, json!({"package": {"bar": null}}))
            .unwrap();
        assert_eq!(
            find_dependent(&registry, &PackageId::package("bar")).unwrap(),
            None
        );
    }
}
