use anyhow::Result;
use log::debug;

use crate::{
    package::PackageId,
    registry::{Registry, RegistryExt},
    runtime::Runtime,
};

use super::{config::Config, services::Services};

/// List every available package and plugin in bootstrap order.
#[tracing::instrument(skip(config))]
pub fn list<R: Runtime>(config: &Config<R>) -> Result<()> {
    let services = Services::new(config);
    let lines = render(&services.registry, &services.index().read()?.order)?;

    if lines.is_empty() {
        println!("No packages available.");
        return Ok(());
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// One line per package: `<id> <version> [<state>]`.
///
/// Packages in `order` come first; anything the index has not seen yet follows
/// in registry order.
fn render(registry: &dyn Registry, order: &[String]) -> Result<Vec<String>> {
    let mut ids: Vec<PackageId> = order.iter().filter_map(|s| s.parse().ok()).collect();
    for package in registry.packages()? {
        let id = PackageId::package(package.as_str());
        if !ids.contains(&id) {
            ids.push(id);
        }
        for plugin in registry.plugins(&package)? {
            let id = PackageId::plugin(package.as_str(), plugin);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    let available: Vec<String> = registry.packages()?;
    let mut lines = Vec::with_capacity(ids.len());
    for id in ids {
        if !available.contains(&id.package) {
            debug!("Skipping {} from a stale index", id);
            continue;
        }
        let version = registry
            .version(&id)?
            .unwrap_or_else(|| "(unknown)".to_string());
        let state = match (registry.is_installed(&id)?, registry.is_active(&id)?) {
            (true, true) => "installed, active",
            (true, false) => "installed",
            _ => "available",
        };
        lines.push(format!("{} {} [{}]", id, version, state));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::memory::MemoryRegistry;
    use crate::registry::keys;
    use serde_json::json;

    #[test]
    fn test_render_follows_index_order() {
        let registry = MemoryRegistry::new();
        let blog = PackageId::package("blog");
        let shop = PackageId::package("shop");
        registry.set(&blog, keys::VERSION, json!("1.2.0")).unwrap();
        registry.set_installed(&blog, true).unwrap();
        registry.set_active(&blog, true).unwrap();
        registry.set_installed(&shop, true).unwrap();
        registry
            .set_installed(&PackageId::plugin("shop", "invoices"), false)
            .unwrap();

        let lines = render(&registry, &["shop".to_string(), "blog".to_string()]).unwrap();

        assert_eq!(
            lines,
            vec![
                "shop (unknown) [installed]",
                "blog 1.2.0 [installed, active]",
                "shop/invoices (unknown) [available]",
            ]
        );
    }

    #[test]
    fn test_render_skips_stale_entries() {
        let registry = MemoryRegistry::new();
        let lines = render(&registry, &["gone".to_string()]).unwrap();
        assert!(lines.is_empty());
    }
}
