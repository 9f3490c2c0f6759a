use anyhow::Result;

use super::{PackageId, PackageLayout, layout::PLUGINS_DIR};
use crate::runtime::Runtime;

/// Find every package and plugin present on disk.
///
/// Directory structure: `<root>/packages/<name>/[plugins/<plugin>/]`.
/// Hidden directories are skipped. Results are sorted.
#[tracing::instrument(skip(runtime, layout))]
pub fn find_all_packages<R: Runtime>(runtime: &R, layout: &PackageLayout) -> Result<Vec<PackageId>> {
    let mut found = Vec::new();
    let packages_dir = layout.packages_dir();

    if !runtime.exists(&packages_dir) {
        return Ok(found);
    }

    for package_path in runtime.read_dir(&packages_dir)? {
        let Some(name) = dir_name(runtime, &package_path) else {
            continue;
        };

        let plugins_dir = package_path.join(PLUGINS_DIR);
        let mut plugins = Vec::new();
        if runtime.is_dir(&plugins_dir) {
            for plugin_path in runtime.read_dir(&plugins_dir)? {
                if let Some(plugin) = dir_name(runtime, &plugin_path) {
                    plugins.push(PackageId::plugin(name.clone(), plugin));
                }
            }
        }

        found.push(PackageId::package(name));
        found.extend(plugins);
    }

    found.sort();
    Ok(found)
}

fn dir_name<R: Runtime>(runtime: &R, path: &std::path::Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') || !runtime.is_dir(path) {
        return None;
    }
    Some(name.to_string())
}
