//! Requirement block parsing.

use anyhow::{Result, bail};
use log::debug;
use serde_json::Value;

use crate::package::{VersionConstraint, kind_of};

pub const HOST: &str = "host";
pub const HOST_EXTENSION: &str = "host-extension";
pub const PACKAGE: &str = "package";

/// Parsed form of a package's `requires` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirements {
    /// Constraint on the host version.
    pub host: VersionConstraint,
    /// Host extensions that must be loaded.
    pub host_extensions: Vec<String>,
    /// Sibling packages that must be available, with optional version bounds.
    pub packages: Vec<(String, VersionConstraint)>,
}

type KindParser = fn(&mut Requirements, &Value) -> Result<()>;

/// One parser per requirement kind; kinds are independent of each other.
const KINDS: &[(&str, KindParser)] = &[
    (HOST, parse_host),
    (HOST_EXTENSION, parse_host_extensions),
    (PACKAGE, parse_packages),
];

impl Requirements {
    /// Parse a raw requirement block.
    ///
    /// Fails when the block, or any kind in it, has the wrong shape. Unknown
    /// kinds are ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => bail!("expecting requires to be a mapping, {} given", kind_of(other)),
        };

        let mut requirements = Self::default();
        for (kind, attr) in map {
            match KINDS.iter().find(|(name, _)| *name == kind.as_str()) {
                Some((_, parse)) => parse(&mut requirements, attr)?,
                None => debug!("Ignoring unknown requirement kind '{}'", kind),
            }
        }
        Ok(requirements)
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.host_extensions.is_empty() && self.packages.is_empty()
    }

    /// Whether this block requires the package named `name`.
    pub fn names_package(&self, name: &str) -> bool {
        self.packages.iter().any(|(dep, _)| dep == name)
    }
}

fn parse_host(requirements: &mut Requirements, attr: &Value) -> Result<()> {
    requirements.host = VersionConstraint::from_value(attr)
        .map_err(|e| anyhow::anyhow!("invalid '{}' requirement: {}", HOST, e))?;
    Ok(())
}

fn parse_host_extensions(requirements: &mut Requirements, attr: &Value) -> Result<()> {
    let Value::Array(items) = attr else {
        bail!(
            "expecting {} to be a list, {} given",
            HOST_EXTENSION,
            kind_of(attr)
        );
    };
    // Non-string entries carry no extension name and are skipped.
    requirements.host_extensions = items
        .iter()
        .filter_map(|item| item.as_str().map(String::from))
        .collect();
    Ok(())
}

fn parse_packages(requirements: &mut Requirements, attr: &Value) -> Result<()> {
    let Value::Object(deps) = attr else {
        bail!("expecting {} to be a mapping, {} given", PACKAGE, kind_of(attr));
    };
    requirements.packages = deps
        .iter()
        .map(|(name, constraint)| {
            VersionConstraint::from_value(constraint)
                .map(|c| (name.clone(), c))
                .map_err(|e| anyhow::anyhow!("invalid requirement on package '{}': {}", name, e))
        })
        .collect::<Result<_>>()?;
    Ok(())
}
