//! Package descriptor (`package.yml`) loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{PackageId, PackageLayout, version_text};
use crate::registry::{Registry, keys};
use crate::runtime::Runtime;

/// Metadata a package declares about itself.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct PackageDescriptor {
    #[serde(default, deserialize_with = "version_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Raw requirement block; its shape is checked by the dependency validator.
    #[serde(default)]
    pub requires: Option<Value>,
}

/// YAML reads an unquoted `version: 1.10` as the float 1.1, so only strings
/// and integers are accepted.
fn version_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) => version_text(&value)
            .map_err(|e| serde::de::Error::custom(format!("version {}", e))),
        None => Ok(None),
    }
}

impl PackageDescriptor {
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }
}

/// Reads descriptors from package base directories and publishes them to the registry.
pub struct DescriptorLoader<'a, R: Runtime> {
    runtime: &'a R,
    layout: &'a PackageLayout,
}

impl<'a, R: Runtime> DescriptorLoader<'a, R> {
    pub fn new(runtime: &'a R, layout: &'a PackageLayout) -> Self {
        Self { runtime, layout }
    }

    /// Load the descriptor of `id`. `None` if the package ships none.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, id: &PackageId) -> Result<Option<PackageDescriptor>> {
        let path = self.layout.descriptor(id);
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        let content = self.runtime.read_to_string(&path)?;
        PackageDescriptor::parse(&content)
            .with_context(|| format!("Malformed descriptor {:?}", path))
            .map(Some)
    }

    /// Load the descriptor of `id` and copy its properties into the registry.
    pub fn load_into(&self, registry: &dyn Registry, id: &PackageId) -> Result<()> {
        let Some(descriptor) = self.load(id)? else {
            return Ok(());
        };

        if let Some(version) = descriptor.version {
            registry.set(id, keys::VERSION, Value::String(version))?;
        }
        registry.set(
            id,
            keys::REQUIRES,
            descriptor
                .requires
                .unwrap_or_else(|| Value::Object(Default::default())),
        )?;
        if let Some(author) = descriptor.author {
            registry.set(id, keys::AUTHOR, Value::String(author))?;
        }
        if let Some(description) = descriptor.description {
            registry.set(id, keys::DESCRIPTION, Value::String(description))?;
        }
        Ok(())
    }
}
