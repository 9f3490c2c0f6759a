//! Registry access for lifecycle scripts.
//!
//! These commands run while the calling lifecycle operation holds the root
//! lock, so they must not take it themselves.

use anyhow::Result;
use serde_json::Value;

use crate::{package::PackageId, registry::Registry, runtime::Runtime};

use super::{config::Config, services::Services};

/// Print a registry property as JSON (`null` when unset).
#[tracing::instrument(skip(config))]
pub fn registry_get<R: Runtime>(config: &Config<R>, name: &str, key: &str) -> Result<()> {
    let id = name.parse::<PackageId>()?;
    let services = Services::new(config);
    let value = services.registry.get(&id, key)?.unwrap_or(Value::Null);
    println!("{}", value);
    Ok(())
}

/// Store a registry property. `value` is parsed as JSON; anything that is not
/// valid JSON is stored as a plain string.
#[tracing::instrument(skip(config))]
pub fn registry_set<R: Runtime>(config: &Config<R>, name: &str, key: &str, value: &str) -> Result<()> {
    let id = name.parse::<PackageId>()?;
    let services = Services::new(config);
    services.registry.set(&id, key, parse_value(value))
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
