//! Dependency checks.
//!
//! - `requirements` - parsing of the `requires` block
//! - `validator` - forward check of a package's requirements against the system
//! - `dependents` - reverse lookup of packages that still require a target

mod dependents;
mod requirements;
mod validator;

use std::collections::BTreeSet;

pub use dependents::find_dependent;
pub use requirements::Requirements;
pub use validator::DependencyValidator;

/// What the running host offers to packages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    pub version: String,
    pub extensions: BTreeSet<String>,
}

impl HostContext {
    pub fn new(version: impl Into<String>, extensions: impl IntoIterator<Item = String>) -> Self {
        Self {
            version: version.into(),
            extensions: extensions.into_iter().collect(),
        }
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }
}
