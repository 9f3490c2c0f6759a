//! Forward dependency validation.

use log::debug;

use super::{HostContext, Requirements};
use crate::error::{LifecycleError, ValidationFailure};
use crate::package::PackageId;
use crate::registry::{Registry, RegistryExt};

/// Checks a package's declared requirements against the host and the registry.
///
/// The first unmet requirement is reported; checks run in the order host
/// version, host extensions, required packages.
pub struct DependencyValidator<'a> {
    host: &'a HostContext,
    registry: &'a dyn Registry,
}

impl<'a> DependencyValidator<'a> {
    pub fn new(host: &'a HostContext, registry: &'a dyn Registry) -> Self {
        Self { host, registry }
    }

    /// Validate the requirements currently recorded for `id`.
    #[tracing::instrument(skip(self))]
    pub fn validate(&self, id: &PackageId) -> Result<(), LifecycleError> {
        let raw = self.registry.requires(id).map_err(LifecycleError::Registry)?;
        let requirements =
            Requirements::from_value(&raw).map_err(|e| LifecycleError::Configuration {
                package: id.clone(),
                message: e.to_string(),
            })?;
        self.check(&requirements)
    }

    /// Validate an already parsed requirement block.
    pub fn check(&self, requirements: &Requirements) -> Result<(), LifecycleError> {
        if let Some((bound, required)) = requirements.host.check(&self.host.version) {
            return Err(ValidationFailure::HostVersion {
                bound,
                required,
                found: self.host.version.clone(),
            }
            .into());
        }

        if let Some(missing) = requirements
            .host_extensions
            .iter()
            .find(|ext| !self.host.has_extension(ext))
        {
            return Err(ValidationFailure::MissingExtension {
                name: missing.clone(),
            }
            .into());
        }

        for (name, constraint) in &requirements.packages {
            if !self
                .registry
                .is_available(name)
                .map_err(LifecycleError::Registry)?
            {
                return Err(ValidationFailure::MissingPackage { name: name.clone() }.into());
            }
            if constraint.is_empty() {
                continue;
            }

            // Compared against the recorded version; the installed flag is not consulted.
            let found = self
                .registry
                .version(&PackageId::package(name.as_str()))
                .map_err(LifecycleError::Registry)?
                .unwrap_or_default();
            if let Some((bound, required)) = constraint.check(&found) {
                return Err(ValidationFailure::PackageVersion {
                    name: name.clone(),
                    bound,
                    required,
                    found,
                }
                .into());
            }
            debug!("Requirement on {} satisfied by {}", name, found);
        }

        Ok(())
    }
}
