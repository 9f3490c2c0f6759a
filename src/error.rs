//! Outcome taxonomy for lifecycle operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::package::PackageId;

/// Result of a lifecycle operation: `Ok(())` or the first failure encountered.
pub type Outcome = std::result::Result<(), LifecycleError>;

/// Which bound of a version constraint was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Min,
    Max,
}

/// A requirement the current system state does not satisfy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("{}", host_message(.bound, .required, .found))]
    HostVersion {
        bound: Bound,
        required: String,
        found: String,
    },

    #[error("Missing required host extension \"{name}\"!")]
    MissingExtension { name: String },

    #[error("Missing required package \"{name}\"!")]
    MissingPackage { name: String },

    #[error("{}", package_message(.name, .bound, .required, .found))]
    PackageVersion {
        name: String,
        bound: Bound,
        required: String,
        found: String,
    },
}

fn host_message(bound: &Bound, required: &str, found: &str) -> String {
    match bound {
        Bound::Exact => format!("Package requires host \"{required}\", but \"{found}\" is installed!"),
        Bound::Min => format!(
            "Package requires at least host \"{required}\", but \"{found}\" is installed!"
        ),
        Bound::Max => format!(
            "Package requires at most host \"{required}\", but \"{found}\" is installed!"
        ),
    }
}

fn package_message(name: &str, bound: &Bound, required: &str, found: &str) -> String {
    match bound {
        Bound::Exact => format!(
            "Required package \"{name}\" not in required version \"{required}\" (found: \"{found}\")"
        ),
        Bound::Min => format!(
            "Required package \"{name}\" not in required version! Requires at least \"{required}\", but found: \"{found}\"!"
        ),
        Bound::Max => format!(
            "Required package \"{name}\" not in required version! Requires at most \"{required}\", but found: \"{found}\"!"
        ),
    }
}

/// Errors produced by lifecycle operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A declared requirement is unmet. Raised before any side effect.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// The package descriptor or its requirement block is malformed.
    #[error("Invalid configuration for package \"{package}\": {message}")]
    Configuration { package: PackageId, message: String },

    /// A lifecycle or data script failed or left the registry unconfirmed.
    #[error("{message}")]
    Script { package: PackageId, message: String },

    /// A file system step failed.
    #[error("{message} ({operation} {})", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        message: String,
    },

    /// Rebuilding the bootstrap index failed.
    #[error("Failed to regenerate the bootstrap index: {0}")]
    Regeneration(String),

    /// A delegated step exceeded the configured time limit.
    #[error("{step} did not finish within {seconds}s")]
    Timeout { step: String, seconds: u64 },

    /// Another installed package still requires the target.
    #[error("{message}")]
    DependencyBlocked {
        package: PackageId,
        dependent: PackageId,
        message: String,
    },

    /// Activation was requested for a package that is not installed.
    #[error("{message}")]
    NotInstalled { package: PackageId, message: String },

    /// The registry store could not be read or written.
    #[error("Registry access failed: {0:#}")]
    Registry(#[source] anyhow::Error),
}

impl LifecycleError {
    /// Whether this failure happened before anything was changed.
    pub fn is_validation(&self) -> bool {
        matches!(self, LifecycleError::Validation(_))
    }
}
