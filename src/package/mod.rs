//! Package model
//!
//! This module provides package identity, on-disk layout, descriptor
//! loading, discovery and version comparison.

mod descriptor;
mod discovery;
mod id;
pub mod layout;
mod version;

pub use descriptor::{DescriptorLoader, PackageDescriptor};
pub use discovery::find_all_packages;
pub use id::PackageId;
pub use layout::PackageLayout;
pub use version::{VersionConstraint, compare_versions};
pub(crate) use version::{kind_of, version_text};
