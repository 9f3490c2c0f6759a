use anyhow::{Context, Result};
use log::debug;

use crate::{
    error::Outcome,
    lifecycle::IndexRegenerator,
    lock::RootLock,
    package::PackageId,
    runtime::Runtime,
};

pub mod config;
mod list;
mod paths;
mod registry;
mod services;

pub use list::list;
pub use registry::{registry_get, registry_set};

use config::Config;
use services::Services;

/// A state transition requested from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install { install_dump: bool },
    Uninstall,
    Activate,
    Deactivate,
    Delete,
    MoveUp,
    MoveDown,
}

impl Operation {
    fn done(&self) -> &'static str {
        match self {
            Operation::Install { .. } => "installed",
            Operation::Uninstall => "uninstalled",
            Operation::Activate => "activated",
            Operation::Deactivate => "deactivated",
            Operation::Delete => "deleted",
            Operation::MoveUp => "moved up",
            Operation::MoveDown => "moved down",
        }
    }
}

/// Run one lifecycle operation on `name` under the install root's lock.
#[tracing::instrument(skip(config))]
pub async fn run<R: Runtime>(config: &Config<R>, name: &str, operation: Operation) -> Result<()> {
    let id = name.parse::<PackageId>()?;
    let _lock = RootLock::acquire(&config.layout.lock_path())?;

    execute(config, &id, operation).await?;
    println!("{} {}.", id, operation.done());
    Ok(())
}

async fn execute<R: Runtime>(config: &Config<R>, id: &PackageId, operation: Operation) -> Outcome {
    let services = Services::new(config);
    let index = services.index();
    let engine = services.engine(&index);

    match operation {
        Operation::Install { install_dump } => engine.install(id, install_dump).await,
        Operation::Uninstall => engine.uninstall(id).await,
        Operation::Activate => engine.activate(id),
        Operation::Deactivate => engine.deactivate(id),
        Operation::Delete => engine.delete(id).await,
        Operation::MoveUp => engine.move_up(id),
        Operation::MoveDown => engine.move_down(id),
    }
}

/// Synchronise the registry with the packages directory and rewrite the index.
#[tracing::instrument(skip(config))]
pub fn sync<R: Runtime>(config: &Config<R>) -> Result<()> {
    let _lock = RootLock::acquire(&config.layout.lock_path())?;
    let services = Services::new(config);
    services
        .index()
        .regenerate()
        .with_context(|| format!("Failed to regenerate {:?}", config.layout.index_path()))?;
    debug!("Index regenerated");
    Ok(())
}
