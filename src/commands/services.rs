//! Service factory for the lifecycle collaborators.
//!
//! The registry is owned here; the bootstrap index borrows it, so it is built
//! separately with [`Services::index`] and handed back to [`Services::engine`].

use std::path::PathBuf;

use log::debug;

use crate::{
    cache::DirSymbolCache,
    i18n::MessageCatalog,
    index::BootstrapIndex,
    lifecycle::{Collaborators, LifecycleEngine},
    registry::FileRegistry,
    runtime::Runtime,
    script::ShellScriptRunner,
};

use super::config::Config;

pub struct Services<'a, R: Runtime> {
    config: &'a Config<R>,
    pub registry: FileRegistry<'a, R>,
    pub scripts: ShellScriptRunner,
    pub cache: DirSymbolCache<'a, R>,
    pub translator: MessageCatalog,
}

impl<'a, R: Runtime> Services<'a, R> {
    pub fn new(config: &'a Config<R>) -> Self {
        let bin = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("addonctl"));
        debug!("Scripts call back through {:?}", bin);

        Self {
            config,
            registry: FileRegistry::new(&config.runtime, config.layout.registry_path()),
            scripts: ShellScriptRunner::new(
                config.settings.script_interpreter.clone(),
                config.settings.sql_command.clone(),
                bin,
            ),
            cache: DirSymbolCache::new(&config.runtime, config.layout.cache_dir()),
            translator: MessageCatalog::english(),
        }
    }

    pub fn index(&self) -> BootstrapIndex<'_, R> {
        BootstrapIndex::new(&self.config.runtime, &self.config.layout, &self.registry)
    }

    pub fn engine<'s>(&'s self, index: &'s BootstrapIndex<'s, R>) -> LifecycleEngine<'s, R> {
        let collab = Collaborators {
            registry: &self.registry,
            scripts: &self.scripts,
            index,
            ordering: index,
            cache: &self.cache,
            translator: &self.translator,
        };
        LifecycleEngine::new(
            &self.config.runtime,
            &self.config.layout,
            &self.config.host,
            collab,
            self.config.engine_options(),
        )
    }
}
