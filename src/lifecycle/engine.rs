//! Lifecycle engine - ordered, rollback-aware package state transitions.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};

use super::{Collaborators, ScriptContext};
use crate::dependency::{DependencyValidator, HostContext, find_dependent};
use crate::error::{LifecycleError, Outcome};
use crate::package::{DescriptorLoader, PackageId, PackageLayout};
use crate::registry::RegistryExt;
use crate::runtime::Runtime;

/// Tunables for delegated steps.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Upper bound for a single script or SQL step.
    pub step_timeout: Duration,
    /// Permission bits applied to copied media files.
    pub media_mode: Option<u32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(300),
            media_mode: None,
        }
    }
}

/// Drives packages through install, uninstall, activation and deactivation.
///
/// Each operation returns the first failure it meets. Registry flags changed
/// by a failed operation are written back to their previous value, except
/// where noted on the operation.
pub struct LifecycleEngine<'a, R: Runtime> {
    runtime: &'a R,
    layout: &'a PackageLayout,
    host: &'a HostContext,
    collab: Collaborators<'a>,
    options: EngineOptions,
}

impl<'a, R: Runtime> LifecycleEngine<'a, R> {
    pub fn new(
        runtime: &'a R,
        layout: &'a PackageLayout,
        host: &'a HostContext,
        collab: Collaborators<'a>,
        options: EngineOptions,
    ) -> Self {
        Self {
            runtime,
            layout,
            host,
            collab,
            options,
        }
    }

    /// Install a package.
    ///
    /// Steps: writability check, descriptor load, requirement validation,
    /// install script (or direct flag write), install SQL (when `install_dump`),
    /// index regeneration, media copy.
    ///
    /// Any failure before the media copy resets `installed` to false. A
    /// failing media copy is reported but leaves the package installed.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, id: &PackageId, install_dump: bool) -> Outcome {
        info!("Installing {}", id);

        if let Err(e) = self.install_steps(id, install_dump).await {
            debug!("Install of {} failed, rolling back: {}", id, e);
            self.restore_installed(id, false);
            return Err(e);
        }

        self.copy_media(id)
    }

    async fn install_steps(&self, id: &PackageId, install_dump: bool) -> Outcome {
        let base_dir = self.layout.base_dir(id);
        if !self.runtime.is_writable(&base_dir) {
            return Err(LifecycleError::Io {
                operation: "write-check",
                path: base_dir.clone(),
                message: self.msg(id, "dir_not_writable", &[&base_dir.display().to_string()]),
            });
        }

        DescriptorLoader::new(self.runtime, self.layout)
            .load_into(self.collab.registry, id)
            .map_err(|e| LifecycleError::Configuration {
                package: id.clone(),
                message: format!("{:#}", e),
            })?;

        DependencyValidator::new(self.host, self.collab.registry).validate(id)?;

        let script = self.layout.install_script(id);
        if self.runtime.exists(&script) {
            self.run_script(id, &script, "no_install").await?;
            self.verify(id, true, "no_install")?;
        } else {
            debug!("{} has no install script", id);
            self.registry_write(|| self.collab.registry.set_installed(id, true))?;
        }

        let sql = self.layout.install_sql(id);
        if install_dump && self.runtime.exists(&sql) {
            self.apply_sql(id, &sql, "install_sql_error").await?;
        }

        self.regenerate()
    }

    fn copy_media(&self, id: &PackageId) -> Outcome {
        let files_dir = self.layout.files_dir(id);
        if !self.runtime.is_dir(&files_dir) {
            return Ok(());
        }

        let media_dir = self.layout.media_dir(id);
        match self
            .runtime
            .copy_dir(&files_dir, &media_dir, self.options.media_mode)
        {
            Ok(count) => {
                debug!("Copied {} media file(s) to {:?}", count, media_dir);
                Ok(())
            }
            Err(e) => {
                warn!("Copying media of {} failed: {:#}", id, e);
                Err(LifecycleError::Io {
                    operation: "copy",
                    path: media_dir,
                    message: self.msg(id, "install_cant_copy_files", &[]),
                })
            }
        }
    }

    /// Uninstall a package.
    ///
    /// Refuses while any available package or plugin still requires it. Then
    /// runs the uninstall script (or writes the flag directly), deactivates,
    /// applies the uninstall SQL, regenerates the index and removes the media
    /// directory. Any failure after the dependency check leaves the package
    /// marked installed.
    #[tracing::instrument(skip(self))]
    pub async fn uninstall(&self, id: &PackageId) -> Outcome {
        info!("Uninstalling {}", id);

        let dependent = find_dependent(self.collab.registry, id).map_err(LifecycleError::Registry)?;
        if let Some(dependent) = dependent {
            let message = match &dependent.plugin {
                Some(plugin) => self.msg(
                    id,
                    "required_by_plugin",
                    &[&id.to_string(), plugin, &dependent.package],
                ),
                None => self.msg(id, "required_by", &[&id.to_string(), &dependent.package]),
            };
            return Err(LifecycleError::DependencyBlocked {
                package: id.clone(),
                dependent,
                message,
            });
        }

        let result = self.uninstall_steps(id).await;
        if let Err(e) = &result {
            debug!("Uninstall of {} failed, rolling back: {}", id, e);
            self.restore_installed(id, true);
        }
        result
    }

    async fn uninstall_steps(&self, id: &PackageId) -> Outcome {
        let script = self.layout.uninstall_script(id);
        if self.runtime.exists(&script) {
            self.run_script(id, &script, "no_uninstall").await?;
            self.verify(id, false, "no_uninstall")?;
        } else {
            debug!("{} has no uninstall script", id);
            self.registry_write(|| self.collab.registry.set_installed(id, false))?;
        }

        self.deactivate(id)?;

        let sql = self.layout.uninstall_sql(id);
        if self.runtime.exists(&sql) {
            self.apply_sql(id, &sql, "uninstall_sql_error").await?;
        }

        self.regenerate()?;

        let media_dir = self.layout.media_dir(id);
        if self.runtime.is_dir(&media_dir)
            && let Err(e) = self.runtime.remove_dir_all(&media_dir)
        {
            warn!("Removing media of {} failed: {:#}", id, e);
            return Err(LifecycleError::Io {
                operation: "delete",
                path: media_dir,
                message: self.msg(id, "install_cant_delete_files", &[]),
            });
        }

        Ok(())
    }

    /// Activate an installed package.
    #[tracing::instrument(skip(self))]
    pub fn activate(&self, id: &PackageId) -> Outcome {
        info!("Activating {}", id);

        let installed = self
            .collab
            .registry
            .is_installed(id)
            .map_err(LifecycleError::Registry)?;

        if !installed {
            return Err(LifecycleError::NotInstalled {
                package: id.clone(),
                message: self.msg(id, "no_activation", &[&id.to_string()]),
            });
        }

        let result = self
            .registry_write(|| self.collab.registry.set_active(id, true))
            .and_then(|_| self.regenerate());
        if result.is_err() {
            self.restore_active(id, false);
        }
        result
    }

    /// Deactivate a package. Calling it on an inactive package is a no-op
    /// apart from regenerating the index.
    #[tracing::instrument(skip(self))]
    pub fn deactivate(&self, id: &PackageId) -> Outcome {
        info!("Deactivating {}", id);

        let result = self
            .registry_write(|| self.collab.registry.set_active(id, false))
            .and_then(|_| self.regenerate());

        match result {
            Ok(()) => {
                // Disabled packages must not be scanned for symbols on the next load.
                self.collab.cache.invalidate();
                Ok(())
            }
            Err(e) => {
                self.restore_active(id, true);
                Err(e)
            }
        }
    }

    /// Uninstall a package, then remove its base directory and regenerate.
    ///
    /// Nothing is rolled back: each step only runs if the previous one succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &PackageId) -> Outcome {
        self.uninstall(id).await?;

        let base_dir = self.layout.base_dir(id);
        info!("Deleting {:?}", base_dir);
        if self.runtime.exists(&base_dir) {
            self.runtime
                .remove_dir_all(&base_dir)
                .map_err(|e| LifecycleError::Io {
                    operation: "delete",
                    path: base_dir.clone(),
                    message: format!(
                        "{} {:#}",
                        self.msg(id, "delete_cant_delete_dir", &[]),
                        e
                    ),
                })?;
        }

        self.regenerate()
    }

    /// Move a package one slot earlier in the bootstrap order.
    pub fn move_up(&self, id: &PackageId) -> Outcome {
        self.collab
            .ordering
            .move_up(id)
            .map_err(|e| LifecycleError::Regeneration(format!("{:#}", e)))
    }

    /// Move a package one slot later in the bootstrap order.
    pub fn move_down(&self, id: &PackageId) -> Outcome {
        self.collab
            .ordering
            .move_down(id)
            .map_err(|e| LifecycleError::Regeneration(format!("{:#}", e)))
    }

    fn script_context(&self, id: &PackageId) -> ScriptContext {
        ScriptContext {
            package: id.clone(),
            root: self.layout.root().to_path_buf(),
            base_dir: self.layout.base_dir(id),
        }
    }

    async fn run_script(&self, id: &PackageId, script: &Path, failure_key: &str) -> Outcome {
        debug!("Running {:?} for {}", script, id);
        // A message left over from an earlier attempt would fail verification.
        self.registry_write(|| self.collab.registry.set_install_message(id, ""))?;

        let ctx = self.script_context(id);
        let step = script.display().to_string();
        self.bounded(step, self.collab.scripts.run_script(script, &ctx))
            .await?
            .map_err(|e| LifecycleError::Script {
                package: id.clone(),
                message: format!("{}\n{:#}", self.msg(id, failure_key, &[&id.to_string()]), e),
            })
    }

    async fn apply_sql(&self, id: &PackageId, sql: &Path, failure_key: &str) -> Outcome {
        debug!("Applying {:?} for {}", sql, id);
        let ctx = self.script_context(id);
        let step = sql.display().to_string();
        self.bounded(step, self.collab.scripts.apply_sql(sql, &ctx))
            .await?
            .map_err(|e| LifecycleError::Script {
                package: id.clone(),
                message: self.msg(id, failure_key, &[&format!("{:#}", e)]),
            })
    }

    /// Confirm that a script left `installed == expect_installed` and no message.
    fn verify(&self, id: &PackageId, expect_installed: bool, failure_key: &str) -> Outcome {
        let registry = self.collab.registry;
        let message = registry
            .install_message(id)
            .map_err(LifecycleError::Registry)?;
        let installed = registry.is_installed(id).map_err(LifecycleError::Registry)?;

        if installed == expect_installed && message.is_empty() {
            return Ok(());
        }

        let reason = if message.is_empty() {
            self.msg(id, "no_reason", &[])
        } else {
            message
        };
        Err(LifecycleError::Script {
            package: id.clone(),
            message: format!("{}\n{}", self.msg(id, failure_key, &[&id.to_string()]), reason),
        })
    }

    fn regenerate(&self) -> Outcome {
        self.collab
            .index
            .regenerate()
            .map_err(|e| LifecycleError::Regeneration(format!("{:#}", e)))
    }

    async fn bounded<T>(&self, step: String, fut: impl Future<Output = T>) -> Result<T, LifecycleError> {
        tokio::time::timeout(self.options.step_timeout, fut)
            .await
            .map_err(|_| LifecycleError::Timeout {
                step,
                seconds: self.options.step_timeout.as_secs(),
            })
    }

    fn registry_write(&self, write: impl FnOnce() -> anyhow::Result<()>) -> Outcome {
        write().map_err(LifecycleError::Registry)
    }

    fn restore_installed(&self, id: &PackageId, installed: bool) {
        if let Err(e) = self.collab.registry.set_installed(id, installed) {
            warn!("Failed to reset installed={} for {}: {:#}", installed, id, e);
        }
    }

    fn restore_active(&self, id: &PackageId, active: bool) {
        if let Err(e) = self.collab.registry.set_active(id, active) {
            warn!("Failed to reset active={} for {}: {:#}", active, id, e);
        }
    }

    fn msg(&self, id: &PackageId, key: &str, args: &[&str]) -> String {
        self.collab
            .translator
            .translate(&format!("{}{}", id.message_prefix(), key), args)
    }
}
