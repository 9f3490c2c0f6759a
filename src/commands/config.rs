use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Deserializer};

use crate::{
    dependency::HostContext, lifecycle::EngineOptions, package::PackageLayout, runtime::Runtime,
};

use super::paths::default_install_root;

/// Contents of `<root>/addonctl.yml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host_version: Option<String>,
    pub host_extensions: Vec<String>,
    pub script_interpreter: String,
    pub sql_command: Option<String>,
    pub step_timeout_secs: u64,
    /// Octal permission bits for copied media files, e.g. `"0644"`.
    #[serde(deserialize_with = "deserialize_mode")]
    pub media_mode: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_version: None,
            host_extensions: Vec::new(),
            script_interpreter: "sh".to_string(),
            sql_command: None,
            step_timeout_secs: 300,
            media_mode: None,
        }
    }
}

/// Strings are read as octal; plain integers are taken as-is.
fn deserialize_mode<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Mode {
        Bits(u32),
        Octal(String),
    }

    match Option::<Mode>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Mode::Bits(bits)) => Ok(Some(bits)),
        Some(Mode::Octal(s)) => {
            let digits = s.trim().trim_start_matches("0o");
            u32::from_str_radix(digits, 8)
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid octal mode '{}'", s)))
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load<R: Runtime>(runtime: &R, path: &std::path::Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = runtime.read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse settings {:?}", path))
    }
}

/// Everything a command needs to know about its install root.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub layout: PackageLayout,
    pub settings: Settings,
    pub host: HostContext,
}

impl<R: Runtime> Config<R> {
    /// Resolve the install root and read its settings. CLI values win over the
    /// settings file; the host version falls back to this crate's version.
    pub fn new(runtime: R, install_root: Option<PathBuf>, host_version: Option<String>) -> Result<Self> {
        let root = match install_root {
            Some(path) => path,
            None => default_install_root(&runtime)?,
        };
        let layout = PackageLayout::new(root);
        let settings = Settings::load(&runtime, &layout.settings_path())?;

        let version = host_version
            .or_else(|| settings.host_version.clone())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let host = HostContext::new(version, settings.host_extensions.iter().cloned());
        debug!("Host context: {:?}", host);

        Ok(Self {
            runtime,
            layout,
            settings,
            host,
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            step_timeout: Duration::from_secs(self.settings.step_timeout_secs),
            media_mode: self.settings.media_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    fn runtime_with_settings(content: Option<&'static str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/srv/addonctl.yml");
        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(move |_| content.is_some());
        if let Some(content) = content {
            runtime
                .expect_read_to_string()
                .with(eq(path))
                .returning(move |_| Ok(content.to_string()));
        }
        runtime
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let runtime = runtime_with_settings(None);
        let config = Config::new(runtime, Some(PathBuf::from("/srv")), None).unwrap();

        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.host.version, env!("CARGO_PKG_VERSION"));
        assert!(config.host.extensions.is_empty());
        assert_eq!(config.engine_options().step_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_settings_file_is_read() {
        let runtime = runtime_with_settings(Some(
            "host_version: 5.4.1\nhost_extensions: [gd, intl]\nsql_command: sqlite3 app.db\nstep_timeout_secs: 20\nmedia_mode: \"0640\"\n",
        ));
        let config = Config::new(runtime, Some(PathBuf::from("/srv")), None).unwrap();

        assert_eq!(config.host.version, "5.4.1");
        assert!(config.host.has_extension("intl"));
        assert_eq!(config.settings.script_interpreter, "sh");
        assert_eq!(config.settings.sql_command.as_deref(), Some("sqlite3 app.db"));
        let options = config.engine_options();
        assert_eq!(options.step_timeout, Duration::from_secs(20));
        assert_eq!(options.media_mode, Some(0o640));
    }

    #[test]
    fn test_cli_host_version_wins() {
        let runtime = runtime_with_settings(Some("host_version: 5.4.1\n"));
        let config = Config::new(
            runtime,
            Some(PathBuf::from("/srv")),
            Some("6.0.0".to_string()),
        )
        .unwrap();
        assert_eq!(config.host.version, "6.0.0");
    }

    #[test]
    fn test_default_root_from_home() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime.expect_exists().returning(|_| false);

        let config = Config::new(runtime, None, None).unwrap();
        assert_eq!(config.layout.root(), std::path::Path::new("/home/user/.addonctl"));
    }

    #[test]
    fn test_invalid_settings() {
        let runtime = runtime_with_settings(Some("media_mode: \"rwx\"\n"));
        let err = Config::new(runtime, Some(PathBuf::from("/srv")), None)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("addonctl.yml"));
    }

    #[test]
    fn test_numeric_mode_taken_as_is() {
        let settings: Settings = serde_yaml_ng::from_str("media_mode: 420\n").unwrap();
        assert_eq!(settings.media_mode, Some(0o644));
    }
}
