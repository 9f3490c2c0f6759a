//! Built-in message catalog.

use std::collections::HashMap;

use crate::lifecycle::Translator;

const ENGLISH: &[(&str, &str)] = &[
    ("addon_dir_not_writable", "Package directory \"{0}\" is not writable!"),
    ("addon_no_install", "Package \"{0}\" could not be installed!"),
    ("addon_no_uninstall", "Package \"{0}\" could not be uninstalled!"),
    ("addon_no_reason", "No reason given."),
    ("addon_no_activation", "Package \"{0}\" is not installed and cannot be activated!"),
    ("addon_install_sql_error", "Error while applying install.sql: {0}"),
    ("addon_uninstall_sql_error", "Error while applying uninstall.sql: {0}"),
    ("addon_install_cant_copy_files", "Could not copy package files to the media directory!"),
    ("addon_install_cant_delete_files", "Could not remove package files from the media directory!"),
    ("addon_required_by", "Package \"{0}\" is required by installed package \"{1}\"!"),
    (
        "addon_required_by_plugin",
        "Package \"{0}\" is required by plugin \"{1}\" of package \"{2}\"!",
    ),
    ("addon_delete_cant_delete_dir", "Could not delete the package directory!"),
    ("plugin_dir_not_writable", "Plugin directory \"{0}\" is not writable!"),
    ("plugin_no_install", "Plugin \"{0}\" could not be installed!"),
    ("plugin_no_uninstall", "Plugin \"{0}\" could not be uninstalled!"),
    ("plugin_no_reason", "No reason given."),
    ("plugin_no_activation", "Plugin \"{0}\" is not installed and cannot be activated!"),
    ("plugin_install_sql_error", "Error while applying install.sql: {0}"),
    ("plugin_uninstall_sql_error", "Error while applying uninstall.sql: {0}"),
    ("plugin_install_cant_copy_files", "Could not copy plugin files to the media directory!"),
    ("plugin_install_cant_delete_files", "Could not remove plugin files from the media directory!"),
    ("plugin_required_by", "Plugin \"{0}\" is required by installed package \"{1}\"!"),
    (
        "plugin_required_by_plugin",
        "Plugin \"{0}\" is required by plugin \"{1}\" of package \"{2}\"!",
    ),
    ("plugin_delete_cant_delete_dir", "Could not delete the plugin directory!"),
];

/// Key to template lookup with `{N}` positional placeholders.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn english() -> Self {
        Self::from_entries(ENGLISH.iter().copied())
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            messages: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, key: &str, args: &[&str]) -> String {
        let Some(template) = self.messages.get(key) else {
            return key.to_string();
        };
        substitute(template, args)
    }
}

/// Replace `{N}` with `args[N]` in one pass, so placeholders inside an
/// argument are left alone. Out-of-range placeholders stay as written.
fn substitute(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let arg = tail
            .find('}')
            .and_then(|close| Some((close, tail[..close].parse::<usize>().ok()?)))
            .and_then(|(close, i)| Some((close, *args.get(i)?)));

        match arg {
            Some((close, arg)) => {
                out.push_str(arg);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
