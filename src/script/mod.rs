//! Shell-backed execution of package scripts.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::lifecycle::{ScriptContext, ScriptRunner};

/// Environment variables exported to every script.
pub const ENV_ROOT: &str = "ADDONCTL_ROOT";
pub const ENV_PACKAGE: &str = "ADDONCTL_PACKAGE";
pub const ENV_BIN: &str = "ADDONCTL_BIN";

/// Runs lifecycle scripts with a shell interpreter and pipes SQL scripts
/// into a configured command.
///
/// Scripts run in the package's base directory. They report back through
/// `$ADDONCTL_BIN registry set "$ADDONCTL_PACKAGE" <key> <json>`.
#[derive(Debug, Clone)]
pub struct ShellScriptRunner {
    interpreter: String,
    sql_command: Option<String>,
    bin: PathBuf,
}

impl ShellScriptRunner {
    pub fn new(interpreter: impl Into<String>, sql_command: Option<String>, bin: PathBuf) -> Self {
        Self {
            interpreter: interpreter.into(),
            sql_command,
            bin,
        }
    }

    fn command(&self, ctx: &ScriptContext) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.current_dir(&ctx.base_dir)
            .env(ENV_ROOT, &ctx.root)
            .env(ENV_PACKAGE, ctx.package.to_string())
            .env(ENV_BIN, &self.bin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed out step drops the future; take the child down with it.
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ScriptRunner for ShellScriptRunner {
    #[tracing::instrument(skip(self, ctx))]
    async fn run_script(&self, path: &Path, ctx: &ScriptContext) -> Result<()> {
        debug!("{} {:?}", self.interpreter, path);
        let output = self
            .command(ctx)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to start {} for {:?}", self.interpreter, path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{:?} exited with {}: {}", path, output.status, stderr.trim());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn apply_sql(&self, path: &Path, ctx: &ScriptContext) -> Result<()> {
        let Some(sql_command) = &self.sql_command else {
            bail!("no SQL executor configured");
        };

        let sql = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;

        debug!("Piping {:?} into `{}`", path, sql_command);
        let mut child = self
            .command(ctx)
            .arg("-c")
            .arg(sql_command)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start `{}`", sql_command))?;

        // Output is drained while stdin is written; an executor that echoes
        // its input would otherwise fill the pipe and stall.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&sql).await {
                    // The executor stopped reading; its exit status tells why.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<_, io::Error>(())
        };

        let ((), output) = tokio::try_join!(feed, child.wait_with_output())
            .with_context(|| format!("Failed to pipe {:?} into `{}`", path, sql_command))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{}` exited with {}: {}", sql_command, output.status, stderr.trim());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::package::PackageId;
    use std::fs;
    use tempfile::tempdir;

    fn context(root: &Path, id: &str) -> ScriptContext {
        let package: PackageId = id.parse().unwrap();
        let base_dir = root.join("packages").join(&package.package);
        fs::create_dir_all(&base_dir).unwrap();
        ScriptContext {
            package,
            root: root.to_path_buf(),
            base_dir,
        }
    }

    #[tokio::test]
    async fn test_run_script_exports_environment() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let script = ctx.base_dir.join("install.sh");
        fs::write(
            &script,
            "echo \"$ADDONCTL_PACKAGE|$ADDONCTL_ROOT|$ADDONCTL_BIN\" > env.txt\n",
        )
        .unwrap();

        let runner = ShellScriptRunner::new("sh", None, PathBuf::from("/usr/bin/addonctl"));
        runner.run_script(&script, &ctx).await.unwrap();

        let written = fs::read_to_string(ctx.base_dir.join("env.txt")).unwrap();
        assert_eq!(
            written.trim(),
            format!("foo|{}|/usr/bin/addonctl", dir.path().display())
        );
    }

    #[tokio::test]
    async fn test_run_script_failure_carries_stderr() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let script = ctx.base_dir.join("install.sh");
        fs::write(&script, "echo 'database unreachable' >&2\nexit 3\n").unwrap();

        let runner = ShellScriptRunner::new("sh", None, PathBuf::from("addonctl"));
        let err = runner.run_script(&script, &ctx).await.unwrap_err();
        assert!(err.to_string().contains("database unreachable"), "{}", err);
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let script = ctx.base_dir.join("install.sh");
        fs::write(&script, "true\n").unwrap();

        let runner = ShellScriptRunner::new("no-such-shell-xyz", None, PathBuf::from("addonctl"));
        assert!(runner.run_script(&script, &ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_sql_pipes_file() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let sql = ctx.base_dir.join("install.sql");
        fs::write(&sql, "CREATE TABLE foo (id INTEGER);\n").unwrap();

        let runner = ShellScriptRunner::new(
            "sh",
            Some("cat > applied.sql".to_string()),
            PathBuf::from("addonctl"),
        );
        runner.apply_sql(&sql, &ctx).await.unwrap();

        let applied = fs::read_to_string(ctx.base_dir.join("applied.sql")).unwrap();
        assert_eq!(applied, "CREATE TABLE foo (id INTEGER);\n");
    }

    #[tokio::test]
    async fn test_apply_sql_with_echoing_executor() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let sql = ctx.base_dir.join("install.sql");
        let statement = "INSERT INTO foo VALUES (1);\n";
        fs::write(&sql, statement.repeat(1 << 16)).unwrap();

        let runner = ShellScriptRunner::new("sh", Some("cat".to_string()), PathBuf::from("addonctl"));
        tokio::time::timeout(std::time::Duration::from_secs(30), runner.apply_sql(&sql, &ctx))
            .await
            .expect("executor output must be drained while input is written")
            .unwrap();
    }

    #[tokio::test]
    async fn test_apply_sql_executor_exits_early() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let sql = ctx.base_dir.join("install.sql");
        fs::write(&sql, "SELECT 1;\n".repeat(1 << 17)).unwrap();

        let runner = ShellScriptRunner::new(
            "sh",
            Some("echo 'database locked' >&2; exit 2".to_string()),
            PathBuf::from("addonctl"),
        );
        let err = runner.apply_sql(&sql, &ctx).await.unwrap_err();
        assert!(err.to_string().contains("database locked"), "{}", err);
    }

    #[tokio::test]
    async fn test_apply_sql_failure() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let sql = ctx.base_dir.join("install.sql");
        fs::write(&sql, "CREAT TABLE;\n").unwrap();

        let runner = ShellScriptRunner::new(
            "sh",
            Some("cat >/dev/null; echo 'syntax error' >&2; exit 1".to_string()),
            PathBuf::from("addonctl"),
        );
        let err = runner.apply_sql(&sql, &ctx).await.unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }

    #[tokio::test]
    async fn test_apply_sql_without_executor() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), "foo");
        let sql = ctx.base_dir.join("install.sql");
        fs::write(&sql, "SELECT 1;\n").unwrap();

        let runner = ShellScriptRunner::new("sh", None, PathBuf::from("addonctl"));
        let err = runner.apply_sql(&sql, &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "no SQL executor configured");
    }
}
