//! File system operations (read, write, directory trees, permissions).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).context("Failed to write to file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context("Failed to read file to string")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn rename_impl(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).context("Failed to rename file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)?.map(|entry| Ok(entry?.path())).collect()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).context("Failed to remove directory and its contents")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn copy_dir_impl(&self, from: &Path, to: &Path, mode: Option<u32>) -> Result<u64> {
        let mut copied = 0;
        fs::create_dir_all(to).context("Failed to create destination directory")?;

        for entry in WalkDir::new(from).follow_links(false) {
            let entry = entry.map_err(|e| anyhow::anyhow!("Failed to walk directory: {}", e))?;
            let rel_path = entry.path().strip_prefix(from).unwrap_or(entry.path());
            let dest = to.join(rel_path);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)
                    .with_context(|| format!("Failed to create directory {:?}", dest))?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &dest)
                    .with_context(|| format!("Failed to copy {:?} to {:?}", entry.path(), dest))?;
                if let Some(mode) = mode {
                    set_permissions(&dest, mode)?;
                }
                copied += 1;
            }
        }

        Ok(copied)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_writable_impl(&self, path: &Path) -> bool {
        #[cfg(unix)]
        {
            nix::unistd::access(path, nix::unistd::AccessFlags::W_OK).is_ok()
        }
        #[cfg(not(unix))]
        {
            fs::metadata(path)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false)
        }
    }
}

fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = fs::Permissions::from_mode(mode);
        fs::set_permissions(path, permissions).context("Failed to set permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode); // Suppress unused warnings on non-Unix
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");

        runtime.write(&file_path, b"hello").unwrap();
        assert!(runtime.exists(&file_path));
        assert_eq!(runtime.read_to_string(&file_path).unwrap(), "hello");

        let new_path = dir.path().join("renamed.txt");
        runtime.rename(&file_path, &new_path).unwrap();
        assert!(!runtime.exists(&file_path));
        assert!(runtime.exists(&new_path));
    }

    #[test]
    fn test_real_runtime_dir_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("sub/nested");

        runtime.create_dir_all(&sub_dir).unwrap();
        assert!(runtime.is_dir(&sub_dir));

        let parent = dir.path().join("sub");
        let entries = runtime.read_dir(&parent).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("nested"));

        runtime.remove_dir_all(&parent).unwrap();
        assert!(!runtime.exists(&parent));
    }

    #[test]
    fn test_copy_dir_recursive() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let src = dir.path().join("files");
        std::fs::create_dir_all(src.join("css")).unwrap();
        std::fs::write(src.join("logo.png"), b"png").unwrap();
        std::fs::write(src.join("css/site.css"), b"body{}").unwrap();

        let dest = dir.path().join("media/foo");
        let copied = runtime.copy_dir(&src, &dest, None).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(std::fs::read(dest.join("logo.png")).unwrap(), b"png");
        assert_eq!(std::fs::read(dest.join("css/site.css")).unwrap(), b"body{}");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let src = dir.path().join("files");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.txt"), b"a").unwrap();

        let dest = dir.path().join("out");
        runtime.copy_dir(&src, &dest, Some(0o640)).unwrap();

        let mode = std::fs::metadata(dest.join("a.txt")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_copy_dir_missing_source_fails() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let result = runtime.copy_dir(&dir.path().join("nope"), &dir.path().join("out"), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_writable() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        assert!(runtime.is_writable(dir.path()));
        assert!(!runtime.is_writable(&dir.path().join("missing")));
    }

    #[test]
    fn test_real_runtime_errors() {
        let runtime = RealRuntime;
        let result = runtime.read_to_string(std::path::Path::new("/nonexistent/path/file.txt"));
        assert!(result.is_err());
    }
}
