//! Pack archive extraction.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::error::{ManagerError, ManagerResult};

/// Unpacks a pack archive.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive_path` into `dest_dir`, overwriting existing files.
    ///
    /// Returns the number of files under `dest_dir` afterwards.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> ManagerResult<usize>;
}

/// Extractor backed by the system `unzip` tool.
#[derive(Debug, Default)]
pub struct ShellExtractor;

impl ShellExtractor {
    /// Create a new shell-based extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ShellExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> ManagerResult<usize> {
        fs::create_dir_all(dest_dir).map_err(|e| ManagerError::CreateDirFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

        let output = Command::new("unzip")
            .arg("-o")
            .arg("-q")
            .arg(archive_path)
            .arg("-d")
            .arg(dest_dir)
            .output()
            .map_err(|e| ManagerError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: format!("Failed to run unzip: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ManagerError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: format!("unzip failed: {}", stderr.trim()),
            });
        }

        let count = count_files_recursive(dest_dir)?;
        debug!(archive = %archive_path.display(), files = count, "Extracted pack archive");
        Ok(count)
    }
}

/// Count files recursively in a directory.
pub(crate) fn count_files_recursive(dir: &Path) -> ManagerResult<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| ManagerError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}

/// Check that `unzip` can be run.
pub fn check_required_tools() -> ManagerResult<()> {
    Command::new("unzip")
        .arg("-v")
        .output()
        .map(|_| ())
        .map_err(|_| ManagerError::ExtractionFailed {
            path: PathBuf::new(),
            reason: "unzip command not found. Please install unzip.".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_missing_archive_fails() {
        let temp = TempDir::new().unwrap();
        let extractor = ShellExtractor::new();

        let result = extractor.extract(&temp.path().join("missing.zip"), &temp.path().join("out"));
        assert!(matches!(result, Err(ManagerError::ExtractionFailed { .. })));
        assert!(temp.path().join("out").is_dir());
    }

    #[test]
    fn test_extract_garbage_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("pack.zip");
        fs::write(&archive, b"not a zip archive").unwrap();

        let result = ShellExtractor::new().extract(&archive, &temp.path().join("out"));
        assert!(result.is_err());
    }

    #[test]
    fn test_count_files_recursive() {
        let temp = TempDir::new().unwrap();

        fs::write(temp.path().join("manifest.json"), "{}").unwrap();
        let overrides = temp.path().join("overrides").join("config");
        fs::create_dir_all(&overrides).unwrap();
        fs::write(overrides.join("jei.cfg"), "a").unwrap();
        fs::write(overrides.join("forge.cfg"), "b").unwrap();

        assert_eq!(count_files_recursive(temp.path()).unwrap(), 3);
    }

    #[test]
    fn test_count_files_nonexistent_dir() {
        let count = count_files_recursive(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(count, 0);
    }
}
