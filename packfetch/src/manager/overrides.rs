//! Merging acquired and pack-supplied files into the installation.

use std::fs;
use std::path::Path;

use super::error::{ManagerError, ManagerResult};

/// Copy everything under `source_dir` into `target_dir`, replacing files
/// that already exist there.
///
/// Files in `target_dir` that have no counterpart in `source_dir` are left
/// alone. A missing `source_dir` copies nothing.
///
/// Returns the number of files copied.
pub fn merge_dir(source_dir: &Path, target_dir: &Path) -> ManagerResult<usize> {
    if !source_dir.is_dir() {
        return Ok(0);
    }

    fs::create_dir_all(target_dir).map_err(|e| ManagerError::CreateDirFailed {
        path: target_dir.to_path_buf(),
        source: e,
    })?;

    let entries = fs::read_dir(source_dir).map_err(|e| ManagerError::ReadFailed {
        path: source_dir.to_path_buf(),
        source: e,
    })?;

    let mut copied = 0;
    for entry in entries {
        let entry = entry.map_err(|e| ManagerError::ReadFailed {
            path: source_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let dest = target_dir.join(entry.file_name());

        if path.is_dir() {
            copied += merge_dir(&path, &dest)?;
        } else {
            fs::copy(&path, &dest).map_err(|e| ManagerError::WriteFailed {
                path: dest.clone(),
                source: e,
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_merge_replaces_and_keeps() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("overrides");
        let target = temp.path().join("modpack");

        fs::create_dir_all(source.join("config")).unwrap();
        fs::write(source.join("options.txt"), "new").unwrap();
        fs::write(source.join("config").join("jei.cfg"), "cfg").unwrap();

        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("options.txt"), "old").unwrap();
        fs::write(target.join("servers.dat"), "keep").unwrap();

        let copied = merge_dir(&source, &target).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(target.join("options.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(target.join("servers.dat")).unwrap(), "keep");
        assert_eq!(
            fs::read_to_string(target.join("config").join("jei.cfg")).unwrap(),
            "cfg"
        );
    }

    #[test]
    fn test_merge_missing_source() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("modpack");

        assert_eq!(merge_dir(&temp.path().join("nope"), &target).unwrap(), 0);
        assert!(!target.exists());
    }
}
