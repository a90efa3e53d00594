//! On-disk layout of an installed pack release.
//!
//! ```text
//! <output>/<pack-slug>/<release-slug>/
//! ├── modpack/              finished installation
//! │   └── mods/
//! ├── download/
//! │   ├── <archive>.zip     pack archive
//! │   ├── extracted/        unpacked archive (manifest.json, overrides/)
//! │   └── mods/             acquired components
//! ├── progress.json         acquisition ledger
//! └── README.md             install guide
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{ManagerError, ManagerResult};
use crate::catalog::slugify;

/// Ledger file name inside a release directory.
pub const LEDGER_FILE_NAME: &str = "progress.json";

/// Install guide file name inside a release directory.
pub const GUIDE_FILE_NAME: &str = "README.md";

/// Release directory name used when the archive name has no usable characters.
const FALLBACK_RELEASE_DIR: &str = "release";

/// Paths of one pack release under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackLayout {
    root: PathBuf,
}

impl PackLayout {
    /// Layout for `archive_name` of the pack called `pack_name`.
    ///
    /// Both names are reduced to slugs; the archive's extension is dropped
    /// before that.
    pub fn new(output_dir: &Path, pack_name: &str, archive_name: &str) -> Self {
        let release = release_dir_name(archive_name);
        Self {
            root: output_dir.join(slugify(pack_name)).join(release),
        }
    }

    /// Release directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finished installation.
    pub fn modpack_dir(&self) -> PathBuf {
        self.root.join("modpack")
    }

    /// Mods folder of the finished installation.
    pub fn modpack_mods_dir(&self) -> PathBuf {
        self.modpack_dir().join("mods")
    }

    /// Where the pack archive is downloaded.
    pub fn download_dir(&self) -> PathBuf {
        self.root.join("download")
    }

    /// Unpacked pack archive.
    pub fn extracted_dir(&self) -> PathBuf {
        self.download_dir().join("extracted")
    }

    /// Where components are acquired.
    pub fn mods_download_dir(&self) -> PathBuf {
        self.download_dir().join("mods")
    }

    /// Acquisition ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE_NAME)
    }

    /// Install guide.
    pub fn guide_path(&self) -> PathBuf {
        self.root.join(GUIDE_FILE_NAME)
    }

    /// Create every directory of the layout.
    pub fn create_all(&self) -> ManagerResult<()> {
        for dir in [
            self.modpack_mods_dir(),
            self.extracted_dir(),
            self.mods_download_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| ManagerError::CreateDirFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        debug!(path = %self.root.display(), "Prepared pack directories");
        Ok(())
    }
}

fn release_dir_name(archive_name: &str) -> String {
    let stem = match archive_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => archive_name,
    };
    // Dots are removed rather than turned into separators: "ATM6-1.1" → "atm6-11"
    let slug = slugify(&stem.replace('.', ""));
    if slug.is_empty() {
        FALLBACK_RELEASE_DIR.to_string()
    } else {
        slug
    }
}
