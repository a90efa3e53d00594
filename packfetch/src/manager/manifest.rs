//! Pack manifest model.
//!
//! Every pack archive carries a `manifest.json` at its root describing the
//! game version, the mod loader, the mods to fetch, and the directory of
//! files to copy over the installation:
//!
//! ```json
//! {
//!   "minecraft": {
//!     "version": "1.16.5",
//!     "modLoaders": [{ "id": "forge-36.1.0", "primary": true }]
//!   },
//!   "name": "All the Mods 6",
//!   "version": "1.1",
//!   "author": "ATMTeam",
//!   "files": [{ "projectID": 238222, "fileID": 3043174, "required": true }],
//!   "overrides": "overrides"
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::download::ComponentRef;

/// File name of the manifest inside an extracted pack.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Overrides directory used when the manifest names none.
pub const DEFAULT_OVERRIDES_DIR: &str = "overrides";

/// Failure to load a pack manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Malformed JSON or a required field is missing.
    #[error("invalid manifest {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Game version and mod loaders the pack targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTarget {
    pub version: String,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoader>,
}

/// A mod loader build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModLoader {
    /// Loader build id, e.g. `forge-36.1.0`.
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

/// One mod listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestFile {
    #[serde(rename = "projectID")]
    pub project_id: u64,
    #[serde(rename = "fileID")]
    pub file_id: u64,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ManifestFile {
    /// The component reference the acquisition engine works with.
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.project_id, self.file_id)
    }
}

/// A parsed `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub minecraft: GameTarget,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub files: Vec<ManifestFile>,
    #[serde(default)]
    pub overrides: Option<String>,
}

impl Manifest {
    /// Load `manifest.json` from an extracted pack directory.
    pub fn load(extracted_dir: &Path) -> Result<Self, ManifestError> {
        let path = extracted_dir.join(MANIFEST_FILE_NAME);
        let text = fs::read_to_string(&path).map_err(|e| ManifestError::Read {
            path: path.clone(),
            source: e,
        })?;

        Self::parse(&text).map_err(|reason| ManifestError::Invalid { path, reason })
    }

    fn parse(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    /// Components to acquire, in manifest order.
    pub fn components(&self) -> Vec<ComponentRef> {
        self.files.iter().map(ManifestFile::component).collect()
    }

    /// Name of the overrides directory inside the extracted pack.
    pub fn overrides_dir(&self) -> &str {
        self.overrides
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .unwrap_or(DEFAULT_OVERRIDES_DIR)
    }

    /// The loader flagged primary, else the first one listed.
    pub fn primary_loader(&self) -> Option<&ModLoader> {
        let loaders = &self.minecraft.mod_loaders;
        loaders.iter().find(|l| l.primary).or_else(|| loaders.first())
    }
}
