//! Durable per-component acquisition progress.
//!
//! The ledger maps component id → release id → [`ComponentRecord`]. It is
//! loaded once per run, mutated in memory by the planner, and written back
//! with a full atomic rewrite only when something changed.
//!
//! # File format
//!
//! ```json
//! {
//!   "238222": {
//!     "3043174": {
//!       "resolved_url": "https://edge.example.com/files/3043/174/jei.jar",
//!       "content_digest": "b94d27b9...",
//!       "local_name": "jei.jar",
//!       "completed": true
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{LedgerError, LedgerResult};

/// One manifest entry: a component and the release of it the pack requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef {
    /// Catalog project id of the component.
    pub component_id: u64,
    /// Catalog file id of the required release.
    pub release_id: u64,
}

impl ComponentRef {
    /// Create a component reference.
    pub fn new(component_id: u64, release_id: u64) -> Self {
        Self {
            component_id,
            release_id,
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component_id, self.release_id)
    }
}

/// Acquisition state of one component release.
///
/// Optional fields distinguish "not known yet" (`None`) from a known empty
/// value (`Some("")`). An empty digest never validates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Direct download URL, once resolved.
    #[serde(default)]
    pub resolved_url: Option<String>,

    /// Digest of the last file that was stored successfully.
    #[serde(default)]
    pub content_digest: Option<String>,

    /// File name under the mods directory.
    #[serde(default)]
    pub local_name: Option<String>,

    /// Set only after a successful download-and-store cycle.
    #[serde(default)]
    pub completed: bool,
}

impl ComponentRecord {
    /// The resolved URL, if present and non-empty.
    pub fn url(&self) -> Option<&str> {
        non_empty(&self.resolved_url)
    }

    /// The stored digest, if present and non-empty.
    pub fn digest(&self) -> Option<&str> {
        non_empty(&self.content_digest)
    }

    /// The stored file name, if present and non-empty.
    pub fn file_name(&self) -> Option<&str> {
        non_empty(&self.local_name)
    }

    /// Whether the record claims a finished download that can be checked
    /// against the filesystem without any network access.
    pub fn is_verifiable(&self) -> bool {
        self.completed && self.file_name().is_some() && self.digest().is_some()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

type Records = BTreeMap<String, BTreeMap<String, ComponentRecord>>;

/// Keyed record of acquisition progress, backed by a JSON file.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    records: Records,
    dirty: bool,
}

impl Ledger {
    /// Create an empty ledger that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Records::new(),
            dirty: false,
        }
    }

    /// Load the ledger stored at `path`.
    ///
    /// An absent or empty file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Corrupt`] if the file has content that is not a
    /// valid ledger, and [`LedgerError::Read`] if it cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();

        if !path.exists() {
            debug!(path = %path.display(), "No ledger found, starting fresh");
            return Ok(Self::new(path));
        }

        let content = fs::read_to_string(&path).map_err(|e| LedgerError::Read {
            path: path.clone(),
            source: e,
        })?;

        if content.trim().is_empty() {
            debug!(path = %path.display(), "Ledger is empty, starting fresh");
            return Ok(Self::new(path));
        }

        let records: Records =
            serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        for (component_id, releases) in &records {
            if component_id.parse::<u64>().is_err() {
                return Err(LedgerError::Corrupt {
                    path,
                    reason: format!("invalid component id {:?}", component_id),
                });
            }
            if let Some(release_id) = releases.keys().find(|k| k.parse::<u64>().is_err()) {
                return Err(LedgerError::Corrupt {
                    path,
                    reason: format!("invalid release id {:?}", release_id),
                });
            }
        }

        debug!(path = %path.display(), components = records.len(), "Loaded ledger");
        Ok(Self {
            path,
            records,
            dirty: false,
        })
    }

    /// Path the ledger persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any record was created or changed since load or last persist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of component releases tracked.
    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    /// Whether the ledger tracks no component releases.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a record without creating it.
    pub fn record(&self, component: &ComponentRef) -> Option<&ComponentRecord> {
        self.records
            .get(&component.component_id.to_string())
            .and_then(|releases| releases.get(&component.release_id.to_string()))
    }

    /// Get the record for `component`, creating an empty one on first access.
    ///
    /// Creating a record marks the ledger dirty.
    pub fn get(&mut self, component: &ComponentRef) -> &ComponentRecord {
        self.entry(component)
    }

    /// Mutate the record for `component` in place.
    ///
    /// The ledger is marked dirty only if the record was created or the
    /// closure actually changed it.
    pub fn update<F>(&mut self, component: &ComponentRef, f: F)
    where
        F: FnOnce(&mut ComponentRecord),
    {
        let record = self.entry(component);
        let before = record.clone();
        f(record);
        if *record != before {
            self.dirty = true;
        }
    }

    fn entry(&mut self, component: &ComponentRef) -> &mut ComponentRecord {
        let releases = self
            .records
            .entry(component.component_id.to_string())
            .or_default();

        let release_key = component.release_id.to_string();
        if !releases.contains_key(&release_key) {
            self.dirty = true;
        }
        releases.entry(release_key).or_default()
    }

    /// Write the ledger back to disk if it is dirty.
    ///
    /// The ledger is serialized to a temporary file next to the target and
    /// renamed over it, so an interrupted write never leaves a truncated
    /// ledger behind. Returns whether a write happened.
    pub fn persist(&mut self) -> LedgerResult<bool> {
        if !self.dirty {
            return Ok(false);
        }

        self.write_atomic()?;
        self.dirty = false;
        info!(path = %self.path.display(), components = self.len(), "Saved download progress");
        Ok(true)
    }

    fn write_atomic(&self) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| LedgerError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let write_err = |e| LedgerError::Write {
            path: temp_path.clone(),
            source: e,
        };

        let file = File::create(&temp_path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)
            .map_err(|e| LedgerError::Serialize(e.to_string()))?;
        writer.write_all(b"\n").map_err(write_err)?;

        let file = writer
            .into_inner()
            .map_err(|e| write_err(e.into_error()))?;
        file.sync_all().map_err(write_err)?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| LedgerError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}
