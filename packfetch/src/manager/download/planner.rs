//! Per-component acquisition planning.
//!
//! For one manifest entry the planner decides whether anything needs to
//! happen at all, which URL to fetch from, and how the ledger record changes:
//!
//! ```text
//! record completed + file validates ──────────────► Skipped
//!         │ (otherwise)
//!         ▼
//! URL cached? ──no──► resolve from catalog ──err──► Failed / Cancelled
//!         │                    │
//!         ▼                    ▼
//!     record URL (ledger dirty, survives a failed transfer)
//!         │
//!         ▼
//!     download ──err──► Failed (completed = false) / Cancelled
//!         │
//!         ▼
//!     record digest, file name, completed = true ───► Acquired
//! ```

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checksum::{calculate_file_digest, validate};
use super::http::{file_name_from_url, Transport};
use super::ledger::{ComponentRef, Ledger};
use super::progress::{emit, AcquireEvent, AcquireEventCallback};
use crate::catalog::Catalog;

/// Result of planning and executing the acquisition of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Already present and intact; no network access happened.
    Skipped,
    /// The file is in place and the record is complete.
    Acquired,
    /// Resolution or transfer failed; the run continues with the next entry.
    Failed(String),
    /// The operator interrupted the run.
    Cancelled,
}

/// Acquires individual components into the mods directory.
pub struct Planner<'a> {
    catalog: &'a dyn Catalog,
    transport: &'a dyn Transport,
    mods_dir: &'a Path,
    force: bool,
    cancel: &'a CancellationToken,
    on_event: Option<&'a AcquireEventCallback>,
}

impl<'a> Planner<'a> {
    /// Create a planner writing into `mods_dir`.
    ///
    /// With `force` set every component is fetched again, even when the
    /// ledger and the file on disk agree.
    pub fn new(
        catalog: &'a dyn Catalog,
        transport: &'a dyn Transport,
        mods_dir: &'a Path,
        force: bool,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            catalog,
            transport,
            mods_dir,
            force,
            cancel,
            on_event: None,
        }
    }

    /// Report decisions through `on_event`.
    pub fn with_events(mut self, on_event: Option<&'a AcquireEventCallback>) -> Self {
        self.on_event = on_event;
        self
    }

    /// Acquire one component, updating its ledger record.
    pub fn acquire_one(&self, component: &ComponentRef, ledger: &mut Ledger) -> PlanOutcome {
        let record = ledger.get(component).clone();
        let mut force = self.force;

        // The completed flag is only trusted once the file itself checks out
        if !force && record.completed {
            if let (Some(file_name), Some(digest)) = (record.file_name(), record.digest()) {
                if validate(&self.mods_dir.join(file_name), Some(digest)) {
                    debug!(%component, file_name, "Digest matches, skipping");
                    self.emit(AcquireEvent::Skipped {
                        component: *component,
                        file_name: file_name.to_string(),
                    });
                    return PlanOutcome::Skipped;
                }

                info!(%component, file_name, "Stored file is missing or altered, downloading again");
                force = true;
            }
        }

        let url = match record.url() {
            Some(url) => url.to_string(),
            None => match self.resolve(component) {
                Ok(url) => url,
                Err(outcome) => return outcome,
            },
        };

        // Recorded before the transfer so a later run never has to resolve again
        ledger.update(component, |r| r.resolved_url = Some(url.clone()));

        let file_name = file_name_from_url(&url).unwrap_or_else(|| component.to_string());
        self.emit(AcquireEvent::Downloading {
            component: *component,
            file_name,
        });

        // Only a completed record vouches for a file it holds no digest for;
        // anything else on disk may be the remains of an interrupted write
        let expected_digest = if record.completed {
            record.content_digest.as_deref()
        } else {
            Some("")
        };

        let downloaded = match self.transport.download(
            &url,
            self.mods_dir,
            force,
            expected_digest,
            self.cancel,
        ) {
            Ok(downloaded) => downloaded,
            Err(e) if e.is_cancelled() => {
                info!(%component, "Download interrupted");
                self.emit(AcquireEvent::Cancelled {
                    component: *component,
                });
                return PlanOutcome::Cancelled;
            }
            Err(e) => {
                warn!(%component, url = %url, error = %e, "Download failed");
                ledger.update(component, |r| r.completed = false);
                return self.fail(component, e.to_string());
            }
        };

        // An existing file accepted without a digest gets one now, so the
        // next run can take the fast path
        let digest = match downloaded.digest {
            Some(digest) => Some(digest),
            None if record.digest().is_none() => match calculate_file_digest(&downloaded.path) {
                Ok(digest) => Some(digest),
                Err(e) => {
                    warn!(path = %downloaded.path.display(), error = %e, "Could not digest existing file");
                    None
                }
            },
            None => None,
        };

        ledger.update(component, |r| {
            if let Some(digest) = digest {
                if r.content_digest.as_deref() != Some(digest.as_str()) {
                    r.content_digest = Some(digest);
                }
            }
            r.local_name = Some(downloaded.file_name.clone());
            r.completed = true;
        });

        debug!(%component, file_name = %downloaded.file_name, fresh = downloaded.fresh, "Acquired");
        self.emit(AcquireEvent::Acquired {
            component: *component,
            file_name: downloaded.file_name,
            fresh: downloaded.fresh,
        });
        PlanOutcome::Acquired
    }

    /// Look up the download URL, mapping failures to a terminal outcome.
    fn resolve(&self, component: &ComponentRef) -> Result<String, PlanOutcome> {
        self.emit(AcquireEvent::Resolving {
            component: *component,
        });

        match self.catalog.release_download_url(component, self.cancel) {
            Ok(url) => {
                debug!(%component, url = %url, "Resolved download URL");
                Ok(url)
            }
            Err(e) if e.is_cancelled() => {
                info!(%component, "Resolution interrupted");
                self.emit(AcquireEvent::Cancelled {
                    component: *component,
                });
                Err(PlanOutcome::Cancelled)
            }
            Err(e) => {
                warn!(%component, error = %e, "Failed to resolve download URL");
                Err(self.fail(component, e.to_string()))
            }
        }
    }

    fn fail(&self, component: &ComponentRef, reason: String) -> PlanOutcome {
        self.emit(AcquireEvent::Failed {
            component: *component,
            reason: reason.clone(),
        });
        PlanOutcome::Failed(reason)
    }

    fn emit(&self, event: AcquireEvent) {
        emit(self.on_event, event);
    }
}
