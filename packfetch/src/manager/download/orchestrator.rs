//! Acquisition driver.
//!
//! Runs the planner over every manifest entry in order and applies the
//! retry-or-abort policy when a pass ends with failures:
//!
//! ```text
//!            ┌──────────────── Retry ────────────────┐
//!            ▼                                       │
//!        Running ──cancel──► Cancelled               │
//!            │                                       │
//!            ├── no failures ──► CompletedClean      │
//!            │                                       │
//!            └── failures ──► CompletedWithFailures ─┤
//!                                                    └── Abort ──► Aborted
//! ```
//!
//! The ledger is persisted once at the end of every pass, after the
//! operator has answered the retry prompt, and only when the pass changed it.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::LedgerResult;
use super::http::Transport;
use super::ledger::{ComponentRef, Ledger};
use super::planner::{PlanOutcome, Planner};
use super::progress::{emit, AcquireEvent, AcquireEventCallback};
use crate::catalog::Catalog;

/// Operator answer after a pass with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run the entire pass again from the first entry.
    Retry,
    /// Stop with the failures unresolved.
    Abort,
}

/// Asks the operator whether to retry after failures.
///
/// This is the only point where the engine waits on the operator.
pub trait RetryPrompt {
    /// Decide what to do about `failures`, listed in manifest order.
    fn retry_failed(&self, failures: &[ComponentRef]) -> RetryDecision;
}

impl<F> RetryPrompt for F
where
    F: Fn(&[ComponentRef]) -> RetryDecision,
{
    fn retry_failed(&self, failures: &[ComponentRef]) -> RetryDecision {
        self(failures)
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStatus {
    /// Every entry was skipped or acquired.
    Clean,
    /// A pass ended with failures and the operator chose to stop.
    Aborted,
    /// The operator interrupted the run.
    Cancelled,
}

/// Aggregate result of [`AcquisitionDriver::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionOutcome {
    /// How the run ended.
    pub status: AcquisitionStatus,
    /// Components that failed in the last pass, in manifest order.
    pub failures: Vec<ComponentRef>,
    /// Whether the run was interrupted.
    pub interrupted: bool,
    /// Whether any pass changed the ledger (and therefore wrote it).
    pub ledger_dirty: bool,
    /// Number of passes over the manifest.
    pub passes: usize,
    /// Components acquired in the last pass.
    pub acquired: usize,
    /// Components skipped in the last pass.
    pub skipped: usize,
}

impl AcquisitionOutcome {
    /// Whether every component is in place.
    pub fn is_clean(&self) -> bool {
        self.status == AcquisitionStatus::Clean
    }
}

/// State reached at the end of a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Cancelled,
    CompletedWithFailures,
    CompletedClean,
}

#[derive(Debug, Default)]
struct PassReport {
    failures: Vec<ComponentRef>,
    acquired: usize,
    skipped: usize,
    interrupted: bool,
}

impl PassReport {
    fn state(&self) -> PassState {
        if self.interrupted {
            PassState::Cancelled
        } else if self.failures.is_empty() {
            PassState::CompletedClean
        } else {
            PassState::CompletedWithFailures
        }
    }
}

/// Drives the acquisition of every component in a manifest.
pub struct AcquisitionDriver<'a> {
    catalog: &'a dyn Catalog,
    transport: &'a dyn Transport,
    prompt: &'a dyn RetryPrompt,
    cancel: &'a CancellationToken,
    on_event: Option<AcquireEventCallback>,
}

impl<'a> AcquisitionDriver<'a> {
    /// Create a driver.
    pub fn new(
        catalog: &'a dyn Catalog,
        transport: &'a dyn Transport,
        prompt: &'a dyn RetryPrompt,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            catalog,
            transport,
            prompt,
            cancel,
            on_event: None,
        }
    }

    /// Report per-component progress through `callback`.
    pub fn with_event_callback(mut self, callback: AcquireEventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    /// Acquire every entry into `mods_dir`.
    ///
    /// Entries are processed strictly in order and independently of each
    /// other. Per-component failures never abort the pass; cancellation
    /// stops it immediately. The ledger is persisted after each pass.
    ///
    /// # Errors
    ///
    /// Only a failure to persist the ledger is returned as an error.
    pub fn run(
        &self,
        entries: &[ComponentRef],
        ledger: &mut Ledger,
        mods_dir: &Path,
        force: bool,
    ) -> LedgerResult<AcquisitionOutcome> {
        let planner = Planner::new(self.catalog, self.transport, mods_dir, force, self.cancel)
            .with_events(self.on_event.as_ref());

        let mut passes = 0;
        let mut ledger_dirty = false;

        loop {
            passes += 1;
            let report = self.run_pass(&planner, entries, ledger, passes);

            let mut status = match report.state() {
                PassState::Cancelled => Some(AcquisitionStatus::Cancelled),
                PassState::CompletedClean => Some(AcquisitionStatus::Clean),
                PassState::CompletedWithFailures => {
                    warn!(failed = report.failures.len(), pass = passes, "Some components failed");
                    match self.prompt.retry_failed(&report.failures) {
                        RetryDecision::Retry => None,
                        RetryDecision::Abort => Some(AcquisitionStatus::Aborted),
                    }
                }
            };

            // An interrupt during the prompt supersedes the answer
            if self.cancel.is_cancelled() {
                status = Some(AcquisitionStatus::Cancelled);
            }

            if ledger.is_dirty() {
                ledger_dirty = true;
                ledger.persist()?;
                self.emit(AcquireEvent::LedgerSaved);
            }

            if let Some(status) = status {
                info!(
                    ?status,
                    passes,
                    acquired = report.acquired,
                    skipped = report.skipped,
                    "Acquisition finished"
                );
                return Ok(AcquisitionOutcome {
                    status,
                    failures: report.failures,
                    interrupted: status == AcquisitionStatus::Cancelled,
                    ledger_dirty,
                    passes,
                    acquired: report.acquired,
                    skipped: report.skipped,
                });
            }

            info!(pass = passes, "Retrying all components");
        }
    }

    fn run_pass(
        &self,
        planner: &Planner<'_>,
        entries: &[ComponentRef],
        ledger: &mut Ledger,
        pass: usize,
    ) -> PassReport {
        self.emit(AcquireEvent::PassStarted {
            pass,
            total: entries.len(),
        });

        let mut report = PassReport::default();

        for component in entries {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            match planner.acquire_one(component, ledger) {
                PlanOutcome::Skipped => report.skipped += 1,
                PlanOutcome::Acquired => report.acquired += 1,
                PlanOutcome::Failed(_) => report.failures.push(*component),
                PlanOutcome::Cancelled => {
                    report.interrupted = true;
                    break;
                }
            }
        }

        self.emit(AcquireEvent::PassFinished {
            pass,
            failures: report.failures.clone(),
        });
        report
    }

    fn emit(&self, event: AcquireEvent) {
        emit(self.on_event.as_ref(), event);
    }
}
