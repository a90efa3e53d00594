//! Resumable acquisition of pack components.
//!
//! This module turns a manifest's list of component references into verified
//! files on disk, tolerating partial failure, interruption, and repeated
//! invocation:
//! - Content digests for change detection (`checksum`)
//! - Byte transfers with cancellation (`http`)
//! - Durable per-component progress (`ledger`)
//! - Per-component decisions (`planner`)
//! - The retry-or-abort pass loop (`orchestrator`)
//! - Progress events for the UI (`progress`)
//!
//! # Architecture
//!
//! ```text
//! AcquisitionDriver (orchestrator)
//!         │
//!         ├── RetryPrompt (operator decision after failures)
//!         │
//!         └── Planner (one component at a time)
//!                 │
//!                 ├── Ledger (load once, persist when dirty)
//!                 ├── Catalog (resolve download URL)
//!                 └── Transport (fetch bytes, skip if present)
//!                         └── checksum (validate existing files)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use packfetch::manager::download::{AcquisitionDriver, ComponentRef, HttpTransport, Ledger, RetryDecision};
//!
//! let transport = HttpTransport::new(USER_AGENT)?;
//! let mut ledger = Ledger::load(layout.ledger_path())?;
//! let prompt = |_: &[ComponentRef]| RetryDecision::Abort;
//!
//! let driver = AcquisitionDriver::new(&catalog, &transport, &prompt, &cancel);
//! let outcome = driver.run(&manifest.components(), &mut ledger, layout.mods_download_dir(), false)?;
//! ```

mod checksum;
mod error;
mod http;
mod ledger;
mod orchestrator;
mod planner;
mod progress;

pub use checksum::{calculate_file_digest, digest_bytes, validate};
pub use error::{LedgerError, LedgerResult, TransferError, TransferResult};
pub use http::{file_name_from_url, Downloaded, Fetched, HttpTransport, Transport, DEFAULT_TIMEOUT_SECS};
pub use ledger::{ComponentRecord, ComponentRef, Ledger};
pub use orchestrator::{
    AcquisitionDriver, AcquisitionOutcome, AcquisitionStatus, RetryDecision, RetryPrompt,
};
pub use planner::{PlanOutcome, Planner};
pub use progress::{AcquireEvent, AcquireEventCallback};
