//! Per-component progress events.
//!
//! The planner and driver report each decision as it is made through an
//! optional callback, leaving presentation to the caller.

use super::ledger::ComponentRef;

/// Callback invoked for every acquisition event.
pub type AcquireEventCallback = Box<dyn Fn(&AcquireEvent) + Send + Sync>;

/// Something the acquisition engine decided or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireEvent {
    /// A pass over the manifest is starting.
    PassStarted {
        /// 1-based pass number.
        pass: usize,
        /// Number of manifest entries in the pass.
        total: usize,
    },

    /// The file on disk validated against the ledger; nothing to do.
    Skipped {
        component: ComponentRef,
        file_name: String,
    },

    /// Looking up the download URL in the catalog.
    Resolving { component: ComponentRef },

    /// Transferring the file.
    Downloading {
        component: ComponentRef,
        file_name: String,
    },

    /// The file is in place and recorded as complete.
    Acquired {
        component: ComponentRef,
        file_name: String,
        /// Whether new bytes were fetched, as opposed to an existing file
        /// being accepted.
        fresh: bool,
    },

    /// The component could not be acquired in this pass.
    Failed {
        component: ComponentRef,
        reason: String,
    },

    /// The run was interrupted while working on this component.
    Cancelled { component: ComponentRef },

    /// A pass ended; failed components are listed in manifest order.
    PassFinished {
        pass: usize,
        failures: Vec<ComponentRef>,
    },

    /// The ledger was written to disk.
    LedgerSaved,
}

/// Invoke an optional callback.
pub(crate) fn emit(callback: Option<&AcquireEventCallback>, event: AcquireEvent) {
    if let Some(cb) = callback {
        cb(&event);
    }
}
