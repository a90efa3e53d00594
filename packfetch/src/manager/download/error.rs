//! Error types for the acquisition engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for network transfers.
pub type TransferResult<T> = Result<T, TransferError>;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failure while fetching bytes from a URL or storing them locally.
///
/// Every variant except [`TransferError::Cancelled`] is recoverable: it is
/// recorded against a single component and the run continues.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The operator interrupted the run.
    #[error("transfer cancelled")]
    Cancelled,

    /// The request could not be sent or the body could not be read.
    #[error("failed to fetch {url}: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The request did not finish within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// No file name could be derived from the URL.
    #[error("cannot derive a file name from {0}")]
    InvalidUrl(String),

    /// The fetched bytes could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl TransferError {
    /// Whether this error is an operator interruption rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure while loading or persisting the progress ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger file exists but could not be read.
    #[error("failed to read ledger {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The ledger file exists but is not a valid ledger.
    ///
    /// Never treated as "no progress": that would silently discard
    /// everything recorded by earlier runs.
    #[error("corrupt ledger {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The ledger could not be written.
    #[error("failed to write ledger {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The ledger could not be serialized.
    #[error("failed to serialize ledger: {0}")]
    Serialize(String),
}
