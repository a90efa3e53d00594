//! Error types for pack installation.

use std::io;
use std::path::PathBuf;

use crate::catalog::CatalogError;

use super::download::{ComponentRef, LedgerError, TransferError};
use super::manifest::ManifestError;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors that can occur while installing a pack.
#[derive(Debug)]
pub enum ManagerError {
    /// Failed to read a file or directory.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Catalog request failed.
    Catalog(CatalogError),

    /// No catalog project has the given slug.
    ProjectNotFound(String),

    /// The project has no downloadable release.
    NoRelease { project_id: u64, name: String },

    /// The pack archive could not be downloaded.
    PackDownloadFailed { url: String, reason: String },

    /// Archive extraction failed.
    ExtractionFailed { path: PathBuf, reason: String },

    /// The pack manifest is unreadable or incomplete.
    Manifest(ManifestError),

    /// The progress ledger could not be loaded or saved.
    Ledger(LedgerError),

    /// The HTTP client could not be set up.
    Transfer(TransferError),

    /// The operator interrupted the installation.
    Cancelled,

    /// Some components failed and the operator chose not to retry.
    Aborted { failures: Vec<ComponentRef> },
}

impl ManagerError {
    /// Whether the failure is an operator interruption.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Catalog(e) => e.is_cancelled(),
            Self::Transfer(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::Catalog(e) => write!(f, "catalog error: {}", e),
            Self::ProjectNotFound(slug) => write!(f, "no project found with slug {:?}", slug),
            Self::NoRelease { project_id, name } => {
                write!(f, "{} ({}) has no downloadable release", name, project_id)
            }
            Self::PackDownloadFailed { url, reason } => {
                write!(f, "failed to download pack archive {}: {}", url, reason)
            }
            Self::ExtractionFailed { path, reason } => {
                write!(f, "failed to extract {}: {}", path.display(), reason)
            }
            Self::Manifest(e) => write!(f, "{}", e),
            Self::Ledger(e) => write!(f, "{}", e),
            Self::Transfer(e) => write!(f, "{}", e),
            Self::Cancelled => write!(f, "installation cancelled"),
            Self::Aborted { failures } => {
                write!(f, "failed to download {} component(s)", failures.len())
            }
        }
    }
}

impl std::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::CreateDirFailed { source, .. } => Some(source),
            Self::Catalog(e) => Some(e),
            Self::Manifest(e) => Some(e),
            Self::Ledger(e) => Some(e),
            Self::Transfer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CatalogError> for ManagerError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

impl From<ManifestError> for ManagerError {
    fn from(e: ManifestError) -> Self {
        Self::Manifest(e)
    }
}

impl From<LedgerError> for ManagerError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<TransferError> for ManagerError {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ManagerError::NoRelease {
            project_id: 389615,
            name: "All the Mods 6".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "All the Mods 6 (389615) has no downloadable release"
        );
    }

    #[test]
    fn test_aborted_display() {
        let err = ManagerError::Aborted {
            failures: vec![ComponentRef::new(101, 201)],
        };
        assert_eq!(err.to_string(), "failed to download 1 component(s)");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ManagerError::Cancelled.is_cancelled());
        assert!(ManagerError::Catalog(CatalogError::Transfer(TransferError::Cancelled)).is_cancelled());
        assert!(ManagerError::Transfer(TransferError::Cancelled).is_cancelled());
        assert!(!ManagerError::ProjectNotFound("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err = ManagerError::ReadFailed {
            path: PathBuf::from("/tmp/x"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.source().is_some());
        assert!(ManagerError::Cancelled.source().is_none());
    }
}
