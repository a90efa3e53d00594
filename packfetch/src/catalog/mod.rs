//! Remote catalog access.
//!
//! The catalog knows every project (packs and the mods they contain), its
//! releases, and where each release can be downloaded. This module provides:
//! - The [`Catalog`] trait used by the installer and the acquisition engine
//! - [`HttpCatalog`], the implementation backed by the catalog's HTTP API
//! - [`PackRef`] parsing for the forms a user may name a pack in

mod client;
mod reference;

pub use client::{CatalogSettings, HttpCatalog};
pub use reference::{slugify, PackRef, PackTarget, ReferenceError};

use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::manager::download::{ComponentRef, TransferError};

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request failed or was cancelled.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The response could not be understood.
    #[error("failed to parse catalog response from {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The catalog returned an empty download URL.
    #[error("catalog returned no download URL for {0}")]
    EmptyDownloadUrl(ComponentRef),

    /// The configured API root does not form a valid request URL.
    #[error("invalid catalog endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The project does not exist.
    #[error("project {0} not found")]
    NotFound(u64),
}

impl CatalogError {
    /// Whether the failure is an operator interruption.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transfer(e) if e.is_cancelled())
    }
}

/// Catalog metadata for one project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Project id.
    pub id: u64,
    /// Human-readable project name.
    pub name: String,
    /// URL-friendly project name.
    #[serde(default)]
    pub slug: String,
    /// Most recent releases, oldest first.
    #[serde(default)]
    pub latest_files: Vec<ReleaseFile>,
}

impl ProjectInfo {
    /// The newest release, if any.
    pub fn latest_release(&self) -> Option<&ReleaseFile> {
        self.latest_files.last()
    }
}

/// One downloadable release of a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFile {
    /// Release (file) id.
    pub id: u64,
    /// Name of the release file.
    #[serde(default)]
    pub file_name: String,
    /// Direct download URL.
    pub download_url: String,
}

/// Read access to the remote catalog.
///
/// Every call may be slow or fail; callers must handle both ordinary
/// failure and cancellation (see [`CatalogError::is_cancelled`]).
pub trait Catalog: Send + Sync {
    /// Find the id of the project whose slug is exactly `slug`.
    fn search_project(&self, slug: &str, cancel: &CancellationToken)
        -> CatalogResult<Option<u64>>;

    /// Fetch a project's metadata including its latest releases.
    fn project_info(&self, project_id: u64, cancel: &CancellationToken)
        -> CatalogResult<ProjectInfo>;

    /// Resolve a component release to its direct download URL.
    fn release_download_url(
        &self,
        component: &ComponentRef,
        cancel: &CancellationToken,
    ) -> CatalogResult<String>;
}
