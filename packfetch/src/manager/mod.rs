//! Pack installation.
//!
//! This module provides:
//! - The resumable component acquisition engine ([`download`])
//! - The pack manifest model and on-disk layout
//! - Archive extraction and override merging
//! - [`PackInstaller`], which runs the whole workflow
//!
//! # Example
//!
//! ```ignore
//! use packfetch::catalog::{HttpCatalog, PackRef};
//! use packfetch::manager::{ManagerConfig, PackInstaller};
//!
//! let config = ManagerConfig::new(output_dir);
//! let catalog = HttpCatalog::new(config.transport()?, config.catalog.clone());
//! let installer = PackInstaller::new(catalog, config.transport()?, config);
//!
//! let report = installer.install(&PackRef::parse("all-the-mods-6")?, &prompt)?;
//! println!("Installed into {}", report.modpack_dir.display());
//! ```

mod config;
pub mod download;
mod error;
mod extractor;
mod guide;
mod installer;
mod layout;
mod manifest;
mod overrides;

pub use config::ManagerConfig;
pub use error::{ManagerError, ManagerResult};
pub use extractor::{check_required_tools, ArchiveExtractor, ShellExtractor};
pub use guide::{render_guide, write_guide};
pub use installer::{InstallProgressCallback, InstallReport, InstallStage, PackInstaller};
pub use layout::{PackLayout, GUIDE_FILE_NAME, LEDGER_FILE_NAME};
pub use manifest::{
    GameTarget, Manifest, ManifestError, ManifestFile, ModLoader, DEFAULT_OVERRIDES_DIR,
    MANIFEST_FILE_NAME,
};
pub use overrides::merge_dir;
