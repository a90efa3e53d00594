//! Pack installer.
//!
//! This module orchestrates the full installation workflow:
//! 1. Resolve the pack project from the catalog
//! 2. Pick the release archive and prepare the directory layout
//! 3. Download and extract the archive
//! 4. Read the manifest and load the acquisition ledger
//! 5. Acquire every component listed in the manifest
//! 6. Merge mods and overrides into the finished installation
//! 7. Write the install guide

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, PackRef, PackTarget, ProjectInfo};

use super::config::ManagerConfig;
use super::download::{
    file_name_from_url, AcquireEvent, AcquireEventCallback, AcquisitionDriver, AcquisitionOutcome,
    AcquisitionStatus, ComponentRef, Ledger, RetryPrompt, Transport,
};
use super::error::{ManagerError, ManagerResult};
use super::extractor::{ArchiveExtractor, ShellExtractor};
use super::guide::write_guide;
use super::layout::PackLayout;
use super::manifest::Manifest;
use super::overrides::merge_dir;

/// Progress callback for installation operations.
///
/// # Arguments
///
/// * `stage` - Current installation stage
/// * `progress` - Progress within the stage (0.0 - 1.0)
/// * `message` - Human-readable message
pub type InstallProgressCallback = Box<dyn Fn(InstallStage, f64, &str) + Send + Sync>;

/// Installation stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Looking up the pack project.
    ResolvingProject,
    /// Fetching project metadata.
    FetchingInfo,
    /// Downloading the pack archive.
    DownloadingPack,
    /// Extracting the pack archive.
    Extracting,
    /// Acquiring the components listed in the manifest.
    AcquiringMods,
    /// Merging mods and overrides into the installation.
    Merging,
    /// Installation complete.
    Complete,
}

impl InstallStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResolvingProject => "Resolving project",
            Self::FetchingInfo => "Fetching project info",
            Self::DownloadingPack => "Downloading modpack",
            Self::Extracting => "Extracting",
            Self::AcquiringMods => "Downloading mods",
            Self::Merging => "Overriding files",
            Self::Complete => "Complete",
        }
    }
}

/// Result of a successful installation.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Catalog project id of the pack.
    pub project_id: u64,
    /// Display name of the pack.
    pub pack_name: String,
    /// Release that was installed.
    pub release_id: u64,
    /// Release directory holding everything for this release.
    pub release_dir: PathBuf,
    /// Finished installation.
    pub modpack_dir: PathBuf,
    /// Number of components in the manifest.
    pub components: usize,
    /// Files copied into the installation.
    pub files_merged: usize,
    /// How the component acquisition ended.
    pub acquisition: AcquisitionOutcome,
}

/// The archive chosen for a pack release.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackArchive {
    release_id: u64,
    url: String,
    file_name: String,
}

/// Pack installer.
///
/// Handles the complete workflow from a pack reference to a finished
/// installation directory.
pub struct PackInstaller<C: Catalog, T: Transport, E: ArchiveExtractor = ShellExtractor> {
    catalog: C,
    transport: T,
    extractor: E,
    config: ManagerConfig,
    cancel: CancellationToken,
    on_progress: Option<InstallProgressCallback>,
    on_event: Option<Arc<AcquireEventCallback>>,
}

impl<C: Catalog, T: Transport> PackInstaller<C, T, ShellExtractor> {
    /// Create an installer that extracts archives with `unzip`.
    pub fn new(catalog: C, transport: T, config: ManagerConfig) -> Self {
        Self::with_extractor(catalog, transport, ShellExtractor::new(), config)
    }
}

impl<C: Catalog, T: Transport, E: ArchiveExtractor> PackInstaller<C, T, E> {
    /// Create an installer with a custom archive extractor.
    pub fn with_extractor(catalog: C, transport: T, extractor: E, config: ManagerConfig) -> Self {
        Self {
            catalog,
            transport,
            extractor,
            config,
            cancel: CancellationToken::new(),
            on_progress: None,
            on_event: None,
        }
    }

    /// Stop at the next check once `cancel` is cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report stage progress through `callback`.
    pub fn with_progress_callback(mut self, callback: InstallProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Report per-component progress through `callback`.
    pub fn with_event_callback(mut self, callback: AcquireEventCallback) -> Self {
        self.on_event = Some(Arc::new(callback));
        self
    }

    /// The installer's configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Install the pack named by `pack`.
    ///
    /// `prompt` is asked whether to retry when a pass over the components
    /// ends with failures.
    ///
    /// # Errors
    ///
    /// [`ManagerError::Aborted`] when components are still missing after the
    /// operator declined to retry, [`ManagerError::Cancelled`] on interruption,
    /// and any unrecoverable catalog, archive, manifest, or ledger failure.
    pub fn install(&self, pack: &PackRef, prompt: &dyn RetryPrompt) -> ManagerResult<InstallReport> {
        self.report(InstallStage::ResolvingProject, 0.0, "Resolving project...");
        let project_id = self.resolve_project(&pack.target)?;

        self.check_cancelled()?;
        self.report(InstallStage::FetchingInfo, 0.0, "Fetching project info...");
        let info = self
            .catalog
            .project_info(project_id, &self.cancel)
            .map_err(|e| self.catalog_error(e))?;
        self.report(InstallStage::FetchingInfo, 1.0, &info.name);

        let archive = self.select_archive(&info, pack.release_id)?;
        let layout = PackLayout::new(&self.config.output_dir, &info.name, &archive.file_name);
        layout.create_all()?;
        info!(
            project_id,
            release_id = archive.release_id,
            path = %layout.root().display(),
            "Installing pack"
        );

        self.report(InstallStage::DownloadingPack, 0.0, &archive.file_name);
        let archive_path = self.download_archive(&archive, &layout)?;
        self.report(InstallStage::DownloadingPack, 1.0, &archive.file_name);

        self.check_cancelled()?;
        self.report(InstallStage::Extracting, 0.0, "Extracting modpack...");
        let extracted = self.extractor.extract(&archive_path, &layout.extracted_dir())?;
        debug!(files = extracted, "Pack archive extracted");
        self.report(InstallStage::Extracting, 1.0, "Extracted");

        let manifest = Manifest::load(&layout.extracted_dir())?;
        let mut ledger = Ledger::load(layout.ledger_path())?;
        let components = manifest.components();

        self.check_cancelled()?;
        self.report(InstallStage::AcquiringMods, 0.0, "Downloading mods...");
        let acquisition = self.acquire(&components, &mut ledger, &layout, prompt)?;
        match acquisition.status {
            AcquisitionStatus::Clean => {}
            AcquisitionStatus::Cancelled => return Err(ManagerError::Cancelled),
            AcquisitionStatus::Aborted => {
                return Err(ManagerError::Aborted {
                    failures: acquisition.failures,
                })
            }
        }
        self.report(InstallStage::AcquiringMods, 1.0, "All mods downloaded");

        self.report(InstallStage::Merging, 0.0, "Overriding files...");
        let mut files_merged = merge_dir(&layout.mods_download_dir(), &layout.modpack_mods_dir())?;
        files_merged += merge_dir(
            &layout.extracted_dir().join(manifest.overrides_dir()),
            &layout.modpack_dir(),
        )?;
        self.report(InstallStage::Merging, 1.0, "Done");

        write_guide(&layout.guide_path(), &manifest, &layout.modpack_dir())?;
        self.report(InstallStage::Complete, 1.0, "Modpack download finished");

        Ok(InstallReport {
            project_id,
            pack_name: info.name,
            release_id: archive.release_id,
            release_dir: layout.root().to_path_buf(),
            modpack_dir: layout.modpack_dir(),
            components: components.len(),
            files_merged,
            acquisition,
        })
    }

    fn resolve_project(&self, target: &PackTarget) -> ManagerResult<u64> {
        match target {
            PackTarget::Id(id) => Ok(*id),
            PackTarget::Slug(slug) => self
                .catalog
                .search_project(slug, &self.cancel)
                .map_err(|e| self.catalog_error(e))?
                .ok_or_else(|| ManagerError::ProjectNotFound(slug.clone())),
        }
    }

    /// Pick the archive to install.
    ///
    /// A requested release is resolved through the catalog; when that fails
    /// or yields nothing, the newest release is used instead.
    fn select_archive(&self, info: &ProjectInfo, release_id: Option<u64>) -> ManagerResult<PackArchive> {
        if let Some(release_id) = release_id {
            let component = ComponentRef::new(info.id, release_id);
            match self.catalog.release_download_url(&component, &self.cancel) {
                Ok(url) => {
                    if let Some(file_name) = file_name_from_url(&url) {
                        return Ok(PackArchive {
                            release_id,
                            url,
                            file_name,
                        });
                    }
                    warn!(release_id, url = %url, "Release URL has no file name, using latest release");
                }
                Err(e) if e.is_cancelled() => return Err(ManagerError::Cancelled),
                Err(e) => {
                    warn!(release_id, error = %e, "Could not resolve release, using latest release");
                }
            }
        }

        let latest = info.latest_release().ok_or_else(|| ManagerError::NoRelease {
            project_id: info.id,
            name: info.name.clone(),
        })?;

        let file_name = file_name_from_url(&latest.download_url)
            .or_else(|| Some(latest.file_name.clone()).filter(|name| !name.is_empty()))
            .ok_or_else(|| ManagerError::NoRelease {
                project_id: info.id,
                name: info.name.clone(),
            })?;

        Ok(PackArchive {
            release_id: latest.id,
            url: latest.download_url.clone(),
            file_name,
        })
    }

    fn download_archive(&self, archive: &PackArchive, layout: &PackLayout) -> ManagerResult<PathBuf> {
        let failed = |reason: String| ManagerError::PackDownloadFailed {
            url: archive.url.clone(),
            reason,
        };

        let downloaded = self
            .transport
            .download(
                &archive.url,
                &layout.download_dir(),
                self.config.force,
                None,
                &self.cancel,
            )
            .map_err(|e| {
                if e.is_cancelled() {
                    ManagerError::Cancelled
                } else {
                    failed(e.to_string())
                }
            })?;

        let size = std::fs::metadata(&downloaded.path)
            .map(|m| m.len())
            .map_err(|e| failed(e.to_string()))?;
        if size == 0 {
            return Err(failed("downloaded file is empty".to_string()));
        }

        debug!(path = %downloaded.path.display(), size, fresh = downloaded.fresh, "Pack archive ready");
        Ok(downloaded.path)
    }

    fn acquire(
        &self,
        components: &[ComponentRef],
        ledger: &mut Ledger,
        layout: &PackLayout,
        prompt: &dyn RetryPrompt,
    ) -> ManagerResult<AcquisitionOutcome> {
        let mut driver = AcquisitionDriver::new(&self.catalog, &self.transport, prompt, &self.cancel);
        if let Some(callback) = &self.on_event {
            let callback = Arc::clone(callback);
            driver = driver.with_event_callback(Box::new(move |event: &AcquireEvent| callback(event)));
        }

        Ok(driver.run(
            components,
            ledger,
            &layout.mods_download_dir(),
            self.config.force,
        )?)
    }

    fn catalog_error(&self, e: crate::catalog::CatalogError) -> ManagerError {
        if e.is_cancelled() {
            ManagerError::Cancelled
        } else {
            ManagerError::Catalog(e)
        }
    }

    fn check_cancelled(&self) -> ManagerResult<()> {
        if self.cancel.is_cancelled() {
            Err(ManagerError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn report(&self, stage: InstallStage, progress: f64, message: &str) {
        if let Some(ref cb) = self.on_progress {
            cb(stage, progress, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use crate::catalog::{CatalogError, CatalogResult, ReleaseFile};
    use crate::manager::download::{Fetched, RetryDecision, TransferError, TransferResult};

    const MANIFEST: &str = r#"{
        "minecraft": {"version": "1.16.5", "modLoaders": [{"id": "forge-36.1.0", "primary": true}]},
        "name": "Test Pack",
        "files": [
            {"projectID": 100, "fileID": 200, "required": true},
            {"projectID": 101, "fileID": 201, "required": true}
        ],
        "overrides": "overrides"
    }"#;

    struct FakeCatalog {
        broken: Mutex<Vec<ComponentRef>>,
    }

    impl FakeCatalog {
        fn new() -> Self {
            Self {
                broken: Mutex::new(Vec::new()),
            }
        }

        fn breaking(component: ComponentRef) -> Self {
            Self {
                broken: Mutex::new(vec![component]),
            }
        }
    }

    impl Catalog for FakeCatalog {
        fn search_project(&self, slug: &str, _cancel: &CancellationToken) -> CatalogResult<Option<u64>> {
            Ok((slug == "test-pack").then_some(7))
        }

        fn project_info(&self, project_id: u64, _cancel: &CancellationToken) -> CatalogResult<ProjectInfo> {
            if project_id != 7 {
                return Err(CatalogError::NotFound(project_id));
            }
            Ok(ProjectInfo {
                id: 7,
                name: "Test Pack".to_string(),
                slug: "test-pack".to_string(),
                latest_files: vec![ReleaseFile {
                    id: 70,
                    file_name: "Test Pack-1.0.zip".to_string(),
                    download_url: "https://edge.example.com/packs/test-pack-1.0.zip".to_string(),
                }],
            })
        }

        fn release_download_url(
            &self,
            component: &ComponentRef,
            _cancel: &CancellationToken,
        ) -> CatalogResult<String> {
            if self.broken.lock().unwrap().contains(component) {
                return Err(CatalogError::Transfer(TransferError::Status {
                    url: "catalog".to_string(),
                    status: 500,
                }));
            }
            Ok(format!(
                "https://edge.example.com/files/{}-{}.jar",
                component.component_id, component.release_id
            ))
        }
    }

    struct FakeTransport;

    impl Transport for FakeTransport {
        fn fetch(&self, url: &str, cancel: &CancellationToken) -> TransferResult<Fetched> {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            Ok(Fetched::new(url.as_bytes().to_vec()))
        }
    }

    /// Writes a manifest and an overrides tree instead of unzipping.
    struct FakeExtractor;

    impl ArchiveExtractor for FakeExtractor {
        fn extract(&self, _archive_path: &Path, dest_dir: &Path) -> ManagerResult<usize> {
            fs::create_dir_all(dest_dir.join("overrides").join("config")).unwrap();
            fs::write(dest_dir.join("manifest.json"), MANIFEST).unwrap();
            fs::write(dest_dir.join("overrides").join("config").join("pack.cfg"), "x").unwrap();
            Ok(2)
        }
    }

    fn installer(temp: &TempDir, catalog: FakeCatalog) -> PackInstaller<FakeCatalog, FakeTransport, FakeExtractor> {
        PackInstaller::with_extractor(
            catalog,
            FakeTransport,
            FakeExtractor,
            ManagerConfig::new(temp.path().to_path_buf()),
        )
    }

    fn abort(_: &[ComponentRef]) -> RetryDecision {
        RetryDecision::Abort
    }

    #[test]
    fn test_install_stage_names() {
        assert_eq!(InstallStage::DownloadingPack.name(), "Downloading modpack");
        assert_eq!(InstallStage::Complete.name(), "Complete");
    }

    #[test]
    fn test_install_by_slug() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, FakeCatalog::new());

        let report = installer
            .install(&PackRef::parse("test-pack").unwrap(), &abort)
            .unwrap();

        let release_dir = temp.path().join("test-pack").join("test-pack-10");
        assert_eq!(report.release_dir, release_dir);
        assert_eq!(report.release_id, 70);
        assert_eq!(report.components, 2);
        assert_eq!(report.files_merged, 3);
        assert!(report.acquisition.is_clean());
        assert!(release_dir.join("modpack/mods/100-200.jar").is_file());
        assert!(release_dir.join("modpack/mods/101-201.jar").is_file());
        assert!(release_dir.join("modpack/config/pack.cfg").is_file());
        assert!(release_dir.join("README.md").is_file());
        assert!(release_dir.join("progress.json").is_file());
    }

    #[test]
    fn test_second_install_skips_everything() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, FakeCatalog::new());
        let pack = PackRef::parse("7").unwrap();

        installer.install(&pack, &abort).unwrap();
        let report = installer.install(&pack, &abort).unwrap();

        assert_eq!(report.acquisition.skipped, 2);
        assert_eq!(report.acquisition.acquired, 0);
        assert!(!report.acquisition.ledger_dirty);
    }

    #[test]
    fn test_unknown_slug() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, FakeCatalog::new());

        let err = installer
            .install(&PackRef::parse("missing-pack").unwrap(), &abort)
            .unwrap_err();
        assert!(matches!(err, ManagerError::ProjectNotFound(ref slug) if slug == "missing-pack"));
    }

    #[test]
    fn test_unresolvable_release_falls_back_to_latest() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, FakeCatalog::breaking(ComponentRef::new(7, 99)));

        let pack = PackRef::parse("7").unwrap().with_release(Some(99));
        let report = installer.install(&pack, &abort).unwrap();
        assert_eq!(report.release_id, 70);
    }

    #[test]
    fn test_failed_component_aborts_without_merge() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, FakeCatalog::breaking(ComponentRef::new(101, 201)));

        let err = installer.install(&PackRef::parse("7").unwrap(), &abort).unwrap_err();
        match err {
            ManagerError::Aborted { failures } => {
                assert_eq!(failures, vec![ComponentRef::new(101, 201)]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let release_dir = temp.path().join("test-pack").join("test-pack-10");
        assert!(release_dir.join("download/mods/100-200.jar").is_file());
        assert!(!release_dir.join("modpack/mods/100-200.jar").exists());
        assert!(!release_dir.join("README.md").exists());
        assert!(release_dir.join("progress.json").is_file());
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let installer = installer(&temp, FakeCatalog::new()).with_cancellation(cancel);

        let err = installer.install(&PackRef::parse("7").unwrap(), &abort).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_progress_and_events_reported() {
        let temp = TempDir::new().unwrap();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(0usize));

        let stages_cb = Arc::clone(&stages);
        let events_cb = Arc::clone(&events);
        let installer = installer(&temp, FakeCatalog::new())
            .with_progress_callback(Box::new(move |stage: InstallStage, _: f64, _: &str| {
                stages_cb.lock().unwrap().push(stage);
            }))
            .with_event_callback(Box::new(move |_: &AcquireEvent| {
                *events_cb.lock().unwrap() += 1;
            }));

        installer.install(&PackRef::parse("7").unwrap(), &abort).unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&InstallStage::ResolvingProject));
        assert_eq!(stages.last(), Some(&InstallStage::Complete));
        assert!(*events.lock().unwrap() > 0);
    }
}
