//! User configuration file.
//!
//! Settings live in an INI file at `~/.config/packfetch/config.ini` (or the
//! platform equivalent). Every key is optional; a missing file yields the
//! defaults.
//!
//! ```ini
//! [catalog]
//! api_url = https://addons-ecs.forgesvc.net/api/v2/addon
//! user_agent = Mozilla/5.0 ...
//! game_id = 432
//! section_id = 4471
//! search_page_size = 20
//!
//! [download]
//! timeout = 300
//!
//! [paths]
//! output_dir = ~/modpacks
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::catalog::CatalogSettings;
use crate::manager::download::DEFAULT_TIMEOUT_SECS;

/// Identification header sent with every request.
///
/// The catalog rejects requests without a browser-like user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36";

const CONFIG_DIR_NAME: &str = "packfetch";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed as INI.
    #[error("failed to read config {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// A key holds a value of the wrong type.
    #[error("invalid value {value:?} for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// The file could not be written.
    #[error("failed to write config {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

/// `[catalog]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSection {
    pub api_url: String,
    pub user_agent: String,
    pub game_id: u32,
    pub section_id: u32,
    pub search_page_size: u32,
}

impl Default for CatalogSection {
    fn default() -> Self {
        let settings = CatalogSettings::default();
        Self {
            api_url: settings.api_url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            game_id: settings.game_id,
            section_id: settings.section_id,
            search_page_size: settings.search_page_size,
        }
    }
}

impl CatalogSection {
    /// Endpoint settings for the catalog client.
    pub fn settings(&self) -> CatalogSettings {
        CatalogSettings {
            api_url: self.api_url.clone(),
            game_id: self.game_id,
            section_id: self.section_id,
            search_page_size: self.search_page_size,
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSection {
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathsSection {
    /// Root directory packs are installed under.
    pub output_dir: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub catalog: CatalogSection,
    pub download: DownloadSection,
    pub paths: PathsSection,
}

/// Location of the configuration file, if the platform has a config dir.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("catalog")) {
            if let Some(value) = non_empty(section.get("api_url")) {
                config.catalog.api_url = value.to_string();
            }
            if let Some(value) = non_empty(section.get("user_agent")) {
                config.catalog.user_agent = value.to_string();
            }
            if let Some(value) = parse_key(section.get("game_id"), "catalog", "game_id")? {
                config.catalog.game_id = value;
            }
            if let Some(value) = parse_key(section.get("section_id"), "catalog", "section_id")? {
                config.catalog.section_id = value;
            }
            if let Some(value) =
                parse_key(section.get("search_page_size"), "catalog", "search_page_size")?
            {
                config.catalog.search_page_size = value;
            }
        }

        if let Some(section) = ini.section(Some("download")) {
            if let Some(value) = parse_key(section.get("timeout"), "download", "timeout")? {
                config.download.timeout = value;
            }
        }

        if let Some(section) = ini.section(Some("paths")) {
            config.paths.output_dir = non_empty(section.get("output_dir")).map(expand_tilde);
        }

        Ok(config)
    }

    /// Write to the default location, creating its directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_file_path().ok_or_else(|| ConfigError::Write {
            path: PathBuf::from(CONFIG_FILE_NAME),
            reason: "no configuration directory on this platform".to_string(),
        })?;
        self.save_to(&path)
    }

    /// Write to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::Write {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("catalog"))
            .set("api_url", self.catalog.api_url.as_str())
            .set("user_agent", self.catalog.user_agent.as_str())
            .set("game_id", self.catalog.game_id.to_string())
            .set("section_id", self.catalog.section_id.to_string())
            .set("search_page_size", self.catalog.search_page_size.to_string());
        ini.with_section(Some("download"))
            .set("timeout", self.download.timeout.to_string());
        if let Some(dir) = &self.paths.output_dir {
            ini.with_section(Some("paths"))
                .set("output_dir", dir.to_string_lossy());
        }

        ini.write_to_file(path).map_err(|e| write_err(e.to_string()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_key<T: FromStr>(
    value: Option<&str>,
    section: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();

        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.catalog.game_id, 432);
        assert_eq!(config.catalog.section_id, 4471);
        assert_eq!(config.download.timeout, 300);
        assert!(config.paths.output_dir.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let config = ConfigFile::parse(
            "[catalog]\napi_url = http://localhost:8080/addon\ngame_id = 1\n\n\
             [download]\ntimeout = 30\n\n[paths]\noutput_dir = /srv/packs\n",
        )
        .unwrap();

        assert_eq!(config.catalog.api_url, "http://localhost:8080/addon");
        assert_eq!(config.catalog.game_id, 1);
        assert_eq!(config.catalog.section_id, 4471);
        assert_eq!(config.catalog.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.download.timeout, 30);
        assert_eq!(config.paths.output_dir, Some(PathBuf::from("/srv/packs")));
    }

    #[test]
    fn test_parse_invalid_number() {
        let err = ConfigFile::parse("[download]\ntimeout = soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeout"));
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = ConfigFile::parse("[catalog]\napi_url =\n[paths]\noutput_dir =\n").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.catalog.user_agent = "packfetch-test/1.0".to_string();
        config.download.timeout = 45;
        config.paths.output_dir = Some(PathBuf::from("/tmp/packs"));
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_catalog_settings() {
        let settings = CatalogSection::default().settings();
        assert_eq!(settings, CatalogSettings::default());
    }
}
