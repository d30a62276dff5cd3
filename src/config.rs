//! Configuration types for the updater and the feed publisher.

use crate::error::{Result, UpdaterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Updater (client-side) configuration.
///
/// Read once at startup and static for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Base URL of the feed endpoint (e.g. `http://localhost:3000`).
    pub feed_base_url: String,
    /// Version of the running application, compared against the feed.
    pub current_version: semver::Version,
    /// Accept prerelease-tagged versions from the feed.
    pub allow_prerelease: bool,
    /// Start the download immediately when a check finds an update.
    /// When `false`, a user/automated decision gates the download step.
    pub auto_download: bool,
    /// Allow update checks in development builds.
    pub dev_mode: bool,
    /// Directory downloaded artifacts are written to (None = system temp).
    pub download_dir: Option<PathBuf>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            feed_base_url: "http://localhost:3000".to_owned(),
            current_version: semver::Version::new(1, 0, 0),
            allow_prerelease: true,
            auto_download: false,
            dev_mode: false,
            download_dir: None,
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            UpdaterError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| UpdaterError::Config(format!("cannot parse config {}: {e}", path.display())))
    }

    /// Directory downloaded artifacts land in.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("updraft-downloads"))
    }
}

/// Feed publisher (server-side) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to (0 = auto-assign).
    pub port: u16,
    /// Directory containing the descriptor document and artifact files.
    pub root_dir: PathBuf,
    /// Filename of the descriptor document within `root_dir`.
    pub descriptor_file: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            root_dir: PathBuf::from("."),
            descriptor_file: "latest.yml".to_owned(),
        }
    }
}

impl PublisherConfig {
    /// Full path of the descriptor document.
    pub fn descriptor_path(&self) -> PathBuf {
        self.root_dir.join(&self.descriptor_file)
    }
}
