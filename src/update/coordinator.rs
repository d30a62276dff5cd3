//! The update coordinator: single authority for the update lifecycle.
//!
//! Owns the `Idle / Checking / UpdateAvailable / NoUpdateAvailable /
//! Downloading / Downloaded / Error` state machine, enforces at-most-one
//! in-flight check and at-most-one in-flight download, and publishes
//! transitions as events. Every accepted command bumps a generation
//! counter; a completion carrying a stale generation (superseded by
//! `reset()` or a later command) is discarded instead of resurrecting
//! state.

use crate::config::UpdaterConfig;
use crate::error::UpdaterError;
use crate::feed::{FeedClient, VersionDescriptor};
use crate::update::downloader::download_artifact;
use crate::update::events::{DownloadProgress, EventEmitter, UpdateEvent};
use crate::update::installer::{ApplyUpdate, PlatformInstaller};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay before the one automatic background check after startup.
const AUTO_CHECK_DELAY: Duration = Duration::from_secs(3);

/// Lifecycle state of the coordinator. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorState {
    /// Nothing in flight, nothing pending.
    Idle,
    /// A feed check is in flight.
    Checking,
    /// The feed reported a newer version.
    UpdateAvailable(VersionDescriptor),
    /// The feed reported nothing newer.
    NoUpdateAvailable,
    /// An artifact transfer is in flight.
    Downloading {
        /// The version being downloaded.
        descriptor: VersionDescriptor,
        /// Latest progress snapshot.
        progress: DownloadProgress,
    },
    /// The artifact is on disk and ready to install.
    Downloaded(VersionDescriptor),
    /// The last check, download, or install failed.
    Error(String),
}

impl CoordinatorState {
    /// Whether a check or download is currently in flight.
    fn in_flight(&self) -> bool {
        matches!(self, Self::Checking | Self::Downloading { .. })
    }
}

struct Inner {
    state: CoordinatorState,
    /// Bumped by every accepted command and by `reset()`; stale async
    /// completions compare against it and are discarded.
    generation: u64,
    /// Where the last completed download landed.
    downloaded_artifact: Option<PathBuf>,
}

/// Orchestrates check → notify → download → notify → install.
pub struct UpdateCoordinator {
    config: UpdaterConfig,
    client: FeedClient,
    emitter: EventEmitter,
    installer: Box<dyn ApplyUpdate>,
    inner: Mutex<Inner>,
}

impl UpdateCoordinator {
    /// Create a coordinator in `Idle`, with the default platform installer.
    pub fn new(config: UpdaterConfig) -> Self {
        let client = FeedClient::new(config.feed_base_url.clone());
        Self {
            config,
            client,
            emitter: EventEmitter::new(),
            installer: Box::new(PlatformInstaller),
            inner: Mutex::new(Inner {
                state: CoordinatorState::Idle,
                generation: 0,
                downloaded_artifact: None,
            }),
        }
    }

    /// Replace the apply-update capability (tests, host integrations).
    pub fn with_installer(mut self, installer: impl ApplyUpdate + 'static) -> Self {
        self.installer = Box::new(installer);
        self
    }

    /// The notification channel observers subscribe on.
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CoordinatorState {
        self.lock().state.clone()
    }

    /// Path of the downloaded artifact, once in `Downloaded`.
    pub fn downloaded_artifact(&self) -> Option<PathBuf> {
        self.lock().downloaded_artifact.clone()
    }

    /// Issue the one automatic background check, three seconds from now.
    ///
    /// The check runs with `manual = false` and is subject to the same
    /// single-flight rule as manual checks: if a manual check is already in
    /// flight when the timer fires, this one is skipped, not queued.
    pub fn spawn_auto_check(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(AUTO_CHECK_DELAY).await;
            debug!("automatic update check firing");
            coordinator.check_for_updates(false).await;
        })
    }

    /// Check the feed for a newer version.
    ///
    /// No-op while a check or download is already in flight. On a newer
    /// version, transitions to `UpdateAvailable` and emits the matching
    /// event (and starts the download when `auto_download` is configured).
    /// When nothing newer is found, the `NoUpdateAvailable` event fires only
    /// for manual checks — background checks that find nothing stay silent.
    /// Fetch failures land in `Error` and emit `UpdateError`. The
    /// single-flight guard is released in every case.
    pub async fn check_for_updates(&self, manual: bool) {
        if cfg!(debug_assertions) && !self.config.dev_mode {
            warn!("update check skipped: development build without dev_mode");
            return;
        }

        let generation = {
            let mut inner = self.lock();
            if inner.state.in_flight() {
                debug!("update check skipped: operation already in flight");
                return;
            }
            inner.generation += 1;
            inner.state = CoordinatorState::Checking;
            inner.generation
        };

        info!(
            manual,
            current = %self.config.current_version,
            feed = self.client.base_url(),
            "checking for updates"
        );
        let result = self.client.fetch_latest().await;

        let event = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!("stale check completion discarded");
                return;
            }
            match result {
                Ok(descriptor) if self.accepts(&descriptor) => {
                    info!(version = %descriptor.version, "update available");
                    inner.state = CoordinatorState::UpdateAvailable(descriptor.clone());
                    Some(UpdateEvent::UpdateAvailable { descriptor })
                }
                Ok(descriptor) => {
                    info!(version = %descriptor.version, "no update available");
                    inner.state = CoordinatorState::NoUpdateAvailable;
                    manual.then_some(UpdateEvent::NoUpdateAvailable)
                }
                Err(e) => {
                    warn!("update check failed: {e}");
                    inner.state = CoordinatorState::Error(e.to_string());
                    Some(UpdateEvent::UpdateError {
                        reason: e.to_string(),
                    })
                }
            }
        };

        let update_found = matches!(event, Some(UpdateEvent::UpdateAvailable { .. }));
        if let Some(event) = event {
            self.emitter.emit(&event);
        }

        if update_found && self.config.auto_download {
            self.download_update().await;
        }
    }

    /// Download the artifact of the available update.
    ///
    /// Valid only from `UpdateAvailable`; a silent no-op from any other
    /// state. Streams `DownloadProgress` events (monotone in bytes) while
    /// `Downloading`, then lands in `Downloaded` + `UpdateDownloaded`, or in
    /// `Error` + `UpdateError` on a mid-transfer failure.
    pub async fn download_update(&self) {
        let (descriptor, generation) = {
            let mut inner = self.lock();
            let CoordinatorState::UpdateAvailable(descriptor) = &inner.state else {
                debug!("download request ignored: no update available");
                return;
            };
            let descriptor = descriptor.clone();
            inner.generation += 1;
            inner.state = CoordinatorState::Downloading {
                descriptor: descriptor.clone(),
                progress: DownloadProgress::zero(descriptor.size.unwrap_or(0)),
            };
            (descriptor, inner.generation)
        };

        let url = descriptor.artifact_url(self.client.base_url());
        let dest = self.config.download_dir().join(&descriptor.path);
        info!(version = %descriptor.version, url, "downloading update");

        let result = download_artifact(self.client.http(), &url, &dest, |progress| {
            {
                let mut inner = self.lock();
                if inner.generation != generation {
                    return;
                }
                if let CoordinatorState::Downloading { progress: current, .. } = &mut inner.state {
                    *current = progress;
                }
            }
            self.emitter.emit(&UpdateEvent::DownloadProgress { progress });
        })
        .await;

        let event = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!("stale download completion discarded");
                return;
            }
            match result {
                Ok(()) => {
                    info!(version = %descriptor.version, dest = %dest.display(), "update downloaded");
                    inner.state = CoordinatorState::Downloaded(descriptor.clone());
                    inner.downloaded_artifact = Some(dest);
                    UpdateEvent::UpdateDownloaded { descriptor }
                }
                Err(e) => {
                    warn!("update download failed: {e}");
                    inner.state = CoordinatorState::Error(e.to_string());
                    UpdateEvent::UpdateError {
                        reason: e.to_string(),
                    }
                }
            }
        };
        self.emitter.emit(&event);
    }

    /// Dispatch the downloaded update to the apply-update capability.
    ///
    /// Valid only from `Downloaded`; a silent no-op otherwise. Under normal
    /// operation the capability restarts the host process; if control does
    /// return, the coordinator resets to `Idle`. An apply failure lands in
    /// `Error` + `UpdateError` with no automatic retry.
    pub fn install_update(&self) {
        let artifact = {
            let inner = self.lock();
            let CoordinatorState::Downloaded(_) = &inner.state else {
                debug!("install request ignored: no downloaded update");
                return;
            };
            inner.downloaded_artifact.clone()
        };
        let Some(artifact) = artifact else {
            self.fail_install("downloaded artifact path lost".to_owned());
            return;
        };

        match self.installer.apply(&artifact) {
            Ok(()) => {
                let mut inner = self.lock();
                inner.generation += 1;
                inner.state = CoordinatorState::Idle;
                inner.downloaded_artifact = None;
            }
            Err(e) => self.fail_install(e.to_string()),
        }
    }

    /// Force-return to `Idle` from any state.
    ///
    /// Does not stop an in-flight network operation, but bumps the
    /// generation so its late completion is discarded.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = CoordinatorState::Idle;
        inner.downloaded_artifact = None;
    }

    /// Version gate: strictly newer than the running version, and
    /// prerelease-tagged only when the prerelease channel is allowed.
    /// Equal versions are "no update".
    fn accepts(&self, descriptor: &VersionDescriptor) -> bool {
        if !self.config.allow_prerelease && descriptor.is_prerelease() {
            return false;
        }
        descriptor.version > self.config.current_version
    }

    fn fail_install(&self, reason: String) {
        warn!("update install failed: {reason}");
        {
            let mut inner = self.lock();
            inner.state = CoordinatorState::Error(reason.clone());
        }
        self.emitter
            .emit(&UpdateEvent::UpdateError { reason: UpdaterError::Install(reason).to_string() });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
