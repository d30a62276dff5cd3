//! Update events and the emitter that fans them out.
//!
//! A one-directional, ordered notification channel from the coordinator to
//! any number of observers. Delivery is synchronous in emission order; there
//! is no buffering (observers registered after an event never see it) and no
//! back-pressure (observers must not block — they run on the presentation
//! side).

use crate::feed::VersionDescriptor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transient progress of one artifact transfer.
///
/// Exists only while the coordinator is in `Downloading`; discarded on
/// transition out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// Bytes transferred so far.
    pub bytes_transferred: u64,
    /// Total bytes expected for the transfer.
    pub total_bytes: u64,
    /// Transfer rate in bytes per second, measured over the whole transfer.
    pub bytes_per_second: u64,
}

impl DownloadProgress {
    /// A zeroed progress record for a transfer that has not moved yet.
    pub fn zero(total_bytes: u64) -> Self {
        Self {
            bytes_transferred: 0,
            total_bytes,
            bytes_per_second: 0,
        }
    }

    /// Completion percentage in `[0, 100]`. A zero-byte transfer is 100%.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
    }
}

/// Events emitted by the update coordinator.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// A newer version than the running one was found on the feed.
    UpdateAvailable {
        /// Descriptor of the available version.
        descriptor: VersionDescriptor,
    },
    /// A manual check found nothing newer. Background checks that find
    /// nothing emit no event at all.
    NoUpdateAvailable,
    /// Transfer progress while a download is in flight.
    DownloadProgress {
        /// Current progress snapshot.
        progress: DownloadProgress,
    },
    /// The artifact finished downloading and is ready to install.
    UpdateDownloaded {
        /// Descriptor of the downloaded version.
        descriptor: VersionDescriptor,
    },
    /// A check, download, or install failed.
    UpdateError {
        /// Human-readable failure detail.
        reason: String,
    },
}

impl UpdateEvent {
    /// The kind tag used for per-kind subscription.
    pub fn kind(&self) -> UpdateEventKind {
        match self {
            Self::UpdateAvailable { .. } => UpdateEventKind::UpdateAvailable,
            Self::NoUpdateAvailable => UpdateEventKind::NoUpdateAvailable,
            Self::DownloadProgress { .. } => UpdateEventKind::DownloadProgress,
            Self::UpdateDownloaded { .. } => UpdateEventKind::UpdateDownloaded,
            Self::UpdateError { .. } => UpdateEventKind::UpdateError,
        }
    }
}

/// Discriminant for subscribing to one event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateEventKind {
    /// See [`UpdateEvent::UpdateAvailable`].
    UpdateAvailable,
    /// See [`UpdateEvent::NoUpdateAvailable`].
    NoUpdateAvailable,
    /// See [`UpdateEvent::DownloadProgress`].
    DownloadProgress,
    /// See [`UpdateEvent::UpdateDownloaded`].
    UpdateDownloaded,
    /// See [`UpdateEvent::UpdateError`].
    UpdateError,
}

/// Handle returned by [`EventEmitter::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(u64);

/// Observer callback type.
pub type EventHandler = Box<dyn Fn(&UpdateEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    kind: UpdateEventKind,
    handler: EventHandler,
}

/// Typed publish/subscribe channel from the coordinator to observers.
#[derive(Default)]
pub struct EventEmitter {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    /// Create an emitter with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe(
        &self,
        kind: UpdateEventKind,
        handler: impl Fn(&UpdateEvent) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(Subscription {
            id,
            kind,
            handler: Box::new(handler),
        });
        SubscriptionHandle(id)
    }

    /// Remove one subscription. Unknown handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut guard = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|s| s.id != handle.0);
    }

    /// Remove every subscription for one event kind.
    pub fn unsubscribe_all(&self, kind: UpdateEventKind) {
        let mut guard = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|s| s.kind != kind);
    }

    /// Number of live subscriptions (all kinds).
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Broadcast an event synchronously, in registration order, to every
    /// handler subscribed to its kind.
    ///
    /// Handlers run on the emitting thread and must not re-enter the
    /// emitter or block.
    pub fn emit(&self, event: &UpdateEvent) {
        let guard = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        let kind = event.kind();
        for subscription in guard.iter().filter(|s| s.kind == kind) {
            (subscription.handler)(event);
        }
    }
}
