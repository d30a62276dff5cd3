//! Updraft: auto-update feed protocol and client-side state machine.
//!
//! A demonstration of desktop auto-update wiring with the reusable part —
//! the update coordinator — factored out from the GUI glue:
//! - **Feed client**: one HTTP GET for the version descriptor document.
//! - **Update coordinator**: the `Idle / Checking / UpdateAvailable /
//!   Downloading / Downloaded` state machine with single-flight guards.
//! - **Event emitter**: ordered one-way notifications to observers.
//! - **Feed publisher**: a local HTTP origin serving the descriptor and
//!   installer artifacts.
//!
//! Presentation (windows, dialogs) and installer mechanics are external
//! collaborators: the former subscribes on the emitter, the latter plugs in
//! behind the [`update::ApplyUpdate`] trait.

pub mod config;
pub mod error;
pub mod feed;
pub mod publisher;
pub mod update;

pub use config::{PublisherConfig, UpdaterConfig};
pub use error::{FetchError, Result, UpdaterError};
pub use feed::{FeedClient, VersionDescriptor};
pub use publisher::FeedPublisher;
pub use update::{
    CoordinatorState, DownloadProgress, EventEmitter, UpdateCoordinator, UpdateEvent,
    UpdateEventKind,
};
