//! Client-side update machinery.
//!
//! The coordinator owns the update lifecycle state machine; events flow
//! one-way to observers through the emitter; the downloader and installer
//! do the actual transfer and apply steps.

pub mod coordinator;
pub mod downloader;
pub mod events;
pub mod installer;

pub use coordinator::{CoordinatorState, UpdateCoordinator};
pub use events::{DownloadProgress, EventEmitter, SubscriptionHandle, UpdateEvent, UpdateEventKind};
pub use installer::{ApplyUpdate, PlatformInstaller};
