//! Headless updater demo.
//!
//! Plays the presentation layer: subscribes to coordinator events, runs a
//! manual check against a feed, downloads when an update is found, and
//! stops short of installing. Usage:
//!
//! ```text
//! updraft-demo [FEED_BASE_URL] [CURRENT_VERSION]
//! ```

use std::sync::Arc;
use updraft::{UpdateCoordinator, UpdateEventKind, UpdaterConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("updraft=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mut config = UpdaterConfig {
        dev_mode: true,
        auto_download: true,
        ..Default::default()
    };
    if let Some(base_url) = args.next() {
        config.feed_base_url = base_url;
    }
    if let Some(version) = args.next() {
        config.current_version = version
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid version {version:?}: {e}"))?;
    }

    let coordinator = Arc::new(UpdateCoordinator::new(config));

    coordinator
        .emitter()
        .subscribe(UpdateEventKind::UpdateAvailable, |event| {
            if let updraft::UpdateEvent::UpdateAvailable { descriptor } = event {
                println!("update available: {} ({})", descriptor.version, descriptor.path);
            }
        });
    coordinator
        .emitter()
        .subscribe(UpdateEventKind::NoUpdateAvailable, |_| {
            println!("already on the latest version");
        });
    coordinator
        .emitter()
        .subscribe(UpdateEventKind::DownloadProgress, |event| {
            if let updraft::UpdateEvent::DownloadProgress { progress } = event {
                println!(
                    "downloading: {:.1}% ({}/{} bytes)",
                    progress.percent(),
                    progress.bytes_transferred,
                    progress.total_bytes
                );
            }
        });
    coordinator
        .emitter()
        .subscribe(UpdateEventKind::UpdateDownloaded, |event| {
            if let updraft::UpdateEvent::UpdateDownloaded { descriptor } = event {
                println!("downloaded {} — ready to install on restart", descriptor.version);
            }
        });
    coordinator
        .emitter()
        .subscribe(UpdateEventKind::UpdateError, |event| {
            if let updraft::UpdateEvent::UpdateError { reason } = event {
                eprintln!("update failed: {reason}");
            }
        });

    coordinator.check_for_updates(true).await;

    if let Some(artifact) = coordinator.downloaded_artifact() {
        println!("artifact saved at {}", artifact.display());
    }
    Ok(())
}
