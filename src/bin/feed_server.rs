//! Feed server binary.
//!
//! Serves a version descriptor document and installer artifacts from a
//! fixed directory over plain HTTP. Usage:
//!
//! ```text
//! updraft-feed-server [ROOT_DIR] [PORT]
//! ```

use updraft::{FeedPublisher, PublisherConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("updraft=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mut config = PublisherConfig::default();
    if let Some(root) = args.next() {
        config.root_dir = root.into();
    }
    if let Some(port) = args.next() {
        config.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid port {port:?}: {e}"))?;
    }

    let publisher = FeedPublisher::start(&config)
        .await
        .map_err(|e| anyhow::anyhow!("feed server failed to start: {e}"))?;

    // Serve until interrupted.
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    publisher.shutdown();
    Ok(())
}
