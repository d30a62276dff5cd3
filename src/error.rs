//! Error types for the update system.

/// Failure modes of a single feed fetch.
///
/// The feed client performs exactly one request per call and maps every
/// failure into one of these two classes. Retries, if any, belong to the
/// coordinator.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure, timeout, or non-success HTTP status.
    #[error("feed unreachable: {0}")]
    Unreachable(String),

    /// The response body did not parse as a feed envelope or descriptor.
    #[error("malformed feed document: {0}")]
    MalformedDocument(String),
}

/// Top-level error type for the updater.
#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    /// Feed fetch error (transport or parse).
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Artifact transfer or write error.
    #[error("download error: {0}")]
    Download(String),

    /// Apply-update capability failure.
    #[error("install error: {0}")]
    Install(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Feed publisher error (bind, serve).
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpdaterError>;
