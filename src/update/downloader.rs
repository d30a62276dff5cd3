//! Streaming artifact download.
//!
//! Transfers the installer artifact to a local file, reporting progress per
//! chunk through a callback. Error classification and state transitions are
//! the coordinator's job; this layer only moves bytes.

use crate::error::{Result, UpdaterError};
use crate::update::events::DownloadProgress;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Instant;
use tokio::io::AsyncWriteExt;

/// Download `url` to `dest`, invoking `on_progress` after every chunk.
///
/// Progress is monotonically non-decreasing in bytes transferred; the final
/// invocation reports `bytes_transferred == total_bytes`. When the server
/// sends no `Content-Length`, the total is pinned to the byte count once the
/// transfer completes.
///
/// # Errors
///
/// Returns [`UpdaterError::Download`] on transport failure, non-success
/// status, or a short/overlong body; I/O failures writing `dest` map to the
/// same class.
pub async fn download_artifact(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    mut on_progress: impl FnMut(DownloadProgress),
) -> Result<()> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| UpdaterError::Download(format!("GET {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpdaterError::Download(format!(
            "GET {url} returned status {status}"
        )));
    }

    let declared_total = response.content_length().unwrap_or(0);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| UpdaterError::Download(format!("cannot create {}: {e}", parent.display())))?;
    }
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| UpdaterError::Download(format!("cannot create {}: {e}", dest.display())))?;

    let started = Instant::now();
    let mut transferred: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| UpdaterError::Download(format!("transfer interrupted: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| UpdaterError::Download(format!("write to {} failed: {e}", dest.display())))?;

        transferred += chunk.len() as u64;
        on_progress(DownloadProgress {
            bytes_transferred: transferred,
            total_bytes: declared_total.max(transferred),
            bytes_per_second: rate(transferred, started),
        });
    }

    file.flush()
        .await
        .map_err(|e| UpdaterError::Download(format!("flush of {} failed: {e}", dest.display())))?;

    if declared_total > 0 && transferred != declared_total {
        return Err(UpdaterError::Download(format!(
            "transfer truncated: got {transferred} of {declared_total} bytes"
        )));
    }

    // A zero-byte or unknown-length body still completes with one final report.
    if transferred == 0 {
        on_progress(DownloadProgress {
            bytes_transferred: 0,
            total_bytes: 0,
            bytes_per_second: 0,
        });
    }

    Ok(())
}

fn rate(transferred: u64, started: Instant) -> u64 {
    let elapsed = started.elapsed().as_secs_f64();
    if elapsed <= f64::EPSILON {
        return 0;
    }
    (transferred as f64 / elapsed) as u64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn downloads_bytes_with_monotone_progress() {
        let server = MockServer::start().await;
        let body = vec![0xABu8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/download/app-setup.exe"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app-setup.exe");
        let mut reports: Vec<DownloadProgress> = Vec::new();

        let http = reqwest::Client::new();
        download_artifact(
            &http,
            &format!("{}/download/app-setup.exe", server.uri()),
            &dest,
            |p| reports.push(p),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(!reports.is_empty());
        for pair in reports.windows(2) {
            assert!(pair[1].bytes_transferred >= pair[0].bytes_transferred);
        }
        let last = reports.last().unwrap();
        assert_eq!(last.bytes_transferred, body.len() as u64);
        assert_eq!(last.bytes_transferred, last.total_bytes);
        assert!((last.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn non_success_status_is_a_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/missing.exe"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.exe");
        let http = reqwest::Client::new();
        let result = download_artifact(
            &http,
            &format!("{}/download/missing.exe", server.uri()),
            &dest,
            |_| {},
        )
        .await;

        assert!(matches!(result, Err(UpdaterError::Download(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn zero_byte_body_reports_completion() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/empty.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::<u8>::new()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.bin");
        let mut reports = Vec::new();
        let http = reqwest::Client::new();
        download_artifact(
            &http,
            &format!("{}/download/empty.bin", server.uri()),
            &dest,
            |p| reports.push(p),
        )
        .await
        .unwrap();

        assert!(dest.exists());
        let last = reports.last().unwrap();
        assert_eq!(last.bytes_transferred, 0);
        assert!((last.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never.bin");
        let http = reqwest::Client::new();
        let result = download_artifact(&http, "http://127.0.0.1:1/download/x", &dest, |_| {}).await;
        assert!(matches!(result, Err(UpdaterError::Download(_))));
    }
}
