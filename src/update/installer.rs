//! The apply-update capability.
//!
//! Installer execution is an external collaborator: the coordinator only
//! needs "dispatch the downloaded artifact and get out of the way". The
//! [`ApplyUpdate`] trait is that seam; [`PlatformInstaller`] is the
//! permissive default that launches the artifact as a detached process.
//! Under normal operation the host application exits right after dispatch,
//! so control never returns to the coordinator.

use crate::error::{Result, UpdaterError};
use std::path::Path;

/// Capability to apply a downloaded update artifact.
pub trait ApplyUpdate: Send + Sync {
    /// Dispatch the artifact (installer) for execution.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Install`] if the artifact cannot be launched.
    fn apply(&self, artifact: &Path) -> Result<()>;
}

/// Launches the downloaded installer as a detached child process.
#[derive(Debug, Default)]
pub struct PlatformInstaller;

impl ApplyUpdate for PlatformInstaller {
    fn apply(&self, artifact: &Path) -> Result<()> {
        if !artifact.exists() {
            return Err(UpdaterError::Install(format!(
                "artifact {} does not exist",
                artifact.display()
            )));
        }

        set_executable(artifact)?;

        std::process::Command::new(artifact)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                UpdaterError::Install(format!("cannot launch {}: {e}", artifact.display()))
            })?;

        tracing::info!("installer dispatched: {}", artifact.display());
        Ok(())
    }
}

/// Set executable permission on Unix platforms.
fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
            UpdaterError::Install(format!(
                "cannot set executable permission on {}: {e}",
                path.display()
            ))
        })?;
    }
    let _ = path; // Suppress unused warning on Windows.
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn missing_artifact_is_an_install_error() {
        let installer = PlatformInstaller;
        let result = installer.apply(Path::new("/nonexistent/updraft-setup"));
        assert!(matches!(result, Err(UpdaterError::Install(_))));
    }

    #[cfg(unix)]
    #[test]
    fn set_executable_marks_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("installer.sh");
        std::fs::write(&file, "#!/bin/sh\nexit 0\n").unwrap();

        set_executable(&file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn apply_launches_a_real_script() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let script = dir.path().join("installer.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\ntouch {}\n", marker.display()),
        )
        .unwrap();

        let installer = PlatformInstaller;
        installer.apply(&script).unwrap();

        // The child is detached; poll briefly for its side effect.
        for _ in 0..50 {
            if marker.exists() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        panic!("installer script did not run");
    }
}
