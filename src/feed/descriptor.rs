//! The version descriptor document.
//!
//! The feed publishes an electron-updater style `latest.yml`: a YAML
//! document naming the latest version and the installer artifact relative
//! to the publisher root. A descriptor is immutable once parsed; a new
//! check produces a new descriptor.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

/// Metadata record describing the latest published build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    /// Semantic version of the published build.
    pub version: semver::Version,
    /// Artifact filename, relative to the publisher's served root.
    pub path: String,
    /// ISO 8601 release date, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Artifact size in bytes, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Artifact checksum, if published. Carried but not verified here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
}

impl VersionDescriptor {
    /// Parse a descriptor from raw YAML document text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedDocument`] if the text does not parse
    /// or the artifact path escapes the served root.
    pub fn parse(text: &str) -> Result<Self, FetchError> {
        let descriptor: Self = serde_yaml::from_str(text)
            .map_err(|e| FetchError::MalformedDocument(format!("descriptor parse failed: {e}")))?;
        descriptor.validate_path()?;
        Ok(descriptor)
    }

    /// Serialize the descriptor back to YAML document text.
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }

    /// Returns `true` if the version carries a prerelease tag.
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Absolute download URL of the artifact under a feed base URL.
    pub fn artifact_url(&self, base_url: &str) -> String {
        format!("{}/download/{}", base_url.trim_end_matches('/'), self.path)
    }

    /// The artifact path must stay inside the publisher root: relative,
    /// no parent-directory segments, no backslash tricks.
    fn validate_path(&self) -> Result<(), FetchError> {
        let path = self.path.as_str();
        let escapes = path.is_empty()
            || path.starts_with('/')
            || path.contains('\\')
            || path.split('/').any(|segment| segment == ".." || segment.is_empty());
        if escapes {
            return Err(FetchError::MalformedDocument(format!(
                "artifact path {path:?} escapes the served root"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const LATEST_YML: &str = "\
version: 1.2.0
path: app-1.2.0-setup.exe
releaseDate: '2025-06-01T00:00:00.000Z'
size: 52428800
sha512: abc123
";

    #[test]
    fn parse_full_document() {
        let d = VersionDescriptor::parse(LATEST_YML).unwrap();
        assert_eq!(d.version, semver::Version::new(1, 2, 0));
        assert_eq!(d.path, "app-1.2.0-setup.exe");
        assert_eq!(d.release_date.as_deref(), Some("2025-06-01T00:00:00.000Z"));
        assert_eq!(d.size, Some(52_428_800));
        assert_eq!(d.sha512.as_deref(), Some("abc123"));
    }

    #[test]
    fn parse_minimal_document() {
        let d = VersionDescriptor::parse("version: 2.0.0\npath: setup.exe\n").unwrap();
        assert_eq!(d.version.to_string(), "2.0.0");
        assert!(d.release_date.is_none());
        assert!(d.size.is_none());
        assert!(d.sha512.is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        let result = VersionDescriptor::parse("{not yaml at all ::::");
        assert!(matches!(result, Err(FetchError::MalformedDocument(_))));
    }

    #[test]
    fn parse_rejects_missing_version() {
        let result = VersionDescriptor::parse("path: setup.exe\n");
        assert!(matches!(result, Err(FetchError::MalformedDocument(_))));
    }

    #[test]
    fn parse_rejects_non_semver_version() {
        let result = VersionDescriptor::parse("version: latest\npath: setup.exe\n");
        assert!(matches!(result, Err(FetchError::MalformedDocument(_))));
    }

    #[test]
    fn parse_rejects_traversal_paths() {
        for path in ["../escape.exe", "/etc/passwd", "a/../../b.exe", "dir\\file.exe", ""] {
            let text = format!("version: 1.0.0\npath: '{path}'\n");
            let result = VersionDescriptor::parse(&text);
            assert!(
                matches!(result, Err(FetchError::MalformedDocument(_))),
                "path {path:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_accepts_nested_relative_path() {
        let d = VersionDescriptor::parse("version: 1.0.0\npath: nightly/app-setup.exe\n").unwrap();
        assert_eq!(d.path, "nightly/app-setup.exe");
    }

    #[test]
    fn prerelease_detection() {
        let stable = VersionDescriptor::parse("version: 1.2.0\npath: a.exe\n").unwrap();
        assert!(!stable.is_prerelease());
        let beta = VersionDescriptor::parse("version: 1.2.0-beta.1\npath: a.exe\n").unwrap();
        assert!(beta.is_prerelease());
    }

    #[test]
    fn artifact_url_joins_base() {
        let d = VersionDescriptor::parse("version: 1.2.0\npath: app-setup.exe\n").unwrap();
        assert_eq!(
            d.artifact_url("http://localhost:3000"),
            "http://localhost:3000/download/app-setup.exe"
        );
        // Trailing slash on the base does not double up.
        assert_eq!(
            d.artifact_url("http://localhost:3000/"),
            "http://localhost:3000/download/app-setup.exe"
        );
    }

    #[test]
    fn yaml_round_trip_preserves_fields() {
        let d = VersionDescriptor::parse(LATEST_YML).unwrap();
        let restored = VersionDescriptor::parse(&d.to_yaml()).unwrap();
        assert_eq!(restored, d);
    }
}
