use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error_handling::types::StorageError;

/// Extension every artifact carries.
pub const ARTIFACT_EXTENSION: &str = "png";

/// Timestamp layout of capture names, second granularity.
pub const CAPTURE_NAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

const MAX_NAME_LEN: usize = 255;

/// A validated artifact file name.
///
/// Guaranteed to be a single component of the content directory: no
/// separators, no `..`, no leading dot (hidden files are reserved for
/// in-progress writes) and a `.png` extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn parse(name: &str) -> Result<Self, StorageError> {
        let invalid = || StorageError::InvalidName(name.to_string());

        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(invalid());
        }
        if name.contains(['/', '\\', '\0']) || name.contains("..") || name.starts_with('.') {
            return Err(invalid());
        }
        let extension = Path::new(name).extension().and_then(|e| e.to_str());
        if extension != Some(ARTIFACT_EXTENSION) {
            return Err(invalid());
        }
        Ok(Self(name.to_string()))
    }

    /// Name of the artifact captured at `at`.
    pub fn for_capture(at: DateTime<Local>) -> Self {
        Self(format!(
            "{}.{}",
            at.format(CAPTURE_NAME_FORMAT),
            ARTIFACT_EXTENSION
        ))
    }

    /// Capture time encoded in the name, if it follows the capture pattern.
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        let stem = self.0.strip_suffix(".png")?;
        NaiveDateTime::parse_from_str(stem, CAPTURE_NAME_FORMAT).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a content directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: ArtifactName,
    pub size: u64,
}

/// Outcome of a best-effort bulk delete.
#[derive(Debug, Default)]
pub struct PurgeReport {
    pub removed: Vec<String>,
    pub failed: Vec<(String, std::io::Error)>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_capture_name_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 10, 3, 7).unwrap();
        let name = ArtifactName::for_capture(at);
        assert_eq!(name.as_str(), "2024-01-01-10-03-07.png");
        assert_eq!(name.captured_at(), Some(at.naive_local()));
    }

    #[test]
    fn test_parse_accepts_flat_png_names() {
        assert!(ArtifactName::parse("2024-01-01-10-00-00.png").is_ok());
        assert!(ArtifactName::parse("missing.png").is_ok());
        assert_eq!(ArtifactName::parse("notes.png").unwrap().captured_at(), None);
    }

    #[test]
    fn test_parse_rejects_traversal_and_separators() {
        for bad in [
            "",
            "..",
            "../secret.png",
            "..png",
            "a..b.png",
            "dir/file.png",
            "dir\\file.png",
            "/etc/passwd",
            ".hidden.png",
            "nul\0.png",
            "image.jpg",
            "png",
        ] {
            match ArtifactName::parse(bad) {
                Err(StorageError::InvalidName(_)) => {}
                other => panic!("{:?} should be rejected, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_parse_rejects_overlong_names() {
        let long = format!("{}.png", "a".repeat(300));
        assert!(ArtifactName::parse(&long).is_err());
    }
}
