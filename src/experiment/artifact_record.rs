//! Artifact Record - one entry of a run's artifact tree

use serde::{Deserialize, Serialize};

/// Artifact Record represents a file or directory stored for a run.
///
/// Paths are relative to the run's artifact root and always use `/` as
/// separator, regardless of the local platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    path: String,
    #[serde(default)]
    is_dir: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::wire::de_opt_u64"
    )]
    file_size: Option<u64>,
}

impl ArtifactRecord {
    /// Create a file entry.
    #[must_use]
    pub fn file(path: impl Into<String>, file_size: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            file_size: Some(file_size),
        }
    }

    /// Create a directory entry.
    #[must_use]
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            file_size: None,
        }
    }

    /// Get the path relative to the artifact root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this entry is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Get the file size in bytes (files only).
    #[must_use]
    pub const fn file_size(&self) -> Option<u64> {
        self.file_size
    }
}

/// Join artifact path segments with `/`, skipping empty segments.
#[must_use]
pub fn join_artifact_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}/{child}"),
    }
}
