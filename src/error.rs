//! Error taxonomy for kfm.
//!
//! Parsing and planning errors are raised before anything on disk is touched.
//! Execution and reversal errors are raised after the manifest has been saved,
//! so the manifest on disk always lists exactly the moves that happened.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single manifest entry could not be reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalConflictKind {
    /// The moved file is no longer at its recorded destination
    DestinationMissing,
    /// Something already occupies the original location
    SourceOccupied,
}

impl fmt::Display for ReversalConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestinationMissing => write!(f, "moved file is missing"),
            Self::SourceOccupied => write!(f, "original location is occupied"),
        }
    }
}

#[derive(Debug, Error)]
pub enum KfmError {
    #[error("malformed well range '{token}': {reason}")]
    MalformedRange { token: String, reason: String },

    #[error("label '{label}' is assigned to well {well} more than once")]
    DuplicateLabel { label: String, well: String },

    #[error("invalid condition label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("well {well} ({xy}) has no condition in the well specification")]
    UnmappedWell { well: String, xy: String },

    #[error("{xy} could not be mapped to a plate well: {reason}")]
    UnmappedXy { xy: String, reason: String },

    #[error("planned destination {} collides: {reason}", .destination.display())]
    PathCollision { destination: PathBuf, reason: String },

    #[error("'{}' could not be moved, destination already exists: {}", .source_path.display(), .destination.display())]
    DestinationExists {
        source_path: PathBuf,
        destination: PathBuf,
    },

    #[error("no manifest found at {}; nothing to reverse", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("manifest {} is corrupt: {reason}", .path.display())]
    ManifestCorrupt { path: PathBuf, reason: String },

    #[error("cannot move {} back to {}: {kind}", .destination.display(), .source_path.display())]
    ReversalConflict {
        source_path: PathBuf,
        destination: PathBuf,
        kind: ReversalConflictKind,
    },

    #[error("files have already been moved (manifest at {}); reverse the move before moving again", .0.display())]
    ManifestExists(PathBuf),

    #[error("another kfm run is active on {}", .0.display())]
    RunInProgress(PathBuf),

    #[error("invalid grouping: {0}")]
    InvalidGroupBy(String),

    #[error("invalid well specification: {0}")]
    WellSpec(String),

    #[error("no well-condition YAML (*.yaml, *.yml) found in {}", .0.display())]
    WellSpecNotFound(PathBuf),

    #[error("failed to parse {}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to {action} {}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, KfmError>;

/// Attach the attempted action and path to an `io::Error`.
pub(crate) trait IoResultExt<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| KfmError::Filesystem {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_error_message_names_path() {
        let err: Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
            .with_path("read directory", Path::new("/plate/XY01"));
        let message = err.unwrap_err().to_string();
        assert_eq!(message, "failed to read directory /plate/XY01");
    }

    #[test]
    fn test_reversal_conflict_message() {
        let err = KfmError::ReversalConflict {
            source_path: PathBuf::from("/plate/XY01/a.tif"),
            destination: PathBuf::from("/plate/NIL/a.tif"),
            kind: ReversalConflictKind::SourceOccupied,
        };
        assert!(err.to_string().contains("original location is occupied"));
    }
}
