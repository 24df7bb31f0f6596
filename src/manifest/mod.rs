//! Move manifest: record a forward run, replay it backwards.
//!
//! Each move is saved as pending before its rename and as done after it, so
//! after a crash the manifest lists every move that may have been applied.

pub mod entry;
pub mod executor;
pub mod lock;
pub mod replay;
pub mod store;

pub use entry::{EntryStatus, Manifest, ManifestEntry, ManifestState, RECORD_TIME_FORMAT};
pub use executor::{execute, ConflictMode, ExecuteOptions, ExecutionReport};
pub use lock::RunLock;
pub use replay::{replay_reverse, ReversalReport};
pub use store::ManifestStore;

/// Manifest file kept in the group folder between a run and its reversal
pub const MANIFEST_FILE_NAME: &str = "kfm_record.json";

/// Advisory lock file held for the duration of a run
pub const LOCK_FILE_NAME: &str = ".kfm.lock";

/// Suffix of a manifest archived after reversal
pub const ARCHIVE_SUFFIX: &str = "_rev_kfm_record.json";

/// Finder metadata, never moved and removed from otherwise empty dirs
pub const DS_STORE: &str = ".DS_Store";

/// Top-level names the planner must leave in place
pub fn is_reserved_name(name: &str) -> bool {
    name == DS_STORE
        || name == MANIFEST_FILE_NAME
        || name == LOCK_FILE_NAME
        || name == format!("{MANIFEST_FILE_NAME}.tmp")
        || name.ends_with(ARCHIVE_SUFFIX)
}
