//! Manifest types
//!
//! A manifest is the append-only record of one forward run: every move, in
//! execution order, plus the directories the run created. An entry is written
//! as `pending` before its rename and flipped to `done` after it, so a run
//! killed between the two still leaves a record of the move. Reversal walks
//! the entries backwards.

use crate::layout::MoveKind;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Timestamp format used for `record_time` and archived manifest names
pub const RECORD_TIME_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

/// Lifecycle of a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestState {
    /// Forward run started; moves are appended as they complete
    #[default]
    InProgress,
    /// Forward run finished without stopping
    Complete,
    /// Reversal started; reversed entries are flagged
    Reversing,
}

/// Progress of one recorded move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Recorded before the rename; the move may or may not have happened
    Pending,
    /// Rename completed
    #[default]
    Done,
}

/// One move of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Execution order within the run
    pub sequence: u32,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: MoveKind,
    pub moved_at: DateTime<Utc>,
    #[serde(default)]
    pub status: EntryStatus,
    /// Set once the move has been undone
    #[serde(default)]
    pub reversed: bool,
}

impl ManifestEntry {
    /// The move that undoes this one, as (from, to)
    pub fn inverse(&self) -> (&Path, &Path) {
        (&self.destination, &self.source)
    }

    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    pub fn mark_reversed(&mut self) {
        self.reversed = true;
    }

    pub fn description(&self) -> String {
        format!(
            "Move {} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version for forward compatibility
    pub version: u32,
    pub run_id: String,
    /// Group folder that was reorganised
    pub root: PathBuf,
    /// Local time the run started, `YYYY.MM.DD_HH.MM.SS`
    pub record_time: String,
    pub started_at: DateTime<Utc>,
    pub state: ManifestState,
    pub moves: Vec<ManifestEntry>,
    /// Directories created by the run, in creation order
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
}

impl Manifest {
    /// Current schema version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(root: PathBuf) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            run_id: Uuid::new_v4().to_string(),
            root,
            record_time: Local::now().format(RECORD_TIME_FORMAT).to_string(),
            started_at: Utc::now(),
            state: ManifestState::InProgress,
            moves: Vec::new(),
            created_dirs: Vec::new(),
        }
    }

    /// Append a move about to be attempted and return its index
    pub fn begin_move(&mut self, source: PathBuf, destination: PathBuf, kind: MoveKind) -> usize {
        let sequence = self.moves.len();
        self.moves.push(ManifestEntry {
            sequence: sequence as u32,
            source,
            destination,
            kind,
            moved_at: Utc::now(),
            status: EntryStatus::Pending,
            reversed: false,
        });
        sequence
    }

    /// Mark the move at `index` as done
    pub fn complete_move(&mut self, index: usize) {
        if let Some(entry) = self.moves.get_mut(index) {
            entry.status = EntryStatus::Done;
            entry.moved_at = Utc::now();
        }
    }

    /// Drop the last entry if it is still pending at `index`
    pub fn discard_pending(&mut self, index: usize) {
        if index + 1 == self.moves.len() && self.moves[index].is_pending() {
            self.moves.pop();
        }
    }

    pub fn record_created_dir(&mut self, path: PathBuf) {
        self.created_dirs.push(path);
    }

    /// Number of moves still to be undone
    pub fn pending_reversal(&self) -> usize {
        self.moves.iter().filter(|m| !m.reversed).count()
    }

    /// Basic structural checks after loading
    pub fn check(&self) -> Result<(), String> {
        if self.version > Self::CURRENT_VERSION {
            return Err(format!(
                "written by a newer kfm (version {}, supported {})",
                self.version,
                Self::CURRENT_VERSION
            ));
        }
        for (i, entry) in self.moves.iter().enumerate() {
            if entry.sequence as usize != i {
                return Err(format!(
                    "entry {i} has sequence {} (entries out of order)",
                    entry.sequence
                ));
            }
            if entry.source.as_os_str().is_empty() || entry.destination.as_os_str().is_empty() {
                return Err(format!("entry {i} has an empty path"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_move_sequences() {
        let mut manifest = Manifest::new(PathBuf::from("/g"));
        manifest.begin_move("/g/a".into(), "/g/x/a".into(), MoveKind::Image);
        let index = manifest.begin_move("/g/b".into(), "/g/x/b".into(), MoveKind::Unmoved);

        assert_eq!(index, 1);
        assert_eq!(manifest.moves[1].sequence, 1);
        assert_eq!(manifest.pending_reversal(), 2);
        assert!(manifest.check().is_ok());
    }

    #[test]
    fn test_move_status_lifecycle() {
        let mut manifest = Manifest::new(PathBuf::from("/g"));
        let first = manifest.begin_move("/g/a".into(), "/g/x/a".into(), MoveKind::Image);
        assert!(manifest.moves[first].is_pending());
        manifest.complete_move(first);
        assert_eq!(manifest.moves[first].status, EntryStatus::Done);

        let second = manifest.begin_move("/g/b".into(), "/g/x/b".into(), MoveKind::Image);
        // Only a trailing pending entry is dropped
        manifest.discard_pending(first);
        assert_eq!(manifest.moves.len(), 2);
        manifest.discard_pending(second);
        assert_eq!(manifest.moves.len(), 1);
        assert!(manifest.check().is_ok());
    }

    #[test]
    fn test_inverse_swaps_paths() {
        let mut manifest = Manifest::new(PathBuf::from("/g"));
        manifest.begin_move("/g/a".into(), "/g/x/a".into(), MoveKind::Image);
        let (from, to) = manifest.moves[0].inverse();
        assert_eq!(from, Path::new("/g/x/a"));
        assert_eq!(to, Path::new("/g/a"));
    }

    #[test]
    fn test_json_shape() {
        let mut manifest = Manifest::new(PathBuf::from("/g"));
        let index = manifest.begin_move("/g/a".into(), "/g/x/a".into(), MoveKind::Image);
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["moves"][0]["status"], "pending");

        manifest.complete_move(index);
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["state"], "in_progress");
        assert_eq!(json["moves"][0]["status"], "done");
        assert_eq!(json["moves"][0]["source"], "/g/a");
        assert_eq!(json["moves"][0]["destination"], "/g/x/a");
        assert_eq!(json["moves"][0]["kind"], "image");
        assert!(json["recordTime"].is_string());
    }

    #[test]
    fn test_check_rejects_reordered_entries() {
        let mut manifest = Manifest::new(PathBuf::from("/g"));
        manifest.begin_move("/g/a".into(), "/g/x/a".into(), MoveKind::Image);
        manifest.moves[0].sequence = 4;
        assert!(manifest.check().unwrap_err().contains("out of order"));
    }

    #[test]
    fn test_missing_flags_default_to_done_and_not_reversed() {
        let json = r#"{"sequence":0,"source":"/a","destination":"/b","kind":"image","movedAt":"2024-01-01T00:00:00Z"}"#;
        let entry: ManifestEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.reversed);
        assert_eq!(entry.status, EntryStatus::Done);
    }
}
