//! Reversal
//!
//! Replays a manifest backwards: every recorded move is undone in reverse
//! order, then the directories the run created are removed deepest first
//! and the manifest is archived. Reversal stops at the first entry that
//! cannot be undone; the entries already undone are flagged in the manifest
//! so a later `-rev` continues where this one stopped.
//!
//! A pending entry is one whose rename may not have happened. If its source
//! is still in place and its destination is absent it is settled without
//! moving anything; otherwise it is undone like any other entry.

use super::entry::{Manifest, ManifestState};
use super::store::ManifestStore;
use super::DS_STORE;
use crate::error::{IoResultExt, KfmError, ReversalConflictKind, Result};
use crate::fs::FileSystem;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a reversal
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalReport {
    pub reversed: usize,
    /// Entries undone by an earlier, interrupted reversal
    pub already_reversed: usize,
    /// Pending entries whose move never happened
    pub never_moved: usize,
    pub removed_dirs: usize,
    /// Created directories left in place because they are not empty
    pub kept_dirs: Vec<PathBuf>,
    pub archived_manifest: PathBuf,
}

/// Undo the run recorded in `store`
pub fn replay_reverse(fs: &dyn FileSystem, store: &ManifestStore) -> Result<ReversalReport> {
    let mut manifest = store.load(fs)?;

    let mut report = ReversalReport {
        already_reversed: manifest.moves.len() - manifest.pending_reversal(),
        ..ReversalReport::default()
    };

    tracing::info!(
        run_id = %manifest.run_id,
        record_time = %manifest.record_time,
        pending = manifest.pending_reversal(),
        "Reversing move"
    );

    manifest.state = ManifestState::Reversing;
    store.save(fs, &manifest)?;

    for index in (0..manifest.moves.len()).rev() {
        if manifest.moves[index].reversed {
            continue;
        }
        if never_moved(fs, &manifest, index) {
            tracing::info!(
                operation = %manifest.moves[index].description(),
                "Move never happened, nothing to undo"
            );
            manifest.moves[index].mark_reversed();
            store.save(fs, &manifest)?;
            report.never_moved += 1;
            continue;
        }
        if let Err(err) = reverse_entry(fs, &manifest, index) {
            store.save(fs, &manifest)?;
            tracing::error!(
                reversed = report.reversed,
                remaining = manifest.pending_reversal(),
                error = %err,
                "Reversal stopped"
            );
            return Err(err);
        }
        manifest.moves[index].mark_reversed();
        store.save(fs, &manifest)?;
        report.reversed += 1;
    }

    remove_created_dirs(fs, &manifest, &mut report)?;

    report.archived_manifest = store.archive(fs, &manifest)?;

    tracing::info!(
        reversed = report.reversed,
        removed_dirs = report.removed_dirs,
        kept_dirs = report.kept_dirs.len(),
        archive = %report.archived_manifest.display(),
        "Reversal complete"
    );
    Ok(report)
}

/// A pending entry whose rename did not take place
fn never_moved(fs: &dyn FileSystem, manifest: &Manifest, index: usize) -> bool {
    let entry = &manifest.moves[index];
    entry.is_pending() && fs.exists(&entry.source) && !fs.exists(&entry.destination)
}

fn reverse_entry(fs: &dyn FileSystem, manifest: &Manifest, index: usize) -> Result<()> {
    let entry = &manifest.moves[index];
    let (from, to) = entry.inverse();

    if !fs.exists(from) {
        return Err(conflict(manifest, index, ReversalConflictKind::DestinationMissing));
    }
    if fs.exists(to) {
        return Err(conflict(manifest, index, ReversalConflictKind::SourceOccupied));
    }

    if let Some(parent) = to.parent() {
        ensure_dir(fs, parent)?;
    }
    fs.rename(from, to).with_path("move back", from)?;

    tracing::debug!(operation = %entry.description(), "Reversed");
    Ok(())
}

fn conflict(manifest: &Manifest, index: usize, kind: ReversalConflictKind) -> KfmError {
    let entry = &manifest.moves[index];
    KfmError::ReversalConflict {
        source_path: entry.source.clone(),
        destination: entry.destination.clone(),
        kind,
    }
}

/// Recreate a missing original directory
fn ensure_dir(fs: &dyn FileSystem, dir: &Path) -> Result<()> {
    let missing: Vec<&Path> = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !fs.exists(ancestor))
        .collect();
    for path in missing.into_iter().rev() {
        tracing::warn!(path = %path.display(), "Recreating missing original directory");
        fs.create_dir(path).with_path("create directory", path)?;
    }
    Ok(())
}

fn remove_created_dirs(
    fs: &dyn FileSystem,
    manifest: &Manifest,
    report: &mut ReversalReport,
) -> Result<()> {
    let mut dirs: Vec<&PathBuf> = manifest.created_dirs.iter().collect();
    dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));

    for dir in dirs {
        if !fs.is_dir(dir) {
            continue;
        }
        let entries = fs.list_dir(dir).with_path("read directory", dir)?;
        if entries.len() == 1 && entries[0].name == DS_STORE {
            fs.remove_file(&entries[0].path)
                .with_path("remove", &entries[0].path)?;
        } else if !entries.is_empty() {
            tracing::warn!(
                path = %dir.display(),
                entries = entries.len(),
                "Created directory is not empty, keeping it"
            );
            report.kept_dirs.push(dir.clone());
            continue;
        }
        fs.remove_dir(dir).with_path("remove directory", dir)?;
        report.removed_dirs += 1;
    }
    Ok(())
}
