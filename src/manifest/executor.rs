//! Forward execution
//!
//! Applies a validated [`MovePlan`] one move at a time. Before each rename
//! the move and the directories it needs are saved as a pending entry; after
//! the rename the entry is saved as done. Whatever stops the run, the
//! manifest on disk covers every move that may have happened and `-rev` can
//! settle and undo them.

use super::entry::{Manifest, ManifestState};
use super::store::ManifestStore;
use crate::error::{IoResultExt, KfmError, Result};
use crate::fs::FileSystem;
use crate::layout::{MovePlan, PlannedMove};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Policy for a destination that already exists at execution time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// Stop the run with `DestinationExists`
    #[default]
    Abort,
    /// Leave the file where it is and continue
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub on_conflict: ConflictMode,
}

/// Outcome of a forward run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub moved: usize,
    /// Reasons for skipped moves
    pub skipped: Vec<String>,
    pub created_dirs: usize,
    pub manifest_path: PathBuf,
}

/// Apply `plan`, recording every move in `store`
pub fn execute(
    fs: &dyn FileSystem,
    plan: &MovePlan,
    store: &ManifestStore,
    options: &ExecuteOptions,
) -> Result<ExecutionReport> {
    plan.validate()?;
    if store.exists(fs) {
        return Err(KfmError::ManifestExists(store.path().to_path_buf()));
    }

    let mut manifest = Manifest::new(plan.root.clone());
    store.save(fs, &manifest)?;

    tracing::info!(
        run_id = %manifest.run_id,
        moves = plan.len(),
        manifest = %store.path().display(),
        "Starting move"
    );

    let mut report = ExecutionReport {
        manifest_path: store.path().to_path_buf(),
        ..ExecutionReport::default()
    };

    for planned in &plan.moves {
        match apply_move(fs, store, planned, &mut manifest, options) {
            Ok(Some(reason)) => {
                tracing::warn!(
                    source = %planned.source.display(),
                    reason = %reason,
                    "Skipped move"
                );
                report.skipped.push(reason);
            }
            Ok(None) => report.moved += 1,
            Err(err) => {
                if let Err(save_err) = store.save(fs, &manifest) {
                    tracing::error!(error = %save_err, "Could not save manifest after failure");
                }
                tracing::error!(
                    moved = report.moved,
                    remaining = plan.len() - report.moved - report.skipped.len(),
                    error = %err,
                    "Move stopped; reverse with -rev to restore the folder"
                );
                return Err(err);
            }
        }
    }

    manifest.state = ManifestState::Complete;
    store.save(fs, &manifest)?;
    report.created_dirs = manifest.created_dirs.len();

    tracing::info!(
        moved = report.moved,
        skipped = report.skipped.len(),
        created_dirs = report.created_dirs,
        "Move complete"
    );
    Ok(report)
}

/// Perform one move. `Ok(Some(reason))` means it was skipped.
fn apply_move(
    fs: &dyn FileSystem,
    store: &ManifestStore,
    planned: &PlannedMove,
    manifest: &mut Manifest,
    options: &ExecuteOptions,
) -> Result<Option<String>> {
    let source = &planned.source;
    let destination = &planned.destination;

    if !fs.exists(source) {
        return match options.on_conflict {
            ConflictMode::Skip => Ok(Some(format!("Source not found: {}", source.display()))),
            ConflictMode::Abort => Err(KfmError::Filesystem {
                action: "move",
                path: source.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "source not found"),
            }),
        };
    }

    if fs.exists(destination) {
        return match options.on_conflict {
            ConflictMode::Skip => Ok(Some(format!(
                "Destination exists: {}",
                destination.display()
            ))),
            ConflictMode::Abort => Err(KfmError::DestinationExists {
                source_path: source.clone(),
                destination: destination.clone(),
            }),
        };
    }

    let parents = missing_parents(fs, destination);
    for dir in &parents {
        manifest.record_created_dir(dir.clone());
    }
    let index = manifest.begin_move(source.clone(), destination.clone(), planned.kind);
    store.save(fs, manifest)?;

    for dir in &parents {
        fs.create_dir(dir).with_path("create directory", dir)?;
    }
    if let Err(err) = fs.rename(source, destination) {
        manifest.discard_pending(index);
        return Err(KfmError::Filesystem {
            action: "move",
            path: source.clone(),
            source: err,
        });
    }

    manifest.complete_move(index);
    store.save(fs, manifest)?;
    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        "Moved"
    );
    Ok(None)
}

/// Missing ancestors of `path`, outermost first
fn missing_parents(fs: &dyn FileSystem, path: &Path) -> Vec<PathBuf> {
    let mut missing: Vec<PathBuf> = path
        .ancestors()
        .skip(1)
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !fs.exists(ancestor))
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}
