//! Forward and reverse runs over a group folder.

use crate::error::{KfmError, Result};
use crate::fs::{FileSystem, OsFileSystem};
use crate::layout::{plan, GroupBy, MovePlan, PlanOptions, ScanOrder, UnmappedPolicy};
use crate::manifest::{
    execute, replay_reverse, ConflictMode, ExecuteOptions, ExecutionReport, Manifest,
    ManifestStore, ReversalReport, RunLock,
};
use crate::wells::spec::locate;
use crate::wells::{resolve, PlateFormat, WellSpec, DEFAULT_SEPARATOR};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Everything one invocation needs, after argument parsing
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub group_folder: PathBuf,
    pub direction: Direction,
    /// Well-condition YAML or a folder containing one; defaults to the group folder
    pub yaml_path: Option<PathBuf>,
    pub group_by: GroupBy,
    /// Overrides the `plate` key of the YAML file
    pub plate: Option<PlateFormat>,
    pub scan_order: ScanOrder,
    pub separator: String,
    pub unmapped: UnmappedPolicy,
    pub on_conflict: ConflictMode,
    pub collect_unmoved: bool,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn new(group_folder: PathBuf) -> Self {
        Self {
            group_folder,
            direction: Direction::Forward,
            yaml_path: None,
            group_by: GroupBy::default(),
            plate: None,
            scan_order: ScanOrder::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
            unmapped: UnmappedPolicy::default(),
            on_conflict: ConflictMode::default(),
            collect_unmoved: true,
            dry_run: false,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Forward dry run
    Planned(MovePlan),
    Moved(ExecutionReport),
    /// Reverse dry run
    ReversePreview(Manifest),
    Reversed(ReversalReport),
}

/// Run against the real filesystem, holding the run lock unless dry-running
pub fn run(config: &RunConfig) -> Result<RunOutcome> {
    let _lock = if config.dry_run {
        None
    } else {
        Some(RunLock::acquire(&config.group_folder)?)
    };
    let fs = OsFileSystem;
    match config.direction {
        Direction::Forward => run_forward(&fs, config),
        Direction::Reverse => run_reverse(&fs, config),
    }
}

pub fn run_forward(fs: &dyn FileSystem, config: &RunConfig) -> Result<RunOutcome> {
    let group = &config.group_folder;
    let store = ManifestStore::for_group(group);
    if store.exists(fs) {
        return Err(KfmError::ManifestExists(store.path().to_path_buf()));
    }

    let yaml = locate(fs, config.yaml_path.as_deref().unwrap_or(group.as_path()))?;
    let spec = WellSpec::load(fs, &yaml)?;
    let plate = config.plate.or(spec.plate).unwrap_or_default();
    tracing::info!(yaml = %yaml.display(), %plate, "Loaded well specification");

    let entries = spec.entries(plate)?;
    let conditions = resolve(&entries, &config.separator)?;

    let options = PlanOptions {
        plate,
        scan_order: config.scan_order,
        group_by: config.group_by.clone(),
        unmapped: config.unmapped,
        collect_unmoved: config.collect_unmoved,
    };
    let plan = plan(fs, group, &conditions, &options)?;

    if config.dry_run {
        return Ok(RunOutcome::Planned(plan));
    }

    let options = ExecuteOptions {
        on_conflict: config.on_conflict,
    };
    execute(fs, &plan, &store, &options).map(RunOutcome::Moved)
}

pub fn run_reverse(fs: &dyn FileSystem, config: &RunConfig) -> Result<RunOutcome> {
    let store = ManifestStore::for_group(&config.group_folder);
    if config.dry_run {
        return store.load(fs).map(RunOutcome::ReversePreview);
    }
    replay_reverse(fs, &store).map(RunOutcome::Reversed)
}
