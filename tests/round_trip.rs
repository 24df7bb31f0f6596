//! Forward and reverse runs against a real directory.

use kfm::commands::{run, Direction, RunConfig, RunOutcome};
use kfm::fs::{DirEntryInfo, FileSystem, OsFileSystem};
use kfm::layout::{plan, PlanOptions};
use kfm::manifest::{
    execute, is_reserved_name, replay_reverse, ExecuteOptions, ManifestStore, LOCK_FILE_NAME,
};
use kfm::wells::{resolve, WellSpec};
use kfm::KfmError;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use walkdir::WalkDir;

const WELLS_YAML: &str = "\
plate: 96
wells:
  - NIL: A1-C4
  - DD: B1-C4
  - puro_ctrl: D1
";

/// A small Keyence export: three positions, a stitched Z stack and a time point
fn create_group(root: &Path) {
    let files: &[(&str, &[u8])] = &[
        ("XY01/_A01", b""),
        ("XY01/Image_XY01_CH1.tif", b"a01-ch1"),
        ("XY01/Image_XY01_CH2.tif", b"a01-ch2"),
        ("XY01/Image_XY01.gci", b"a01-meta"),
        ("XY02/_B02", b""),
        ("XY02/Image_XY02_00001_Z001_CH1.tif", b"b02-s1-z1"),
        ("XY02/Image_XY02_00001_Z002_CH1.tif", b"b02-s1-z2"),
        ("XY03/_D01", b""),
        ("XY03/Image_T0001_XY03_CH1.tif", b"d01-t1"),
        ("notes.txt", b"plate notes"),
        ("wells.yaml", WELLS_YAML.as_bytes()),
    ];
    for (name, contents) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// Relative path of every file and directory, with file contents.
/// The manifest, its archive and the lock file are left out.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| !is_reserved_name(&entry.file_name().to_string_lossy()))
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            let contents = entry
                .file_type()
                .is_file()
                .then(|| fs::read(entry.path()).unwrap());
            (relative, contents)
        })
        .collect()
}

#[test]
fn test_move_and_reverse_restores_folder() {
    let dir = tempdir().unwrap();
    let group = dir.path().join("plate1");
    create_group(&group);
    let before = snapshot(&group);

    let config = RunConfig::new(group.clone());
    let RunOutcome::Moved(report) = run(&config).unwrap() else {
        panic!("expected a forward run");
    };
    // 5 images, then XY01..XY03, notes.txt and wells.yaml
    assert_eq!(report.moved, 10);

    assert_eq!(
        fs::read(group.join("NIL/A01_NIL/CH1/Image_A01_NIL_CH1.tif")).unwrap(),
        b"a01-ch1"
    );
    assert!(group
        .join("NIL_DD/B02_NIL_DD/stitch00001/Z002/CH1/Image_B02_NIL_DD_00001_Z002_CH1.tif")
        .is_file());
    assert!(group
        .join("puro_ctrl/D01_puro_ctrl/CH1/Image_T0001_D01_puro_ctrl_CH1.tif")
        .is_file());
    assert!(group.join("unmoved/XY01/Image_XY01.gci").is_file());
    assert!(group.join("unmoved/wells.yaml").is_file());
    assert!(group.join("kfm_record.json").is_file());
    // Released but kept, so the next run locks the same file
    assert!(group.join(LOCK_FILE_NAME).is_file());

    let reverse = RunConfig {
        direction: Direction::Reverse,
        ..config
    };
    let RunOutcome::Reversed(report) = run(&reverse).unwrap() else {
        panic!("expected a reversal");
    };
    assert_eq!(report.reversed, 10);
    assert!(report.kept_dirs.is_empty());
    assert!(report.archived_manifest.is_file());

    assert_eq!(snapshot(&group), before);
}

#[test]
fn test_second_run_refused_until_reversed() {
    let dir = tempdir().unwrap();
    create_group(dir.path());

    let config = RunConfig::new(dir.path().to_path_buf());
    run(&config).unwrap();
    let err = run(&config).unwrap_err();
    assert!(matches!(err, KfmError::ManifestExists(_)));
}

#[test]
fn test_dry_run_leaves_folder_untouched() {
    let dir = tempdir().unwrap();
    create_group(dir.path());
    let before = snapshot(dir.path());

    let config = RunConfig {
        dry_run: true,
        ..RunConfig::new(dir.path().to_path_buf())
    };
    let RunOutcome::Planned(plan) = run(&config).unwrap() else {
        panic!("expected a plan");
    };
    assert_eq!(plan.len(), 10);
    assert_eq!(snapshot(dir.path()), before);
}

/// Real filesystem whose renames fail once `renames_left` reaches zero
struct InterruptingFileSystem {
    inner: OsFileSystem,
    renames_left: Cell<usize>,
}

impl FileSystem for InterruptingFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        self.inner.list_dir(path)
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.walk_files(root)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.renames_left.get() == 0 {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "power cut"));
        }
        self.renames_left.set(self.renames_left.get() - 1);
        self.inner.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.inner.write_atomic(path, contents)
    }
}

#[test]
fn test_interrupted_run_reverses_completed_moves() {
    let dir = tempdir().unwrap();
    let group = dir.path();
    create_group(group);
    let before = snapshot(group);

    let flaky = InterruptingFileSystem {
        inner: OsFileSystem,
        renames_left: Cell::new(4),
    };
    let spec = WellSpec::load(&flaky, &group.join("wells.yaml")).unwrap();
    let options = PlanOptions::default();
    let conditions = resolve(&spec.entries(options.plate).unwrap(), "_").unwrap();
    let plan = plan(&flaky, group, &conditions, &options).unwrap();
    let store = ManifestStore::for_group(group);

    let err = execute(&flaky, &plan, &store, &ExecuteOptions::default()).unwrap_err();
    assert!(matches!(err, KfmError::Filesystem { .. }));

    let manifest = store.load(&OsFileSystem).unwrap();
    assert_eq!(manifest.moves.len(), 4);
    let moved: Vec<&Path> = manifest.moves.iter().map(|m| m.source.as_path()).collect();
    let planned: Vec<&Path> = plan.moves[..4].iter().map(|m| m.source.as_path()).collect();
    assert_eq!(moved, planned);

    let report = replay_reverse(&OsFileSystem, &store).unwrap();
    assert_eq!(report.reversed, 4);
    assert_eq!(snapshot(group), before);
}
