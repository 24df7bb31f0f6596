//! Compute where every file of a group folder goes.
//!
//! Planning only reads the filesystem. The returned [`MovePlan`] is complete
//! and validated before the executor touches anything.

use super::group_by::GroupBy;
use super::image::{ImageName, ImageRecord};
use super::xy::{discover_xy_folders, ScanOrder, XyWellMap};
use crate::error::{IoResultExt, KfmError, Result};
use crate::fs::FileSystem;
use crate::manifest::is_reserved_name;
use crate::wells::{ConditionMap, PlateFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Condition used for wells the well specification does not mention
pub const UNASSIGNED_LABEL: &str = "unassigned";

/// Folder that receives every non-image entry of the group folder
pub const UNMOVED_DIR: &str = "unmoved";

/// What to do with a well that has no condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnmappedPolicy {
    /// Label it [`UNASSIGNED_LABEL`]
    #[default]
    Fallback,
    /// Fail planning with `UnmappedWell`
    Strict,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub plate: PlateFormat,
    pub scan_order: ScanOrder,
    pub group_by: GroupBy,
    pub unmapped: UnmappedPolicy,
    /// Park every other top-level entry in `unmoved/`
    pub collect_unmoved: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            plate: PlateFormat::default(),
            scan_order: ScanOrder::default(),
            group_by: GroupBy::default(),
            unmapped: UnmappedPolicy::default(),
            collect_unmoved: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Image,
    Unmoved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: MoveKind,
}

/// Ordered list of moves for one group folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovePlan {
    pub root: PathBuf,
    pub moves: Vec<PlannedMove>,
}

impl MovePlan {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            moves: Vec::new(),
        }
    }

    pub fn push(&mut self, source: PathBuf, destination: PathBuf, kind: MoveKind) {
        self.moves.push(PlannedMove {
            source,
            destination,
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn count(&self, kind: MoveKind) -> usize {
        self.moves.iter().filter(|m| m.kind == kind).count()
    }

    /// Reject plans that would overwrite or strand files.
    ///
    /// Destinations must be unique, and no destination may sit at or below a
    /// source that is moved at the same step or later.
    pub fn validate(&self) -> Result<()> {
        let mut destinations: HashMap<&Path, usize> = HashMap::with_capacity(self.moves.len());
        for (i, planned) in self.moves.iter().enumerate() {
            if let Some(first) = destinations.insert(&planned.destination, i) {
                return Err(KfmError::PathCollision {
                    destination: planned.destination.clone(),
                    reason: format!(
                        "both {} and {} would be moved there",
                        self.moves[first].source.display(),
                        planned.source.display()
                    ),
                });
            }
        }

        let sources: HashMap<&Path, usize> = self
            .moves
            .iter()
            .enumerate()
            .map(|(i, m)| (m.source.as_path(), i))
            .collect();
        for (i, planned) in self.moves.iter().enumerate() {
            for ancestor in planned.destination.ancestors() {
                match sources.get(ancestor) {
                    Some(&j) if j >= i => {
                        return Err(KfmError::PathCollision {
                            destination: planned.destination.clone(),
                            reason: format!(
                                "it lies inside {}, which is itself moved",
                                self.moves[j].source.display()
                            ),
                        })
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Plan the reorganisation of `group_folder`
pub fn plan(
    fs: &dyn FileSystem,
    group_folder: &Path,
    conditions: &ConditionMap,
    options: &PlanOptions,
) -> Result<MovePlan> {
    if !fs.is_dir(group_folder) {
        return Err(KfmError::Filesystem {
            action: "open group folder",
            path: group_folder.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let folders = discover_xy_folders(fs, group_folder)?;
    if folders.is_empty() {
        tracing::warn!(folder = %group_folder.display(), "No XY folders found");
    }
    let xy_map = XyWellMap::build(fs, &folders, options.scan_order, options.plate)?;

    let mut plan = MovePlan::new(group_folder.to_path_buf());

    for folder in &folders {
        let Some(position) = xy_map.get(folder.index) else {
            continue;
        };
        let condition = match (conditions.condition(position.well), options.unmapped) {
            (Some(condition), _) => condition,
            (None, UnmappedPolicy::Fallback) => {
                tracing::warn!(
                    xy = %folder.name,
                    well = %position.well,
                    label = UNASSIGNED_LABEL,
                    "Well has no condition, using fallback label"
                );
                UNASSIGNED_LABEL.to_string()
            }
            (None, UnmappedPolicy::Strict) => {
                return Err(KfmError::UnmappedWell {
                    well: position.well.to_string(),
                    xy: folder.name.clone(),
                })
            }
        };

        let files = fs
            .walk_files(&folder.path)
            .with_path("read XY folder", &folder.path)?;
        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let Some(name) = ImageName::parse(&file_name) else {
                tracing::debug!(file = %path.display(), "Not an image, leaving with its folder");
                continue;
            };
            if name.xy != folder.index {
                tracing::warn!(
                    file = %path.display(),
                    folder = %folder.name,
                    "Image name XY index differs from its folder; using the folder"
                );
            }

            let record = ImageRecord {
                name,
                well: position.well,
                well_label: position.label.clone(),
                condition: condition.clone(),
                path,
            };
            let destination = options
                .group_by
                .directory(group_folder, &record)?
                .join(record.name.renamed(&record.well_tag()));
            plan.push(record.path, destination, MoveKind::Image);
        }
    }

    if options.collect_unmoved {
        let unmoved_dir = group_folder.join(UNMOVED_DIR);
        for entry in fs
            .list_dir(group_folder)
            .with_path("read group folder", group_folder)?
        {
            if is_reserved_name(&entry.name) {
                continue;
            }
            let destination = unmoved_dir.join(&entry.name);
            plan.push(entry.path, destination, MoveKind::Unmoved);
        }
    }

    plan.validate()?;

    tracing::info!(
        images = plan.count(MoveKind::Image),
        unmoved = plan.count(MoveKind::Unmoved),
        xy_folders = folders.len(),
        "Planned moves"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::manifest::MANIFEST_FILE_NAME;
    use crate::wells::{resolve, ConditionEntry};

    const PLATE: PlateFormat = PlateFormat::Wells96;

    fn conditions(items: &[(&str, &str)]) -> ConditionMap {
        let entries: Vec<ConditionEntry> = items
            .iter()
            .map(|(label, spec)| ConditionEntry::parse(*label, spec, PLATE).unwrap())
            .collect();
        resolve(&entries, "_").unwrap()
    }

    fn group() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/g/XY01/_A01")
            .add_file("/g/XY01/Image_XY01_CH1.tif", "a1")
            .add_file("/g/XY01/Image_XY01_CH2.tif", "a2")
            .add_file("/g/XY01/Image_XY01.gci", "meta")
            .add_dir("/g/XY02/_B02")
            .add_file("/g/XY02/Image_XY02_CH1.tif", "b1")
            .add_file("/g/wells.yaml", "wells: []")
            .add_file("/g/.DS_Store", "");
        fs
    }

    #[test]
    fn test_plan_natural_layout() {
        let fs = group();
        let map = conditions(&[("NIL", "A1-C4"), ("DD", "B1-C4")]);
        let plan = plan(&fs, Path::new("/g"), &map, &PlanOptions::default()).unwrap();

        let images: Vec<(&Path, &Path)> = plan
            .moves
            .iter()
            .filter(|m| m.kind == MoveKind::Image)
            .map(|m| (m.source.as_path(), m.destination.as_path()))
            .collect();
        assert_eq!(
            images,
            vec![
                (
                    Path::new("/g/XY01/Image_XY01_CH1.tif"),
                    Path::new("/g/NIL/A01_NIL/CH1/Image_A01_NIL_CH1.tif")
                ),
                (
                    Path::new("/g/XY01/Image_XY01_CH2.tif"),
                    Path::new("/g/NIL/A01_NIL/CH2/Image_A01_NIL_CH2.tif")
                ),
                (
                    Path::new("/g/XY02/Image_XY02_CH1.tif"),
                    Path::new("/g/NIL_DD/B02_NIL_DD/CH1/Image_B02_NIL_DD_CH1.tif")
                ),
            ]
        );
    }

    #[test]
    fn test_unmoved_come_after_images_and_skip_reserved() {
        let fs = group();
        fs.add_file(Path::new("/g").join(MANIFEST_FILE_NAME), "{}");
        let map = conditions(&[("NIL", "A1-H12")]);
        let plan = plan(&fs, Path::new("/g"), &map, &PlanOptions::default()).unwrap();

        let unmoved: Vec<&Path> = plan
            .moves
            .iter()
            .skip_while(|m| m.kind == MoveKind::Image)
            .map(|m| m.destination.as_path())
            .collect();
        assert_eq!(
            unmoved,
            vec![
                Path::new("/g/unmoved/XY01"),
                Path::new("/g/unmoved/XY02"),
                Path::new("/g/unmoved/wells.yaml"),
            ]
        );
        assert!(plan.moves.iter().all(|m| m.kind == MoveKind::Unmoved
            || !m.destination.starts_with("/g/unmoved")));
    }

    #[test]
    fn test_unassigned_fallback() {
        let fs = group();
        let map = conditions(&[("NIL", "A1")]);
        let plan = plan(&fs, Path::new("/g"), &map, &PlanOptions::default()).unwrap();
        assert!(plan.moves.iter().any(|m| m.destination
            == Path::new("/g/unassigned/B02_unassigned/CH1/Image_B02_unassigned_CH1.tif")));
    }

    #[test]
    fn test_strict_unmapped_well() {
        let fs = group();
        let map = conditions(&[("NIL", "A1")]);
        let opts = PlanOptions {
            unmapped: UnmappedPolicy::Strict,
            ..PlanOptions::default()
        };
        let err = plan(&fs, Path::new("/g"), &map, &opts).unwrap_err();
        assert!(matches!(err, KfmError::UnmappedWell { .. }));
    }

    #[test]
    fn test_duplicate_wells_get_unique_names() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/g/XY01/_A01")
            .add_file("/g/XY01/Image_XY01_CH1.tif", "1")
            .add_dir("/g/XY02/_A01")
            .add_file("/g/XY02/Image_XY02_CH1.tif", "2");
        let map = conditions(&[("NIL", "A1")]);
        let opts = PlanOptions {
            group_by: GroupBy::None,
            collect_unmoved: false,
            ..PlanOptions::default()
        };
        let plan = plan(&fs, Path::new("/g"), &map, &opts).unwrap();
        let destinations: Vec<&Path> = plan.moves.iter().map(|m| m.destination.as_path()).collect();
        assert_eq!(
            destinations,
            vec![
                Path::new("/g/Image_A01(1)_NIL_CH1.tif"),
                Path::new("/g/Image_A01(2)_NIL_CH1.tif"),
            ]
        );
    }

    #[test]
    fn test_collision_detected() {
        let mut plan = MovePlan::new(PathBuf::from("/g"));
        plan.push("/g/XY01/a.tif".into(), "/g/out/a.tif".into(), MoveKind::Image);
        plan.push("/g/XY02/a.tif".into(), "/g/out/a.tif".into(), MoveKind::Image);
        assert!(matches!(plan.validate(), Err(KfmError::PathCollision { .. })));
    }

    #[test]
    fn test_condition_named_like_top_level_entry() {
        let fs = group();
        fs.add_dir("/g/NIL");
        let map = conditions(&[("NIL", "A1-H12")]);
        let err = plan(&fs, Path::new("/g"), &map, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, KfmError::PathCollision { .. }));
    }

    #[test]
    fn test_missing_group_folder() {
        let fs = MemoryFileSystem::new();
        let err = plan(&fs, Path::new("/nope"), &ConditionMap::default(), &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, KfmError::Filesystem { .. }));
    }
}
