//! XY position folders and their mapping to plate wells.
//!
//! Keyence writes one `XY<n>` folder per stage position and drops a `_<WELL>`
//! shortcut (e.g. `_A01`) inside it naming the well it was acquired in. That
//! shortcut is the default source of truth; fixed scan-order tables are
//! available for exports that lack them.

use crate::error::{IoResultExt, KfmError, Result};
use crate::fs::FileSystem;
use crate::wells::{PlateFormat, WellId};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

static XY_FOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^XY(?P<index>\d+)$").expect("Invalid regex"));

/// How XY indices are turned into wells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanOrder {
    /// Read the `_<WELL>` shortcut inside each XY folder
    #[default]
    Shortcut,
    /// XY1 = A01, XY2 = A02, ... one row after another
    RowMajor,
    /// Like row-major, but every second row runs right to left
    Serpentine,
}

impl ScanOrder {
    /// Fixed XY → well table for a plate; entry `i` is XY index `i + 1`
    pub fn table(self, plate: PlateFormat) -> Vec<WellId> {
        let columns: Vec<u8> = (1..=plate.columns()).collect();
        let mut table = Vec::with_capacity(plate.well_count() as usize);
        for row in 0..plate.rows() {
            let reverse = self == Self::Serpentine && row % 2 == 1;
            let ordered: Box<dyn Iterator<Item = &u8>> = if reverse {
                Box::new(columns.iter().rev())
            } else {
                Box::new(columns.iter())
            };
            table.extend(ordered.map(|column| WellId::new(row, *column)));
        }
        table
    }
}

impl FromStr for ScanOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "shortcut" => Ok(Self::Shortcut),
            "row-major" | "rowmajor" => Ok(Self::RowMajor),
            "serpentine" | "snake" => Ok(Self::Serpentine),
            _ => Err(format!(
                "unknown scan order '{s}' (expected shortcut, row-major or serpentine)"
            )),
        }
    }
}

impl fmt::Display for ScanOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shortcut => "shortcut",
            Self::RowMajor => "row-major",
            Self::Serpentine => "serpentine",
        };
        f.write_str(name)
    }
}

/// One `XY<n>` folder directly under the group folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XyFolder {
    pub index: u32,
    pub name: String,
    pub path: PathBuf,
}

/// Find the XY folders of a group folder, ordered by index
pub fn discover_xy_folders(fs: &dyn FileSystem, group_folder: &Path) -> Result<Vec<XyFolder>> {
    let mut folders: Vec<XyFolder> = fs
        .list_dir(group_folder)
        .with_path("read group folder", group_folder)?
        .into_iter()
        .filter(|entry| entry.is_dir)
        .filter_map(|entry| {
            let index = XY_FOLDER.captures(&entry.name)?.name("index")?.as_str().parse().ok()?;
            Some(XyFolder {
                index,
                name: entry.name,
                path: entry.path,
            })
        })
        .collect();
    folders.sort_by_key(|f| f.index);
    Ok(folders)
}

/// Well assigned to one XY position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XyPosition {
    pub well: WellId,
    /// `A01`, or `A01(n)` when the well holds several positions
    pub label: String,
}

/// XY index → well, with unique labels for wells imaged more than once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XyWellMap {
    positions: BTreeMap<u32, XyPosition>,
}

impl XyWellMap {
    /// Build the map for `folders` using `order`
    pub fn build(
        fs: &dyn FileSystem,
        folders: &[XyFolder],
        order: ScanOrder,
        plate: PlateFormat,
    ) -> Result<Self> {
        let mut wells: Vec<(u32, WellId)> = Vec::with_capacity(folders.len());
        match order {
            ScanOrder::Shortcut => {
                for folder in folders {
                    wells.push((folder.index, shortcut_well(fs, folder, plate)?));
                }
            }
            ScanOrder::RowMajor | ScanOrder::Serpentine => {
                let table = order.table(plate);
                for folder in folders {
                    let well = folder
                        .index
                        .checked_sub(1)
                        .and_then(|i| table.get(i as usize))
                        .copied()
                        .ok_or_else(|| KfmError::UnmappedXy {
                            xy: folder.name.clone(),
                            reason: format!(
                                "index {} is outside the {} {} scan table",
                                folder.index, plate, order
                            ),
                        })?;
                    wells.push((folder.index, well));
                }
            }
        }
        Ok(Self::from_wells(wells))
    }

    /// Assign unique labels; positions sharing a well are numbered in XY order
    pub fn from_wells(mut wells: Vec<(u32, WellId)>) -> Self {
        wells.sort_by_key(|(index, _)| *index);

        let mut counts: BTreeMap<WellId, u32> = BTreeMap::new();
        for (_, well) in &wells {
            *counts.entry(*well).or_default() += 1;
        }

        let mut seen: BTreeMap<WellId, u32> = BTreeMap::new();
        let positions = wells
            .into_iter()
            .map(|(index, well)| {
                let label = if counts[&well] > 1 {
                    let n = seen.entry(well).or_default();
                    *n += 1;
                    format!("{well}({n})")
                } else {
                    well.to_string()
                };
                (index, XyPosition { well, label })
            })
            .collect();

        Self { positions }
    }

    pub fn get(&self, xy: u32) -> Option<&XyPosition> {
        self.positions.get(&xy)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Read the `_<WELL>` shortcut of one XY folder
fn shortcut_well(fs: &dyn FileSystem, folder: &XyFolder, plate: PlateFormat) -> Result<WellId> {
    let unmapped = |reason: String| KfmError::UnmappedXy {
        xy: folder.name.clone(),
        reason,
    };

    let shortcuts: Vec<String> = fs
        .list_dir(&folder.path)
        .with_path("read XY folder", &folder.path)?
        .into_iter()
        .filter_map(|entry| {
            let well = entry.name.strip_prefix('_')?;
            // Windows shortcuts carry an .lnk extension
            let well = well.strip_suffix(".lnk").unwrap_or(well);
            WellId::parse_unbounded(well).map(|_| well.to_string())
        })
        .collect();

    match shortcuts.as_slice() {
        [] => Err(unmapped(
            "no _<WELL> shortcut found; use a fixed scan order instead".to_string(),
        )),
        [well] => WellId::parse(well, plate).map_err(unmapped),
        many => Err(unmapped(format!("several well shortcuts: {}", many.join(", ")))),
    }
}
