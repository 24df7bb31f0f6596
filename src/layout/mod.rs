//! Keyence export layout: XY folders, image names, and the planned
//! destination of every file.

pub mod group_by;
pub mod image;
pub mod planner;
pub mod xy;

pub use group_by::{GroupBy, GroupKey};
pub use image::{ImageName, ImageRecord};
pub use planner::{
    plan, MoveKind, MovePlan, PlanOptions, PlannedMove, UnmappedPolicy, UNASSIGNED_LABEL,
    UNMOVED_DIR,
};
pub use xy::{discover_xy_folders, ScanOrder, XyFolder, XyWellMap};
