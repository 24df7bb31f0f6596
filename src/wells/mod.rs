//! Plate wells, well ranges and the condition labels assigned to them.

pub mod conditions;
pub mod range;
pub mod spec;
pub mod well;

pub use conditions::{resolve, ConditionEntry, ConditionMap, DEFAULT_SEPARATOR};
pub use range::{parse_range, parse_region_list, WellRange};
pub use spec::WellSpec;
pub use well::{PlateFormat, WellId};
