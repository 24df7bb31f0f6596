//! Resolve ordered (label, wells) entries into one condition per well.

use super::range::{parse_region_list, WellRange};
use super::well::{PlateFormat, WellId};
use crate::error::{KfmError, Result};
use std::collections::BTreeMap;

/// Default separator between overlapping labels, e.g. `NIL_DD`
pub const DEFAULT_SEPARATOR: &str = "_";

/// One item of the `wells` list: a label and the wells it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionEntry {
    pub label: String,
    pub ranges: Vec<WellRange>,
}

impl ConditionEntry {
    pub fn new(label: impl Into<String>, ranges: Vec<WellRange>) -> Self {
        Self {
            label: label.into(),
            ranges,
        }
    }

    /// Build an entry from a label and a region list such as `A1-C4, D1`
    pub fn parse(label: impl Into<String>, spec: &str, plate: PlateFormat) -> Result<Self> {
        let label = label.into();
        validate_label(&label)?;
        Ok(Self::new(label, parse_region_list(spec, plate)?))
    }
}

/// Labels become directory and file name components
fn validate_label(label: &str) -> Result<()> {
    let invalid = |reason: &str| KfmError::InvalidLabel {
        label: label.to_string(),
        reason: reason.to_string(),
    };
    if label.trim().is_empty() {
        return Err(invalid("label is empty"));
    }
    if label == "." || label == ".." {
        return Err(invalid("label cannot be a relative path"));
    }
    if label.contains(['/', '\\']) {
        return Err(invalid("label cannot contain path separators"));
    }
    if label.chars().any(char::is_control) {
        return Err(invalid("label cannot contain control characters"));
    }
    Ok(())
}

/// Per-well ordered labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionMap {
    separator: String,
    labels: BTreeMap<WellId, Vec<String>>,
}

impl ConditionMap {
    pub fn labels(&self, well: WellId) -> Option<&[String]> {
        self.labels.get(&well).map(Vec::as_slice)
    }

    /// Joined condition for a well, `None` when no entry covers it
    pub fn condition(&self, well: WellId) -> Option<String> {
        self.labels(well).map(|labels| labels.join(&self.separator))
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Number of wells with at least one label
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WellId, &[String])> {
        self.labels.iter().map(|(well, labels)| (*well, labels.as_slice()))
    }
}

/// Merge entries in order.
///
/// A well covered by several entries collects every label in entry order.
/// The same label reaching one well from two entries is rejected; overlapping
/// ranges inside a single entry count once.
pub fn resolve(entries: &[ConditionEntry], separator: &str) -> Result<ConditionMap> {
    let mut labels: BTreeMap<WellId, Vec<String>> = BTreeMap::new();

    for entry in entries {
        validate_label(&entry.label)?;

        let mut wells: Vec<WellId> = entry.ranges.iter().flat_map(WellRange::wells).collect();
        wells.sort_unstable();
        wells.dedup();

        for well in wells {
            let assigned = labels.entry(well).or_default();
            if assigned.iter().any(|l| *l == entry.label) {
                return Err(KfmError::DuplicateLabel {
                    label: entry.label.clone(),
                    well: well.to_string(),
                });
            }
            assigned.push(entry.label.clone());
        }

        tracing::debug!(label = %entry.label, ranges = entry.ranges.len(), "Resolved condition entry");
    }

    Ok(ConditionMap {
        separator: separator.to_string(),
        labels,
    })
}
