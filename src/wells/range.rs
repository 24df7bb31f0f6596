//! Well range tokens: `D1`, `A1-C4`, and comma-separated lists of them.

use super::well::{PlateFormat, WellId};
use crate::error::{KfmError, Result};
use std::collections::BTreeSet;

/// A single well or a rectangular block of wells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellRange {
    Single(WellId),
    /// Corners are stored normalised: `top_left` has the smaller row and column
    Rect { top_left: WellId, bottom_right: WellId },
}

impl WellRange {
    /// Parse one range token against a plate.
    ///
    /// Whitespace is ignored and corners may be given in any order.
    pub fn parse(token: &str, plate: PlateFormat) -> Result<Self> {
        let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        let malformed = |reason: String| KfmError::MalformedRange {
            token: token.to_string(),
            reason,
        };

        if compact.is_empty() {
            return Err(malformed("empty token".to_string()));
        }

        let mut parts = compact.split('-');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(malformed("more than one '-' in token".to_string()));
        }

        let a = WellId::parse(first, plate).map_err(malformed)?;
        let Some(second) = second else {
            return Ok(Self::Single(a));
        };
        let b = WellId::parse(second, plate).map_err(malformed)?;

        Ok(Self::Rect {
            top_left: WellId::new(a.row().min(b.row()), a.column().min(b.column())),
            bottom_right: WellId::new(a.row().max(b.row()), a.column().max(b.column())),
        })
    }

    /// Number of wells covered
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Rect {
                top_left,
                bottom_right,
            } => {
                let rows = usize::from(bottom_right.row() - top_left.row()) + 1;
                let columns = usize::from(bottom_right.column() - top_left.column()) + 1;
                rows * columns
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the covered wells in row-major order
    pub fn wells(&self) -> impl Iterator<Item = WellId> {
        let (top_left, bottom_right) = match *self {
            Self::Single(well) => (well, well),
            Self::Rect {
                top_left,
                bottom_right,
            } => (top_left, bottom_right),
        };
        (top_left.row()..=bottom_right.row()).flat_map(move |row| {
            (top_left.column()..=bottom_right.column()).map(move |column| WellId::new(row, column))
        })
    }
}

/// Expand a single range token into the set of wells it names
pub fn parse_range(token: &str, plate: PlateFormat) -> Result<BTreeSet<WellId>> {
    Ok(WellRange::parse(token, plate)?.wells().collect())
}

/// Parse a comma-separated list of range tokens, e.g. `F1-H1, A2-H2, A3`
pub fn parse_region_list(spec: &str, plate: PlateFormat) -> Result<Vec<WellRange>> {
    spec.split(',')
        .map(|token| WellRange::parse(token, plate))
        .collect()
}
