//! Plate formats and well identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ROW_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOP";

/// Supported multi-well plate layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PlateFormat {
    Wells6,
    Wells12,
    Wells24,
    Wells48,
    #[default]
    Wells96,
    Wells384,
}

impl PlateFormat {
    pub fn rows(self) -> u8 {
        match self {
            Self::Wells6 => 2,
            Self::Wells12 => 3,
            Self::Wells24 => 4,
            Self::Wells48 => 6,
            Self::Wells96 => 8,
            Self::Wells384 => 16,
        }
    }

    pub fn columns(self) -> u8 {
        match self {
            Self::Wells6 => 3,
            Self::Wells12 => 4,
            Self::Wells24 => 6,
            Self::Wells48 => 8,
            Self::Wells96 => 12,
            Self::Wells384 => 24,
        }
    }

    pub fn well_count(self) -> u32 {
        u32::from(self.rows()) * u32::from(self.columns())
    }

    pub fn from_well_count(count: u32) -> Option<Self> {
        match count {
            6 => Some(Self::Wells6),
            12 => Some(Self::Wells12),
            24 => Some(Self::Wells24),
            48 => Some(Self::Wells48),
            96 => Some(Self::Wells96),
            384 => Some(Self::Wells384),
            _ => None,
        }
    }

    /// Last row letter of this plate, e.g. `H` for 96 wells
    pub fn last_row_letter(self) -> char {
        char::from(ROW_LETTERS[usize::from(self.rows()) - 1])
    }

    pub fn contains(self, well: WellId) -> bool {
        well.row < self.rows() && well.column >= 1 && well.column <= self.columns()
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-well", self.well_count())
    }
}

impl TryFrom<u32> for PlateFormat {
    type Error = String;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        Self::from_well_count(count).ok_or_else(|| {
            format!("unsupported plate size {count} (expected 6, 12, 24, 48, 96 or 384)")
        })
    }
}

impl From<PlateFormat> for u32 {
    fn from(plate: PlateFormat) -> Self {
        plate.well_count()
    }
}

impl FromStr for PlateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let count: u32 = s
            .trim()
            .trim_end_matches("-well")
            .parse()
            .map_err(|_| format!("plate size must be a number of wells, got '{s}'"))?;
        Self::try_from(count)
    }
}

/// A single well position: zero-based row, one-based column.
///
/// Ordering is by row, then column, so sorted sets come out in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WellId {
    row: u8,
    column: u8,
}

impl WellId {
    /// Build a well from a zero-based row and one-based column
    pub fn new(row: u8, column: u8) -> Self {
        Self { row, column }
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn column(self) -> u8 {
        self.column
    }

    pub fn row_letter(self) -> char {
        ROW_LETTERS
            .get(usize::from(self.row))
            .map(|b| char::from(*b))
            .unwrap_or('?')
    }

    /// Parse `A1`, `a01` or `H12` without checking plate bounds.
    ///
    /// Returns `None` when the text is not a letter followed by digits.
    pub fn parse_unbounded(text: &str) -> Option<(char, u32)> {
        let mut chars = text.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if !letter.is_ascii_uppercase() {
            return None;
        }
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.len() > 4 {
            return None;
        }
        let column = digits.parse().ok()?;
        Some((letter, column))
    }

    /// Parse a well and check it lies on `plate`
    pub fn parse(text: &str, plate: PlateFormat) -> Result<Self, String> {
        let (letter, column) = Self::parse_unbounded(text)
            .ok_or_else(|| format!("'{text}' is not a well (expected e.g. A1 or B05)"))?;
        let row = ROW_LETTERS
            .iter()
            .position(|b| char::from(*b) == letter)
            .filter(|row| *row < usize::from(plate.rows()))
            .ok_or_else(|| {
                format!(
                    "row {letter} is outside the {plate} plate (rows A-{})",
                    plate.last_row_letter()
                )
            })?;
        if column == 0 || column > u32::from(plate.columns()) {
            return Err(format!(
                "column {column} is outside the {plate} plate (columns 1-{})",
                plate.columns()
            ));
        }
        // Both bounds are checked above, so the narrowing casts are lossless
        Ok(Self::new(row as u8, column as u8))
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.row_letter(), self.column)
    }
}
