//! Keyence image file names.
//!
//! Exports are named `<prefix>[_T<n>]_XY<n>[_<stitch>][_Z<n>]_<channel>.tif`,
//! e.g. `Image_T0001_XY01_00003_Z002_CH1.tif`. Every part except the XY token
//! is kept verbatim when a file is renamed.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::wells::WellId;

static IMAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<prefix>.+?)(?:_(?P<T>T\d+))?_XY(?P<XY>\d+)(?:_(?P<stitch>\d{5}))?(?:_(?P<Z>Z\d+))?_(?P<CH>.+)\.(?P<ext>(?i:tiff?))$",
    )
    .expect("Invalid regex")
});

/// Metadata embedded in an image file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    pub prefix: String,
    /// Timelapse point, e.g. `T0001`
    pub timepoint: Option<String>,
    pub xy: u32,
    /// Stitch tile, e.g. `00003`
    pub stitch: Option<String>,
    /// Z slice, e.g. `Z002`
    pub z: Option<String>,
    /// Channel, e.g. `CH1` or `Overlay`
    pub channel: String,
    pub extension: String,
}

impl ImageName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = IMAGE_NAME.captures(file_name)?;
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
        Some(Self {
            prefix: text("prefix")?,
            timepoint: text("T"),
            xy: caps.name("XY")?.as_str().parse().ok()?,
            stitch: text("stitch"),
            z: text("Z"),
            channel: text("CH")?,
            extension: text("ext")?,
        })
    }

    /// File name with the XY token replaced by `replacement`
    pub fn renamed(&self, replacement: &str) -> String {
        let mut name = self.prefix.clone();
        if let Some(t) = &self.timepoint {
            name.push('_');
            name.push_str(t);
        }
        name.push('_');
        name.push_str(replacement);
        if let Some(stitch) = &self.stitch {
            name.push('_');
            name.push_str(stitch);
        }
        if let Some(z) = &self.z {
            name.push('_');
            name.push_str(z);
        }
        name.push('_');
        name.push_str(&self.channel);
        name.push('.');
        name.push_str(&self.extension);
        name
    }
}

/// One source image with everything needed to place it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub name: ImageName,
    pub well: WellId,
    /// `A01`, or `A01(2)` when several XY positions share the well
    pub well_label: String,
    /// Joined condition labels, or the fallback label
    pub condition: String,
}

impl ImageRecord {
    /// `<well>_<condition>`, used for the per-well directory and file names
    pub fn well_tag(&self) -> String {
        format!("{}_{}", self.well_label, self.condition)
    }
}
