//! Destination directory schemes.

use super::image::ImageRecord;
use crate::error::{KfmError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One directory level of a custom grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// `<well>_<condition>`
    Xy,
    /// `<condition>`
    Cond,
    /// `T0001`
    T,
    /// `stitch00001`
    Stitch,
    /// `Z001`
    Z,
    /// `CH1`
    Ch,
}

impl GroupKey {
    fn name(self) -> &'static str {
        match self {
            Self::Xy => "XY",
            Self::Cond => "cond",
            Self::T => "T",
            Self::Stitch => "stitch",
            Self::Z => "Z",
            Self::Ch => "CH",
        }
    }

    /// Directory name for `image`, `None` when its file name lacks the part
    fn component(self, image: &ImageRecord) -> Option<String> {
        match self {
            Self::Xy => Some(image.well_tag()),
            Self::Cond => Some(image.condition.clone()),
            Self::T => image.name.timepoint.clone(),
            Self::Stitch => image.name.stitch.as_ref().map(|s| format!("stitch{s}")),
            Self::Z => image.name.z.clone(),
            Self::Ch => Some(image.name.channel.clone()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How images are arranged under the group folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupBy {
    /// Everything directly in the group folder
    None,
    /// `<cond>/<well>_<cond>/[stitch<n>/][<Z>/]<CH>/`
    #[default]
    Natural,
    /// One level per key, in the given order
    Keys(Vec<GroupKey>),
}

impl GroupBy {
    /// Parse the `--opt` values
    pub fn from_options<S: AsRef<str>>(options: &[S]) -> Result<Self> {
        const CHOICES: &str = "none, natural, XY, cond, T, stitch, Z, CH";

        let mut keys = Vec::new();
        let mut exclusive = None;
        for option in options {
            let option = option.as_ref();
            let key = match option {
                "none" => {
                    exclusive = Some(Self::None);
                    continue;
                }
                "natural" => {
                    exclusive = Some(Self::Natural);
                    continue;
                }
                "XY" | "xy" => GroupKey::Xy,
                "cond" => GroupKey::Cond,
                "T" | "t" => GroupKey::T,
                "stitch" => GroupKey::Stitch,
                "Z" | "z" => GroupKey::Z,
                "CH" | "ch" => GroupKey::Ch,
                other => {
                    return Err(KfmError::InvalidGroupBy(format!(
                        "cannot group by '{other}', select from: {CHOICES}"
                    )))
                }
            };
            if keys.contains(&key) {
                return Err(KfmError::InvalidGroupBy(format!("'{key}' is given twice")));
            }
            keys.push(key);
        }

        match exclusive {
            Some(_) if options.len() != 1 => Err(KfmError::InvalidGroupBy(
                "'none' and 'natural' cannot be combined with other options".to_string(),
            )),
            Some(group_by) => Ok(group_by),
            None if keys.is_empty() => Ok(Self::Natural),
            None => Ok(Self::Keys(keys)),
        }
    }

    /// Directory an image is placed in
    pub fn directory(&self, root: &Path, image: &ImageRecord) -> Result<PathBuf> {
        let mut dest = root.to_path_buf();
        match self {
            Self::None => {}
            Self::Natural => {
                dest.push(&image.condition);
                dest.push(image.well_tag());
                if let Some(stitch) = &image.name.stitch {
                    dest.push(format!("stitch{stitch}"));
                }
                if let Some(z) = &image.name.z {
                    dest.push(z);
                }
                dest.push(&image.name.channel);
            }
            Self::Keys(keys) => {
                for key in keys {
                    let component = key.component(image).ok_or_else(|| {
                        KfmError::InvalidGroupBy(format!(
                            "cannot group by '{key}': {} has no {key} part",
                            image.path.display()
                        ))
                    })?;
                    dest.push(component);
                }
            }
        }
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::image::ImageName;
    use crate::wells::WellId;

    fn image(file_name: &str) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from("/g/XY01").join(file_name),
            name: ImageName::parse(file_name).unwrap(),
            well: WellId::new(0, 1),
            well_label: "A01".to_string(),
            condition: "NIL_DD".to_string(),
        }
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(GroupBy::from_options::<&str>(&[]).unwrap(), GroupBy::Natural);
        assert_eq!(GroupBy::from_options(&["none"]).unwrap(), GroupBy::None);
        assert_eq!(
            GroupBy::from_options(&["cond", "XY", "Z"]).unwrap(),
            GroupBy::Keys(vec![GroupKey::Cond, GroupKey::Xy, GroupKey::Z])
        );
    }

    #[test]
    fn test_invalid_options() {
        assert!(GroupBy::from_options(&["none", "XY"]).is_err());
        assert!(GroupBy::from_options(&["natural", "natural"]).is_err());
        assert!(GroupBy::from_options(&["plate"]).is_err());
        assert!(GroupBy::from_options(&["Z", "Z"]).is_err());
    }

    #[test]
    fn test_natural_layout() {
        let dir = GroupBy::Natural
            .directory(Path::new("/g"), &image("Image_XY01_00002_Z003_CH1.tif"))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/g/NIL_DD/A01_NIL_DD/stitch00002/Z003/CH1"));

        let dir = GroupBy::Natural
            .directory(Path::new("/g"), &image("Image_XY01_CH2.tif"))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/g/NIL_DD/A01_NIL_DD/CH2"));
    }

    #[test]
    fn test_custom_keys_layout() {
        let group_by = GroupBy::from_options(&["T", "cond", "CH"]).unwrap();
        let dir = group_by
            .directory(Path::new("/g"), &image("Image_T0004_XY01_CH1.tif"))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/g/T0004/NIL_DD/CH1"));
    }

    #[test]
    fn test_missing_part_rejected() {
        let group_by = GroupBy::from_options(&["Z"]).unwrap();
        let err = group_by
            .directory(Path::new("/g"), &image("Image_XY01_CH1.tif"))
            .unwrap_err();
        assert!(matches!(err, KfmError::InvalidGroupBy(_)));
    }
}
