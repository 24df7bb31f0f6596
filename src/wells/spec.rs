//! Well-condition YAML files.
//!
//! ```yaml
//! plate: 96
//! wells:
//!   - NIL: A1-C4
//!   - DD: B1-C4
//!   - puro_ctrl: D1
//! ```
//!
//! `wells` may also be a plain mapping; its key order is kept.

use super::conditions::ConditionEntry;
use super::well::PlateFormat;
use crate::error::{IoResultExt, KfmError, Result};
use crate::fs::FileSystem;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawWellSpec {
    #[serde(default)]
    plate: Option<PlateFormat>,
    wells: Value,
}

/// Parsed well-condition file, before ranges are checked against a plate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellSpec {
    /// Plate size declared in the file, if any
    pub plate: Option<PlateFormat>,
    /// (label, region list) in file order
    pub items: Vec<(String, String)>,
}

impl WellSpec {
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self> {
        let raw: RawWellSpec = serde_yaml::from_str(text).map_err(|source| KfmError::Yaml {
            path: origin.to_path_buf(),
            source,
        })?;

        let mut items = Vec::new();
        match raw.wells {
            Value::Sequence(sequence) => {
                for item in sequence {
                    let Value::Mapping(mapping) = item else {
                        return Err(KfmError::WellSpec(format!(
                            "each item of 'wells' must be a 'label: wells' mapping, got {}",
                            describe(&item)
                        )));
                    };
                    push_mapping(&mut items, &mapping)?;
                }
            }
            Value::Mapping(mapping) => push_mapping(&mut items, &mapping)?,
            other => {
                return Err(KfmError::WellSpec(format!(
                    "'wells' must be a list or a mapping, got {}",
                    describe(&other)
                )))
            }
        }

        Ok(Self {
            plate: raw.plate,
            items,
        })
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let bytes = fs.read(path).with_path("read well specification", path)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| KfmError::WellSpec(format!("{} is not UTF-8 text", path.display())))?;
        Self::from_yaml_str(&text, path)
    }

    /// Check every item against `plate` and build condition entries
    pub fn entries(&self, plate: PlateFormat) -> Result<Vec<ConditionEntry>> {
        self.items
            .iter()
            .map(|(label, wells)| ConditionEntry::parse(label.clone(), wells, plate))
            .collect()
    }
}

fn push_mapping(items: &mut Vec<(String, String)>, mapping: &serde_yaml::Mapping) -> Result<()> {
    for (key, value) in mapping {
        let label = scalar_text(key).ok_or_else(|| {
            KfmError::WellSpec(format!("condition labels must be scalars, got {}", describe(key)))
        })?;
        let wells = scalar_text(value).ok_or_else(|| {
            KfmError::WellSpec(format!(
                "wells for '{label}' must be a range like A1-C4, got {}",
                describe(value)
            ))
        })?;
        items.push((label, wells));
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Resolve `--ypath`: a file is used as is, a folder is searched for the
/// first `*.yaml`/`*.yml` by name.
pub fn locate(fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
    if !fs.is_dir(path) {
        if fs.exists(path) {
            return Ok(path.to_path_buf());
        }
        return Err(KfmError::WellSpecNotFound(path.to_path_buf()));
    }

    fs.list_dir(path)
        .with_path("read directory", path)?
        .into_iter()
        .find(|entry| {
            !entry.is_dir
                && Path::new(&entry.name)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        })
        .map(|entry| entry.path)
        .ok_or_else(|| KfmError::WellSpecNotFound(path.to_path_buf()))
}
