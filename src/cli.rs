//! CLI argument definitions.

use clap::{ArgAction, Parser, ValueEnum};
use kfm::commands::{Direction, RunConfig};
use kfm::layout::{GroupBy, ScanOrder, UnmappedPolicy};
use kfm::manifest::ConflictMode;
use kfm::wells::{PlateFormat, DEFAULT_SEPARATOR};
use kfm::Result;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "kfm",
    version,
    about = "Move Keyence images into folders named after their well conditions",
    long_about = "Move Keyence images into folders named after their well conditions.\n\n\
                  Conditions are read from a YAML file in the group folder. Every move is\n\
                  recorded in kfm_record.json so that `kfm -rev` restores the original layout."
)]
pub struct Cli {
    /// Group folder containing the XY01, XY02, ... folders.
    #[arg(value_name = "GROUP_FOLDER_PATH")]
    pub group_folder: PathBuf,

    /// Reverse the moves recorded in the group folder.
    #[arg(short = 'r', long = "rev", alias = "reverse")]
    pub reverse: bool,

    /// Well-condition YAML, or a folder holding one (default: the group folder).
    #[arg(long = "ypath", value_name = "YAML_PATH")]
    pub ypath: Option<PathBuf>,

    /// Grouping keys: none, natural, XY, cond, T, stitch, Z, CH.
    #[arg(long = "opt", value_name = "KEY", num_args = 1.., value_delimiter = ',')]
    pub opt: Vec<String>,

    /// Plate size in wells (overrides the YAML `plate` key).
    #[arg(long = "plate", value_name = "N")]
    pub plate: Option<PlateFormat>,

    /// How XY folders are mapped to wells.
    #[arg(long = "scan-order", default_value = "shortcut")]
    pub scan_order: ScanOrder,

    /// Joins the labels of a well with several conditions.
    #[arg(long = "separator", value_name = "SEP", default_value = DEFAULT_SEPARATOR)]
    pub separator: String,

    /// Fail when a well has no condition instead of labelling it "unassigned".
    #[arg(long = "strict-wells")]
    pub strict_wells: bool,

    /// What to do when a destination already exists.
    #[arg(long = "on-conflict", value_enum, default_value = "abort")]
    pub on_conflict: ConflictArg,

    /// Leave non-image entries of the group folder in place.
    #[arg(long = "no-unmoved")]
    pub no_unmoved: bool,

    /// Print what would be moved without touching anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// More log output (-v for debug, -vv for trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConflictArg {
    Abort,
    Skip,
}

impl Cli {
    /// Parse `std::env::args`, accepting the single-dash long flags of older releases
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_legacy_args(std::env::args_os()))
    }

    pub fn run_config(&self) -> Result<RunConfig> {
        Ok(RunConfig {
            group_folder: self.group_folder.clone(),
            direction: if self.reverse {
                Direction::Reverse
            } else {
                Direction::Forward
            },
            yaml_path: self.ypath.clone(),
            group_by: GroupBy::from_options(&self.opt)?,
            plate: self.plate,
            scan_order: self.scan_order,
            separator: self.separator.clone(),
            unmapped: if self.strict_wells {
                UnmappedPolicy::Strict
            } else {
                UnmappedPolicy::Fallback
            },
            on_conflict: match self.on_conflict {
                ConflictArg::Abort => ConflictMode::Abort,
                ConflictArg::Skip => ConflictMode::Skip,
            },
            collect_unmoved: !self.no_unmoved,
            dry_run: self.dry_run,
        })
    }
}

/// Rewrite `-rev`, `-ypath` and `-opt` to their `--` forms
pub fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let (flag, value) = match text.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (text, None),
            };
            let replacement = match flag {
                "-rev" | "-reverse" => "--rev",
                "-ypath" => "--ypath",
                "-opt" => "--opt",
                _ => return arg,
            };
            match value {
                Some(value) => OsString::from(format!("{replacement}={value}")),
                None => OsString::from(replacement),
            }
        })
        .collect()
}
