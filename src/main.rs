//! kfm command-line entry point.

use kfm::commands::{run, RunOutcome};
use kfm::logging::{init_logging, LogConfig};
use std::error::Error;
use std::path::Path;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse_args();
    let log_config = LogConfig {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    if let Err(error) = init_logging(log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let result = cli.run_config().and_then(|config| run(&config));
    let exit_code = match result {
        Ok(outcome) => {
            print_outcome(&cli.group_folder, &outcome);
            0
        }
        Err(error) => {
            eprintln!("error: {}", error_chain(&error));
            1
        }
    };
    std::process::exit(exit_code);
}

fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

fn relative<'a>(root: &Path, path: &'a Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

fn print_outcome(root: &Path, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Planned(plan) => {
            for planned in &plan.moves {
                println!(
                    "{} -> {}",
                    relative(root, &planned.source),
                    relative(root, &planned.destination)
                );
            }
            println!("{} moves planned (dry run, nothing moved)", plan.len());
        }
        RunOutcome::Moved(report) => {
            println!("Moved {} entries", report.moved);
            if !report.skipped.is_empty() {
                println!("Skipped {}:", report.skipped.len());
                for reason in &report.skipped {
                    println!("  {reason}");
                }
            }
            println!("Record: {}", report.manifest_path.display());
        }
        RunOutcome::ReversePreview(manifest) => {
            for entry in manifest.moves.iter().rev().filter(|entry| !entry.reversed) {
                println!(
                    "{} -> {}",
                    relative(root, &entry.destination),
                    relative(root, &entry.source)
                );
            }
            println!(
                "{} moves from {} would be reversed (dry run, nothing moved)",
                manifest.pending_reversal(),
                manifest.record_time
            );
        }
        RunOutcome::Reversed(report) => {
            println!("Reversed {} entries", report.reversed);
            if report.never_moved > 0 {
                println!("  {} recorded moves had not happened", report.never_moved);
            }
            for dir in &report.kept_dirs {
                println!("  kept non-empty folder {}", relative(root, dir));
            }
            println!("Record archived to {}", report.archived_manifest.display());
        }
    }
}
