//! `wheel` CLI: sector rotation and agent loop monitoring for a code-improvement agent.
//!
//! State lives under `.wheel/` in the current directory. Commands print JSON to
//! stdout; diagnostics go to stderr (see `RUST_LOG`).

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use wheel::core::types::{ClassificationConfidence, Reclassification};
use wheel::exit_codes;
use wheel::io::paths::{InitOptions, init_wheel};
use wheel::replay::replay_transcript;
use wheel::rotation::{
    ScanEvent, build_report, next_scope, record_merge, record_scan, record_ticket,
    refresh_from_inventory,
};

#[derive(Parser)]
#[command(
    name = "wheel",
    version,
    about = "Sector rotation scheduler and agent loop monitor"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.wheel/` with the default config and the sector state schema.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Rebuild sectors from a module inventory, keeping history for known paths.
    Refresh {
        /// JSON array of modules produced by the inventory provider.
        #[arg(long)]
        inventory: PathBuf,
    },
    /// Print the sector to scan in the given cycle.
    Next {
        #[arg(long)]
        cycle: u64,
    },
    /// Record a scan, ticket or merge outcome.
    Record {
        #[command(subcommand)]
        event: RecordCommand,
    },
    /// Print coverage, scope adjustment and per-sector metrics.
    Report,
    /// Run a recorded agent transcript (JSON Lines) through the loop monitor.
    Replay { transcript: PathBuf },
}

#[derive(Subcommand)]
enum RecordCommand {
    /// A finished scan of a sector.
    Scan {
        #[arg(long)]
        path: String,
        #[arg(long)]
        cycle: u64,
        /// Number of proposals the scan produced.
        #[arg(long)]
        proposals: u32,
        /// Reclassify the sector as production (true) or not (false).
        #[arg(long)]
        production: Option<bool>,
        /// Replace the sector's purpose.
        #[arg(long)]
        purpose: Option<String>,
        /// Confidence of the reclassification; below medium it is ignored.
        #[arg(long, value_enum, default_value_t = ConfidenceArg::Medium)]
        confidence: ConfidenceArg,
    },
    /// A ticket from the sector succeeded or failed.
    Ticket {
        #[arg(long)]
        path: String,
        #[arg(long, value_enum)]
        outcome: TicketOutcome,
        #[arg(long)]
        category: Option<String>,
    },
    /// A PR from the sector was merged or closed.
    Merge {
        #[arg(long)]
        path: String,
        #[arg(long, value_enum)]
        outcome: MergeOutcome,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfidenceArg {
    Low,
    Medium,
    High,
}

impl From<ConfidenceArg> for ClassificationConfidence {
    fn from(value: ConfidenceArg) -> Self {
        match value {
            ConfidenceArg::Low => ClassificationConfidence::Low,
            ConfidenceArg::Medium => ClassificationConfidence::Medium,
            ConfidenceArg::High => ClassificationConfidence::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TicketOutcome {
    Success,
    Failure,
}

#[derive(Clone, Copy, ValueEnum)]
enum MergeOutcome {
    Merged,
    Closed,
}

#[derive(Serialize)]
struct Recorded {
    applied: bool,
}

fn main() {
    wheel::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = Path::new(".");
    match cli.command {
        Command::Init { force } => {
            let paths = init_wheel(root, &InitOptions { force })?;
            println!("initialized {}", paths.wheel_dir.display());
            Ok(exit_codes::OK)
        }
        Command::Refresh { inventory } => {
            let summary = refresh_from_inventory(root, &inventory, now_ms())?;
            print_json(&summary)?;
            Ok(exit_codes::OK)
        }
        Command::Next { cycle } => match next_scope(root, cycle, now_ms())? {
            Some(next) => {
                print_json(&next)?;
                Ok(exit_codes::OK)
            }
            None => {
                eprintln!("no sector qualifies for cycle {}", cycle);
                Ok(exit_codes::NO_SECTOR)
            }
        },
        Command::Record { event } => {
            let applied = cmd_record(root, event)?;
            print_json(&Recorded { applied })?;
            Ok(exit_codes::OK)
        }
        Command::Report => {
            print_json(&build_report(root)?)?;
            Ok(exit_codes::OK)
        }
        Command::Replay { transcript } => {
            let outcome = replay_transcript(root, &transcript)?;
            print_json(&outcome)?;
            Ok(outcome.exit_code())
        }
    }
}

fn cmd_record(root: &Path, event: RecordCommand) -> Result<bool> {
    match event {
        RecordCommand::Scan {
            path,
            cycle,
            proposals,
            production,
            purpose,
            confidence,
        } => {
            let reclassification =
                (production.is_some() || purpose.is_some()).then(|| Reclassification {
                    production,
                    purpose,
                    confidence: confidence.into(),
                });
            let event = ScanEvent {
                path,
                cycle,
                proposal_count: proposals,
                reclassification,
            };
            record_scan(root, &event, now_ms())
        }
        RecordCommand::Ticket {
            path,
            outcome,
            category,
        } => record_ticket(
            root,
            &path,
            matches!(outcome, TicketOutcome::Success),
            category.as_deref(),
        ),
        RecordCommand::Merge { path, outcome } => {
            record_merge(root, &path, matches!(outcome, MergeOutcome::Merged))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
