//! Match command - run the truth matching over an event file.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::types::{branch_name, MatchLevel, ModuleId};
use crate::io::event::EventFile;
use crate::io::output::{EventMatches, MatchRun};
use crate::matching::engine::{EventReport, MatchRecoToMc, MatchingConfig};

#[derive(Args)]
pub struct MatchArgs {
    /// Event file (JSON, optionally gzip-compressed with a .gz extension)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Write the match branches to this file (.bin for bincode, JSON otherwise)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Matching configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reuse cluster and hit matches stored in the input instead of recomputing them
    #[arg(long)]
    pub suppress_hit_rematching: bool,
}

/// Execute the match command
///
/// # Errors
///
/// Returns an error if the input or configuration cannot be read, if the
/// input lacks MC tracks, or if any subsystem failed on any event.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.suppress_hit_rematching {
        config.suppress_hit_rematching = true;
    }

    let reports = match_events(&args.input, config, verbose)?;

    match format {
        OutputFormat::Text => print_text_reports(&reports),
        OutputFormat::Json => print_json_reports(&reports)?,
        OutputFormat::Tsv => print_tsv_reports(&reports),
    }

    let nof_failures: usize = reports.iter().map(|r| r.failures.len()).sum();
    let nof_events = reports.len();

    if let Some(output) = &args.output {
        let run = MatchRun::new(reports.into_iter().map(EventMatches::from).collect());
        run.save(output)?;
        if verbose {
            eprintln!("Wrote matches of {} events to {}", nof_events, output.display());
        }
    }

    if nof_failures > 0 {
        anyhow::bail!("{nof_failures} subsystem matching failure(s) in {nof_events} event(s)");
    }

    Ok(())
}

/// Load the configuration file, or the defaults without one
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<MatchingConfig> {
    match path {
        Some(path) => Ok(MatchingConfig::from_file(path)?),
        None => Ok(MatchingConfig::default()),
    }
}

/// Read an event file and run the engine over every event
pub(crate) fn match_events(
    input: &Path,
    config: MatchingConfig,
    verbose: bool,
) -> anyhow::Result<Vec<EventReport>> {
    let file = EventFile::load_from_file(input)?;
    let first = file
        .events
        .first()
        .ok_or_else(|| anyhow::anyhow!("No events in {}", input.display()))?;

    let mut engine = MatchRecoToMc::new(config);
    let plan = engine.init(&first.layout())?;
    if verbose {
        eprintln!(
            "Loaded {} events from {} (MVD {}, hit re-matching {})",
            file.events.len(),
            input.display(),
            if plan.mvd_active { "active" } else { "inactive" },
            if plan.suppress_hit_rematching {
                "suppressed"
            } else {
                "enabled"
            },
        );
    }

    let mut reports = Vec::with_capacity(file.events.len());
    for event in &file.events {
        reports.push(engine.exec(event)?);
    }
    Ok(reports)
}

fn print_text_reports(reports: &[EventReport]) {
    for report in reports {
        println!("Event {} (file {})", report.entry, report.file);

        let summary = report.branches.summary();
        if summary.is_empty() {
            println!("  no match branches");
        }
        for (branch, entries) in &summary {
            println!("  {branch:<20} {entries:>6}");
        }

        for module in ModuleId::ALL {
            let Some(tracks) = report.branches.tracks(module) else {
                continue;
            };
            for (i, track_match) in tracks.iter().enumerate() {
                println!(
                    "    {} #{}: {}",
                    branch_name(module, MatchLevel::Track),
                    i,
                    track_match
                );
            }
        }

        for failure in &report.failures {
            println!("  FAILED: {failure}");
        }
        println!();
    }

    let nof_failures: usize = reports.iter().map(|r| r.failures.len()).sum();
    println!(
        "Processed {} events, {} subsystem failure(s)",
        reports.len(),
        nof_failures
    );
}

fn print_json_reports(reports: &[EventReport]) -> anyhow::Result<()> {
    let events: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| {
            let branches: serde_json::Map<String, serde_json::Value> = report
                .branches
                .summary()
                .into_iter()
                .map(|(name, entries)| (name, serde_json::json!(entries)))
                .collect();
            serde_json::json!({
                "file": report.file,
                "entry": report.entry,
                "branches": branches,
                "failures": report.failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "matches": report.branches,
            })
        })
        .collect();

    let output = serde_json::json!({ "events": events });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_reports(reports: &[EventReport]) {
    println!(
        "file\tentry\tbranch\tindex\tmc_file\tmc_entry\tmc_index\tweight\ttotal_weight\ttrue_hits\twrong_hits\tpurity"
    );
    for report in reports {
        for module in ModuleId::ALL {
            let Some(tracks) = report.branches.tracks(module) else {
                continue;
            };
            let branch = branch_name(module, MatchLevel::Track);
            for (i, track_match) in tracks.iter().enumerate() {
                let best = track_match.matched_link();
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{}\t{}\t{:.4}",
                    report.file,
                    report.entry,
                    branch,
                    i,
                    best.file,
                    best.entry,
                    best.index,
                    best.weight,
                    track_match.truth.total_weight(),
                    track_match.nof_true_hits,
                    track_match.nof_wrong_hits,
                    track_match.true_over_all_hits_ratio(),
                );
            }
        }
    }
}
