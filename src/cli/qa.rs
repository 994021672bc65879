//! QA command - track and ring purity, ghost and clone rates.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use crate::cli::matching::{load_config, match_events};
use crate::cli::OutputFormat;
use crate::core::types::{branch_name, MatchLevel, ModuleId};
use crate::matching::engine::EventReport;
use crate::matching::quality::QualitySummary;

#[derive(Args)]
pub struct QaArgs {
    /// Event file (JSON, optionally gzip-compressed with a .gz extension)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Minimum fraction of true hits for a track to count as reconstructed
    #[arg(long)]
    pub quota: Option<f64>,

    /// Matching configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the qa command
///
/// # Errors
///
/// Returns an error if the input or configuration cannot be read, the quota
/// is outside [0, 1], or the input lacks MC tracks.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: QaArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(quota) = args.quota {
        config.quota = quota;
    }
    config.validate()?;
    let quota = config.quota;

    let reports = match_events(&args.input, config, verbose)?;
    let nof_failures: usize = reports.iter().map(|r| r.failures.len()).sum();
    if nof_failures > 0 {
        eprintln!(
            "Warning: {nof_failures} subsystem matching failure(s), affected subsystems are not counted"
        );
    }

    let summaries = summarize(&reports, quota);

    match format {
        OutputFormat::Text => print_text_summary(&summaries, quota, reports.len()),
        OutputFormat::Json => print_json_summary(&summaries, quota, reports.len())?,
        OutputFormat::Tsv => print_tsv_summary(&summaries),
    }

    Ok(())
}

/// Quality per subsystem, accumulated over all events
fn summarize(reports: &[EventReport], quota: f64) -> BTreeMap<ModuleId, QualitySummary> {
    let mut summaries: BTreeMap<ModuleId, QualitySummary> = BTreeMap::new();
    for report in reports {
        for module in ModuleId::ALL {
            if let Some(tracks) = report.branches.tracks(module) {
                summaries
                    .entry(module)
                    .or_default()
                    .merge(&QualitySummary::from_matches(tracks, quota));
            }
        }
    }
    summaries
}

fn print_text_summary(
    summaries: &BTreeMap<ModuleId, QualitySummary>,
    quota: f64,
    nof_events: usize,
) {
    println!("Track quality over {nof_events} events (quota {quota:.2})");
    println!();

    if summaries.is_empty() {
        println!("No track or ring matches produced.");
        return;
    }

    println!(
        "{:<16} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Branch", "Tracks", "Reco", "Clones", "Ghosts", "Ghost%", "Purity"
    );
    for module in ModuleId::ALL {
        let Some(summary) = summaries.get(&module) else {
            continue;
        };
        println!(
            "{:<16} {:>8} {:>8} {:>8} {:>8} {:>7.1}% {:>7.1}%",
            branch_name(module, MatchLevel::Track),
            summary.tracks,
            summary.reconstructed,
            summary.clones,
            summary.ghosts,
            summary.ghost_rate() * 100.0,
            summary.mean_purity * 100.0,
        );
    }
}

fn print_json_summary(
    summaries: &BTreeMap<ModuleId, QualitySummary>,
    quota: f64,
    nof_events: usize,
) -> anyhow::Result<()> {
    let detectors: Vec<serde_json::Value> = ModuleId::ALL
        .iter()
        .filter_map(|module| {
            summaries.get(module).map(|summary| {
                serde_json::json!({
                    "module": module,
                    "branch": branch_name(*module, MatchLevel::Track),
                    "tracks": summary.tracks,
                    "reconstructed": summary.reconstructed,
                    "clones": summary.clones,
                    "ghosts": summary.ghosts,
                    "ghost_rate": summary.ghost_rate(),
                    "mean_purity": summary.mean_purity,
                })
            })
        })
        .collect();

    let output = serde_json::json!({
        "events": nof_events,
        "quota": quota,
        "detectors": detectors,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_summary(summaries: &BTreeMap<ModuleId, QualitySummary>) {
    println!("branch\ttracks\treconstructed\tclones\tghosts\tghost_rate\tmean_purity");
    for module in ModuleId::ALL {
        let Some(summary) = summaries.get(&module) else {
            continue;
        };
        println!(
            "{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}",
            branch_name(module, MatchLevel::Track),
            summary.tracks,
            summary.reconstructed,
            summary.clones,
            summary.ghosts,
            summary.ghost_rate(),
            summary.mean_purity,
        );
    }
}
