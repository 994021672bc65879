//! Command-line interface for cbm-match.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **match**: Run truth matching over an event file and report the branches
//! - **qa**: Run truth matching and summarize track and ring quality
//!
//! ## Usage
//!
//! ```text
//! # Match all events and list the produced branches
//! cbm-match match events.json.gz
//!
//! # Write the match branches (bincode for .bin, JSON otherwise)
//! cbm-match match events.json --output matches.bin
//!
//! # One row per track match, for scripting
//! cbm-match match events.json --format tsv
//!
//! # Track quality with a custom purity quota
//! cbm-match qa events.json --quota 0.8
//! ```

use clap::{Parser, Subcommand};

pub mod matching;
pub mod qa;

#[derive(Parser)]
#[command(name = "cbm-match")]
#[command(author = "CBM Collaboration")]
#[command(version)]
#[command(about = "Match reconstructed CBM objects to their Monte-Carlo truth")]
#[command(
    long_about = "cbm-match traces reconstructed clusters, hits, tracks and RICH rings back to the simulated particles that produced them.\n\nFor every object it records the contributing MC points or tracks with their weights and picks the best match, so that QA can measure:\n- Track purity (true over all hits)\n- Ghost rates\n- Clone rates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match reconstructed objects of every event to the MC truth
    Match(matching::MatchArgs),

    /// Summarize track and ring matching quality
    Qa(qa::QaArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
