//! # cbm-match
//!
//! Monte-Carlo truth matching for reconstructed CBM data.
//!
//! Every reconstructed object of the CBM reconstruction chain (cluster, hit,
//! track, RICH ring) is traced back to the simulated particles that produced
//! it. Contributions are weighted, and the heaviest one becomes the object's
//! best match. QA code then uses these matches to measure track purity and
//! ghost and clone rates.
//!
//! ## Features
//!
//! - **Bottom-up matching**: digis to clusters to hits to tracks
//! - **Two-sided sensors**: STS hits keep only particles seen on both sides
//! - **Silicon track fusion**: MVD and STS hits vote together for STS tracks
//! - **RICH rings**: matched to the mothers of their Cherenkov photons
//! - **Failure isolation**: a broken subsystem never touches the others
//! - **Track QA**: reconstructed, clone and ghost classification
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use cbm_match::{EventFile, MatchRecoToMc, MatchingConfig};
//!
//! let file = EventFile::load_from_file(Path::new("events.json.gz")).unwrap();
//! let mut engine = MatchRecoToMc::new(MatchingConfig::default());
//! engine.init(&file.events[0].layout()).unwrap();
//!
//! for event in &file.events {
//!     let report = engine.exec(event).unwrap();
//!     for (branch, entries) in report.branches.summary() {
//!         println!("{branch}: {entries}");
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: links, matches and the reconstructed and simulated data model
//! - [`digi`]: access to digis and their truth matches
//! - [`matching`]: the matching stages and the per-event engine
//! - [`io`]: event files and match output
//! - [`cli`]: command-line interface implementation

pub mod cli;
pub mod core;
pub mod digi;
pub mod io;
pub mod matching;

// Re-export commonly used types for convenience
pub use core::link::{Link, LinkKey};
pub use core::matches::{Match, TrackMatch};
pub use core::types::*;
pub use io::{Event, EventFile, MatchBranches};
pub use matching::engine::{EventReport, MatchRecoToMc, MatchingConfig};
pub use matching::MatchError;
