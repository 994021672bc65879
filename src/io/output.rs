use serde::{Deserialize, Serialize};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::io::branches::MatchBranches;
use crate::matching::engine::EventReport;

/// Match output format version
pub const MATCH_RUN_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Match branches of one event plus the detectors that failed on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMatches {
    pub file: i32,
    pub entry: i32,
    pub branches: MatchBranches,
    pub failures: Vec<String>,
}

impl From<EventReport> for EventMatches {
    fn from(report: EventReport) -> Self {
        Self {
            file: report.file,
            entry: report.entry,
            branches: report.branches,
            failures: report
                .failures
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Output document of one matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRun {
    pub version: String,
    pub created_at: String,
    pub events: Vec<EventMatches>,
}

impl MatchRun {
    pub fn new(events: Vec<EventMatches>) -> Self {
        Self {
            version: MATCH_RUN_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            events,
        }
    }

    /// Write the run; `.bin` files get bincode, anything else pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), OutputError> {
        let bytes = if is_binary(path) {
            bincode::serialize(self)?
        } else {
            serde_json::to_vec_pretty(self)?
        };
        std::fs::write(path, bytes)?;
        debug!("Wrote {} events to {}", self.events.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, OutputError> {
        let bytes = std::fs::read(path)?;
        let run: MatchRun = if is_binary(path) {
            bincode::deserialize(&bytes)?
        } else {
            serde_json::from_slice(&bytes)?
        };
        if run.version != MATCH_RUN_VERSION {
            warn!(
                "Match output version mismatch (expected {}, found {})",
                MATCH_RUN_VERSION, run.version
            );
        }
        Ok(run)
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("bin")
}
