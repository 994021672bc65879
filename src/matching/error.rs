use thiserror::Error;

use crate::core::types::ModuleId;

/// Conditions that abort matching for one subsystem (or the whole run)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error(
        "no match found for system {module} digi index {digi_index} (digi {digi} from cluster {cluster})"
    )]
    MissingDigiMatch {
        module: ModuleId,
        digi_index: usize,
        digi: usize,
        cluster: usize,
    },

    #[error("{module}: missing the necessary input for matching: {branch}")]
    MissingBranch { module: ModuleId, branch: String },

    #[error("{module}: {what} index {index} out of range (size {len})")]
    IndexOutOfRange {
        module: ModuleId,
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{module}: no MC point {index} in event {entry} of file {file}")]
    MissingMcPoint {
        module: ModuleId,
        file: i32,
        entry: i32,
        index: usize,
    },

    #[error("STS track {track} contains MVD hits, but there is no MVD data available")]
    MvdInconsistency { track: usize },

    #[error("number of {module} digis ({digis}) does not match number of digi matches ({matches})")]
    DigiMatchCountMismatch {
        module: ModuleId,
        digis: usize,
        matches: usize,
    },

    #[error("missing the necessary input for matching: {0}")]
    MissingInput(String),

    #[error("matching engine used before initialization")]
    NotInitialized,
}

/// Bounds-checked lookup used by every matching stage
pub(crate) fn checked<'a, T>(
    items: &'a [T],
    index: usize,
    module: ModuleId,
    what: &'static str,
) -> Result<&'a T, MatchError> {
    items.get(index).ok_or(MatchError::IndexOutOfRange {
        module,
        what,
        index,
        len: items.len(),
    })
}
