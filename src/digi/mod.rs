//! Access to digis and their simulated-truth matches.
//!
//! The matching engine never reaches for a global digi manager. Whoever
//! drives it passes a [`DigiSource`] for the event being processed, so the
//! lifetime of the digi data is the caller's business.
//!
//! - [`DigiSource`]: the read-only interface the matching stages use
//! - [`DigiStore`]: an in-memory implementation, deserializable from event files

pub mod store;

pub use store::DigiStore;

use crate::core::matches::Match;
use crate::core::reco::Digi;
use crate::core::types::ModuleId;

/// Provider of digis and their truth matches, per subsystem
pub trait DigiSource {
    /// Whether truth matches were produced for this subsystem's digis
    fn is_match_present(&self, module: ModuleId) -> bool;

    fn nof_digis(&self, module: ModuleId) -> usize;

    fn digi(&self, module: ModuleId, index: usize) -> Option<&Digi>;

    /// Truth match of one digi; `None` if the branch or the entry is missing
    fn digi_match(&self, module: ModuleId, index: usize) -> Option<&Match>;

    /// Number of truth matches stored for this subsystem
    fn nof_digi_matches(&self, module: ModuleId) -> usize;
}
