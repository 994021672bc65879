//! Event input and match output.
//!
//! - [`event`]: one event's digis, reconstructed objects and simulated data,
//!   read from (optionally gzip-compressed) JSON event files
//! - [`branches`]: the match arrays produced for one event, per subsystem
//! - [`output`]: the document a matching run writes, as JSON or bincode
//!
//! ## Event file layout
//!
//! ```text
//! {
//!   "version": "1.0.0",
//!   "events": [{
//!     "file": 0, "entry": 0,
//!     "digis": { "sts": { "digis": [...], "matches": [{ "links": [...] }] } },
//!     "mc": { "tracks": {...}, "points": { "sts": {...} } },
//!     "sts": { "clusters": [...], "hits": [...], "tracks": [...] },
//!     "rich": { "hits": [...], "rings": [...] },
//!     "matches": { "sts": { "hits": [...] } }
//!   }]
//! }
//! ```

pub mod branches;
pub mod event;
pub mod output;

pub use branches::{DetectorMatches, MatchBranches};
pub use event::{BranchLayout, Event, EventFile};
pub use output::MatchRun;
