//! Core data types for Monte-Carlo truth matching.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Link`](link::Link): a weighted reference to one simulated record
//! - [`Match`](matches::Match): the weight-accumulating set of links attached to a
//!   reconstructed object
//! - [`TrackMatch`](matches::TrackMatch): a match plus true/wrong hit counters
//! - [`reco`]: reconstructed objects (digis, clusters, hits, tracks, rings)
//! - [`mc`]: simulated particles and points, addressed by (file, event, index)
//! - [`types`]: subsystem identifiers, hit kinds and branch naming
//!
//! ## Link identity
//!
//! A link is identified by its `(file, entry, index)` key. Adding a link
//! whose key is already present never duplicates it; the weights add up.
//!
//! | Field  | Meaning                              |
//! |--------|--------------------------------------|
//! | file   | input file the record was read from  |
//! | entry  | event number inside that file        |
//! | index  | position of the record in the event  |
//! | weight | contribution of the record           |

pub mod link;
pub mod matches;
pub mod mc;
pub mod reco;
pub mod types;
