//! Truth matching of reconstructed objects.
//!
//! Matches are built bottom-up, one level at a time:
//!
//! - [`clusters`]: a cluster's match is the union of its digis' matches
//! - [`hits`]: a hit's match comes from its cluster(s), digi(s) or MC point
//! - [`tracks`]: a track's match is a vote of the MC tracks behind its hits
//! - [`rings`]: a RICH ring votes for the mothers of its Cherenkov photons
//! - [`engine`]: runs all of the above per event, in detector order
//! - [`quality`]: reconstructed / clone / ghost classification of tracks
//!
//! ## Weights
//!
//! | Level   | Link weight                                        |
//! |---------|----------------------------------------------------|
//! | cluster | digi truth weights, summed per MC point            |
//! | hit     | cluster weights (both sides summed when two-sided) |
//! | track   | 1 per MC point of every hit                        |
//! | ring    | 1 per hit whose photon came from the mother        |
//!
//! Every stage function reads borrowed inputs and returns freshly allocated
//! match arrays, indexed like the objects they describe. A failing stage
//! returns a [`MatchError`] and nothing else.
//!
//! ## Example
//!
//! ```rust
//! use cbm_match::core::link::Link;
//! use cbm_match::core::matches::Match;
//! use cbm_match::core::reco::Cluster;
//! use cbm_match::core::types::ModuleId;
//! use cbm_match::digi::DigiStore;
//! use cbm_match::matching::clusters::match_clusters;
//!
//! let digi_match = |point: i32, weight: f64| -> Match {
//!     std::iter::once(Link::new(weight, point, 0, 0)).collect()
//! };
//! let digis = DigiStore::new().with_matches(
//!     ModuleId::Sts,
//!     vec![digi_match(1, 10.0), digi_match(1, 5.0), digi_match(2, 3.0)],
//! );
//!
//! let clusters = vec![Cluster::new(vec![0, 1, 2])];
//! let matches = match_clusters(ModuleId::Sts, &digis, &clusters)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(matches[0].matched_link().index, 1);
//! assert_eq!(matches[0].total_weight(), 18.0);
//! ```

pub mod clusters;
pub mod engine;
pub mod error;
pub mod hits;
pub mod quality;
pub mod rings;
pub mod tracks;

pub use engine::{EventReport, MatchRecoToMc, MatchingConfig};
pub use error::MatchError;
