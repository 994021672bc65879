use serde::{Deserialize, Serialize};

use crate::core::types::HitKind;

/// A digitized detector signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Digi {
    /// Readout channel address
    pub address: i32,

    /// Signal amount; time over threshold for TOF digis
    #[serde(default)]
    pub charge: f64,

    #[serde(default)]
    pub time: f64,
}

/// Group of digis from one readout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Indices into the subsystem's digi array
    pub digis: Vec<usize>,
}

impl Cluster {
    pub fn new(digis: Vec<usize>) -> Self {
        Self { digis }
    }
}

/// Single-sided hit (pixel, pad or plain hit)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Parent object: cluster, digi or MC point depending on the subsystem
    pub ref_id: usize,

    /// Readout address, used where hits are matched by address
    #[serde(default)]
    pub address: i32,

    #[serde(default)]
    pub position: [f64; 3],
}

impl Hit {
    pub fn new(ref_id: usize) -> Self {
        Self {
            ref_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: i32) -> Self {
        self.address = address;
        self
    }
}

/// Hit built from a front-side and a back-side cluster of a strip sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StsHit {
    pub front_cluster: usize,
    pub back_cluster: usize,
}

impl StsHit {
    pub fn new(front_cluster: usize, back_cluster: usize) -> Self {
        Self {
            front_cluster,
            back_cluster,
        }
    }
}

/// Reference from a track to one of its hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHit {
    pub kind: HitKind,
    pub index: usize,
}

/// Track built from hits of a single subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub hits: Vec<TrackHit>,
}

impl Track {
    /// Track whose hits are all of one kind
    pub fn from_hits(kind: HitKind, indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            hits: indices
                .into_iter()
                .map(|index| TrackHit { kind, index })
                .collect(),
        }
    }
}

/// Track fitted through the silicon trackers (MVD + STS)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StsTrack {
    #[serde(default)]
    pub mvd_hits: Vec<usize>,
    pub sts_hits: Vec<usize>,
}

impl StsTrack {
    pub fn new(mvd_hits: Vec<usize>, sts_hits: Vec<usize>) -> Self {
        Self { mvd_hits, sts_hits }
    }
}

/// RICH photon hit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichHit {
    /// Source digi, if the hit has one
    #[serde(default)]
    pub digi: Option<usize>,
}

/// Ring of RICH hits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichRing {
    pub hits: Vec<usize>,
}
