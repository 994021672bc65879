use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::matches::{Match, TrackMatch};
use crate::core::types::{branch_name, MatchLevel, ModuleId};

/// Match arrays produced for one subsystem, parallel to its reco arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorMatches {
    #[serde(default)]
    pub clusters: Option<Vec<Match>>,

    #[serde(default)]
    pub hits: Option<Vec<Match>>,

    /// Track matches (ring matches for the RICH)
    #[serde(default, alias = "rings")]
    pub tracks: Option<Vec<TrackMatch>>,
}

impl DetectorMatches {
    /// True when no branch was produced at all
    pub fn is_empty(&self) -> bool {
        self.clusters.is_none() && self.hits.is_none() && self.tracks.is_none()
    }
}

/// All match branches of one event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchBranches {
    detectors: BTreeMap<ModuleId, DetectorMatches>,
}

impl MatchBranches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module: ModuleId) -> Option<&DetectorMatches> {
        self.detectors.get(&module)
    }

    pub fn clusters(&self, module: ModuleId) -> Option<&[Match]> {
        self.get(module)?.clusters.as_deref()
    }

    pub fn hits(&self, module: ModuleId) -> Option<&[Match]> {
        self.get(module)?.hits.as_deref()
    }

    pub fn tracks(&self, module: ModuleId) -> Option<&[TrackMatch]> {
        self.get(module)?.tracks.as_deref()
    }

    /// Store all branches of one subsystem, replacing earlier ones
    pub fn insert(&mut self, module: ModuleId, matches: DetectorMatches) {
        self.detectors.insert(module, matches);
    }

    pub fn set_clusters(&mut self, module: ModuleId, matches: Vec<Match>) {
        self.detectors.entry(module).or_default().clusters = Some(matches);
    }

    pub fn set_hits(&mut self, module: ModuleId, matches: Vec<Match>) {
        self.detectors.entry(module).or_default().hits = Some(matches);
    }

    pub fn set_tracks(&mut self, module: ModuleId, matches: Vec<TrackMatch>) {
        self.detectors.entry(module).or_default().tracks = Some(matches);
    }

    /// Whether a branch of this level exists for the subsystem
    pub fn contains(&self, module: ModuleId, level: MatchLevel) -> bool {
        self.get(module).is_some_and(|d| match level {
            MatchLevel::Cluster => d.clusters.is_some(),
            MatchLevel::Hit => d.hits.is_some(),
            MatchLevel::Track => d.tracks.is_some(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.values().all(DetectorMatches::is_empty)
    }

    /// Registered branches as (name, number of entries), in processing order
    pub fn summary(&self) -> Vec<(String, usize)> {
        let mut result = Vec::new();
        for module in ModuleId::ALL {
            let Some(d) = self.get(module) else {
                continue;
            };
            if let Some(m) = &d.clusters {
                result.push((branch_name(module, MatchLevel::Cluster), m.len()));
            }
            if let Some(m) = &d.hits {
                result.push((branch_name(module, MatchLevel::Hit), m.len()));
            }
            if let Some(m) = &d.tracks {
                result.push((branch_name(module, MatchLevel::Track), m.len()));
            }
        }
        result
    }
}
