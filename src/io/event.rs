use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::matches::Match;
use crate::core::mc::McData;
use crate::core::reco::{Cluster, Hit, RichHit, RichRing, StsHit, StsTrack, Track};
use crate::core::types::{branch_name, MatchLevel, ModuleId};
use crate::digi::{DigiSource, DigiStore};
use crate::io::branches::MatchBranches;

#[derive(Error, Debug)]
pub enum EventFileError {
    #[error("Failed to read event file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse event file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Event file version for compatibility checking
pub const EVENT_FILE_VERSION: &str = "1.0.0";

/// Reconstructed arrays of one subsystem
///
/// `T` is the track type; subsystems without tracking use `()`.
/// Missing arrays deserialize as `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "H: Deserialize<'de>, T: Deserialize<'de>"))]
pub struct Detector<H, T = Track> {
    pub clusters: Option<Vec<Cluster>>,

    pub hits: Option<Vec<H>>,

    #[serde(alias = "rings")]
    pub tracks: Option<Vec<T>>,
}

impl<H, T> Default for Detector<H, T> {
    fn default() -> Self {
        Self {
            clusters: None,
            hits: None,
            tracks: None,
        }
    }
}

/// Everything the matching needs for one event (or timeslice)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub file: i32,

    #[serde(default)]
    pub entry: i32,

    #[serde(default)]
    pub digis: DigiStore,

    #[serde(default)]
    pub mc: McData,

    #[serde(default)]
    pub mvd: Detector<Hit, ()>,

    #[serde(default)]
    pub sts: Detector<StsHit, StsTrack>,

    #[serde(default)]
    pub much: Detector<Hit>,

    #[serde(default)]
    pub trd: Detector<Hit>,

    #[serde(default)]
    pub rich: Detector<RichHit, RichRing>,

    #[serde(default)]
    pub tof: Detector<Hit, ()>,

    /// TOF hit -> digi links (link index = digi index)
    #[serde(default)]
    pub tof_hit_digi_matches: Option<Vec<Match>>,

    #[serde(default)]
    pub fsd: Detector<Hit, ()>,

    /// Match branches already present in the input
    #[serde(default)]
    pub matches: MatchBranches,
}

impl Event {
    pub fn new(file: i32, entry: i32) -> Self {
        Self {
            file,
            entry,
            ..Self::default()
        }
    }

    /// Names of the input branches this event carries
    pub fn layout(&self) -> BranchLayout {
        let mut layout = BranchLayout::default();

        if self.mc.tracks.is_some() {
            layout.insert("MCTrack");
        }
        for module in self.mc.points.keys() {
            layout.insert(format!("{}Point", module.branch_prefix()));
        }
        for module in ModuleId::ALL {
            if self.digis.is_match_present(module) {
                layout.insert(format!("{}DigiMatch", module.branch_prefix()));
            }
            for level in [MatchLevel::Cluster, MatchLevel::Hit, MatchLevel::Track] {
                if self.matches.contains(module, level) {
                    layout.insert(branch_name(module, level));
                }
            }
        }

        let mut reco = |name: &str, present: bool| {
            if present {
                layout.insert(name);
            }
        };
        reco("MvdCluster", self.mvd.clusters.is_some());
        reco("MvdHit", self.mvd.hits.is_some());
        reco("StsCluster", self.sts.clusters.is_some());
        reco("StsHit", self.sts.hits.is_some());
        reco("StsTrack", self.sts.tracks.is_some());
        reco("MuchCluster", self.much.clusters.is_some());
        reco("MuchPixelHit", self.much.hits.is_some());
        reco("MuchTrack", self.much.tracks.is_some());
        reco("TrdCluster", self.trd.clusters.is_some());
        reco("TrdHit", self.trd.hits.is_some());
        reco("TrdTrack", self.trd.tracks.is_some());
        reco("RichHit", self.rich.hits.is_some());
        reco("RichRing", self.rich.tracks.is_some());
        reco("TofHit", self.tof.hits.is_some());
        reco("TofHitDigiMatch", self.tof_hit_digi_matches.is_some());
        reco("FsdHit", self.fsd.hits.is_some());

        layout
    }
}

/// Set of input branch names available to a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchLayout {
    names: BTreeSet<String>,
}

impl BranchLayout {
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Serializable event file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFile {
    pub version: String,
    pub events: Vec<Event>,
}

impl EventFile {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            version: EVENT_FILE_VERSION.to_string(),
            events,
        }
    }

    /// Load events from a JSON file, gzip-compressed if it ends in `.gz`
    pub fn load_from_file(path: &Path) -> Result<Self, EventFileError> {
        let file = std::fs::File::open(path)?;
        let mut content = String::new();
        if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            debug!("Reading gzip-compressed event file {}", path.display());
            GzDecoder::new(file).read_to_string(&mut content)?;
        } else {
            std::io::BufReader::new(file).read_to_string(&mut content)?;
        }
        Self::from_json(&content)
    }

    /// Parse events from a JSON string
    pub fn from_json(json: &str) -> Result<Self, EventFileError> {
        let data: EventFile = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != EVENT_FILE_VERSION {
            warn!(
                "Event file version mismatch (expected {}, found {})",
                EVENT_FILE_VERSION, data.version
            );
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "version": "1.0.0",
        "events": [{
            "entry": 3,
            "mc": {"tracks": {"events": [{"entry": 3, "records": [{"pdg_code": 211}]}]}},
            "sts": {
                "clusters": [{"digis": [0, 1]}],
                "hits": [{"front_cluster": 0, "back_cluster": 0}]
            },
            "rich": {"hits": [{"digi": 0}], "rings": [{"hits": [0]}]}
        }]
    }"#;

    #[test]
    fn test_parse_minimal_event_file() {
        let file = EventFile::from_json(MINIMAL).unwrap();
        assert_eq!(file.events.len(), 1);
        let event = &file.events[0];
        assert_eq!(event.entry, 3);
        assert_eq!(event.file, 0);
        assert_eq!(event.sts.clusters.as_ref().map(Vec::len), Some(1));
        assert!(event.sts.tracks.is_none());
        assert_eq!(event.rich.tracks.as_ref().map(Vec::len), Some(1));
        assert!(event.much.hits.is_none());
    }

    #[test]
    fn test_detector_arrays_are_optional() {
        let sts: Detector<StsHit, StsTrack> = serde_json::from_str(
            r#"{"hits": [{"front_cluster": 1, "back_cluster": 2}],
                "tracks": [{"mvd_hits": [], "sts_hits": [0]}]}"#,
        )
        .unwrap();
        assert!(sts.clusters.is_none());
        assert_eq!(sts.hits, Some(vec![StsHit::new(1, 2)]));
        assert_eq!(sts.tracks.as_ref().map(Vec::len), Some(1));

        let empty: Detector<StsHit, StsTrack> = serde_json::from_str("{}").unwrap();
        assert!(empty.clusters.is_none() && empty.hits.is_none() && empty.tracks.is_none());
    }

    #[test]
    fn test_layout() {
        let file = EventFile::from_json(MINIMAL).unwrap();
        let layout = file.events[0].layout();
        assert!(layout.contains("MCTrack"));
        assert!(layout.contains("StsCluster"));
        assert!(layout.contains("StsHit"));
        assert!(layout.contains("RichRing"));
        assert!(!layout.contains("StsTrack"));
        assert!(!layout.contains("StsDigiMatch"));
        assert!(!layout.contains("StsHitMatch"));
    }

    #[test]
    fn test_version_mismatch_is_not_fatal() {
        let json = r#"{"version": "0.9", "events": []}"#;
        let file = EventFile::from_json(json).unwrap();
        assert!(file.events.is_empty());
    }

    #[test]
    fn test_load_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            std::fs::File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all(MINIMAL.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let file = EventFile::load_from_file(&path).unwrap();
        assert_eq!(file.events.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EventFile::load_from_file(Path::new("/nonexistent/events.json")).unwrap_err();
        assert!(matches!(err, EventFileError::Io(_)));
    }
}
