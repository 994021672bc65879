use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::link::Link;
use crate::core::types::ModuleId;

/// A simulated particle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McTrack {
    pub pdg_code: i32,

    /// Index of the parent track, negative for primaries
    #[serde(default = "no_mother")]
    pub mother_id: i32,

    /// Number of MC points the particle left in each subsystem
    #[serde(default)]
    pub points: BTreeMap<ModuleId, u32>,
}

fn no_mother() -> i32 {
    -1
}

impl McTrack {
    pub fn new(pdg_code: i32, mother_id: i32) -> Self {
        Self {
            pdg_code,
            mother_id,
            points: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_points(mut self, module: ModuleId, n: u32) -> Self {
        self.points.insert(module, n);
        self
    }

    pub fn n_points(&self, module: ModuleId) -> u32 {
        self.points.get(&module).copied().unwrap_or(0)
    }
}

/// A simulated energy deposit of a particle in a sensitive volume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McPoint {
    /// Index of the MC track that produced the point
    pub track_id: i32,

    #[serde(default)]
    pub energy_loss: f64,
}

impl McPoint {
    pub fn new(track_id: i32) -> Self {
        Self {
            track_id,
            energy_loss: 0.0,
        }
    }
}

/// Records of one kind, addressable by (file, event, index)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McDataArray<T> {
    events: Vec<McEventData<T>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct McEventData<T> {
    #[serde(default)]
    file: i32,
    entry: i32,
    records: Vec<T>,
}

impl<T> Default for McDataArray<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> McDataArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the records of one event
    pub fn insert_event(&mut self, file: i32, entry: i32, records: Vec<T>) {
        match self
            .events
            .iter_mut()
            .find(|e| e.file == file && e.entry == entry)
        {
            Some(existing) => existing.records = records,
            None => self.events.push(McEventData {
                file,
                entry,
                records,
            }),
        }
    }

    #[must_use]
    pub fn with_event(mut self, file: i32, entry: i32, records: Vec<T>) -> Self {
        self.insert_event(file, entry, records);
        self
    }

    pub fn get(&self, file: i32, entry: i32, index: i32) -> Option<&T> {
        let index = usize::try_from(index).ok()?;
        self.events
            .iter()
            .find(|e| e.file == file && e.entry == entry)
            .and_then(|e| e.records.get(index))
    }

    /// Record the link points at; `None` for noise or unknown records
    pub fn get_link(&self, link: &Link) -> Option<&T> {
        self.get(link.file, link.entry, link.index)
    }

    /// Number of records stored for one event
    pub fn size(&self, file: i32, entry: i32) -> usize {
        self.events
            .iter()
            .find(|e| e.file == file && e.entry == entry)
            .map_or(0, |e| e.records.len())
    }
}

/// All simulated data available for matching
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McData {
    #[serde(default)]
    pub tracks: Option<McDataArray<McTrack>>,

    /// MC points per subsystem
    #[serde(default)]
    pub points: BTreeMap<ModuleId, McDataArray<McPoint>>,
}

impl McData {
    pub fn points(&self, module: ModuleId) -> Option<&McDataArray<McPoint>> {
        self.points.get(&module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_file_entry_index() {
        let array = McDataArray::new()
            .with_event(0, 0, vec![McPoint::new(10), McPoint::new(11)])
            .with_event(0, 1, vec![McPoint::new(20)]);

        assert_eq!(array.get(0, 0, 1).map(|p| p.track_id), Some(11));
        assert_eq!(array.get(0, 1, 0).map(|p| p.track_id), Some(20));
        assert!(array.get(0, 1, 1).is_none());
        assert!(array.get(1, 0, 0).is_none());
        assert!(array.get(0, 0, -1).is_none());
        assert_eq!(array.size(0, 0), 2);
    }

    #[test]
    fn test_get_link_noise_is_none() {
        let array = McDataArray::new().with_event(0, 0, vec![McPoint::new(1)]);
        assert!(array.get_link(&Link::noise()).is_none());
        assert!(array.get_link(&Link::new(1.0, 0, 0, 0)).is_some());
    }

    #[test]
    fn test_mc_track_points() {
        let track = McTrack::new(211, -1).with_points(ModuleId::Sts, 6);
        assert_eq!(track.n_points(ModuleId::Sts), 6);
        assert_eq!(track.n_points(ModuleId::Much), 0);
    }

    #[test]
    fn test_deserialize_mc_track_defaults() {
        let track: McTrack = serde_json::from_str(r#"{"pdg_code": 11}"#).unwrap();
        assert_eq!(track.mother_id, -1);
        assert!(track.points.is_empty());

        let track: McTrack =
            serde_json::from_str(r#"{"pdg_code": 11, "mother_id": 3, "points": {"sts": 4}}"#)
                .unwrap();
        assert_eq!(track.n_points(ModuleId::Sts), 4);
    }
}
