use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::matches::Match;
use crate::core::reco::Digi;
use crate::core::types::ModuleId;
use crate::digi::DigiSource;

/// Digis of one subsystem and, if available, their truth matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigiBranch {
    #[serde(default)]
    pub digis: Vec<Digi>,

    /// Parallel to `digis`; absent when the digitizer wrote no matches
    #[serde(default)]
    pub matches: Option<Vec<Match>>,
}

/// In-memory digi provider for one event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigiStore {
    branches: BTreeMap<ModuleId, DigiBranch>,
}

impl DigiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the digis (and optional matches) of a subsystem
    pub fn insert(&mut self, module: ModuleId, digis: Vec<Digi>, matches: Option<Vec<Match>>) {
        self.branches.insert(module, DigiBranch { digis, matches });
    }

    #[must_use]
    pub fn with_branch(
        mut self,
        module: ModuleId,
        digis: Vec<Digi>,
        matches: Option<Vec<Match>>,
    ) -> Self {
        self.insert(module, digis, matches);
        self
    }

    /// Shortcut for tests and tools: one default digi per match
    #[must_use]
    pub fn with_matches(self, module: ModuleId, matches: Vec<Match>) -> Self {
        let digis = vec![Digi::default(); matches.len()];
        self.with_branch(module, digis, Some(matches))
    }

    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.branches.keys().copied()
    }
}

impl DigiSource for DigiStore {
    fn is_match_present(&self, module: ModuleId) -> bool {
        self.branches
            .get(&module)
            .is_some_and(|b| b.matches.is_some())
    }

    fn nof_digis(&self, module: ModuleId) -> usize {
        self.branches.get(&module).map_or(0, |b| b.digis.len())
    }

    fn digi(&self, module: ModuleId, index: usize) -> Option<&Digi> {
        self.branches.get(&module)?.digis.get(index)
    }

    fn digi_match(&self, module: ModuleId, index: usize) -> Option<&Match> {
        self.branches.get(&module)?.matches.as_ref()?.get(index)
    }

    fn nof_digi_matches(&self, module: ModuleId) -> usize {
        self.branches
            .get(&module)
            .and_then(|b| b.matches.as_ref())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::Link;

    #[test]
    fn test_match_presence() {
        let store = DigiStore::new()
            .with_matches(ModuleId::Sts, vec![Match::new()])
            .with_branch(ModuleId::Much, vec![Digi::default()], None);

        assert!(store.is_match_present(ModuleId::Sts));
        assert!(!store.is_match_present(ModuleId::Much));
        assert!(!store.is_match_present(ModuleId::Trd));
        assert_eq!(store.nof_digis(ModuleId::Much), 1);
        assert_eq!(store.nof_digi_matches(ModuleId::Much), 0);
    }

    #[test]
    fn test_digi_match_lookup() {
        let m: Match = std::iter::once(Link::new(1.0, 3, 0, 0)).collect();
        let store = DigiStore::new().with_matches(ModuleId::Sts, vec![Match::new(), m]);

        assert_eq!(
            store.digi_match(ModuleId::Sts, 1).map(|m| m.matched_link().index),
            Some(3)
        );
        assert!(store.digi_match(ModuleId::Sts, 2).is_none());
        assert!(store.digi_match(ModuleId::Mvd, 0).is_none());
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "sts": {
                "digis": [{"address": 1}, {"address": 2}],
                "matches": [{"links": [{"weight": 1.0, "index": 0, "entry": 0, "file": 0}]},
                            {"links": []}]
            },
            "tof": {"digis": [{"address": 5, "charge": 12.5}]}
        }"#;
        let store: DigiStore = serde_json::from_str(json).unwrap();
        assert_eq!(store.nof_digis(ModuleId::Sts), 2);
        assert!(store.is_match_present(ModuleId::Sts));
        assert!(!store.is_match_present(ModuleId::Tof));
        assert_eq!(store.digi(ModuleId::Tof, 0).map(|d| d.charge), Some(12.5));
    }
}
