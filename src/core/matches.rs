use serde::{Deserialize, Serialize};

use crate::core::link::{Link, LinkKey};

/// Safely convert a hit count to f64 for ratio calculations
#[inline]
fn count_to_f64(count: u32) -> f64 {
    f64::from(count)
}

/// The simulated-truth links of one reconstructed object
///
/// Links with equal keys accumulate their weights. The matched (best) link is
/// tracked while links are added: it only changes when an updated link
/// becomes strictly heavier than the current best, so among equally heavy
/// links the one that reached that weight first stays matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMatch")]
pub struct Match {
    links: Vec<Link>,
    total_weight: f64,
    matched_index: Option<usize>,
}

/// Wire form of [`Match`]; hand-written inputs only need `links`
///
/// The stored total weight is recomputed from the links. Its slot stays in
/// the struct because bincode reads fields by position.
#[derive(Deserialize)]
struct RawMatch {
    links: Vec<Link>,
    #[serde(default, rename = "total_weight")]
    _total_weight: f64,
    #[serde(default)]
    matched_index: Option<usize>,
}

impl From<RawMatch> for Match {
    fn from(raw: RawMatch) -> Self {
        let mut m = Match::new();
        for link in &raw.links {
            m.add_link(*link);
        }
        // A stored best link survives the replay if it still carries the maximum weight
        if let Some(stored) = raw.matched_index {
            if let (Some(candidate), Some(best)) = (m.links.get(stored), m.matched_index) {
                if candidate.weight >= m.links[best].weight {
                    m.matched_index = Some(stored);
                }
            }
        }
        m
    }
}

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link, merging its weight into an existing link with the same key
    pub fn add_link(&mut self, link: Link) {
        let position = match self.links.iter().position(|l| l.same_target(&link)) {
            Some(i) => {
                self.links[i].add_weight(link.weight);
                i
            }
            None => {
                self.links.push(link);
                self.links.len() - 1
            }
        };
        self.total_weight += link.weight;

        match self.matched_index {
            None => self.matched_index = Some(position),
            Some(best) if self.links[position].weight > self.links[best].weight => {
                self.matched_index = Some(position);
            }
            Some(_) => {}
        }
    }

    /// Add every link of `other`, in order
    pub fn add_links(&mut self, other: &Match) {
        for link in &other.links {
            self.add_link(*link);
        }
    }

    /// Link with the highest accumulated weight, or [`Link::noise`] if empty
    #[must_use]
    pub fn matched_link(&self) -> Link {
        self.matched_index
            .and_then(|i| self.links.get(i).copied())
            .unwrap_or_else(Link::noise)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Accumulated weight for a key (0 if absent)
    #[must_use]
    pub fn weight_of(&self, key: LinkKey) -> f64 {
        self.links
            .iter()
            .find(|l| l.key() == key)
            .map_or(0.0, |l| l.weight)
    }

    #[must_use]
    pub fn contains(&self, key: LinkKey) -> bool {
        self.links.iter().any(|l| l.key() == key)
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.total_weight = 0.0;
        self.matched_index = None;
    }
}

impl FromIterator<Link> for Match {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut m = Match::new();
        for link in iter {
            m.add_link(link);
        }
        m
    }
}

impl std::fmt::Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Match: nofLinks={}", self.links.len())?;
        for link in &self.links {
            write!(f, " {link}")?;
        }
        write!(f, " totalWeight={}", self.total_weight)
    }
}

/// Truth match of a track or ring, with hit purity counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMatch {
    /// Accumulated links of all hits on the track
    pub truth: Match,

    /// Hits whose truth agrees with the matched link
    #[serde(default)]
    pub nof_true_hits: u32,

    /// Hits whose truth disagrees with the matched link
    #[serde(default)]
    pub nof_wrong_hits: u32,
}

impl TrackMatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_link(&mut self, link: Link) {
        self.truth.add_link(link);
    }

    #[must_use]
    pub fn matched_link(&self) -> Link {
        self.truth.matched_link()
    }

    pub fn nof_hits(&self) -> u32 {
        self.nof_true_hits + self.nof_wrong_hits
    }

    /// Fraction of hits that belong to the matched particle (track purity)
    #[must_use]
    pub fn true_over_all_hits_ratio(&self) -> f64 {
        let all = self.nof_hits();
        if all == 0 {
            0.0
        } else {
            count_to_f64(self.nof_true_hits) / count_to_f64(all)
        }
    }

    #[must_use]
    pub fn wrong_over_all_hits_ratio(&self) -> f64 {
        let all = self.nof_hits();
        if all == 0 {
            0.0
        } else {
            count_to_f64(self.nof_wrong_hits) / count_to_f64(all)
        }
    }
}

impl std::fmt::Display for TrackMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nofTrueHits={} nofWrongHits={}",
            self.truth, self.nof_true_hits, self.nof_wrong_hits
        )
    }
}
