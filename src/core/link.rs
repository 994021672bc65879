use serde::{Deserialize, Serialize};

/// Identity of a simulated record: which file, which event, which index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub file: i32,
    pub entry: i32,
    pub index: i32,
}

impl LinkKey {
    pub fn new(file: i32, entry: i32, index: i32) -> Self {
        Self { file, entry, index }
    }
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.file, self.entry, self.index)
    }
}

/// A weighted reference to a simulated record (MC point or MC track)
///
/// Two links refer to the same record when their [`LinkKey`]s are equal; the
/// weight is the amount that record contributed and is not part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Contribution (energy deposit, time over threshold, hit count, ...)
    pub weight: f64,

    /// Index of the record inside its event
    pub index: i32,

    /// Event number
    pub entry: i32,

    /// Input file number
    pub file: i32,
}

impl Link {
    pub fn new(weight: f64, index: i32, entry: i32, file: i32) -> Self {
        Self {
            weight,
            index,
            entry,
            file,
        }
    }

    /// Sentinel returned when nothing matched
    #[must_use]
    pub fn noise() -> Self {
        Self::new(0.0, -1, -1, -1)
    }

    #[must_use]
    pub fn is_noise(&self) -> bool {
        self.index < 0
    }

    #[must_use]
    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.file, self.entry, self.index)
    }

    /// True if both links point at the same simulated record
    #[must_use]
    pub fn same_target(&self, other: &Link) -> bool {
        self.key() == other.key()
    }

    pub fn add_weight(&mut self, weight: f64) {
        self.weight += weight;
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::noise()
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} w={}]", self.key(), self.weight)
    }
}
