use serde::{Deserialize, Serialize};

/// PDG code the transport engine assigns to optical (Cherenkov) photons
pub const CHERENKOV_PHOTON_PDG: i32 = 50_000_050;

/// Detector subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    Mvd,
    Sts,
    Rich,
    Much,
    Trd,
    Tof,
    Fsd,
}

impl ModuleId {
    /// All subsystems in the order the matching engine processes them
    pub const ALL: [ModuleId; 7] = [
        Self::Mvd,
        Self::Sts,
        Self::Much,
        Self::Rich,
        Self::Trd,
        Self::Tof,
        Self::Fsd,
    ];

    /// Prefix used for the subsystem's data branches (e.g. `StsHitMatch`)
    #[must_use]
    pub fn branch_prefix(self) -> &'static str {
        match self {
            Self::Mvd => "Mvd",
            Self::Sts => "Sts",
            Self::Rich => "Rich",
            Self::Much => "Much",
            Self::Trd => "Trd",
            Self::Tof => "Tof",
            Self::Fsd => "Fsd",
        }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mvd => write!(f, "MVD"),
            Self::Sts => write!(f, "STS"),
            Self::Rich => write!(f, "RICH"),
            Self::Much => write!(f, "MUCH"),
            Self::Trd => write!(f, "TRD"),
            Self::Tof => write!(f, "TOF"),
            Self::Fsd => write!(f, "FSD"),
        }
    }
}

/// Kind of hit referenced from a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Mvd,
    Sts,
    MuchPixel,
    MuchStraw,
    Trd,
    Tof,
}

impl HitKind {
    /// Subsystem the hit was measured in
    #[must_use]
    pub fn module(self) -> ModuleId {
        match self {
            Self::Mvd => ModuleId::Mvd,
            Self::Sts => ModuleId::Sts,
            Self::MuchPixel | Self::MuchStraw => ModuleId::Much,
            Self::Trd => ModuleId::Trd,
            Self::Tof => ModuleId::Tof,
        }
    }
}

/// Level of the reconstruction chain a match array belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    Cluster,
    Hit,
    Track,
}

/// Name of the reconstructed-object branch a match array runs parallel to
#[must_use]
pub fn reco_branch_name(module: ModuleId, level: MatchLevel) -> String {
    let object = match (module, level) {
        (_, MatchLevel::Cluster) => "Cluster",
        (ModuleId::Much, MatchLevel::Hit) => "PixelHit",
        (_, MatchLevel::Hit) => "Hit",
        (ModuleId::Rich, MatchLevel::Track) => "Ring",
        (_, MatchLevel::Track) => "Track",
    };
    format!("{}{object}", module.branch_prefix())
}

/// Fixed output branch name for a subsystem and level
///
/// ```
/// use cbm_match::core::types::{branch_name, MatchLevel, ModuleId};
///
/// assert_eq!(branch_name(ModuleId::Sts, MatchLevel::Hit), "StsHitMatch");
/// assert_eq!(branch_name(ModuleId::Much, MatchLevel::Hit), "MuchPixelHitMatch");
/// assert_eq!(branch_name(ModuleId::Rich, MatchLevel::Track), "RichRingMatch");
/// ```
#[must_use]
pub fn branch_name(module: ModuleId, level: MatchLevel) -> String {
    format!("{}Match", reco_branch_name(module, level))
}
