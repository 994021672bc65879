//! Per-event driver for the whole matching chain.
//!
//! [`MatchRecoToMc`] is set up once per run with [`MatchRecoToMc::init`],
//! which looks at the branches the input provides and fixes a [`MatchPlan`]:
//! one [`HitStrategy`] per subsystem, whether MVD hits take part in silicon
//! tracking, and whether stored hit matches are reused. [`MatchRecoToMc::exec`]
//! then runs the subsystems in a fixed order:
//!
//! | Order | Subsystem | Stages                                   |
//! |-------|-----------|------------------------------------------|
//! | 1     | MVD       | clusters, hits                           |
//! | 2     | STS       | clusters, two-sided hits, MVD+STS tracks |
//! | 3     | MUCH      | clusters, pixel hits, tracks             |
//! | 4     | RICH      | rings                                    |
//! | 5     | TRD       | clusters or points, hits, tracks         |
//! | 6     | TOF       | hits via hit-to-digi links               |
//! | 7     | FSD       | hits by readout address                  |
//!
//! A subsystem whose stage fails produces no branches for the event; the
//! failure is logged and recorded in the [`EventReport`], and the remaining
//! subsystems still run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::matches::{Match, TrackMatch};
use crate::core::mc::{McDataArray, McTrack};
use crate::core::reco::{Cluster, Track};
use crate::core::types::{
    branch_name, reco_branch_name, HitKind, MatchLevel, ModuleId, CHERENKOV_PHOTON_PDG,
};
use crate::digi::DigiSource;
use crate::io::branches::{DetectorMatches, MatchBranches};
use crate::io::event::{BranchLayout, Event};
use crate::matching::clusters::match_clusters;
use crate::matching::error::MatchError;
use crate::matching::hits::{
    match_hits, match_hits_by_address, match_hits_from_digis, match_hits_to_points,
    match_tof_hits, match_two_sided_hits,
};
use crate::matching::quality::DEFAULT_QUOTA;
use crate::matching::rings::{match_rich_rings, RingContext};
use crate::matching::tracks::{match_sts_tracks, match_tracks, HitTruth, TrackContext};

/// Default minimum number of STS points of an MC track to vote in track matching
pub const DEFAULT_STS_MIN_MC_POINTS: u32 = 2;

/// Subsystems whose stored cluster and hit matches can replace re-matching
const REUSABLE: [ModuleId; 5] = [
    ModuleId::Mvd,
    ModuleId::Sts,
    ModuleId::Much,
    ModuleId::Trd,
    ModuleId::Fsd,
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Run configuration of the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Reuse cluster and hit matches already present in the input
    pub suppress_hit_rematching: bool,

    /// STS points of MC tracks with fewer STS points are ignored (0 disables)
    pub sts_min_mc_points: u32,

    /// PDG code of Cherenkov photons in the RICH
    pub cherenkov_pdg: i32,

    /// Minimum purity of a reconstructed track for QA
    pub quota: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            suppress_hit_rematching: false,
            sts_min_mc_points: DEFAULT_STS_MIN_MC_POINTS,
            cherenkov_pdg: CHERENKOV_PHOTON_PDG,
            quota: DEFAULT_QUOTA,
        }
    }
}

impl MatchingConfig {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.quota) {
            return Err(ConfigError::Invalid(format!(
                "quota must be within [0, 1], got {}",
                self.quota
            )));
        }
        Ok(())
    }
}

/// How the hits of a subsystem get their truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitStrategy {
    /// Copy of the parent cluster's match
    Cluster,
    /// Keys shared by the front and back cluster
    TwoSided,
    /// Copy of the source digi's match
    Digi,
    /// Union of all digis with the hit's readout address
    Address,
    /// Direct link to the generating MC point
    Points,
    /// Through hit-to-digi links, weighted by time over threshold
    Tof,
}

impl std::fmt::Display for HitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster"),
            Self::TwoSided => write!(f, "two-sided"),
            Self::Digi => write!(f, "digi"),
            Self::Address => write!(f, "address"),
            Self::Points => write!(f, "points"),
            Self::Tof => write!(f, "tof"),
        }
    }
}

/// Decisions taken once per run from the available input branches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPlan {
    strategies: BTreeMap<ModuleId, HitStrategy>,

    /// MVD hits take part in silicon track matching
    pub mvd_active: bool,

    /// Stored cluster and hit matches are reused instead of recomputed
    pub suppress_hit_rematching: bool,
}

impl MatchPlan {
    /// Inspect the input layout and decide what runs.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::MissingInput` if there are no MC tracks.
    pub fn from_layout(layout: &BranchLayout, suppress: bool) -> Result<Self, MatchError> {
        if !layout.contains("MCTrack") {
            return Err(MatchError::MissingInput("MCTrack".to_string()));
        }

        let mut plan = Self::default();
        for module in ModuleId::ALL {
            if let Some(strategy) = select_strategy(module, layout) {
                debug!("{module}: hit strategy {strategy}");
                plan.strategies.insert(module, strategy);
            }
        }

        if plan.strategy(ModuleId::Tof).is_some() && !layout.contains("TofHitDigiMatch") {
            warn!("No TOF hit to digi array found, TOF hits will not be matched");
        }

        let has_mvd_hits = layout.contains("MvdHit");
        plan.mvd_active =
            layout.contains("MvdPoint") || layout.contains("MvdCluster") || has_mvd_hits;
        if plan.mvd_active && !has_mvd_hits {
            warn!("MVD hits are missing, MVD will not be included in the STS track match");
            plan.mvd_active = false;
        }

        plan.suppress_hit_rematching = suppress && stored_matches_complete(layout);
        if plan.suppress_hit_rematching {
            warn!("Hit re-matching is suppressed: stored cluster and hit matches are reused");
        }

        Ok(plan)
    }

    pub fn strategy(&self, module: ModuleId) -> Option<HitStrategy> {
        self.strategies.get(&module).copied()
    }
}

fn select_strategy(module: ModuleId, layout: &BranchLayout) -> Option<HitStrategy> {
    let has = |level| layout.contains(&reco_branch_name(module, level));
    if !has(MatchLevel::Hit) {
        return None;
    }
    let strategy = match module {
        ModuleId::Mvd if has(MatchLevel::Cluster) => HitStrategy::Cluster,
        ModuleId::Mvd => HitStrategy::Digi,
        ModuleId::Sts => HitStrategy::TwoSided,
        ModuleId::Much => HitStrategy::Cluster,
        ModuleId::Trd if has(MatchLevel::Cluster) => HitStrategy::Cluster,
        ModuleId::Trd => HitStrategy::Points,
        ModuleId::Tof => HitStrategy::Tof,
        ModuleId::Fsd => HitStrategy::Address,
        // rings are matched from the hits directly
        ModuleId::Rich => return None,
    };
    Some(strategy)
}

/// Every cluster and hit array of the input comes with its stored match array
fn stored_matches_complete(layout: &BranchLayout) -> bool {
    let mut complete = true;
    for module in REUSABLE {
        for level in [MatchLevel::Cluster, MatchLevel::Hit] {
            let reco = reco_branch_name(module, level);
            let matches = branch_name(module, level);
            if layout.contains(&reco) && !layout.contains(&matches) {
                warn!("{reco} present without {matches}, hit re-matching stays enabled");
                complete = false;
            }
        }
    }
    complete
}

/// A subsystem whose matching was aborted for one event
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFailure {
    pub module: ModuleId,
    pub error: MatchError,
}

impl std::fmt::Display for ModuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} matching failed: {}", self.module, self.error)
    }
}

/// Outcome of matching one event
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    pub file: i32,
    pub entry: i32,
    pub branches: MatchBranches,
    pub failures: Vec<ModuleFailure>,
}

impl EventReport {
    /// No subsystem failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, module: ModuleId) -> bool {
        self.failures.iter().any(|f| f.module == module)
    }
}

/// Matching engine, one per run
#[derive(Debug)]
pub struct MatchRecoToMc {
    config: MatchingConfig,
    plan: Option<MatchPlan>,
    events_processed: u64,
}

impl MatchRecoToMc {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            plan: None,
            events_processed: 0,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn plan(&self) -> Option<&MatchPlan> {
        self.plan.as_ref()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Fix the run plan from the branches the input provides.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::MissingInput` if there are no MC tracks.
    pub fn init(&mut self, layout: &BranchLayout) -> Result<&MatchPlan, MatchError> {
        let plan = MatchPlan::from_layout(layout, self.config.suppress_hit_rematching)?;
        Ok(self.plan.insert(plan))
    }

    /// Match one event.
    ///
    /// Failures of single subsystems end up in the report; only problems
    /// that affect the whole event are returned as errors.
    ///
    /// # Errors
    ///
    /// - `MatchError::NotInitialized` if `init` was not called
    /// - `MatchError::MissingInput` if the event has no MC tracks
    pub fn exec(&mut self, event: &Event) -> Result<EventReport, MatchError> {
        let plan = self.plan.as_ref().ok_or(MatchError::NotInitialized)?;
        let mc_tracks = event
            .mc
            .tracks
            .as_ref()
            .ok_or_else(|| MatchError::MissingInput("MCTrack".to_string()))?;

        let mut report = EventReport {
            file: event.file,
            entry: event.entry,
            branches: MatchBranches::new(),
            failures: Vec::new(),
        };

        for module in ModuleId::ALL {
            let stage = EventStage {
                plan,
                config: &self.config,
                event,
                mc_tracks,
                done: &report.branches,
            };
            let outcome = stage.run(module);
            if !outcome.matches.is_empty() {
                report.branches.insert(module, outcome.matches);
            }
            if let Some(error) = outcome.error {
                error!("{module}: {error}");
                report.failures.push(ModuleFailure { module, error });
            }
        }

        info!("MatchRecoToMc exec event #{}", self.events_processed);
        self.events_processed += 1;
        Ok(report)
    }
}

/// What one subsystem produced for an event
///
/// A failing track stage keeps the cluster and hit matches computed before it.
#[derive(Debug)]
struct StageOutcome {
    matches: DetectorMatches,
    error: Option<MatchError>,
}

impl StageOutcome {
    fn failed(error: MatchError) -> Self {
        Self {
            matches: DetectorMatches::default(),
            error: Some(error),
        }
    }

    fn with_tracks(
        mut matches: DetectorMatches,
        tracks: Result<Option<Vec<TrackMatch>>, MatchError>,
    ) -> Self {
        match tracks {
            Ok(tracks) => {
                matches.tracks = tracks;
                Self { matches, error: None }
            }
            Err(error) => Self {
                matches,
                error: Some(error),
            },
        }
    }
}

impl From<Result<DetectorMatches, MatchError>> for StageOutcome {
    fn from(result: Result<DetectorMatches, MatchError>) -> Self {
        match result {
            Ok(matches) => Self { matches, error: None },
            Err(error) => Self::failed(error),
        }
    }
}

/// Inputs of one event while its subsystems are processed
struct EventStage<'a> {
    plan: &'a MatchPlan,
    config: &'a MatchingConfig,
    event: &'a Event,
    mc_tracks: &'a McDataArray<McTrack>,

    /// Branches of the subsystems already processed for this event
    done: &'a MatchBranches,
}

impl<'a> EventStage<'a> {
    fn run(&self, module: ModuleId) -> StageOutcome {
        match module {
            ModuleId::Mvd | ModuleId::Tof | ModuleId::Fsd => self.hit_stage(module).into(),
            ModuleId::Sts => self.sts(),
            ModuleId::Much => {
                self.tracked(module, HitKind::MuchPixel, self.event.much.tracks.as_deref())
            }
            ModuleId::Trd => {
                self.tracked(module, HitKind::Trd, self.event.trd.tracks.as_deref())
            }
            ModuleId::Rich => StageOutcome {
                matches: self.rich(),
                error: None,
            },
        }
    }

    fn track_context(&self) -> TrackContext<'a> {
        TrackContext {
            mc_tracks: self.mc_tracks,
            sts_min_mc_points: self.config.sts_min_mc_points,
        }
    }

    fn digis(&self) -> &'a dyn DigiSource {
        &self.event.digis
    }

    /// Cluster and hit matches of one subsystem
    fn hit_stage(&self, module: ModuleId) -> Result<DetectorMatches, MatchError> {
        if self.plan.suppress_hit_rematching {
            return Ok(self.reused(module));
        }
        let Some(strategy) = self.plan.strategy(module) else {
            return Ok(DetectorMatches::default());
        };

        let event = self.event;
        match (module, strategy) {
            (ModuleId::Mvd, HitStrategy::Cluster) => self.from_clusters(
                module,
                event.mvd.clusters.as_deref(),
                event.mvd.hits.as_deref(),
                match_hits,
            ),
            (ModuleId::Mvd, HitStrategy::Digi) => {
                let mut out = DetectorMatches::default();
                if let Some(hits) = event.mvd.hits.as_deref() {
                    if self.digis().is_match_present(module) {
                        out.hits = Some(match_hits_from_digis(module, self.digis(), hits)?);
                    }
                }
                Ok(out)
            }
            (ModuleId::Sts, HitStrategy::TwoSided) => self.from_clusters(
                module,
                event.sts.clusters.as_deref(),
                event.sts.hits.as_deref(),
                match_two_sided_hits,
            ),
            (ModuleId::Much, HitStrategy::Cluster) => self.from_clusters(
                module,
                event.much.clusters.as_deref(),
                event.much.hits.as_deref(),
                match_hits,
            ),
            (ModuleId::Trd, HitStrategy::Cluster) => self.from_clusters(
                module,
                event.trd.clusters.as_deref(),
                event.trd.hits.as_deref(),
                match_hits,
            ),
            (ModuleId::Trd, HitStrategy::Points) => {
                let mut out = DetectorMatches::default();
                if let (Some(hits), Some(points)) =
                    (event.trd.hits.as_deref(), event.mc.points(module))
                {
                    out.hits = Some(match_hits_to_points(
                        module,
                        points,
                        event.file,
                        event.entry,
                        hits,
                    )?);
                }
                Ok(out)
            }
            (ModuleId::Tof, HitStrategy::Tof) => {
                let mut out = DetectorMatches::default();
                if let (Some(hits), Some(hit_digi_matches)) = (
                    event.tof.hits.as_deref(),
                    event.tof_hit_digi_matches.as_deref(),
                ) {
                    if self.digis().is_match_present(module) {
                        out.hits = Some(match_tof_hits(self.digis(), hit_digi_matches, hits)?);
                    } else {
                        debug!("TOF: no digi matches, hit matching skipped");
                    }
                }
                Ok(out)
            }
            (ModuleId::Fsd, HitStrategy::Address) => {
                let mut out = DetectorMatches::default();
                if let Some(hits) = event.fsd.hits.as_deref() {
                    out.hits = match_hits_by_address(module, self.digis(), hits)?;
                }
                Ok(out)
            }
            (module, strategy) => {
                debug!("{module}: hit strategy {strategy} does not apply");
                Ok(DetectorMatches::default())
            }
        }
    }

    /// Stored cluster and hit matches of the input, used instead of re-matching
    fn reused(&self, module: ModuleId) -> DetectorMatches {
        let stored = self.event.matches.get(module);
        DetectorMatches {
            clusters: stored.and_then(|d| d.clusters.clone()),
            hits: stored.and_then(|d| d.hits.clone()),
            tracks: None,
        }
    }

    fn from_clusters<H, F>(
        &self,
        module: ModuleId,
        clusters: Option<&[Cluster]>,
        hits: Option<&[H]>,
        match_fn: F,
    ) -> Result<DetectorMatches, MatchError>
    where
        F: Fn(ModuleId, &[Match], &[H]) -> Result<Vec<Match>, MatchError>,
    {
        let mut out = DetectorMatches::default();
        let Some(clusters) = clusters else {
            return Ok(out);
        };
        out.clusters = match_clusters(module, self.digis(), clusters)?;
        if let (Some(cluster_matches), Some(hits)) = (out.clusters.as_deref(), hits) {
            out.hits = Some(match_fn(module, cluster_matches, hits)?);
        }
        Ok(out)
    }

    /// Hit truth for track matching, if hit matches and points both exist
    fn hit_truth(
        &self,
        module: ModuleId,
        hit_matches: Option<&'a [Match]>,
    ) -> Option<HitTruth<'a>> {
        Some(HitTruth::new(module, hit_matches?, self.event.mc.points(module)?))
    }

    fn sts(&self) -> StageOutcome {
        let out = match self.hit_stage(ModuleId::Sts) {
            Ok(out) => out,
            Err(error) => return StageOutcome::failed(error),
        };
        let tracks = {
            let sts_points = self.event.mc.points(ModuleId::Sts);
            let sts = match (out.hits.as_deref(), sts_points) {
                (Some(hits), Some(points)) => Some(HitTruth::new(ModuleId::Sts, hits, points)),
                _ => None,
            };
            let mvd = self.hit_truth(ModuleId::Mvd, self.done.hits(ModuleId::Mvd));
            match_sts_tracks(
                &self.track_context(),
                sts.as_ref(),
                mvd.as_ref(),
                self.plan.mvd_active,
                self.event.sts.tracks.as_deref(),
            )
        };
        StageOutcome::with_tracks(out, tracks)
    }

    /// Hit stage followed by single-subsystem track matching
    fn tracked(
        &self,
        module: ModuleId,
        kind: HitKind,
        tracks: Option<&[Track]>,
    ) -> StageOutcome {
        let out = match self.hit_stage(module) {
            Ok(out) => out,
            Err(error) => return StageOutcome::failed(error),
        };
        let track_matches = self.single_tracks(module, kind, out.hits.as_deref(), tracks);
        StageOutcome::with_tracks(out, track_matches)
    }

    fn single_tracks(
        &self,
        module: ModuleId,
        kind: HitKind,
        hit_matches: Option<&[Match]>,
        tracks: Option<&[Track]>,
    ) -> Result<Option<Vec<TrackMatch>>, MatchError> {
        let Some(tracks) = tracks else {
            return Ok(None);
        };
        let (Some(hit_matches), Some(points)) = (hit_matches, self.event.mc.points(module)) else {
            debug!("{module}: no hit matches or MC points, track matching skipped");
            return Ok(None);
        };
        let truth = HitTruth::new(module, hit_matches, points);
        match_tracks(&self.track_context(), kind, &truth, tracks).map(Some)
    }

    fn rich(&self) -> DetectorMatches {
        let event = self.event;
        let mut out = DetectorMatches::default();
        if let (Some(hits), Some(rings), Some(points)) = (
            event.rich.hits.as_deref(),
            event.rich.tracks.as_deref(),
            event.mc.points(ModuleId::Rich),
        ) {
            let ctx = RingContext {
                digis: self.digis(),
                rich_points: points,
                mc_tracks: self.mc_tracks,
                cherenkov_pdg: self.config.cherenkov_pdg,
            };
            out.tracks = Some(match_rich_rings(&ctx, rings, hits));
        }
        out
    }
}
