use crate::core::link::Link;
use crate::core::matches::{Match, TrackMatch};
use crate::core::mc::{McDataArray, McPoint, McTrack};
use crate::core::reco::{StsTrack, Track};
use crate::core::types::{HitKind, ModuleId};
use crate::matching::error::{checked, MatchError};

/// Shared inputs of every track matching call
#[derive(Debug, Clone, Copy)]
pub struct TrackContext<'a> {
    pub mc_tracks: &'a McDataArray<McTrack>,

    /// STS points of MC tracks with fewer STS points than this are ignored
    /// (0 disables the cut)
    pub sts_min_mc_points: u32,
}

impl TrackContext<'_> {
    fn accepts(&self, module: ModuleId, link: &Link, point: &McPoint) -> bool {
        if module != ModuleId::Sts || self.sts_min_mc_points == 0 {
            return true;
        }
        self.mc_tracks
            .get(link.file, link.entry, point.track_id)
            .is_some_and(|t| t.n_points(ModuleId::Sts) >= self.sts_min_mc_points)
    }
}

/// Hit matches of one subsystem together with the MC points they refer to
#[derive(Debug, Clone, Copy)]
pub struct HitTruth<'a> {
    pub module: ModuleId,
    pub hit_matches: &'a [Match],
    pub points: &'a McDataArray<McPoint>,
}

impl<'a> HitTruth<'a> {
    pub fn new(
        module: ModuleId,
        hit_matches: &'a [Match],
        points: &'a McDataArray<McPoint>,
    ) -> Self {
        Self {
            module,
            hit_matches,
            points,
        }
    }

    fn hit_match(&self, index: usize) -> Result<&'a Match, MatchError> {
        checked(self.hit_matches, index, self.module, "hit match")
    }

    /// Resolved (link, point) pairs of one hit, noise and unknown points dropped
    fn points_of(&self, index: usize) -> Result<Vec<(&'a Link, &'a McPoint)>, MatchError> {
        let points = self.points;
        Ok(self
            .hit_match(index)?
            .links()
            .iter()
            .filter(|l| !l.is_noise())
            .filter_map(|l| points.get_link(l).map(|p| (l, p)))
            .collect())
    }
}

/// Majority vote over the MC tracks behind a list of hits, then purity counting
fn match_track(
    ctx: &TrackContext<'_>,
    hits: &[(&HitTruth<'_>, usize)],
) -> Result<TrackMatch, MatchError> {
    let mut track_match = TrackMatch::new();
    for &(source, i_hit) in hits {
        for (link, point) in source.points_of(i_hit)? {
            if !ctx.accepts(source.module, link, point) {
                continue;
            }
            track_match.add_link(Link::new(1.0, point.track_id, link.entry, link.file));
        }
    }

    if track_match.truth.is_empty() {
        return Ok(track_match);
    }

    let best = track_match.matched_link();
    for &(source, i_hit) in hits {
        let has_true = source.points_of(i_hit)?.iter().any(|(link, point)| {
            point.track_id == best.index && link.entry == best.entry && link.file == best.file
        });
        if has_true {
            track_match.nof_true_hits += 1;
        } else {
            track_match.nof_wrong_hits += 1;
        }
    }

    Ok(track_match)
}

/// Match tracks of a single subsystem.
///
/// Only hits of `kind` are taken into account; each of their MC points votes
/// with weight 1 for the MC track that produced it.
///
/// # Errors
///
/// Returns `MatchError::IndexOutOfRange` if a track refers to an unknown hit.
pub fn match_tracks(
    ctx: &TrackContext<'_>,
    kind: HitKind,
    truth: &HitTruth<'_>,
    tracks: &[Track],
) -> Result<Vec<TrackMatch>, MatchError> {
    tracks
        .iter()
        .map(|track| {
            let hits: Vec<_> = track
                .hits
                .iter()
                .filter(|h| h.kind == kind)
                .map(|h| (truth, h.index))
                .collect();
            match_track(ctx, &hits)
        })
        .collect()
}

/// Match silicon tracks from their STS and MVD hits together.
///
/// Returns `Ok(None)` when there are no STS tracks.
///
/// # Errors
///
/// - `MatchError::MissingBranch` if STS hit matches or points are missing,
///   or the MVD is active and its hit matches or points are missing
/// - `MatchError::MvdInconsistency` if the MVD is inactive but a track
///   carries MVD hits
/// - `MatchError::IndexOutOfRange` if a track refers to an unknown hit
pub fn match_sts_tracks(
    ctx: &TrackContext<'_>,
    sts: Option<&HitTruth<'_>>,
    mvd: Option<&HitTruth<'_>>,
    mvd_active: bool,
    tracks: Option<&[StsTrack]>,
) -> Result<Option<Vec<TrackMatch>>, MatchError> {
    let Some(tracks) = tracks else {
        return Ok(None);
    };

    let sts = sts.ok_or_else(|| MatchError::MissingBranch {
        module: ModuleId::Sts,
        branch: "StsHitMatch/StsPoint".to_string(),
    })?;

    let mvd = if mvd_active {
        Some(mvd.ok_or_else(|| MatchError::MissingBranch {
            module: ModuleId::Mvd,
            branch: "MvdHitMatch/MvdPoint".to_string(),
        })?)
    } else {
        if let Some(track) = tracks.iter().position(|t| !t.mvd_hits.is_empty()) {
            return Err(MatchError::MvdInconsistency { track });
        }
        None
    };

    let mut track_matches = Vec::with_capacity(tracks.len());
    for track in tracks {
        let mut hits: Vec<(&HitTruth<'_>, usize)> =
            track.sts_hits.iter().map(|&i| (sts, i)).collect();
        if let Some(mvd) = mvd {
            hits.extend(track.mvd_hits.iter().map(|&i| (mvd, i)));
        }
        track_matches.push(match_track(ctx, &hits)?);
    }

    Ok(Some(track_matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::LinkKey;

    const ENTRY: i32 = 0;

    fn point_links(indices: &[i32]) -> Match {
        indices
            .iter()
            .map(|&i| Link::new(1.0, i, ENTRY, 0))
            .collect()
    }

    fn mc_tracks(sts_points: &[u32]) -> McDataArray<McTrack> {
        McDataArray::new().with_event(
            0,
            ENTRY,
            sts_points
                .iter()
                .map(|&n| McTrack::new(211, -1).with_points(ModuleId::Sts, n))
                .collect(),
        )
    }

    fn points(track_ids: &[i32]) -> McDataArray<McPoint> {
        McDataArray::new().with_event(
            0,
            ENTRY,
            track_ids.iter().map(|&t| McPoint::new(t)).collect(),
        )
    }

    #[test]
    fn test_all_hits_same_particle() {
        let mc = mc_tracks(&[5, 5]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 2,
        };
        // points 0..4 all from MC track 1
        let pts = points(&[1, 1, 1, 1]);
        let hit_matches: Vec<Match> = (0..4).map(|i| point_links(&[i])).collect();
        let truth = HitTruth::new(ModuleId::Trd, &hit_matches, &pts);
        let tracks = vec![Track::from_hits(HitKind::Trd, 0..4)];

        let matches = match_tracks(&ctx, HitKind::Trd, &truth, &tracks).unwrap();
        let tm = &matches[0];
        assert_eq!(tm.truth.len(), 1);
        assert!((tm.truth.weight_of(LinkKey::new(0, ENTRY, 1)) - 4.0).abs() < 1e-12);
        assert_eq!(tm.nof_true_hits, 4);
        assert_eq!(tm.nof_wrong_hits, 0);
    }

    #[test]
    fn test_majority_and_wrong_hits() {
        let mc = mc_tracks(&[]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 2,
        };
        let pts = points(&[3, 3, 3, 8]);
        let hit_matches: Vec<Match> = (0..4).map(|i| point_links(&[i])).collect();
        let truth = HitTruth::new(ModuleId::Much, &hit_matches, &pts);
        let tracks = vec![Track::from_hits(HitKind::MuchPixel, 0..4)];

        let matches = match_tracks(&ctx, HitKind::MuchPixel, &truth, &tracks).unwrap();
        let tm = &matches[0];
        assert_eq!(tm.matched_link().index, 3);
        assert_eq!(tm.nof_true_hits, 3);
        assert_eq!(tm.nof_wrong_hits, 1);
        assert!((tm.true_over_all_hits_ratio() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_other_hit_kinds_ignored() {
        let mc = mc_tracks(&[]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 0,
        };
        let pts = points(&[1, 2]);
        let hit_matches = vec![point_links(&[0]), point_links(&[1])];
        let truth = HitTruth::new(ModuleId::Much, &hit_matches, &pts);
        let mut track = Track::from_hits(HitKind::MuchPixel, [0]);
        track.hits.push(crate::core::reco::TrackHit {
            kind: HitKind::MuchStraw,
            index: 1,
        });

        let matches = match_tracks(&ctx, HitKind::MuchPixel, &truth, &[track]).unwrap();
        assert_eq!(matches[0].truth.len(), 1);
        assert_eq!(matches[0].nof_hits(), 1);
    }

    #[test]
    fn test_empty_track_match_has_zero_counts() {
        let mc = mc_tracks(&[]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 0,
        };
        let pts = points(&[]);
        let hit_matches = vec![Match::new()];
        let truth = HitTruth::new(ModuleId::Trd, &hit_matches, &pts);
        let tracks = vec![Track::from_hits(HitKind::Trd, [0])];

        let matches = match_tracks(&ctx, HitKind::Trd, &truth, &tracks).unwrap();
        assert!(matches[0].truth.is_empty());
        assert_eq!(matches[0].nof_hits(), 0);
    }

    #[test]
    fn test_unknown_hit_index() {
        let mc = mc_tracks(&[]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 0,
        };
        let pts = points(&[]);
        let truth = HitTruth::new(ModuleId::Trd, &[], &pts);
        let tracks = vec![Track::from_hits(HitKind::Trd, [2])];
        assert!(matches!(
            match_tracks(&ctx, HitKind::Trd, &truth, &tracks),
            Err(MatchError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn test_sts_single_point_tracks_filtered() {
        // MC track 0 has one STS point, MC track 1 has three
        let mc = mc_tracks(&[1, 3]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 2,
        };
        let pts = points(&[0, 1, 1]);
        let hit_matches = vec![point_links(&[0, 1]), point_links(&[2])];
        let sts = HitTruth::new(ModuleId::Sts, &hit_matches, &pts);
        let tracks = vec![StsTrack::new(vec![], vec![0, 1])];

        let matches = match_sts_tracks(&ctx, Some(&sts), None, false, Some(tracks.as_slice()))
            .unwrap()
            .unwrap();
        let tm = &matches[0];
        assert_eq!(tm.truth.len(), 1);
        assert!(!tm.truth.contains(LinkKey::new(0, ENTRY, 0)));
        assert_eq!(tm.matched_link().index, 1);
        assert_eq!(tm.nof_true_hits, 2);
    }

    #[test]
    fn test_sts_mvd_fusion() {
        let mc = mc_tracks(&[4, 4]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 2,
        };
        let sts_pts = points(&[0, 0]);
        let sts_matches = vec![point_links(&[0]), point_links(&[1])];
        let mvd_pts = points(&[0, 1]);
        let mvd_matches = vec![point_links(&[0]), point_links(&[1])];
        let sts = HitTruth::new(ModuleId::Sts, &sts_matches, &sts_pts);
        let mvd = HitTruth::new(ModuleId::Mvd, &mvd_matches, &mvd_pts);
        let tracks = vec![StsTrack::new(vec![0, 1], vec![0, 1])];

        let matches = match_sts_tracks(&ctx, Some(&sts), Some(&mvd), true, Some(tracks.as_slice()))
            .unwrap()
            .unwrap();
        let tm = &matches[0];
        assert!((tm.truth.weight_of(LinkKey::new(0, ENTRY, 0)) - 3.0).abs() < 1e-12);
        assert_eq!(tm.nof_true_hits, 3);
        assert_eq!(tm.nof_wrong_hits, 1);
    }

    #[test]
    fn test_mvd_hits_without_mvd_is_fatal() {
        let mc = mc_tracks(&[]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 2,
        };
        let pts = points(&[]);
        let sts = HitTruth::new(ModuleId::Sts, &[], &pts);
        let tracks = vec![StsTrack::new(vec![], vec![]), StsTrack::new(vec![0], vec![])];

        let err = match_sts_tracks(&ctx, Some(&sts), None, false, Some(tracks.as_slice())).unwrap_err();
        assert_eq!(err, MatchError::MvdInconsistency { track: 1 });
    }

    #[test]
    fn test_missing_inputs() {
        let mc = mc_tracks(&[]);
        let ctx = TrackContext {
            mc_tracks: &mc,
            sts_min_mc_points: 2,
        };
        assert_eq!(match_sts_tracks(&ctx, None, None, false, None), Ok(None));

        let tracks = vec![StsTrack::default()];
        assert!(matches!(
            match_sts_tracks(&ctx, None, None, false, Some(tracks.as_slice())),
            Err(MatchError::MissingBranch {
                module: ModuleId::Sts,
                ..
            })
        ));

        let pts = points(&[]);
        let sts = HitTruth::new(ModuleId::Sts, &[], &pts);
        assert!(matches!(
            match_sts_tracks(&ctx, Some(&sts), None, true, Some(tracks.as_slice())),
            Err(MatchError::MissingBranch {
                module: ModuleId::Mvd,
                ..
            })
        ));
    }
}
