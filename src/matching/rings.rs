use crate::core::link::Link;
use crate::core::matches::TrackMatch;
use crate::core::mc::{McDataArray, McPoint, McTrack};
use crate::core::reco::{RichHit, RichRing};
use crate::core::types::ModuleId;
use crate::digi::DigiSource;

/// Inputs needed to trace RICH hits back to the particles that radiated
#[derive(Clone, Copy)]
pub struct RingContext<'a> {
    pub digis: &'a dyn DigiSource,
    pub rich_points: &'a McDataArray<McPoint>,
    pub mc_tracks: &'a McDataArray<McTrack>,

    /// PDG code marking optical photons
    pub cherenkov_pdg: i32,
}

/// Mother tracks of the Cherenkov photons that fired a RICH hit.
///
/// Follows hit -> digi -> digi truth -> RICH point -> MC track and keeps the
/// mother of every photon, once per distinct (file, event, mother) key.
/// Anything that cannot be resolved yields no link.
pub fn mother_links_for_rich_hit(ctx: &RingContext<'_>, hit: &RichHit) -> Vec<Link> {
    let mut result: Vec<Link> = Vec::new();
    let Some(digi_index) = hit.digi else {
        return result;
    };
    if ctx.digis.digi(ModuleId::Rich, digi_index).is_none() {
        return result;
    }
    let Some(digi_match) = ctx.digis.digi_match(ModuleId::Rich, digi_index) else {
        return result;
    };

    for link in digi_match.links() {
        if link.is_noise() {
            continue;
        }
        let Some(point) = ctx.rich_points.get_link(link) else {
            continue;
        };
        if point.track_id < 0 {
            continue;
        }
        let Some(mc_track) = ctx.mc_tracks.get(link.file, link.entry, point.track_id) else {
            continue;
        };
        if mc_track.pdg_code != ctx.cherenkov_pdg {
            continue;
        }
        // several photons can share a mother
        let mother = Link::new(1.0, mc_track.mother_id, link.entry, link.file);
        if !result.iter().any(|l| l.same_target(&mother)) {
            result.push(mother);
        }
    }

    result
}

/// Match RICH rings to the charged particles that produced them.
///
/// Hits a ring refers to but that do not exist are skipped.
pub fn match_rich_rings(
    ctx: &RingContext<'_>,
    rings: &[RichRing],
    hits: &[RichHit],
) -> Vec<TrackMatch> {
    rings
        .iter()
        .map(|ring| {
            let ring_hits: Vec<&RichHit> = ring.hits.iter().filter_map(|&i| hits.get(i)).collect();
            let mothers: Vec<Vec<Link>> = ring_hits
                .iter()
                .map(|hit| mother_links_for_rich_hit(ctx, hit))
                .collect();

            let mut ring_match = TrackMatch::new();
            for link in mothers.iter().flatten() {
                ring_match.add_link(*link);
            }

            let best = ring_match.matched_link();
            if best.is_noise() {
                return ring_match;
            }
            for hit_mothers in &mothers {
                if hit_mothers.iter().any(|l| l.same_target(&best)) {
                    ring_match.nof_true_hits += 1;
                } else {
                    ring_match.nof_wrong_hits += 1;
                }
            }
            ring_match
        })
        .collect()
}
