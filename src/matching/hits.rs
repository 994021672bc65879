//! Hit-level matching strategies.
//!
//! Which function applies to a subsystem is decided once, when the engine is
//! initialized (see [`HitStrategy`](crate::matching::engine::HitStrategy)):
//!
//! | Strategy        | Hit refers to        | Hit match                                |
//! |-----------------|----------------------|------------------------------------------|
//! | cluster         | one cluster          | copy of the cluster match                |
//! | two-sided       | front + back cluster | keys present on both sides, summed       |
//! | digi            | one digi             | copy of the digi match                   |
//! | address         | readout address      | union of all digis with that address     |
//! | points          | one MC point         | the point, weighted by energy loss       |
//! | TOF             | digis via hit match  | digi points, weighted by time over thr.  |

use std::collections::HashMap;

use tracing::error;

use crate::core::link::Link;
use crate::core::matches::Match;
use crate::core::mc::{McDataArray, McPoint};
use crate::core::reco::{Hit, StsHit};
use crate::core::types::ModuleId;
use crate::digi::DigiSource;
use crate::matching::error::{checked, MatchError};

/// Copy each hit's parent cluster match.
///
/// # Errors
///
/// Returns `MatchError::IndexOutOfRange` if a hit refers to an unknown cluster.
pub fn match_hits(
    module: ModuleId,
    cluster_matches: &[Match],
    hits: &[Hit],
) -> Result<Vec<Match>, MatchError> {
    hits.iter()
        .map(|hit| {
            let cluster_match = checked(cluster_matches, hit.ref_id, module, "cluster match")?;
            let mut hit_match = Match::new();
            hit_match.add_links(cluster_match);
            Ok(hit_match)
        })
        .collect()
}

/// Match hits of double-sided strip sensors.
///
/// A link survives only if the same key is present on both the front and the
/// back cluster; both sides' weights are added to the hit match.
///
/// # Errors
///
/// Returns `MatchError::IndexOutOfRange` if a hit refers to an unknown cluster.
pub fn match_two_sided_hits(
    module: ModuleId,
    cluster_matches: &[Match],
    hits: &[StsHit],
) -> Result<Vec<Match>, MatchError> {
    hits.iter()
        .map(|hit| {
            let front = checked(cluster_matches, hit.front_cluster, module, "front cluster match")?;
            let back = checked(cluster_matches, hit.back_cluster, module, "back cluster match")?;

            let mut hit_match = Match::new();
            for link_f in front.links() {
                for link_b in back.links() {
                    if link_b.same_target(link_f) {
                        hit_match.add_link(*link_f);
                        hit_match.add_link(*link_b);
                    }
                }
            }
            Ok(hit_match)
        })
        .collect()
}

/// Copy each hit's source digi match (subsystems without clustering).
///
/// # Errors
///
/// Returns `MatchError::IndexOutOfRange` if a hit's digi has no match.
pub fn match_hits_from_digis(
    module: ModuleId,
    digis: &dyn DigiSource,
    hits: &[Hit],
) -> Result<Vec<Match>, MatchError> {
    hits.iter()
        .map(|hit| {
            let digi_match =
                digis
                    .digi_match(module, hit.ref_id)
                    .ok_or(MatchError::IndexOutOfRange {
                        module,
                        what: "digi match",
                        index: hit.ref_id,
                        len: digis.nof_digi_matches(module),
                    })?;
            let mut hit_match = Match::new();
            hit_match.add_links(digi_match);
            Ok(hit_match)
        })
        .collect()
}

/// Union the matches of every digi read out at the hit's address.
///
/// Returns `Ok(None)` if the subsystem has no digi matches.
///
/// # Errors
///
/// Returns `MatchError::IndexOutOfRange` if a digi has no match entry.
pub fn match_hits_by_address(
    module: ModuleId,
    digis: &dyn DigiSource,
    hits: &[Hit],
) -> Result<Option<Vec<Match>>, MatchError> {
    if !digis.is_match_present(module) {
        return Ok(None);
    }

    // address -> digi indices, in digi order
    let mut by_address: HashMap<i32, Vec<usize>> = HashMap::new();
    for i_digi in 0..digis.nof_digis(module) {
        if let Some(digi) = digis.digi(module, i_digi) {
            by_address.entry(digi.address).or_default().push(i_digi);
        }
    }

    let mut hit_matches = Vec::with_capacity(hits.len());
    for hit in hits {
        let mut hit_match = Match::new();
        for &i_digi in by_address.get(&hit.address).into_iter().flatten() {
            let digi_match =
                digis
                    .digi_match(module, i_digi)
                    .ok_or(MatchError::IndexOutOfRange {
                        module,
                        what: "digi match",
                        index: i_digi,
                        len: digis.nof_digi_matches(module),
                    })?;
            hit_match.add_links(digi_match);
        }
        hit_matches.push(hit_match);
    }

    Ok(Some(hit_matches))
}

/// Link each hit straight to the MC point it was smeared from.
///
/// # Errors
///
/// Returns `MatchError::MissingMcPoint` if the point does not exist.
pub fn match_hits_to_points(
    module: ModuleId,
    points: &McDataArray<McPoint>,
    file: i32,
    entry: i32,
    hits: &[Hit],
) -> Result<Vec<Match>, MatchError> {
    hits.iter()
        .map(|hit| {
            let missing = MatchError::MissingMcPoint {
                module,
                file,
                entry,
                index: hit.ref_id,
            };
            let index = i32::try_from(hit.ref_id).map_err(|_| missing.clone())?;
            let point = points.get(file, entry, index).ok_or(missing)?;

            let mut hit_match = Match::new();
            hit_match.add_link(Link::new(point.energy_loss, index, entry, file));
            Ok(hit_match)
        })
        .collect()
}

/// Match TOF hits through their hit-to-digi links.
///
/// For every digi of a hit, the point that generated the digi gets the digi's
/// time over threshold as weight; the other points of the digi (hidden by
/// the generating one) get a zero-weight link. Digis with an out-of-range
/// index or without truth are logged and skipped.
///
/// # Errors
///
/// Returns `MatchError::DigiMatchCountMismatch` if digis and digi matches are
/// not parallel, or `MatchError::IndexOutOfRange` for a hit without a
/// hit-to-digi match.
pub fn match_tof_hits(
    digis: &dyn DigiSource,
    hit_digi_matches: &[Match],
    hits: &[Hit],
) -> Result<Vec<Match>, MatchError> {
    let module = ModuleId::Tof;
    let nof_digis = digis.nof_digis(module);
    let nof_digi_matches = digis.nof_digi_matches(module);
    if nof_digis != nof_digi_matches {
        return Err(MatchError::DigiMatchCountMismatch {
            module,
            digis: nof_digis,
            matches: nof_digi_matches,
        });
    }

    let nof_hits = hits.len();
    let mut hit_matches = Vec::with_capacity(nof_hits);
    for (i_hit, hit) in hits.iter().enumerate() {
        let hit_digi_match = checked(hit_digi_matches, i_hit, module, "hit-to-digi match")?;
        let nof_digis_hit = hit_digi_match.len();
        let mut hit_match = Match::new();

        for (i_digi, digi_link) in hit_digi_match.links().iter().enumerate() {
            if digi_link.is_noise() {
                continue;
            }
            let digi_index = usize::try_from(digi_link.index).unwrap_or(usize::MAX);
            let (Some(digi), Some(digi_match)) = (
                digis.digi(module, digi_index),
                digis.digi_match(module, digi_index),
            ) else {
                error!(
                    "TOF: digi index from hit #{i_hit}/{nof_hits} digi {i_digi}/{nof_digis_hit} \
                     is bigger than nb entries in digi arrays: {} vs {nof_digis} => ignore it",
                    digi_link.index
                );
                error!(
                    "TOF: hit position: ( {} , {} , {} )",
                    hit.position[0], hit.position[1], hit.position[2]
                );
                continue;
            };

            if digi_match.is_empty() {
                error!(
                    "TOF: no entries in digi to point match for hit #{i_hit}/{nof_hits} \
                     digi {i_digi}/{nof_digis_hit} (digi index is {digi_index}/{nof_digis}) => ignore it"
                );
                error!("TOF: digi address: 0x{:08x}", digi.address);
                continue;
            }

            let true_point = digi_match.matched_link();
            if true_point.is_noise() {
                continue;
            }
            for point_link in digi_match.links() {
                if point_link.is_noise() {
                    continue;
                }
                let weight = if point_link.same_target(&true_point) {
                    digi.charge
                } else {
                    0.0
                };
                hit_match.add_link(Link::new(
                    weight,
                    point_link.index,
                    point_link.entry,
                    point_link.file,
                ));
            }
        }
        hit_matches.push(hit_match);
    }

    Ok(hit_matches)
}
