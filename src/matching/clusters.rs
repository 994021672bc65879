use tracing::debug;

use crate::core::matches::Match;
use crate::core::reco::Cluster;
use crate::core::types::ModuleId;
use crate::digi::DigiSource;
use crate::matching::error::MatchError;

/// Build one match per cluster by unioning the truth matches of its digis.
///
/// Returns `Ok(None)` when the subsystem has no digi matches at all (nothing
/// to propagate). A single missing digi match is an error: it means the
/// digitization and clustering outputs are out of sync.
///
/// # Errors
///
/// Returns `MatchError::MissingDigiMatch` for the first digi without a match.
pub fn match_clusters(
    module: ModuleId,
    digis: &dyn DigiSource,
    clusters: &[Cluster],
) -> Result<Option<Vec<Match>>, MatchError> {
    if !digis.is_match_present(module) {
        debug!("{module}: no digi matches, cluster matching skipped");
        return Ok(None);
    }

    let mut cluster_matches = Vec::with_capacity(clusters.len());
    for (i_cluster, cluster) in clusters.iter().enumerate() {
        let mut cluster_match = Match::new();
        for (i_digi, &digi_index) in cluster.digis.iter().enumerate() {
            let digi_match =
                digis
                    .digi_match(module, digi_index)
                    .ok_or(MatchError::MissingDigiMatch {
                        module,
                        digi_index,
                        digi: i_digi,
                        cluster: i_cluster,
                    })?;
            cluster_match.add_links(digi_match);
        }
        cluster_matches.push(cluster_match);
    }

    Ok(Some(cluster_matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::{Link, LinkKey};
    use crate::digi::DigiStore;

    fn single(index: i32, weight: f64) -> Match {
        std::iter::once(Link::new(weight, index, 0, 0)).collect()
    }

    #[test]
    fn test_cluster_unions_digi_matches() {
        let store = DigiStore::new().with_matches(
            ModuleId::Sts,
            vec![single(5, 1.0), single(5, 1.0), single(7, 1.0)],
        );
        let clusters = vec![Cluster::new(vec![0, 1, 2])];

        let matches = match_clusters(ModuleId::Sts, &store, &clusters)
            .unwrap()
            .unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.len(), 2);
        assert!((m.weight_of(LinkKey::new(0, 0, 5)) - 2.0).abs() < 1e-12);
        assert!((m.weight_of(LinkKey::new(0, 0, 7)) - 1.0).abs() < 1e-12);
        assert_eq!(m.matched_link().index, 5);
    }

    #[test]
    fn test_empty_cluster_gets_empty_match() {
        let store = DigiStore::new().with_matches(ModuleId::Much, vec![single(1, 1.0)]);
        let matches = match_clusters(ModuleId::Much, &store, &[Cluster::default()])
            .unwrap()
            .unwrap();
        assert!(matches[0].is_empty());
    }

    #[test]
    fn test_absent_match_branch_is_skipped() {
        let store = DigiStore::new();
        let result = match_clusters(ModuleId::Trd, &store, &[Cluster::new(vec![0])]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_digi_match_is_fatal() {
        let store = DigiStore::new().with_matches(ModuleId::Sts, vec![single(1, 1.0)]);
        let clusters = vec![Cluster::new(vec![0]), Cluster::new(vec![0, 3])];

        let err = match_clusters(ModuleId::Sts, &store, &clusters).unwrap_err();
        assert_eq!(
            err,
            MatchError::MissingDigiMatch {
                module: ModuleId::Sts,
                digi_index: 3,
                digi: 1,
                cluster: 1,
            }
        );
    }
}
