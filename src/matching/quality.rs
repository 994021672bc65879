use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::link::LinkKey;
use crate::core::matches::TrackMatch;

/// Safely convert usize to f64 for rate calculations
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Default minimum fraction of true hits for a track to count as reconstructed
pub const DEFAULT_QUOTA: f64 = 0.7;

/// Classification of a reconstructed track against its truth match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Purity reaches the quota and the particle was not found before
    Reconstructed,
    /// Purity reaches the quota but an earlier track already claimed the particle
    Clone,
    /// Purity below quota, or no truth at all
    Ghost,
}

/// Classify tracks in order; the first track claiming a particle wins it.
pub fn classify_tracks(track_matches: &[TrackMatch], quota: f64) -> Vec<TrackStatus> {
    let mut claimed: HashSet<LinkKey> = HashSet::new();
    track_matches
        .iter()
        .map(|tm| {
            let best = tm.matched_link();
            if best.is_noise() || tm.true_over_all_hits_ratio() < quota {
                TrackStatus::Ghost
            } else if claimed.insert(best.key()) {
                TrackStatus::Reconstructed
            } else {
                TrackStatus::Clone
            }
        })
        .collect()
}

/// Aggregated purity figures for one track collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub tracks: usize,
    pub reconstructed: usize,
    pub clones: usize,
    pub ghosts: usize,

    /// Mean true-over-all-hits ratio of non-ghost tracks
    pub mean_purity: f64,
}

impl QualitySummary {
    pub fn from_matches(track_matches: &[TrackMatch], quota: f64) -> Self {
        let statuses = classify_tracks(track_matches, quota);
        let mut summary = Self {
            tracks: track_matches.len(),
            ..Self::default()
        };

        let mut purity_sum = 0.0;
        for (tm, status) in track_matches.iter().zip(&statuses) {
            match status {
                TrackStatus::Reconstructed => summary.reconstructed += 1,
                TrackStatus::Clone => summary.clones += 1,
                TrackStatus::Ghost => {
                    summary.ghosts += 1;
                    continue;
                }
            }
            purity_sum += tm.true_over_all_hits_ratio();
        }

        let good = summary.reconstructed + summary.clones;
        if good > 0 {
            summary.mean_purity = purity_sum / count_to_f64(good);
        }
        summary
    }

    /// Fold another summary (e.g. the next event) into this one
    pub fn merge(&mut self, other: &QualitySummary) {
        let good = self.reconstructed + self.clones;
        let other_good = other.reconstructed + other.clones;
        if good + other_good > 0 {
            self.mean_purity = (self.mean_purity * count_to_f64(good)
                + other.mean_purity * count_to_f64(other_good))
                / count_to_f64(good + other_good);
        }
        self.tracks += other.tracks;
        self.reconstructed += other.reconstructed;
        self.clones += other.clones;
        self.ghosts += other.ghosts;
    }

    /// Fraction of tracks that are ghosts
    #[must_use]
    pub fn ghost_rate(&self) -> f64 {
        if self.tracks == 0 {
            0.0
        } else {
            count_to_f64(self.ghosts) / count_to_f64(self.tracks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::Link;

    fn track(index: i32, true_hits: u32, wrong_hits: u32) -> TrackMatch {
        let mut tm = TrackMatch::new();
        tm.add_link(Link::new(f64::from(true_hits), index, 0, 0));
        tm.nof_true_hits = true_hits;
        tm.nof_wrong_hits = wrong_hits;
        tm
    }

    #[test]
    fn test_classification() {
        let matches = vec![
            track(1, 8, 0),
            track(2, 5, 5),
            track(1, 7, 1),
            TrackMatch::new(),
            track(3, 7, 3),
        ];
        let statuses = classify_tracks(&matches, DEFAULT_QUOTA);
        assert_eq!(
            statuses,
            vec![
                TrackStatus::Reconstructed,
                TrackStatus::Ghost,
                TrackStatus::Clone,
                TrackStatus::Ghost,
                TrackStatus::Reconstructed,
            ]
        );
    }

    #[test]
    fn test_summary_and_merge() {
        let mut summary = QualitySummary::from_matches(&[track(1, 4, 0), track(2, 1, 3)], 0.7);
        assert_eq!(summary.tracks, 2);
        assert_eq!(summary.reconstructed, 1);
        assert_eq!(summary.ghosts, 1);
        assert!((summary.mean_purity - 1.0).abs() < 1e-12);
        assert!((summary.ghost_rate() - 0.5).abs() < 1e-12);

        let other = QualitySummary::from_matches(&[track(5, 3, 1)], 0.7);
        summary.merge(&other);
        assert_eq!(summary.tracks, 3);
        assert_eq!(summary.reconstructed, 2);
        assert!((summary.mean_purity - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let summary = QualitySummary::from_matches(&[], DEFAULT_QUOTA);
        assert_eq!(summary, QualitySummary::default());
        assert!(summary.ghost_rate().abs() < f64::EPSILON);
    }
}
