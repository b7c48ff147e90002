//! Rating-ordered selection of the top N candidates.

use std::cmp::Ordering;
use std::collections::HashSet;

use tripscout_core::{AppConfig, Candidate, RankDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankConfig {
    /// Maximum number of candidates returned.
    pub limit: usize,
    pub direction: RankDirection,
    /// Drop repeated provider ids (first occurrence wins) before sorting.
    pub dedup_by_id: bool,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            direction: RankDirection::Ascending,
            dedup_by_id: false,
        }
    }
}

impl RankConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            limit: config.result_limit,
            direction: config.rank_direction,
            dedup_by_id: config.dedup_by_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ranker {
    config: RankConfig,
}

impl Ranker {
    #[must_use]
    pub fn new(config: RankConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> RankConfig {
        self.config
    }

    /// Sorts `candidates` by rating in the configured direction and keeps the
    /// first `limit`.
    ///
    /// The sort is stable in both directions: equal ratings keep their input
    /// order, so identical input always yields identical output.
    #[must_use]
    pub fn rank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.config.dedup_by_id {
            let mut seen = HashSet::new();
            candidates.retain(|c| seen.insert(c.id.clone()));
        }

        match self.config.direction {
            RankDirection::Ascending => candidates.sort_by(compare_ratings),
            RankDirection::Descending => candidates.sort_by(|a, b| compare_ratings(b, a)),
        }

        candidates.truncate(self.config.limit);
        candidates
    }
}

/// Three-way comparison on `rating`: lower ratings order first, equal
/// ratings compare as ties.
#[must_use]
pub fn compare_ratings(a: &Candidate, b: &Candidate) -> Ordering {
    a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal)
}
