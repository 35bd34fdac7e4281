//! Brand diversity rebalancing

use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::ScoredCandidate;
use super::{DEFAULT_BRAND_BONUSES, DIVERSITY_MIN_CANDIDATES, MAX_SCORE};

/// Bonus schedule that keeps a single brand from filling the top of the list.
#[derive(Debug, Clone, PartialEq)]
pub struct DiversityPolicy {
    /// Lists with at most this many candidates are only sorted.
    pub min_candidates: usize,
    /// Bonus for the n-th occurrence of a brand (0-based); occurrences past the end get 0.
    pub brand_bonuses: Vec<f64>,
}

impl Default for DiversityPolicy {
    fn default() -> Self {
        Self {
            min_candidates: DIVERSITY_MIN_CANDIDATES,
            brand_bonuses: DEFAULT_BRAND_BONUSES.to_vec(),
        }
    }
}

impl DiversityPolicy {
    pub fn with_min_candidates(mut self, min_candidates: usize) -> Self {
        self.min_candidates = min_candidates;
        self
    }

    /// Sort by match score and, for lists larger than `min_candidates`, add the brand bonus
    /// in score order and sort again.
    ///
    /// Brand-less candidates are counted together as one brand. Sorting is stable, so equal
    /// scores keep their incoming order. A list where every score is 0 carries no preference
    /// signal and is left in incoming order.
    pub fn rebalance(&self, mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        sort_by_match_desc(&mut candidates);
        if candidates.len() <= self.min_candidates
            || candidates.iter().all(|candidate| candidate.match_score == 0.0)
        {
            return candidates;
        }

        let mut occurrences: HashMap<Option<String>, usize> = HashMap::new();
        for candidate in &mut candidates {
            let seen = occurrences.entry(candidate.brand.clone()).or_insert(0);
            let bonus = self.brand_bonuses.get(*seen).copied().unwrap_or(0.0);
            *seen += 1;

            candidate.match_score = (candidate.match_score + bonus).min(MAX_SCORE);
        }

        sort_by_match_desc(&mut candidates);
        candidates
    }
}

fn sort_by_match_desc(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| b.match_score.partial_cmp(&a.match_score).unwrap_or(Ordering::Equal));
}
