//! Stock-aware final ordering

use std::cmp::Ordering;

use super::types::ScoredCandidate;

/// Order in-stock candidates ahead of out-of-stock ones, each group by match score
/// descending, and keep at most `limit` entries.
pub fn rank_by_stock(mut candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.in_stock
            .cmp(&a.in_stock)
            .then_with(|| b.match_score.partial_cmp(&a.match_score).unwrap_or(Ordering::Equal))
    });
    candidates.truncate(limit);
    candidates
}
