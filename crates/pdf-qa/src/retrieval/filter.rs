//! Adaptive relevance-threshold filtering

use crate::types::ScoredCandidate;

/// Keep the candidates whose score is strictly above the threshold,
/// relaxing the threshold until at least one qualifies
///
/// While every candidate scores at or below the threshold, the threshold is
/// halved. Halving stops early once it no longer changes the value, so with
/// all scores at or below zero the threshold settles at zero and the result
/// is empty. A NaN threshold selects nothing. Candidate order is preserved.
///
/// Returns the selection and the threshold it was made with.
pub fn filter(
    candidates: Vec<ScoredCandidate>,
    initial_threshold: f32,
) -> (Vec<ScoredCandidate>, f32) {
    if candidates.is_empty() {
        return (candidates, initial_threshold);
    }

    let mut threshold = initial_threshold;
    while candidates.iter().all(|c| c.score <= threshold) {
        let halved = threshold / 2.0;
        if halved == threshold {
            break;
        }
        tracing::debug!(from = threshold, to = halved, "No candidate above threshold, relaxing");
        threshold = halved;
    }

    let selected = candidates
        .into_iter()
        .filter(|c| c.score > threshold)
        .collect();

    (selected, threshold)
}
