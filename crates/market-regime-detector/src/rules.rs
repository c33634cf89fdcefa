//! Median-split classifier used when no statistical model is available.

use crate::features::FeatureFrame;
use crate::{MarketRegime, TransitionMatrix};

/// Fixed confidence reported for the current rule-based state. There is no
/// posterior to draw it from.
pub const RULE_BASED_CONFIDENCE: f64 = 0.75;

/// Label each feature row by comparing momentum and volatility to the
/// medians of their full series.
pub fn classify(features: &FeatureFrame) -> Vec<MarketRegime> {
    if features.is_empty() {
        return Vec::new();
    }
    let vol_median = features.volatility_median;
    let mom_median = features.momentum_median;

    features
        .momentum
        .iter()
        .zip(&features.volatility)
        .map(|(&m, &v)| match (m > mom_median, v > vol_median) {
            (true, false) => MarketRegime::Markup,
            (true, true) => MarketRegime::Distribution,
            (false, true) => MarketRegime::Markdown,
            (false, false) => MarketRegime::Accumulation,
        })
        .collect()
}

/// Row-normalized frequencies of observed label-to-label transitions. Every
/// regime gets a row; rows with no outgoing transitions stay all zero.
pub fn empirical_transitions(labels: &[MarketRegime]) -> TransitionMatrix {
    let mut counts = [[0.0f64; 4]; 4];
    for pair in labels.windows(2) {
        counts[pair[0].index()][pair[1].index()] += 1.0;
    }

    MarketRegime::ALL
        .iter()
        .map(|from| {
            let row = &counts[from.index()];
            let total: f64 = row.iter().sum();
            let normalized = MarketRegime::ALL
                .iter()
                .map(|to| {
                    let p = if total > 0.0 { row[to.index()] / total } else { 0.0 };
                    (*to, signal_core::stats::round_to(p, 4))
                })
                .collect();
            (*from, normalized)
        })
        .collect()
}
