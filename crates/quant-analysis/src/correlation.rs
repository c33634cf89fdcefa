//! Correlation / redundancy analysis across an indicator set.
//!
//! Indicators that measure the same underlying signal add noise rather than
//! information. The analyzer flags highly correlated pairs, groups them into
//! clusters and estimates how many independent indicators the set really holds.

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use signal_core::stats::{self, round_to, CorrelationMethod};
use signal_core::{AlignedFrame, NamedSeries, SignalError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// |corr| >= 0.95
    RemoveOne,
    /// |corr| >= 0.90
    StronglyConsiderRemoving,
    Review,
}

impl Recommendation {
    pub fn for_correlation(correlation: f64) -> Self {
        let abs = correlation.abs();
        if abs >= 0.95 {
            Recommendation::RemoveOne
        } else if abs >= 0.90 {
            Recommendation::StronglyConsiderRemoving
        } else {
            Recommendation::Review
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::RemoveOne => "Remove one: near-duplicate signals",
            Recommendation::StronglyConsiderRemoving => "Strongly consider removing one",
            Recommendation::Review => {
                "Review: moderately correlated, may be acceptable with justification"
            }
        }
    }
}

/// A pair of indicators that are potentially redundant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedundancyPair {
    pub indicator_a: String,
    pub indicator_b: String,
    /// Signed, rounded to 4 decimals
    pub correlation: f64,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub names: Vec<String>,
    /// Square matrix in `names` order; undefined entries are NaN
    pub correlation_matrix: Vec<Vec<f64>>,
    pub redundant_pairs: Vec<RedundancyPair>,
    pub cluster_assignments: BTreeMap<String, usize>,
    /// Effective number of independent indicators, rounded to 2 decimals
    pub effective_n: f64,
}

impl CorrelationReport {
    /// Fraction of all unordered pairs that were flagged.
    pub fn redundancy_ratio(&self) -> f64 {
        let n = self.names.len();
        if n <= 1 {
            return 0.0;
        }
        let total_pairs = (n * (n - 1) / 2) as f64;
        self.redundant_pairs.len() as f64 / total_pairs
    }

    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.correlation_matrix[i][j])
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_assignments
            .values()
            .copied()
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }
}

/// Analyze indicator correlations and detect redundancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationAnalyzer {
    /// Absolute correlation at or above which a pair is flagged
    pub redundancy_threshold: f64,
    pub method: CorrelationMethod,
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self {
            redundancy_threshold: 0.85,
            method: CorrelationMethod::Spearman,
        }
    }
}

impl CorrelationAnalyzer {
    pub fn new(redundancy_threshold: f64, method: CorrelationMethod) -> Result<Self, SignalError> {
        let analyzer = Self { redundancy_threshold, method };
        analyzer.validate()?;
        Ok(analyzer)
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        if !(self.redundancy_threshold > 0.0 && self.redundancy_threshold <= 1.0) {
            return Err(SignalError::InvalidConfig(format!(
                "redundancy_threshold must be within (0, 1], got {}",
                self.redundancy_threshold
            )));
        }
        Ok(())
    }

    /// Analyze the correlation structure of a set of indicator series. Series
    /// are aligned on their union index and each pair is correlated over the
    /// rows where both have a value.
    pub fn analyze(&self, indicators: &[NamedSeries]) -> CorrelationReport {
        let frame = AlignedFrame::from_series(indicators);
        let matrix = self.correlation_matrix(&frame);
        let names = frame.names.clone();

        let mut redundant_pairs = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                let c = matrix[i][j];
                if c.abs() >= self.redundancy_threshold {
                    redundant_pairs.push(RedundancyPair {
                        indicator_a: names[i].clone(),
                        indicator_b: names[j].clone(),
                        correlation: round_to(c, 4),
                        recommendation: Recommendation::for_correlation(c),
                    });
                }
            }
        }

        let effective_n = round_to(effective_n(&matrix), 2);
        let cluster_assignments = self.cluster(&names, &matrix);

        tracing::debug!(
            indicators = names.len(),
            flagged = redundant_pairs.len(),
            effective_n,
            "Correlation analysis complete"
        );

        CorrelationReport {
            names,
            correlation_matrix: matrix,
            redundant_pairs,
            cluster_assignments,
            effective_n,
        }
    }

    fn correlation_matrix(&self, frame: &AlignedFrame) -> Vec<Vec<f64>> {
        let n = frame.width();
        let mut matrix = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                let (x, y) = frame.pairwise_complete(i, j);
                let c = stats::correlation(&x, &y, self.method);
                let c = if i == j && c.is_finite() { 1.0 } else { c };
                matrix[i][j] = c;
                matrix[j][i] = c;
            }
        }
        matrix
    }

    /// Greedy single pass: each unassigned indicator opens a cluster and
    /// absorbs every still-unassigned indicator correlated with it at or above
    /// the threshold. Order-dependent and not transitively closed.
    fn cluster(&self, names: &[String], matrix: &[Vec<f64>]) -> BTreeMap<String, usize> {
        let mut assigned: Vec<Option<usize>> = vec![None; names.len()];
        let mut cluster_id = 0;

        for i in 0..names.len() {
            if assigned[i].is_some() {
                continue;
            }
            assigned[i] = Some(cluster_id);
            for j in 0..names.len() {
                if assigned[j].is_none() && matrix[i][j].abs() >= self.redundancy_threshold {
                    assigned[j] = Some(cluster_id);
                }
            }
            cluster_id += 1;
        }

        names
            .iter()
            .cloned()
            .zip(assigned.into_iter().flatten())
            .collect()
    }
}

/// Participation ratio `(sum l)^2 / sum l^2` over the strictly positive
/// eigenvalues of a correlation matrix. Falls back to the indicator count when
/// the matrix has undefined entries or cannot be decomposed.
pub fn effective_n(matrix: &[Vec<f64>]) -> f64 {
    let n = matrix.len();
    if n == 0 {
        return 0.0;
    }
    if matrix.iter().flatten().any(|v| !v.is_finite()) {
        tracing::debug!("Correlation matrix has undefined entries, using raw indicator count");
        return n as f64;
    }

    let m = DMatrix::from_fn(n, n, |i, j| matrix[i][j]);
    let Some(eigen) = SymmetricEigen::try_new(m, f64::EPSILON, 0) else {
        tracing::debug!("Eigen decomposition did not converge, using raw indicator count");
        return n as f64;
    };

    let positive: Vec<f64> = eigen.eigenvalues.iter().copied().filter(|l| *l > 0.0).collect();
    if positive.is_empty() {
        return n as f64;
    }
    let sum: f64 = positive.iter().sum();
    let sum_sq: f64 = positive.iter().map(|l| l * l).sum();
    let result = sum * sum / sum_sq;
    if result.is_finite() {
        result
    } else {
        n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use signal_core::Observation;

    fn series(name: &str, values: &[f64]) -> NamedSeries {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        NamedSeries::new(
            name,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Observation::new(start + Duration::days(i as i64), *v))
                .collect(),
        )
    }

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn sample_set() -> Vec<NamedSeries> {
        let base: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).sin() + i as f64 * 0.01).collect();
        let near_copy: Vec<f64> = base
            .iter()
            .zip(noise(100, 1))
            .map(|(b, e)| b * 1.05 + e * 0.01)
            .collect();
        vec![
            series("mayer", &base),
            series("dma_ratio", &near_copy),
            series("nvt", &noise(100, 99)),
        ]
    }

    #[test]
    fn test_flags_near_duplicate_pair() {
        let report = CorrelationAnalyzer::default().analyze(&sample_set());
        assert_eq!(report.redundant_pairs.len(), 1);
        let pair = &report.redundant_pairs[0];
        assert_eq!(pair.indicator_a, "mayer");
        assert_eq!(pair.indicator_b, "dma_ratio");
        assert!(pair.correlation >= 0.95);
        assert_eq!(pair.recommendation, Recommendation::RemoveOne);

        assert_eq!(report.cluster_assignments["mayer"], report.cluster_assignments["dma_ratio"]);
        assert_ne!(report.cluster_assignments["mayer"], report.cluster_assignments["nvt"]);
        assert_eq!(report.cluster_count(), 2);
        assert!((report.redundancy_ratio() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let report = CorrelationAnalyzer::default().analyze(&sample_set());
        let m = &report.correlation_matrix;
        for i in 0..3 {
            assert_eq!(m[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        assert_eq!(report.correlation("nvt", "mayer"), Some(m[2][0]));
        assert_eq!(report.correlation("nvt", "missing"), None);
    }

    #[test]
    fn test_effective_n_bounds() {
        let report = CorrelationAnalyzer::default().analyze(&sample_set());
        assert!(report.effective_n >= 1.0);
        assert!(report.effective_n <= 3.0);

        let independent: Vec<NamedSeries> = (0..4)
            .map(|k| series(&format!("ind{}", k), &noise(500, 7 + k as u64)))
            .collect();
        let report = CorrelationAnalyzer::new(0.85, CorrelationMethod::Pearson)
            .unwrap()
            .analyze(&independent);
        assert!(report.redundant_pairs.is_empty());
        assert!(report.effective_n > 3.0 && report.effective_n <= 4.0);
    }

    #[test]
    fn test_effective_n_identity_and_duplicates() {
        let identity = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!((effective_n(&identity) - 2.0).abs() < 1e-9);

        let duplicate = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!((effective_n(&duplicate) - 1.0).abs() < 1e-9);

        let undefined = vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]];
        assert_eq!(effective_n(&undefined), 2.0);
    }

    #[test]
    fn test_greedy_clustering_is_order_dependent() {
        // a~b and b~c but a and c are only weakly related
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let matrix = vec![
            vec![1.0, 0.9, 0.5],
            vec![0.9, 1.0, 0.9],
            vec![0.5, 0.9, 1.0],
        ];
        let analyzer = CorrelationAnalyzer::default();
        let clusters = analyzer.cluster(&names, &matrix);
        // 'a' opens cluster 0 and takes 'b'; 'c' is left for its own cluster
        assert_eq!(clusters["a"], 0);
        assert_eq!(clusters["b"], 0);
        assert_eq!(clusters["c"], 1);

        let reordered: Vec<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();
        let matrix = vec![
            vec![1.0, 0.9, 0.9],
            vec![0.9, 1.0, 0.5],
            vec![0.9, 0.5, 1.0],
        ];
        let clusters = analyzer.cluster(&reordered, &matrix);
        assert!(clusters.values().all(|c| *c == 0));
    }

    #[test]
    fn test_recommendation_tiers() {
        assert_eq!(Recommendation::for_correlation(-0.97), Recommendation::RemoveOne);
        assert_eq!(Recommendation::for_correlation(0.92), Recommendation::StronglyConsiderRemoving);
        assert_eq!(Recommendation::for_correlation(0.86), Recommendation::Review);
    }

    #[test]
    fn test_constant_column_never_flagged() {
        let set = vec![
            series("flat", &[1.0; 20]),
            series("line", &(0..20).map(|i| i as f64).collect::<Vec<_>>()),
        ];
        let report = CorrelationAnalyzer::default().analyze(&set);
        assert!(report.correlation_matrix[0][1].is_nan());
        assert!(report.redundant_pairs.is_empty());
        assert_eq!(report.cluster_count(), 2);
        assert_eq!(report.effective_n, 2.0);
    }

    #[test]
    fn test_empty_and_invalid_threshold() {
        let report = CorrelationAnalyzer::default().analyze(&[]);
        assert!(report.names.is_empty());
        assert_eq!(report.redundancy_ratio(), 0.0);
        assert!(CorrelationAnalyzer::new(0.0, CorrelationMethod::Pearson).is_err());
        assert!(CorrelationAnalyzer::new(1.2, CorrelationMethod::Pearson).is_err());
    }
}
