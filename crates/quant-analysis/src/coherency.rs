//! Time coherency: whether a set of directional (+1 / -1 / 0) indicators go
//! long together and short together.

use serde::{Deserialize, Serialize};
use signal_core::stats::{self, round_to};
use signal_core::{AlignedFrame, NamedSeries, SignalError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherencyReport {
    /// Mean per-step fraction of opinionated indicators agreeing with the majority
    pub agreement_ratio: f64,
    pub constructive_ratio: f64,
    pub destructive_ratio: f64,
    pub mixed_ratio: f64,
    /// Fraction of each indicator's non-zero readings matching the row consensus
    pub per_indicator_alignment: BTreeMap<String, f64>,
    pub avg_pairwise_correlation: f64,
    pub is_coherent: bool,
}

impl CoherencyReport {
    fn perfect() -> Self {
        Self {
            agreement_ratio: 1.0,
            constructive_ratio: 1.0,
            destructive_ratio: 0.0,
            mixed_ratio: 0.0,
            per_indicator_alignment: BTreeMap::new(),
            avg_pairwise_correlation: 1.0,
            is_coherent: true,
        }
    }

    pub fn summary(&self) -> String {
        if self.is_coherent {
            format!(
                "Coherent system: {:.1}% agreement, {:.1}% constructive",
                self.agreement_ratio * 100.0,
                self.constructive_ratio * 100.0
            )
        } else {
            format!(
                "Incoherent system: {:.1}% agreement, {:.1}% destructive, {:.1}% mixed",
                self.agreement_ratio * 100.0,
                self.destructive_ratio * 100.0,
                self.mixed_ratio * 100.0
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherencyAnalyzer {
    /// Minimum step agreement for a step to count as constructive
    pub constructive_threshold: f64,
    /// Maximum step agreement for a step to count as destructive
    pub destructive_threshold: f64,
    /// Minimum constructive ratio for the system to be coherent
    pub coherency_min: f64,
}

impl Default for CoherencyAnalyzer {
    fn default() -> Self {
        Self {
            constructive_threshold: 0.8,
            destructive_threshold: 0.2,
            coherency_min: 0.6,
        }
    }
}

impl CoherencyAnalyzer {
    pub fn validate(&self) -> Result<(), SignalError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.constructive_threshold)
            || !in_unit(self.destructive_threshold)
            || !in_unit(self.coherency_min)
        {
            return Err(SignalError::InvalidConfig(
                "coherency thresholds must be within [0, 1]".to_string(),
            ));
        }
        if self.destructive_threshold >= self.constructive_threshold {
            return Err(SignalError::InvalidConfig(format!(
                "destructive_threshold ({}) must be below constructive_threshold ({})",
                self.destructive_threshold, self.constructive_threshold
            )));
        }
        Ok(())
    }

    /// Analyze coherency across indicator signal series. Series are aligned on
    /// their union index; a missing reading counts as no opinion (0).
    pub fn analyze(&self, signals: &[NamedSeries]) -> CoherencyReport {
        let frame = AlignedFrame::from_series(signals);
        let columns: Vec<Vec<f64>> = frame
            .columns
            .iter()
            .map(|c| c.iter().map(|v| v.map(sign).unwrap_or(0.0)).collect())
            .collect();
        self.analyze_columns(&frame.names, &columns)
    }

    /// Same as [`analyze`](Self::analyze) over already aligned columns of equal length.
    pub fn analyze_columns(&self, names: &[String], columns: &[Vec<f64>]) -> CoherencyReport {
        let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
        if columns.len() < 2 || rows == 0 {
            tracing::debug!(
                indicators = columns.len(),
                "Too few indicators for coherency, reporting perfect agreement"
            );
            return CoherencyReport::perfect();
        }

        let mut agreement = Vec::with_capacity(rows);
        let mut consensus = Vec::with_capacity(rows);
        for r in 0..rows {
            let row: Vec<f64> = columns.iter().map(|c| c[r]).collect();
            let row_sum: f64 = row.iter().sum();
            consensus.push(sign(row_sum));

            let nonzero: Vec<f64> = row.into_iter().filter(|v| *v != 0.0).collect();
            if nonzero.is_empty() {
                agreement.push(0.5);
                continue;
            }
            let majority = if nonzero.iter().sum::<f64>() >= 0.0 { 1.0 } else { -1.0 };
            let agree = nonzero.iter().filter(|v| **v == majority).count();
            agreement.push(agree as f64 / nonzero.len() as f64);
        }

        let steps = rows as f64;
        let overall = agreement.iter().sum::<f64>() / steps;
        let constructive =
            agreement.iter().filter(|a| **a >= self.constructive_threshold).count() as f64 / steps;
        let destructive =
            agreement.iter().filter(|a| **a <= self.destructive_threshold).count() as f64 / steps;
        let mixed = 1.0 - constructive - destructive;

        let per_indicator_alignment = names
            .iter()
            .zip(columns)
            .map(|(name, column)| {
                let opinions: Vec<(f64, f64)> = column[..rows]
                    .iter()
                    .zip(&consensus)
                    .filter(|(v, _)| **v != 0.0)
                    .map(|(v, c)| (*v, *c))
                    .collect();
                let alignment = if opinions.is_empty() {
                    0.0
                } else {
                    opinions.iter().filter(|(v, c)| v == c).count() as f64 / opinions.len() as f64
                };
                (name.clone(), round_to(alignment, 4))
            })
            .collect();

        let avg_corr = average_pairwise_correlation(columns, rows);

        CoherencyReport {
            agreement_ratio: round_to(overall, 4),
            constructive_ratio: round_to(constructive, 4),
            destructive_ratio: round_to(destructive, 4),
            mixed_ratio: round_to(mixed, 4),
            per_indicator_alignment,
            avg_pairwise_correlation: round_to(avg_corr, 4),
            is_coherent: constructive >= self.coherency_min,
        }
    }

    /// Indicators whose alignment with the consensus is below `threshold`.
    pub fn find_outlier_indicators(&self, signals: &[NamedSeries], threshold: f64) -> Vec<String> {
        self.analyze(signals)
            .per_indicator_alignment
            .into_iter()
            .filter(|(_, alignment)| *alignment < threshold)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Default alignment cutoff for [`CoherencyAnalyzer::find_outlier_indicators`].
pub const OUTLIER_ALIGNMENT: f64 = 0.5;

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Mean Pearson correlation over the strict upper triangle, skipping undefined
/// pairs. 0.0 when no pair is defined.
fn average_pairwise_correlation(columns: &[Vec<f64>], rows: usize) -> f64 {
    let mut defined = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let c = stats::pearson(&columns[i][..rows], &columns[j][..rows]);
            if c.is_finite() {
                defined.push(c);
            }
        }
    }
    if defined.is_empty() {
        0.0
    } else {
        stats::mean(&defined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(cols: &[(&str, &[f64])]) -> (Vec<String>, Vec<Vec<f64>>) {
        (
            cols.iter().map(|(n, _)| n.to_string()).collect(),
            cols.iter().map(|(_, v)| v.to_vec()).collect(),
        )
    }

    #[test]
    fn test_perfectly_coherent() {
        let s = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0];
        let (names, cols) = frame(&[("a", &s), ("b", &s), ("c", &s)]);
        let report = CoherencyAnalyzer::default().analyze_columns(&names, &cols);
        assert_eq!(report.agreement_ratio, 1.0);
        assert_eq!(report.constructive_ratio, 1.0);
        assert_eq!(report.avg_pairwise_correlation, 1.0);
        assert!(report.is_coherent);
        assert!(report.summary().starts_with("Coherent system: 100.0% agreement"));
    }

    #[test]
    fn test_exactly_opposite_is_half_agreement() {
        let (names, cols) = frame(&[("a", &[1.0; 4]), ("b", &[-1.0; 4])]);
        let report = CoherencyAnalyzer::default().analyze_columns(&names, &cols);
        assert!((report.agreement_ratio - 0.5).abs() < 0.01);
        assert_eq!(report.mixed_ratio, 1.0);
        assert!(!report.is_coherent);
        // Tied rows have no consensus, so neither side aligns
        assert_eq!(report.per_indicator_alignment["a"], 0.0);
        assert_eq!(report.per_indicator_alignment["b"], 0.0);
        // Constant columns have no defined correlation
        assert_eq!(report.avg_pairwise_correlation, 0.0);
    }

    #[test]
    fn test_mixed_coherency() {
        let (names, cols) = frame(&[
            ("a", &[1.0, 1.0, -1.0, -1.0, 1.0]),
            ("b", &[1.0, -1.0, -1.0, 1.0, 1.0]),
            ("c", &[1.0, 1.0, -1.0, -1.0, -1.0]),
        ]);
        let report = CoherencyAnalyzer::default().analyze_columns(&names, &cols);
        assert!(report.agreement_ratio > 0.0 && report.agreement_ratio < 1.0);
        let total = report.constructive_ratio + report.destructive_ratio + report.mixed_ratio;
        assert!((total - 1.0).abs() < 1e-9);
        assert!(report.summary().starts_with("Incoherent system"));
    }

    #[test]
    fn test_degenerate_inputs_are_coherent() {
        let analyzer = CoherencyAnalyzer::default();
        assert!(analyzer.analyze(&[]).is_coherent);

        let (names, cols) = frame(&[("a", &[1.0, -1.0, 1.0])]);
        let report = analyzer.analyze_columns(&names, &cols);
        assert!(report.is_coherent);
        assert_eq!(report.destructive_ratio, 0.0);
        assert!(report.per_indicator_alignment.is_empty());
    }

    #[test]
    fn test_all_zero_rows_are_ambiguous() {
        let (names, cols) = frame(&[("a", &[0.0, 0.0]), ("b", &[0.0, 0.0])]);
        let report = CoherencyAnalyzer::default().analyze_columns(&names, &cols);
        assert_eq!(report.agreement_ratio, 0.5);
        assert_eq!(report.per_indicator_alignment["a"], 0.0);
    }

    #[test]
    fn test_per_indicator_alignment_and_outliers() {
        let good = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0];
        let bad = [-1.0, -1.0, 1.0, 1.0, -1.0, -1.0];
        let (names, cols) = frame(&[("a", &good), ("b", &good), ("c", &good), ("outlier", &bad)]);
        let report = CoherencyAnalyzer::default().analyze_columns(&names, &cols);
        assert_eq!(report.per_indicator_alignment["a"], 1.0);
        assert_eq!(report.per_indicator_alignment["outlier"], 0.0);
        assert!(report.avg_pairwise_correlation < 1.0);
    }

    #[test]
    fn test_find_outliers_over_series() {
        use chrono::{Duration, TimeZone, Utc};
        use signal_core::Observation;

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let make = |name: &str, values: &[f64]| {
            NamedSeries::new(
                name,
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Observation::new(start + Duration::weeks(i as i64), *v))
                    .collect(),
            )
        };
        let good = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0];
        let bad = [-1.0, -1.0, 1.0, 1.0, -1.0, -1.0];
        let signals = vec![make("a", &good), make("b", &good), make("c", &good), make("outlier", &bad)];

        let analyzer = CoherencyAnalyzer::default();
        assert_eq!(
            analyzer.find_outlier_indicators(&signals, OUTLIER_ALIGNMENT),
            vec!["outlier".to_string()]
        );
        assert!(analyzer
            .find_outlier_indicators(&signals[..3], OUTLIER_ALIGNMENT)
            .is_empty());
    }

    #[test]
    fn test_threshold_validation() {
        assert!(CoherencyAnalyzer::default().validate().is_ok());
        let bad = CoherencyAnalyzer {
            destructive_threshold: 0.9,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
