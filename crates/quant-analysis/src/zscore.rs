//! Z-Score Engine: normalize an indicator reading against its own history
//! after configurable outlier exclusion.

use serde::{Deserialize, Serialize};
use signal_core::stats::{mean, median, quantile, round_to};
use signal_core::SignalError;
use statrs::statistics::Statistics;

/// Scores are clamped to +/- this many standard deviations.
pub const Z_CLAMP: f64 = 4.0;
/// Fewer usable points than this yields an informational zero score.
pub const MIN_POINTS: usize = 3;
const MAD_SCALE: f64 = 0.6745;

/// Methods for excluding outliers before z-score computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    None,
    /// Interquartile range fences
    #[default]
    Iqr,
    /// Drop values outside percentile bounds
    Percentile,
    /// Clip values to percentile bounds
    Winsorize,
    /// Modified z-score on the median absolute deviation
    Mad,
}

impl std::str::FromStr for OutlierMethod {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(OutlierMethod::None),
            "iqr" => Ok(OutlierMethod::Iqr),
            "percentile" => Ok(OutlierMethod::Percentile),
            "winsorize" => Ok(OutlierMethod::Winsorize),
            "mad" => Ok(OutlierMethod::Mad),
            other => Err(SignalError::InvalidConfig(format!("unknown outlier method '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScoreConfig {
    pub outlier_method: OutlierMethod,
    /// Fence width k in `[Q1 - k*IQR, Q3 + k*IQR]`
    pub iqr_multiplier: f64,
    pub percentile_lower: f64,
    pub percentile_upper: f64,
    pub mad_threshold: f64,
    /// Score ln(value) against ln(history); non-positive values are dropped
    pub use_log_transform: bool,
    /// Trailing window for `compute_series`; expanding window when unset
    pub rolling_window: Option<usize>,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::Iqr,
            iqr_multiplier: 1.5,
            percentile_lower: 2.5,
            percentile_upper: 97.5,
            mad_threshold: 3.0,
            use_log_transform: false,
            rolling_window: None,
        }
    }
}

impl ZScoreConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if !(1.0..=3.0).contains(&self.iqr_multiplier) {
            return Err(SignalError::InvalidConfig(format!(
                "iqr_multiplier must be within [1, 3], got {}",
                self.iqr_multiplier
            )));
        }
        if !(0.0..=10.0).contains(&self.percentile_lower) {
            return Err(SignalError::InvalidConfig(format!(
                "percentile_lower must be within [0, 10], got {}",
                self.percentile_lower
            )));
        }
        if !(90.0..=100.0).contains(&self.percentile_upper) {
            return Err(SignalError::InvalidConfig(format!(
                "percentile_upper must be within [90, 100], got {}",
                self.percentile_upper
            )));
        }
        if !(2.0..=5.0).contains(&self.mad_threshold) {
            return Err(SignalError::InvalidConfig(format!(
                "mad_threshold must be within [2, 5], got {}",
                self.mad_threshold
            )));
        }
        if matches!(self.rolling_window, Some(w) if w < MIN_POINTS) {
            return Err(SignalError::InvalidConfig(format!(
                "rolling_window must be at least {}",
                MIN_POINTS
            )));
        }
        Ok(())
    }
}

/// Result of a z-score computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreResult {
    /// Clamped to [-4, 4], rounded to 4 decimals
    pub z_score: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    /// The value that was scored (log value under the log transform)
    pub raw_value: f64,
    pub data_points_used: usize,
    pub outliers_removed: usize,
    pub method: OutlierMethod,
}

/// Compute z-scores for indicator values with configurable outlier exclusion.
#[derive(Debug, Clone, Default)]
pub struct ZScoreEngine {
    config: ZScoreConfig,
}

impl ZScoreEngine {
    pub fn new(config: ZScoreConfig) -> Result<Self, SignalError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ZScoreConfig {
        &self.config
    }

    /// Z-score of `current_value` against `history`. Missing (NaN) history
    /// points are ignored. Never fails: too little data yields a zero score.
    pub fn compute(&self, history: &[f64], current_value: f64) -> ZScoreResult {
        let mut clean: Vec<f64> = history.iter().copied().filter(|v| v.is_finite()).collect();
        let original_count = clean.len();
        let mut current = current_value;

        if self.config.use_log_transform {
            clean = clean.into_iter().filter(|&v| v > 0.0).map(f64::ln).collect();
            current = if current_value > 0.0 { current_value.ln() } else { 0.0 };
        }

        let cleaned = self.remove_outliers(&clean);
        let outliers_removed = original_count - cleaned.len();

        if cleaned.len() < MIN_POINTS {
            tracing::debug!(
                points = cleaned.len(),
                "Too few points after outlier exclusion, returning zero z-score"
            );
            return ZScoreResult {
                z_score: 0.0,
                mean: round_to(mean(&clean), 6),
                std: 0.0,
                raw_value: current,
                data_points_used: cleaned.len(),
                outliers_removed,
                method: self.config.outlier_method,
            };
        }

        let m = cleaned.as_slice().mean();
        let sd = cleaned.as_slice().std_dev();

        let z = if sd == 0.0 { 0.0 } else { (current - m) / sd };
        let z = if z.is_finite() { z.clamp(-Z_CLAMP, Z_CLAMP) } else { 0.0 };

        ZScoreResult {
            z_score: round_to(z, 4),
            mean: round_to(m, 6),
            std: round_to(sd, 6),
            raw_value: current,
            data_points_used: cleaned.len(),
            outliers_removed,
            method: self.config.outlier_method,
        }
    }

    /// Per-point z-scores over a series, lazily. With `rolling_window` set each
    /// point is scored against the preceding window, otherwise against all
    /// earlier points. Points without at least three predecessors score 0.0.
    pub fn compute_series<'a>(&'a self, series: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        let window = self.config.rolling_window;
        (0..series.len()).map(move |i| {
            let start = match window {
                Some(w) => i.saturating_sub(w),
                None => 0,
            };
            let history = &series[start..i];
            if history.len() < MIN_POINTS {
                return 0.0;
            }
            self.compute(history, series[i]).z_score
        })
    }

    fn remove_outliers(&self, series: &[f64]) -> Vec<f64> {
        if series.is_empty() {
            return Vec::new();
        }
        match self.config.outlier_method {
            OutlierMethod::None => series.to_vec(),
            OutlierMethod::Iqr => self.iqr_filter(series),
            OutlierMethod::Percentile => self.percentile_filter(series),
            OutlierMethod::Winsorize => self.winsorize(series),
            OutlierMethod::Mad => self.mad_filter(series),
        }
    }

    fn iqr_filter(&self, series: &[f64]) -> Vec<f64> {
        let q1 = quantile(series, 0.25);
        let q3 = quantile(series, 0.75);
        let iqr = q3 - q1;
        let lower = q1 - self.config.iqr_multiplier * iqr;
        let upper = q3 + self.config.iqr_multiplier * iqr;
        series.iter().copied().filter(|v| (lower..=upper).contains(v)).collect()
    }

    fn percentile_bounds(&self, series: &[f64]) -> (f64, f64) {
        (
            quantile(series, self.config.percentile_lower / 100.0),
            quantile(series, self.config.percentile_upper / 100.0),
        )
    }

    fn percentile_filter(&self, series: &[f64]) -> Vec<f64> {
        let (lower, upper) = self.percentile_bounds(series);
        series.iter().copied().filter(|v| (lower..=upper).contains(v)).collect()
    }

    /// Clip rather than drop: the point count is preserved.
    fn winsorize(&self, series: &[f64]) -> Vec<f64> {
        let (lower, upper) = self.percentile_bounds(series);
        series.iter().map(|v| v.clamp(lower, upper)).collect()
    }

    fn mad_filter(&self, series: &[f64]) -> Vec<f64> {
        let med = median(series);
        let deviations: Vec<f64> = series.iter().map(|v| (v - med).abs()).collect();
        let mad = median(&deviations);
        if mad == 0.0 {
            tracing::debug!("MAD is zero, skipping outlier exclusion");
            return series.to_vec();
        }
        series
            .iter()
            .copied()
            .filter(|v| (MAD_SCALE * (v - med) / mad).abs() <= self.config.mad_threshold)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-normal samples (sum of uniforms from an LCG).
    fn normal_series(n: usize, mu: f64, sigma: f64, seed: u64) -> Vec<f64> {
        let mut state = seed;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n)
            .map(|_| {
                let s: f64 = (0..12).map(|_| next()).sum::<f64>() - 6.0;
                mu + sigma * s
            })
            .collect()
    }

    fn engine(method: OutlierMethod) -> ZScoreEngine {
        ZScoreEngine::new(ZScoreConfig {
            outlier_method: method,
            ..Default::default()
        })
        .unwrap()
    }

    fn with_outliers() -> Vec<f64> {
        let mut data = normal_series(500, 100.0, 15.0, 42);
        data[0] = 1000.0;
        data[1] = -500.0;
        data
    }

    #[test]
    fn test_value_at_mean_scores_zero() {
        let history = vec![10.0, 12.0, 11.0, 13.0, 12.0, 14.0, 10.0, 13.0];
        let current = mean(&history);
        let result = engine(OutlierMethod::None).compute(&history, current);
        assert!(result.z_score.abs() < 1e-4);
        assert!(result.std > 0.0);
        assert_eq!(result.data_points_used, 8);
        assert_eq!(result.outliers_removed, 0);
    }

    #[test]
    fn test_iqr_tames_extreme_outlier() {
        let history = vec![10.0, 12.0, 11.0, 13.0, 100.0, 12.0, 11.0, 14.0, 10.0, 13.0];
        let filtered = engine(OutlierMethod::Iqr).compute(&history, 12.5);
        let raw = engine(OutlierMethod::None).compute(&history, 12.5);

        assert!(filtered.outliers_removed > 0);
        assert_eq!(filtered.data_points_used + filtered.outliers_removed, history.len());
        // The outlier inflates both mean and std when kept
        assert!((filtered.mean - 11.777_778).abs() < 1e-5);
        assert!(filtered.std < raw.std);
        assert!(filtered.z_score.abs() != raw.z_score.abs());
    }

    #[test]
    fn test_extremes_and_clamp() {
        let data = normal_series(500, 100.0, 15.0, 7);
        let e = ZScoreEngine::default();
        assert!(e.compute(&data, 140.0).z_score > 2.0);
        assert!(e.compute(&data, 60.0).z_score < -2.0);
        assert_eq!(e.compute(&data, 9999.0).z_score, Z_CLAMP);
        assert_eq!(e.compute(&data, -9999.0).z_score, -Z_CLAMP);
    }

    #[test]
    fn test_empty_and_short_history() {
        let e = ZScoreEngine::default();
        let result = e.compute(&[], 100.0);
        assert_eq!(result.z_score, 0.0);
        assert_eq!(result.data_points_used, 0);

        let result = e.compute(&[1.0, f64::NAN, 2.0], 100.0);
        assert_eq!(result.z_score, 0.0);
        assert_eq!(result.std, 0.0);
        assert_eq!(result.data_points_used, 2);
    }

    #[test]
    fn test_constant_history_has_zero_std() {
        let result = engine(OutlierMethod::None).compute(&[5.0; 10], 7.0);
        assert_eq!(result.z_score, 0.0);
        assert_eq!(result.std, 0.0);
        assert_eq!(result.data_points_used, 10);
    }

    #[test]
    fn test_outlier_method_bookkeeping() {
        let data = with_outliers();
        for method in [OutlierMethod::Iqr, OutlierMethod::Percentile, OutlierMethod::Mad] {
            let result = engine(method).compute(&data, 100.0);
            assert!(result.outliers_removed > 0, "{:?} removed nothing", method);
            assert!(result.data_points_used + result.outliers_removed <= data.len());
            assert_eq!(result.method, method);
        }

        let none = engine(OutlierMethod::None).compute(&data, 100.0);
        assert_eq!(none.outliers_removed, 0);

        let winsorized = engine(OutlierMethod::Winsorize).compute(&data, 100.0);
        assert_eq!(winsorized.data_points_used, data.len());
        assert_eq!(winsorized.outliers_removed, 0);
    }

    #[test]
    fn test_mad_zero_skips_exclusion() {
        // More than half the points identical: MAD == 0
        let data = vec![5.0, 5.0, 5.0, 5.0, 5.0, 6.0, 50.0];
        let result = engine(OutlierMethod::Mad).compute(&data, 5.0);
        assert_eq!(result.outliers_removed, 0);
        assert_eq!(result.data_points_used, data.len());
    }

    #[test]
    fn test_log_transform() {
        let e = ZScoreEngine::new(ZScoreConfig {
            use_log_transform: true,
            ..Default::default()
        })
        .unwrap();
        let series: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();
        let result = e.compute(&series, 55.0);
        assert!(result.data_points_used > 0);
        assert!((result.raw_value - 55.0f64.ln()).abs() < 1e-12);

        // Non-positive inputs are dropped (and counted as removed)
        let mut with_zero = series.clone();
        with_zero.push(0.0);
        with_zero.push(-3.0);
        let result = e.compute(&with_zero, -1.0);
        assert_eq!(result.raw_value, 0.0);
        assert!(result.outliers_removed >= 2);
    }

    #[test]
    fn test_z_always_within_bounds() {
        let data = normal_series(200, 0.0, 1.0, 3);
        for method in [
            OutlierMethod::None,
            OutlierMethod::Iqr,
            OutlierMethod::Percentile,
            OutlierMethod::Winsorize,
            OutlierMethod::Mad,
        ] {
            let e = engine(method);
            for current in [-1e9, -10.0, -0.5, 0.0, 3.3, 1e12, f64::NAN] {
                let z = e.compute(&data, current).z_score;
                assert!((-Z_CLAMP..=Z_CLAMP).contains(&z));
            }
        }
    }

    #[test]
    fn test_compute_series_expanding_and_rolling() {
        let data = normal_series(120, 50.0, 5.0, 11);
        let expanding: Vec<f64> = ZScoreEngine::default().compute_series(&data).collect();
        assert_eq!(expanding.len(), data.len());
        assert!(expanding[..3].iter().all(|z| *z == 0.0));

        let rolling_engine = ZScoreEngine::new(ZScoreConfig {
            rolling_window: Some(30),
            ..Default::default()
        })
        .unwrap();
        let rolling: Vec<f64> = rolling_engine.compute_series(&data).collect();
        assert_eq!(rolling.len(), data.len());
        assert_eq!(rolling[2], 0.0);
        // Point 40 is scored only against points 10..40
        let expected = rolling_engine.compute(&data[10..40], data[40]).z_score;
        assert_eq!(rolling[40], expected);
    }

    #[test]
    fn test_idempotent() {
        let data = with_outliers();
        let e = ZScoreEngine::default();
        assert_eq!(e.compute(&data, 123.4), e.compute(&data, 123.4));
    }

    #[test]
    fn test_config_ranges() {
        assert!(ZScoreConfig::default().validate().is_ok());
        let bad = ZScoreConfig { iqr_multiplier: 4.0, ..Default::default() };
        assert!(ZScoreEngine::new(bad).is_err());
        let bad = ZScoreConfig { rolling_window: Some(2), ..Default::default() };
        assert!(bad.validate().is_err());
        assert_eq!("WINSORIZE".parse::<OutlierMethod>().unwrap(), OutlierMethod::Winsorize);
    }
}
