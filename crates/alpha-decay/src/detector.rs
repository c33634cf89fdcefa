//! Alpha decay detection
//!
//! An indicator whose correlation with forward returns trends down over time is
//! losing predictive power. The detector fits a linear trend to the trailing
//! rolling correlation and flags decay when the slope is significantly negative.

use serde::{Deserialize, Serialize};
use signal_core::stats::{mean, rolling_correlation, round_to};
use signal_core::{align_pair, Observation, SignalError};

use crate::regression::linregress;

/// Fewest rolling-correlation points a trend is fitted on.
pub const MIN_ROLLING_POINTS: usize = 10;
/// Half-lives shorter than this (in periods) call for close monitoring.
pub const RAPID_DECAY_PERIODS: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Window of the rolling indicator/return correlation
    pub rolling_window: usize,
    /// Minimum absolute correlation for an indicator to be useful at all
    pub min_correlation: f64,
    /// p-value below which a negative slope counts as decay
    pub decay_significance: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rolling_window: 365,
            min_correlation: 0.1,
            decay_significance: 0.05,
        }
    }
}

impl DecayConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.rolling_window < 2 {
            return Err(SignalError::InvalidConfig(format!(
                "rolling_window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        if !(0.0..=1.0).contains(&self.min_correlation) {
            return Err(SignalError::InvalidConfig(format!(
                "min_correlation must be within [0, 1], got {}",
                self.min_correlation
            )));
        }
        if !(self.decay_significance > 0.0 && self.decay_significance < 1.0) {
            return Err(SignalError::InvalidConfig(format!(
                "decay_significance must be within (0, 1), got {}",
                self.decay_significance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayRecommendation {
    InsufficientData,
    InsufficientRollingData,
    /// Decayed below usefulness
    Remove,
    /// Rapid decay, consider replacement
    MonitorClosely,
    /// Slow decay, document it in the indicator comments
    Flag,
    /// Not decaying, but weak recent correlation
    Review,
    Stable,
}

impl DecayRecommendation {
    pub fn classify(
        is_decaying: bool,
        recent_correlation: f64,
        half_life: Option<f64>,
        min_correlation: f64,
    ) -> Self {
        let weak = recent_correlation.abs() < min_correlation;
        match (is_decaying, half_life) {
            (true, _) if weak => DecayRecommendation::Remove,
            (true, Some(h)) if h < RAPID_DECAY_PERIODS => DecayRecommendation::MonitorClosely,
            (true, _) => DecayRecommendation::Flag,
            (false, _) if weak => DecayRecommendation::Review,
            (false, _) => DecayRecommendation::Stable,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DecayRecommendation::InsufficientData => "Insufficient data for decay analysis",
            DecayRecommendation::InsufficientRollingData => "Insufficient rolling correlation data",
            DecayRecommendation::Remove => "Remove: indicator has decayed below usefulness",
            DecayRecommendation::MonitorClosely => "Monitor closely: rapid decay, consider replacement",
            DecayRecommendation::Flag => "Flag: slow decay detected, document in comments",
            DecayRecommendation::Review => "Review: low recent correlation, may not be useful",
            DecayRecommendation::Stable => "Stable: no significant decay detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayReport {
    pub indicator_name: String,
    pub has_decay: bool,
    /// Slope of the rolling-correlation trend per period; negative means decaying
    pub decay_rate: f64,
    pub r_squared: f64,
    pub p_value: f64,
    /// Mean rolling correlation over the last quartile
    pub recent_correlation: f64,
    /// Mean rolling correlation over the first quartile
    pub historical_correlation: f64,
    pub half_life_periods: Option<f64>,
    pub recommendation: DecayRecommendation,
}

impl DecayReport {
    fn insufficient(name: &str, recommendation: DecayRecommendation) -> Self {
        Self {
            indicator_name: name.to_string(),
            has_decay: false,
            decay_rate: 0.0,
            r_squared: 0.0,
            p_value: 1.0,
            recent_correlation: 0.0,
            historical_correlation: 0.0,
            half_life_periods: None,
            recommendation,
        }
    }

    pub fn summary(&self) -> String {
        if self.has_decay {
            let half_life = self
                .half_life_periods
                .map(|h| format!("{:.0}", h))
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "{}: DECAYING (rate={:.4}, p={:.4}, half-life~{} periods)",
                self.indicator_name, self.decay_rate, self.p_value, half_life
            )
        } else {
            format!(
                "{}: Stable (rate={:.4}, p={:.4})",
                self.indicator_name, self.decay_rate, self.p_value
            )
        }
    }
}

/// Detects whether an indicator's predictive power is decaying over time.
#[derive(Debug, Clone, Default)]
pub struct AlphaDecayDetector {
    config: DecayConfig,
}

impl AlphaDecayDetector {
    pub fn new(config: DecayConfig) -> Result<Self, SignalError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        indicator: &[Observation],
        forward_returns: &[Observation],
        name: &str,
    ) -> DecayReport {
        let window = self.config.rolling_window;
        let (_, xs, ys) = align_pair(indicator, forward_returns);

        if xs.len() < window * 2 {
            tracing::debug!(
                indicator = name,
                aligned = xs.len(),
                required = window * 2,
                "Insufficient aligned data for decay analysis"
            );
            return DecayReport::insufficient(name, DecayRecommendation::InsufficientData);
        }

        let rolling: Vec<f64> = rolling_correlation(&xs, &ys, window)
            .into_iter()
            .filter(|c| c.is_finite())
            .collect();

        if rolling.len() < MIN_ROLLING_POINTS {
            tracing::debug!(
                indicator = name,
                points = rolling.len(),
                "Insufficient rolling correlation data"
            );
            return DecayReport::insufficient(name, DecayRecommendation::InsufficientRollingData);
        }

        let time: Vec<f64> = (0..rolling.len()).map(|i| i as f64).collect();
        let Some(fit) = linregress(&time, &rolling) else {
            return DecayReport::insufficient(name, DecayRecommendation::InsufficientRollingData);
        };

        let split = rolling.len() / 4;
        let historical = mean(&rolling[..split]);
        let recent = mean(&rolling[rolling.len() - split..]);

        let is_decaying = fit.slope < 0.0 && fit.p_value < self.config.decay_significance;

        let half_life = (is_decaying
            && fit.slope.abs() > 1e-8
            && historical.abs() > self.config.min_correlation)
            .then(|| (historical / (2.0 * fit.slope)).abs());

        let recommendation = DecayRecommendation::classify(
            is_decaying,
            recent,
            half_life,
            self.config.min_correlation,
        );

        if is_decaying {
            tracing::info!(
                indicator = name,
                slope = fit.slope,
                p_value = fit.p_value,
                "Alpha decay detected"
            );
        }

        DecayReport {
            indicator_name: name.to_string(),
            has_decay: is_decaying,
            decay_rate: round_to(fit.slope, 6),
            r_squared: round_to(fit.r_squared(), 4),
            p_value: round_to(fit.p_value, 6),
            recent_correlation: round_to(recent, 4),
            historical_correlation: round_to(historical, 4),
            half_life_periods: half_life.map(|h| round_to(h, 1)),
            recommendation,
        }
    }
}

/// Forward returns over `horizon` periods: the point at `t` holds
/// `price[t + horizon] / price[t] - 1`. The trailing `horizon` points have no
/// forward value and are omitted.
pub fn forward_returns(prices: &[Observation], horizon: usize) -> Vec<Observation> {
    if horizon == 0 || prices.len() <= horizon {
        return Vec::new();
    }
    prices
        .iter()
        .zip(&prices[horizon..])
        .map(|(now, later)| {
            let value = match (now.finite(), later.finite()) {
                (Some(p0), Some(p1)) if p0 != 0.0 => Some(p1 / p0 - 1.0),
                _ => None,
            };
            Observation {
                timestamp: now.timestamp,
                value,
            }
        })
        .collect()
}
