//! Market regime detection
//!
//! Classifies each point of a price history into one of four market phases
//! (accumulation, markup, distribution, markdown) using either a Gaussian
//! hidden Markov model or a median-split rule set.

pub mod features;
#[cfg(feature = "hmm")]
pub mod hmm;
pub mod rules;

use serde::{Deserialize, Serialize};
use signal_core::stats::round_to;
use signal_core::{Observation, SignalError, Timestamp};
use std::collections::BTreeMap;

use features::{FeatureFrame, FEATURE_COUNT, FEATURE_NAMES};

/// Fewest aligned feature rows the statistical model is fitted on.
pub const MIN_HMM_ROWS: usize = 100;

/// Market phase classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    /// Low volatility, bottoming
    Accumulation,
    /// Rising prices
    Markup,
    /// High volatility, topping
    Distribution,
    /// Falling prices
    Markdown,
}

impl MarketRegime {
    pub const ALL: [MarketRegime; 4] = [
        MarketRegime::Accumulation,
        MarketRegime::Markup,
        MarketRegime::Distribution,
        MarketRegime::Markdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::Accumulation => "accumulation",
            MarketRegime::Markup => "markup",
            MarketRegime::Distribution => "distribution",
            MarketRegime::Markdown => "markdown",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `from -> to -> probability`, each row summing to 1 (or all zero when the
/// regime was never left).
pub type TransitionMatrix = BTreeMap<MarketRegime, BTreeMap<MarketRegime, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Hmm,
    RuleBased,
}

/// Output of a fitted latent-state model over the feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFit {
    /// Most likely hidden state per row
    pub states: Vec<usize>,
    /// Posterior over hidden states at the final row
    pub last_posterior: Vec<f64>,
    /// Row-normalized hidden-state transition probabilities
    pub transition: Vec<Vec<f64>>,
}

/// A latent-state model that can be fitted to feature rows.
pub trait RegimeModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&self, observations: &[[f64; FEATURE_COUNT]], n_states: usize) -> Result<StateFit, SignalError>;
}

/// Detection strategy, fixed at construction.
pub enum RegimeStrategy {
    Hmm(Box<dyn RegimeModel>),
    RuleBased,
}

impl std::fmt::Debug for RegimeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegimeStrategy::Hmm(model) => write!(f, "Hmm({})", model.name()),
            RegimeStrategy::RuleBased => f.write_str("RuleBased"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub n_regimes: usize,
    /// Rolling window of the volatility feature
    pub lookback_vol: usize,
    /// Horizon of the momentum feature
    pub lookback_trend: usize,
    pub use_hmm: bool,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            n_regimes: 4,
            lookback_vol: 30,
            lookback_trend: 60,
            use_hmm: true,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if !(2..=4).contains(&self.n_regimes) {
            return Err(SignalError::InvalidConfig(format!(
                "n_regimes must be within [2, 4], got {}",
                self.n_regimes
            )));
        }
        if self.lookback_vol < 2 || self.lookback_trend < 2 {
            return Err(SignalError::InvalidConfig(
                "lookback_vol and lookback_trend must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub regime: MarketRegime,
    /// Confidence in the current regime
    pub probability: f64,
    /// Consecutive trailing periods spent in the current regime
    pub duration: usize,
}

impl RegimeState {
    pub fn summary(&self) -> String {
        format!(
            "{} ({:.1}% confidence, {}d)",
            self.regime,
            self.probability * 100.0,
            self.duration
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePoint {
    pub timestamp: Timestamp,
    pub regime: MarketRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReport {
    pub current_state: RegimeState,
    /// One label per feature row (after warm-up)
    pub history: Vec<RegimePoint>,
    pub transition_matrix: TransitionMatrix,
    /// Mean simple return per regime
    pub state_means: BTreeMap<MarketRegime, f64>,
    /// Mean rolling volatility per regime
    pub state_volatilities: BTreeMap<MarketRegime, f64>,
    pub feature_names: Vec<String>,
    pub method: DetectionMethod,
}

impl RegimeReport {
    fn empty() -> Self {
        Self {
            current_state: RegimeState {
                regime: MarketRegime::Accumulation,
                probability: 0.5,
                duration: 0,
            },
            history: Vec::new(),
            transition_matrix: BTreeMap::new(),
            state_means: BTreeMap::new(),
            state_volatilities: BTreeMap::new(),
            feature_names: Vec::new(),
            method: DetectionMethod::RuleBased,
        }
    }
}

/// Market regime detector
#[derive(Debug)]
pub struct RegimeDetector {
    config: RegimeConfig,
    strategy: RegimeStrategy,
}

impl RegimeDetector {
    /// Picks the HMM strategy when enabled in config and compiled in.
    pub fn new(config: RegimeConfig) -> Result<Self, SignalError> {
        config.validate()?;
        let strategy = if config.use_hmm {
            default_model()
        } else {
            RegimeStrategy::RuleBased
        };
        Ok(Self { config, strategy })
    }

    /// Use a caller-supplied latent-state model.
    pub fn with_model(config: RegimeConfig, model: Box<dyn RegimeModel>) -> Result<Self, SignalError> {
        config.validate()?;
        Ok(Self {
            config,
            strategy: RegimeStrategy::Hmm(model),
        })
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    pub fn strategy(&self) -> &RegimeStrategy {
        &self.strategy
    }

    pub fn detect(&self, prices: &[Observation]) -> RegimeReport {
        let features =
            FeatureFrame::from_prices(prices, self.config.lookback_vol, self.config.lookback_trend);

        if let RegimeStrategy::Hmm(model) = &self.strategy {
            if features.len() < MIN_HMM_ROWS {
                tracing::warn!(
                    rows = features.len(),
                    required = MIN_HMM_ROWS,
                    "Too few feature rows for the regime model, using rule-based detection"
                );
            } else {
                match self.detect_with_model(model.as_ref(), &features) {
                    Ok(report) => return report,
                    Err(e) => tracing::warn!(
                        model = model.name(),
                        error = %e,
                        "Regime model fit failed, using rule-based detection"
                    ),
                }
            }
        }

        self.detect_rules(&features)
    }

    fn detect_with_model(
        &self,
        model: &dyn RegimeModel,
        features: &FeatureFrame,
    ) -> Result<RegimeReport, SignalError> {
        let k = self.config.n_regimes;
        let fit = model.fit(&features.rows(), k)?;
        if fit.states.len() != features.len() || fit.states.iter().any(|s| *s >= k) {
            return Err(SignalError::Numerical(
                "model returned an inconsistent state sequence".to_string(),
            ));
        }
        if fit.transition.len() != k || fit.transition.iter().any(|row| row.len() != k) {
            return Err(SignalError::Numerical(format!(
                "model returned a transition matrix that is not {}x{}",
                k, k
            )));
        }

        let mut occupancy = vec![0usize; k];
        let mut state_means = vec![0.0; k];
        let mut state_vols = vec![0.0; k];
        for (row, &s) in fit.states.iter().enumerate() {
            occupancy[s] += 1;
            state_means[s] += features.returns[row];
            state_vols[s] += features.volatility[row];
        }
        for s in 0..k {
            if occupancy[s] > 0 {
                state_means[s] /= occupancy[s] as f64;
                state_vols[s] /= occupancy[s] as f64;
            }
        }

        let mapping = map_states_to_regimes(&state_means, &state_vols);
        let labels: Vec<MarketRegime> = fit.states.iter().map(|s| mapping[*s]).collect();

        let current = fit.states[fit.states.len() - 1];
        let probability = fit.last_posterior.get(current).copied().unwrap_or(0.0);

        tracing::info!(
            model = model.name(),
            regime = %mapping[current],
            probability,
            "Regime detected"
        );

        Ok(RegimeReport {
            current_state: RegimeState {
                regime: mapping[current],
                probability: round_to(probability, 4),
                duration: trailing_run(&labels),
            },
            history: history(features, &labels),
            transition_matrix: collapse_transitions(&fit.transition, &mapping, &occupancy),
            state_means: per_regime_mean(&labels, &features.returns),
            state_volatilities: per_regime_mean(&labels, &features.volatility),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            method: DetectionMethod::Hmm,
        })
    }

    fn detect_rules(&self, features: &FeatureFrame) -> RegimeReport {
        if features.is_empty() {
            tracing::debug!("No feature rows after warm-up, reporting default regime");
            return RegimeReport::empty();
        }

        let labels = rules::classify(features);
        let current = labels[labels.len() - 1];

        RegimeReport {
            current_state: RegimeState {
                regime: current,
                probability: rules::RULE_BASED_CONFIDENCE,
                duration: trailing_run(&labels),
            },
            history: history(features, &labels),
            transition_matrix: rules::empirical_transitions(&labels),
            state_means: per_regime_mean(&labels, &features.returns),
            state_volatilities: per_regime_mean(&labels, &features.volatility),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            method: DetectionMethod::RuleBased,
        }
    }
}

#[cfg(feature = "hmm")]
fn default_model() -> RegimeStrategy {
    RegimeStrategy::Hmm(Box::new(hmm::GaussianHmm::default()))
}

#[cfg(not(feature = "hmm"))]
fn default_model() -> RegimeStrategy {
    tracing::warn!("HMM support not compiled in, using rule-based regime detection");
    RegimeStrategy::RuleBased
}

/// Lowest mean return is markdown and highest is markup. With four states
/// the two middle states split on volatility (higher is distribution); with
/// fewer, every middle state is accumulation.
pub fn map_states_to_regimes(state_means: &[f64], state_vols: &[f64]) -> Vec<MarketRegime> {
    let k = state_means.len();
    let mut by_return: Vec<usize> = (0..k).collect();
    by_return.sort_by(|&a, &b| state_means[a].total_cmp(&state_means[b]));

    let mut mapping = vec![MarketRegime::Accumulation; k];
    if k == 0 {
        return mapping;
    }
    mapping[by_return[0]] = MarketRegime::Markdown;
    mapping[by_return[k - 1]] = MarketRegime::Markup;

    if k >= 4 {
        let (a, b) = (by_return[1], by_return[2]);
        let (high, low) = if state_vols[a] > state_vols[b] { (a, b) } else { (b, a) };
        mapping[high] = MarketRegime::Distribution;
        mapping[low] = MarketRegime::Accumulation;
    }
    mapping
}

/// Hidden-state transitions expressed between regime labels. When several
/// states share a label their rows are averaged by occupancy.
fn collapse_transitions(
    transition: &[Vec<f64>],
    mapping: &[MarketRegime],
    occupancy: &[usize],
) -> TransitionMatrix {
    let mut labels: Vec<MarketRegime> = mapping.to_vec();
    labels.sort();
    labels.dedup();

    labels
        .iter()
        .map(|from| {
            let sources: Vec<usize> = (0..mapping.len()).filter(|s| mapping[*s] == *from).collect();
            let weights: Vec<f64> = if sources.iter().any(|s| occupancy[*s] > 0) {
                sources.iter().map(|s| occupancy[*s] as f64).collect()
            } else {
                vec![1.0; sources.len()]
            };
            let total_weight: f64 = weights.iter().sum();

            let row = labels
                .iter()
                .map(|to| {
                    let p: f64 = sources
                        .iter()
                        .zip(&weights)
                        .map(|(s, w)| {
                            w * (0..mapping.len())
                                .filter(|t| mapping[*t] == *to)
                                .map(|t| transition[*s][t])
                                .sum::<f64>()
                        })
                        .sum::<f64>()
                        / total_weight;
                    (*to, round_to(p, 4))
                })
                .collect();
            (*from, row)
        })
        .collect()
}

fn trailing_run(labels: &[MarketRegime]) -> usize {
    match labels.last() {
        Some(last) => labels.iter().rev().take_while(|l| *l == last).count(),
        None => 0,
    }
}

fn history(features: &FeatureFrame, labels: &[MarketRegime]) -> Vec<RegimePoint> {
    features
        .index
        .iter()
        .zip(labels)
        .map(|(timestamp, regime)| RegimePoint {
            timestamp: *timestamp,
            regime: *regime,
        })
        .collect()
}

/// Mean of `values` per label, for the labels that occur.
fn per_regime_mean(labels: &[MarketRegime], values: &[f64]) -> BTreeMap<MarketRegime, f64> {
    let mut sums: BTreeMap<MarketRegime, (f64, usize)> = BTreeMap::new();
    for (label, value) in labels.iter().zip(values) {
        let entry = sums.entry(*label).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(label, (sum, count))| (label, round_to(sum / count as f64, 6)))
        .collect()
}
