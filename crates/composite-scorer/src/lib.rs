//! Composite scoring: aggregates SDCA valuation and LTPI trend systems into
//! composites, the combined signal and portfolio allocation suggestions.

use serde::{Deserialize, Serialize};
use signal_core::stats::round_to;
use signal_core::{
    AssetClass, CombinedSignal, LtpiSystem, SdcaCategory, SdcaSystem, SignalError, SignalStrength,
};
use std::collections::BTreeMap;

pub mod pipeline;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pipeline::{hydrate, AssetPipeline, AssetReport, AssetRequest, EngineConfig, IndicatorReading};

/// Per-category weights for the SDCA composite.
pub type CategoryWeights = BTreeMap<SdcaCategory, f64>;

/// Aggregated SDCA valuation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdcaComposite {
    pub asset: AssetClass,
    pub composite_z: f64,
    pub by_category: BTreeMap<SdcaCategory, f64>,
    pub indicator_count: usize,
    pub interpretation: String,
}

impl SdcaComposite {
    pub fn interpret_z(z: f64) -> &'static str {
        if z <= -2.0 {
            "Extremely oversold, strong buy zone"
        } else if z <= -1.0 {
            "Oversold, accumulation zone"
        } else if z <= 1.0 {
            "Fair value, normal DCA"
        } else if z <= 2.0 {
            "Overbought, reduce or take profit"
        } else {
            "Extremely overbought, strong sell zone"
        }
    }
}

/// Aggregated LTPI trend result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtpiComposite {
    pub asset: AssetClass,
    pub composite_score: i32,
    pub max_possible: usize,
    pub trend_ratio: f64,
    pub interpretation: String,
}

impl LtpiComposite {
    pub fn interpret_ratio(ratio: f64) -> &'static str {
        if ratio > 0.6 {
            "Strong uptrend"
        } else if ratio > 0.2 {
            "Moderate uptrend"
        } else if ratio > -0.2 {
            "Neutral, no clear trend"
        } else if ratio > -0.6 {
            "Moderate downtrend"
        } else {
            "Strong downtrend"
        }
    }
}

/// Fixed allocation weight, reasoning and risk score for a combined signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub weight: f64,
    pub reasoning: &'static str,
    /// -1.0 (max risk-off) to 1.0 (max risk-on)
    pub risk: f64,
}

impl Allocation {
    pub fn for_signal(signal: SignalStrength) -> Self {
        let (weight, reasoning, risk) = match signal {
            SignalStrength::StrongestBuy => {
                (1.0, "Undervalued and uptrend, maximum accumulation", 0.9)
            }
            SignalStrength::CautiousBuy => (
                0.5,
                "Undervalued but downtrend, small DCA while waiting for trend confirmation",
                0.3,
            ),
            SignalStrength::LightBuy => {
                (0.6, "Fair value with positive momentum, standard DCA", 0.5)
            }
            SignalStrength::Hold => (0.3, "Neutral conditions, maintain current position", 0.0),
            SignalStrength::Reduce => {
                (0.15, "Fading momentum or declining from fair value, pause DCA", -0.3)
            }
            SignalStrength::PartialProfit => {
                (0.1, "Overvalued but momentum continues, scale out slowly", -0.5)
            }
            SignalStrength::StrongestSell => {
                (0.0, "Overvalued and downtrend, aggressive de-risk", -0.9)
            }
        };
        Self { weight, reasoning, risk }
    }
}

/// Suggested allocation for a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSuggestion {
    pub asset: AssetClass,
    pub signal: SignalStrength,
    /// Share of available capital, 0.0 to 1.0
    pub allocation_pct: f64,
    pub reasoning: String,
}

/// Combined signal across all tracked assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSignal {
    pub assets: Vec<AllocationSuggestion>,
    /// Mean of the per-asset risk scores
    pub total_risk_score: f64,
}

impl PortfolioSignal {
    /// Allocation per asset; a repeated asset keeps its last entry.
    pub fn summary(&self) -> BTreeMap<AssetClass, f64> {
        self.assets
            .iter()
            .map(|a| (a.asset, a.allocation_pct))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeScorer {
    /// Equal weighting across indicators when unset or empty
    sdca_weights: Option<CategoryWeights>,
}

impl CompositeScorer {
    pub fn new(sdca_weights: Option<CategoryWeights>) -> Result<Self, SignalError> {
        if let Some(weights) = &sdca_weights {
            if let Some((category, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
                return Err(SignalError::InvalidConfig(format!(
                    "weight for {} must be a non-negative number, got {}",
                    category, w
                )));
            }
        }
        Ok(Self { sdca_weights })
    }

    pub fn sdca_weights(&self) -> Option<&CategoryWeights> {
        self.sdca_weights.as_ref()
    }

    /// Weighted mean of category averages when weights are configured
    /// (missing categories weigh 1.0), otherwise the mean of all z-scores.
    fn composite_z(&self, system: &SdcaSystem) -> f64 {
        match self.sdca_weights.as_ref().filter(|w| !w.is_empty()) {
            Some(weights) => {
                let (sum, total) = system.result_by_category().into_iter().fold(
                    (0.0, 0.0),
                    |(sum, total), (category, avg)| {
                        let w = weights.get(&category).copied().unwrap_or(1.0);
                        (sum + avg * w, total + w)
                    },
                );
                if total > 0.0 {
                    sum / total
                } else {
                    0.0
                }
            }
            None => system.composite_z_score(),
        }
    }

    pub fn score_sdca(&self, system: &SdcaSystem) -> SdcaComposite {
        if system.indicators.is_empty() {
            return SdcaComposite {
                asset: system.asset,
                composite_z: 0.0,
                by_category: BTreeMap::new(),
                indicator_count: 0,
                interpretation: "No indicators".to_string(),
            };
        }

        let composite = self.composite_z(system);
        SdcaComposite {
            asset: system.asset,
            composite_z: round_to(composite, 4),
            by_category: system
                .result_by_category()
                .into_iter()
                .map(|(category, z)| (category, round_to(z, 4)))
                .collect(),
            indicator_count: system.indicators.len(),
            interpretation: SdcaComposite::interpret_z(composite).to_string(),
        }
    }

    pub fn score_ltpi(&self, system: &LtpiSystem) -> LtpiComposite {
        let ratio = system.trend_ratio();
        LtpiComposite {
            asset: system.asset,
            composite_score: system.composite_score(),
            max_possible: system.max_possible(),
            trend_ratio: round_to(ratio, 4),
            interpretation: LtpiComposite::interpret_ratio(ratio).to_string(),
        }
    }

    /// Valuation x trend signal. The valuation side is the plain mean of all
    /// SDCA z-scores; category weights only shape the `score_sdca` composite.
    pub fn combined_signal(&self, sdca: &SdcaSystem, ltpi: &LtpiSystem) -> CombinedSignal {
        CombinedSignal::from_systems(sdca, ltpi)
    }

    /// Allocation suggestions per asset, normalized to sum to 1.0 when any
    /// asset has a positive weight.
    pub fn portfolio_signal(&self, systems: &[(SdcaSystem, LtpiSystem)]) -> PortfolioSignal {
        let mut risk_total = 0.0;
        let mut assets: Vec<AllocationSuggestion> = systems
            .iter()
            .map(|(sdca, ltpi)| {
                let combined = self.combined_signal(sdca, ltpi);
                let allocation = Allocation::for_signal(combined.signal);
                risk_total += allocation.risk;
                AllocationSuggestion {
                    asset: combined.asset,
                    signal: combined.signal,
                    allocation_pct: allocation.weight,
                    reasoning: allocation.reasoning.to_string(),
                }
            })
            .collect();

        let total: f64 = assets.iter().map(|a| a.allocation_pct).sum();
        if total > 0.0 {
            for suggestion in &mut assets {
                suggestion.allocation_pct = round_to(suggestion.allocation_pct / total, 4);
            }
        }

        let total_risk_score = if assets.is_empty() {
            0.0
        } else {
            round_to(risk_total / assets.len() as f64, 4)
        };
        tracing::info!(
            "Portfolio signal over {} assets, risk score {:.2}",
            assets.len(),
            total_risk_score
        );

        PortfolioSignal {
            assets,
            total_risk_score,
        }
    }
}
