//! Per-asset pipeline: z-score readings, validate, score, then attach
//! diagnostics for whatever histories the request carries.

use alpha_decay::{forward_returns, AlphaDecayDetector, DecayConfig, DecayReport};
use chrono::NaiveDate;
use market_regime_detector::{RegimeConfig, RegimeDetector, RegimeReport};
use quant_analysis::{
    CoherencyAnalyzer, CoherencyReport, CorrelationAnalyzer, CorrelationReport, ZScoreConfig,
    ZScoreEngine, ZScoreResult,
};
use serde::{Deserialize, Serialize};
use signal_core::{
    finite_values, AssetClass, CombinedSignal, DataFrequency, LtpiSystem, NamedSeries,
    Observation, SdcaSystem, SeriesProvider, SignalError,
};
use std::collections::BTreeMap;
use validation::{LtpiRules, LtpiValidator, SdcaRules, SdcaValidator, ValidationResult};

use crate::{CategoryWeights, CompositeScorer, LtpiComposite, PortfolioSignal, SdcaComposite};

/// Every analyzer's configuration plus validator rules and SDCA weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub zscore: ZScoreConfig,
    pub correlation: CorrelationAnalyzer,
    pub coherency: CoherencyAnalyzer,
    pub decay: DecayConfig,
    pub regime: RegimeConfig,
    pub sdca_rules: SdcaRules,
    pub ltpi_rules: LtpiRules,
    pub sdca_weights: Option<CategoryWeights>,
    /// Periods ahead used for the forward returns fed to the decay detector
    pub forward_return_horizon: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zscore: ZScoreConfig::default(),
            correlation: CorrelationAnalyzer::default(),
            coherency: CoherencyAnalyzer::default(),
            decay: DecayConfig::default(),
            regime: RegimeConfig::default(),
            sdca_rules: SdcaRules::default(),
            ltpi_rules: LtpiRules::default(),
            sdca_weights: None,
            forward_return_horizon: 30,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        self.zscore.validate()?;
        self.correlation.validate()?;
        self.coherency.validate()?;
        self.decay.validate()?;
        self.regime.validate()?;
        self.sdca_rules.validate()?;
        self.ltpi_rules.validate()?;
        if self.forward_return_horizon == 0 {
            return Err(SignalError::InvalidConfig(
                "forward_return_horizon must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// History for one SDCA indicator, matched to it by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub indicator: String,
    /// Metric to fetch from a provider when `history` is empty
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub history: Vec<Observation>,
    /// Value to score; the last finite history value when unset
    #[serde(default)]
    pub current_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub sdca: SdcaSystem,
    pub ltpi: LtpiSystem,
    /// Provider symbol; defaults to the asset name
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub readings: Vec<IndicatorReading>,
    /// Per-indicator LTPI signal histories for coherency analysis
    #[serde(default)]
    pub trend_signals: Vec<NamedSeries>,
    #[serde(default)]
    pub prices: Vec<Observation>,
}

impl AssetRequest {
    pub fn symbol(&self) -> String {
        self.symbol
            .clone()
            .unwrap_or_else(|| self.sdca.asset.as_str().to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReport {
    pub asset: AssetClass,
    pub sdca: SdcaComposite,
    pub ltpi: LtpiComposite,
    pub signal: CombinedSignal,
    pub sdca_validation: ValidationResult,
    pub ltpi_validation: ValidationResult,
    /// Z-score results keyed by indicator name
    pub z_scores: BTreeMap<String, ZScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coherency: Option<CoherencyReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decay: Vec<DecayReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime: Option<RegimeReport>,
}

#[derive(Debug)]
pub struct AssetPipeline {
    zscore: ZScoreEngine,
    correlation: CorrelationAnalyzer,
    coherency: CoherencyAnalyzer,
    decay: AlphaDecayDetector,
    regime: RegimeDetector,
    sdca_validator: SdcaValidator,
    ltpi_validator: LtpiValidator,
    scorer: CompositeScorer,
    forward_return_horizon: usize,
}

impl AssetPipeline {
    pub fn new(config: EngineConfig) -> Result<Self, SignalError> {
        config.validate()?;
        Ok(Self {
            zscore: ZScoreEngine::new(config.zscore)?,
            correlation: config.correlation,
            coherency: config.coherency,
            decay: AlphaDecayDetector::new(config.decay)?,
            regime: RegimeDetector::new(config.regime)?,
            sdca_validator: SdcaValidator::new(config.sdca_rules)?,
            ltpi_validator: LtpiValidator::new(config.ltpi_rules)?,
            scorer: CompositeScorer::new(config.sdca_weights)?,
            forward_return_horizon: config.forward_return_horizon,
        })
    }

    /// Swap in a differently configured regime detector.
    pub fn with_regime_detector(mut self, detector: RegimeDetector) -> Self {
        self.regime = detector;
        self
    }

    pub fn scorer(&self) -> &CompositeScorer {
        &self.scorer
    }

    pub fn validate_sdca(&self, system: &SdcaSystem) -> ValidationResult {
        self.sdca_validator.validate(system)
    }

    pub fn validate_ltpi(&self, system: &LtpiSystem) -> ValidationResult {
        self.ltpi_validator.validate(system)
    }

    pub fn portfolio(&self, systems: &[(SdcaSystem, LtpiSystem)]) -> PortfolioSignal {
        self.scorer.portfolio_signal(systems)
    }

    pub fn run(&self, request: AssetRequest) -> AssetReport {
        let AssetRequest {
            mut sdca,
            ltpi,
            readings,
            trend_signals,
            prices,
            ..
        } = request;
        tracing::info!(
            "Running pipeline for {} ({} SDCA, {} LTPI indicators, {} readings)",
            sdca.asset,
            sdca.indicators.len(),
            ltpi.max_possible(),
            readings.len()
        );

        let z_scores = self.score_readings(&mut sdca, &readings);

        let sdca_validation = self.sdca_validator.validate(&sdca);
        let ltpi_validation = self.ltpi_validator.validate(&ltpi);

        let histories: Vec<NamedSeries> = readings
            .iter()
            .filter(|r| !r.history.is_empty())
            .map(|r| NamedSeries::new(r.indicator.clone(), r.history.clone()))
            .collect();

        let correlation = (histories.len() >= 2).then(|| self.correlation.analyze(&histories));
        let coherency = (!trend_signals.is_empty()).then(|| self.coherency.analyze(&trend_signals));

        let decay = if prices.is_empty() {
            Vec::new()
        } else {
            let forward = forward_returns(&prices, self.forward_return_horizon);
            histories
                .iter()
                .map(|h| self.decay.analyze(&h.points, &forward, &h.name))
                .collect()
        };
        let regime = (!prices.is_empty()).then(|| self.regime.detect(&prices));

        let report = AssetReport {
            asset: sdca.asset,
            sdca: self.scorer.score_sdca(&sdca),
            ltpi: self.scorer.score_ltpi(&ltpi),
            signal: self.scorer.combined_signal(&sdca, &ltpi),
            sdca_validation,
            ltpi_validation,
            z_scores,
            correlation,
            coherency,
            decay,
            regime,
        };
        tracing::info!(
            "{}: {} (z {:.2}, trend {:.2}), SDCA {}, LTPI {}",
            report.asset,
            report.signal.signal.to_label(),
            report.signal.sdca_z_score,
            report.signal.ltpi_ratio,
            report.sdca_validation.summary(),
            report.ltpi_validation.summary()
        );
        report
    }

    /// Replace each matched indicator's z-score with one computed from its
    /// reading's history.
    fn score_readings(
        &self,
        sdca: &mut SdcaSystem,
        readings: &[IndicatorReading],
    ) -> BTreeMap<String, ZScoreResult> {
        let mut results = BTreeMap::new();
        for reading in readings {
            let mut values = finite_values(&reading.history);
            // Without an explicit reading the latest point is scored against
            // the points before it.
            let current = match reading.current_value {
                Some(value) => value,
                None => match values.pop() {
                    Some(value) => value,
                    None => {
                        tracing::debug!("No value to score for '{}'", reading.indicator);
                        continue;
                    }
                },
            };
            let result = self.zscore.compute(&values, current);

            match sdca.indicators.iter().position(|i| i.name == reading.indicator) {
                Some(idx) => match sdca.indicators[idx].clone().with_z_score(result.z_score) {
                    Ok(updated) => sdca.indicators[idx] = updated,
                    Err(e) => tracing::warn!("Keeping supplied z-score: {}", e),
                },
                None => tracing::warn!(
                    "Reading '{}' does not match any SDCA indicator",
                    reading.indicator
                ),
            }
            results.insert(reading.indicator.clone(), result);
        }
        results
    }
}

/// Fill empty price and reading histories from a provider, starting at `start`.
pub async fn hydrate(
    request: &mut AssetRequest,
    provider: &dyn SeriesProvider,
    start: NaiveDate,
) -> Result<(), SignalError> {
    let symbol = request.symbol();

    if request.prices.is_empty() {
        request.prices = provider
            .fetch_price(&symbol, start, None, DataFrequency::Daily)
            .await?;
        tracing::info!("Loaded {} prices for {}", request.prices.len(), symbol);
    }

    for reading in request.readings.iter_mut().filter(|r| r.history.is_empty()) {
        let Some(metric) = reading.metric.as_deref() else {
            continue;
        };
        reading.history = provider.fetch_metric(metric, &symbol, start, None).await?;
        tracing::debug!(
            "Loaded {} points of {} for '{}'",
            reading.history.len(),
            metric,
            reading.indicator
        );
    }
    Ok(())
}
