use anyhow::{Context, Result};
use composite_scorer::{CategoryWeights, EngineConfig};
use signal_core::stats::CorrelationMethod;
use signal_core::SdcaCategory;
use std::env;

/// Engine configuration from the environment: an optional JSON file named by
/// `SIGNAL_ENGINE_CONFIG`, then individual variable overrides.
pub fn from_env() -> Result<EngineConfig> {
    let base = match env::var("SIGNAL_ENGINE_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading engine config {}", path))?;
            serde_json::from_str::<EngineConfig>(&raw).with_context(|| format!("parsing engine config {}", path))?
        }
        Err(_) => EngineConfig::default(),
    };
    let config = with_overrides(base, |key| env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Apply `KEY=value` overrides looked up through `var`.
pub fn with_overrides(
    mut config: EngineConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<EngineConfig> {
    if let Some(v) = var("ZSCORE_OUTLIER_METHOD") {
        config.zscore.outlier_method = v.parse()?;
    }
    if let Some(v) = var("ZSCORE_LOG_TRANSFORM") {
        config.zscore.use_log_transform = v.parse().context("ZSCORE_LOG_TRANSFORM")?;
    }
    if let Some(v) = var("ZSCORE_ROLLING_WINDOW") {
        config.zscore.rolling_window = Some(v.parse().context("ZSCORE_ROLLING_WINDOW")?);
    }
    if let Some(v) = var("REDUNDANCY_THRESHOLD") {
        config.correlation.redundancy_threshold = v.parse().context("REDUNDANCY_THRESHOLD")?;
    }
    if let Some(v) = var("CORRELATION_METHOD") {
        config.correlation.method = v.parse::<CorrelationMethod>().map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = var("DECAY_ROLLING_WINDOW") {
        config.decay.rolling_window = v.parse().context("DECAY_ROLLING_WINDOW")?;
    }
    if let Some(v) = var("REGIME_USE_HMM") {
        config.regime.use_hmm = v.parse().context("REGIME_USE_HMM")?;
    }
    if let Some(v) = var("SDCA_WEIGHTS") {
        config.sdca_weights = Some(parse_weights(&v)?);
    }
    Ok(config)
}

/// `fundamental:0.4,technical:0.35,sentiment:0.25`
fn parse_weights(raw: &str) -> Result<CategoryWeights> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<(SdcaCategory, f64)> {
            let (category, weight) = entry
                .split_once(':')
                .with_context(|| format!("SDCA_WEIGHTS entry '{}' is not category:weight", entry))?;
            let category: SdcaCategory = category.parse()?;
            let weight: f64 = weight
                .trim()
                .parse()
                .with_context(|| format!("SDCA_WEIGHTS weight for {}", category))?;
            Ok((category, weight))
        })
        .collect()
}
