use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::SignalError;

/// Tracked asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Btc,
    Eth,
    Gold,
    Spx,
    /// Altcoins
    Alt,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Btc => "btc",
            AssetClass::Eth => "eth",
            AssetClass::Gold => "gold",
            AssetClass::Spx => "spx",
            AssetClass::Alt => "alt",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valuation (SDCA) indicator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdcaCategory {
    Fundamental,
    Technical,
    Sentiment,
}

impl SdcaCategory {
    pub const ALL: [SdcaCategory; 3] = [
        SdcaCategory::Fundamental,
        SdcaCategory::Technical,
        SdcaCategory::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SdcaCategory::Fundamental => "fundamental",
            SdcaCategory::Technical => "technical",
            SdcaCategory::Sentiment => "sentiment",
        }
    }
}

impl std::str::FromStr for SdcaCategory {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fundamental" => Ok(SdcaCategory::Fundamental),
            "technical" => Ok(SdcaCategory::Technical),
            "sentiment" => Ok(SdcaCategory::Sentiment),
            other => Err(SignalError::InvalidConfig(format!("unknown SDCA category '{}'", other))),
        }
    }
}

impl fmt::Display for SdcaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend (LTPI) indicator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LtpiCategory {
    TechnicalBtc,
    OnChain,
}

/// Where an indicator was sourced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorSource {
    OwnResearch,
    /// Shared community reference sheet; capped by the originality rule
    ReferenceSheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Long,
    Short,
}

/// Combined valuation x trend signal, strongest buy to strongest sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    StrongestBuy,
    CautiousBuy,
    LightBuy,
    Hold,
    Reduce,
    PartialProfit,
    StrongestSell,
}

impl SignalStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::StrongestBuy => "strongest_buy",
            SignalStrength::CautiousBuy => "cautious_buy",
            SignalStrength::LightBuy => "light_buy",
            SignalStrength::Hold => "hold",
            SignalStrength::Reduce => "reduce",
            SignalStrength::PartialProfit => "partial_profit",
            SignalStrength::StrongestSell => "strongest_sell",
        }
    }

    /// Human-readable label for the signal
    pub fn to_label(&self) -> &'static str {
        match self {
            SignalStrength::StrongestBuy => "Strongest Buy",
            SignalStrength::CautiousBuy => "Cautious Buy",
            SignalStrength::LightBuy => "Light Buy",
            SignalStrength::Hold => "Hold",
            SignalStrength::Reduce => "Reduce",
            SignalStrength::PartialProfit => "Partial Profit",
            SignalStrength::StrongestSell => "Strongest Sell",
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Valuation (SDCA) ────────────────────────────────────────────────────────

/// Research documentation attached to every SDCA indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdcaComments {
    /// Pros, cons, suitability, decay status
    #[serde(default)]
    pub why_chosen: String,
    /// Calculation, normalization, timeframe, settings
    #[serde(default)]
    pub how_it_works: String,
    /// Thresholds, +/-2SD values, decay adjustments
    #[serde(default)]
    pub scoring_logic: String,
}

impl SdcaComments {
    /// `(field name, text)` for each documentation field, in fixed order.
    pub fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("why_chosen", self.why_chosen.as_str()),
            ("how_it_works", self.how_it_works.as_str()),
            ("scoring_logic", self.scoring_logic.as_str()),
        ]
    }
}

/// Unchecked SDCA indicator as it arrives from a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdcaIndicatorDraft {
    pub name: String,
    pub category: SdcaCategory,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_website: String,
    #[serde(default)]
    pub source_author: Option<String>,
    pub provided_by: IndicatorSource,
    #[serde(default)]
    pub z_score: f64,
    pub date_updated: NaiveDate,
    #[serde(default)]
    pub comments: SdcaComments,
    #[serde(default)]
    pub has_decay: bool,
    #[serde(default)]
    pub decay_description: Option<String>,
    #[serde(default)]
    pub is_logarithmic: bool,
    #[serde(default)]
    pub is_normalized: bool,
}

/// A single indicator in an SDCA valuation system.
///
/// Constructed only through [`SdcaIndicator::new`] or deserialization, both of
/// which reject an empty name, a z-score outside [-5, 5] and a decay flag
/// without a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SdcaIndicatorDraft")]
pub struct SdcaIndicator {
    pub name: String,
    pub category: SdcaCategory,
    pub source_url: String,
    pub source_website: String,
    pub source_author: Option<String>,
    pub provided_by: IndicatorSource,
    pub z_score: f64,
    pub date_updated: NaiveDate,
    pub comments: SdcaComments,
    pub has_decay: bool,
    pub decay_description: Option<String>,
    pub is_logarithmic: bool,
    pub is_normalized: bool,
}

pub const SDCA_Z_BOUND: f64 = 5.0;

impl SdcaIndicator {
    pub fn new(draft: SdcaIndicatorDraft) -> Result<Self, SignalError> {
        if draft.name.trim().is_empty() {
            return Err(SignalError::EmptyField("name"));
        }
        if !draft.z_score.is_finite() || draft.z_score.abs() > SDCA_Z_BOUND {
            return Err(SignalError::ZScoreOutOfRange {
                name: draft.name,
                value: draft.z_score,
            });
        }
        let documented = draft
            .decay_description
            .as_deref()
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false);
        if draft.has_decay && !documented {
            return Err(SignalError::DecayUndocumented(draft.name));
        }

        Ok(Self {
            name: draft.name,
            category: draft.category,
            source_url: draft.source_url,
            source_website: draft.source_website,
            source_author: draft.source_author,
            provided_by: draft.provided_by,
            z_score: draft.z_score,
            date_updated: draft.date_updated,
            comments: draft.comments,
            has_decay: draft.has_decay,
            decay_description: draft.decay_description,
            is_logarithmic: draft.is_logarithmic,
            is_normalized: draft.is_normalized,
        })
    }

    /// Replace the z-score, keeping the construction bound.
    pub fn with_z_score(mut self, z_score: f64) -> Result<Self, SignalError> {
        if !z_score.is_finite() || z_score.abs() > SDCA_Z_BOUND {
            return Err(SignalError::ZScoreOutOfRange {
                name: self.name,
                value: z_score,
            });
        }
        self.z_score = z_score;
        Ok(self)
    }
}

impl TryFrom<SdcaIndicatorDraft> for SdcaIndicator {
    type Error = SignalError;

    fn try_from(draft: SdcaIndicatorDraft) -> Result<Self, Self::Error> {
        Self::new(draft)
    }
}

/// A complete SDCA valuation system for a single asset.
///
/// Category totals are not enforced here; a system under construction may be
/// invalid until it passes the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdcaSystem {
    pub asset: AssetClass,
    #[serde(default)]
    pub indicators: Vec<SdcaIndicator>,
    pub date_updated: NaiveDate,
}

impl SdcaSystem {
    /// Average z-score across all indicators.
    pub fn composite_z_score(&self) -> f64 {
        if self.indicators.is_empty() {
            return 0.0;
        }
        self.indicators.iter().map(|i| i.z_score).sum::<f64>() / self.indicators.len() as f64
    }

    /// Average z-score per category present in the system.
    pub fn result_by_category(&self) -> BTreeMap<SdcaCategory, f64> {
        let mut buckets: BTreeMap<SdcaCategory, Vec<f64>> = BTreeMap::new();
        for ind in &self.indicators {
            buckets.entry(ind.category).or_default().push(ind.z_score);
        }
        buckets
            .into_iter()
            .map(|(cat, scores)| (cat, scores.iter().sum::<f64>() / scores.len() as f64))
            .collect()
    }

    pub fn count_in(&self, category: SdcaCategory) -> usize {
        self.indicators.iter().filter(|i| i.category == category).count()
    }
}

// ─── Trend (LTPI) ────────────────────────────────────────────────────────────

/// Unchecked LTPI indicator as it arrives from a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtpiIndicatorDraft {
    pub name: String,
    pub category: LtpiCategory,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_website: String,
    pub author: String,
    /// e.g. "supertrend", "mvrv"; used for redundancy checks
    pub indicator_type: String,
    #[serde(default)]
    pub scoring_criteria: String,
    #[serde(default)]
    pub comment: String,
    pub score: i32,
    #[serde(default)]
    pub repaints: bool,
}

/// A single indicator in an LTPI trend system. Repainting indicators and
/// scores outside {-1, 0, 1} never get past construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LtpiIndicatorDraft")]
pub struct LtpiIndicator {
    pub name: String,
    pub category: LtpiCategory,
    pub source_url: String,
    pub source_website: String,
    pub author: String,
    pub indicator_type: String,
    pub scoring_criteria: String,
    pub comment: String,
    pub score: i8,
    pub repaints: bool,
}

impl LtpiIndicator {
    pub fn new(draft: LtpiIndicatorDraft) -> Result<Self, SignalError> {
        if draft.name.trim().is_empty() {
            return Err(SignalError::EmptyField("name"));
        }
        if draft.author.trim().is_empty() {
            return Err(SignalError::EmptyField("author"));
        }
        if draft.indicator_type.trim().is_empty() {
            return Err(SignalError::EmptyField("indicator_type"));
        }
        if draft.repaints {
            return Err(SignalError::RepaintingIndicator(draft.name));
        }
        if !(-1..=1).contains(&draft.score) {
            return Err(SignalError::InvalidTrendScore {
                name: draft.name,
                value: draft.score,
            });
        }

        Ok(Self {
            name: draft.name,
            category: draft.category,
            source_url: draft.source_url,
            source_website: draft.source_website,
            author: draft.author,
            indicator_type: draft.indicator_type,
            scoring_criteria: draft.scoring_criteria,
            comment: draft.comment,
            score: draft.score as i8,
            repaints: false,
        })
    }
}

impl TryFrom<LtpiIndicatorDraft> for LtpiIndicator {
    type Error = SignalError;

    fn try_from(draft: LtpiIndicatorDraft) -> Result<Self, Self::Error> {
        Self::new(draft)
    }
}

/// One ground-truth reversal point in the Intended Signal Period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IspSignal {
    pub date: NaiveDate,
    pub direction: TrendDirection,
}

/// The trend duration an LTPI system is meant to capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntendedSignalPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// e.g. "1D", "3D", "1W"
    pub timeframe: String,
    #[serde(default)]
    pub signals: Vec<IspSignal>,
}

impl IntendedSignalPeriod {
    /// Number of direction changes (trades).
    pub fn trade_count(&self) -> usize {
        self.signals
            .windows(2)
            .filter(|w| w[0].direction != w[1].direction)
            .count()
    }
}

/// A complete LTPI trend system for a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtpiSystem {
    pub asset: AssetClass,
    /// Category 1
    #[serde(default)]
    pub technical: Vec<LtpiIndicator>,
    /// Category 2
    #[serde(default)]
    pub on_chain: Vec<LtpiIndicator>,
    #[serde(default)]
    pub isp: Option<IntendedSignalPeriod>,
    pub date_updated: NaiveDate,
}

impl LtpiSystem {
    pub fn all_indicators(&self) -> impl Iterator<Item = &LtpiIndicator> {
        self.technical.iter().chain(self.on_chain.iter())
    }

    /// Sum of all indicator scores.
    pub fn composite_score(&self) -> i32 {
        self.all_indicators().map(|i| i.score as i32).sum()
    }

    pub fn max_possible(&self) -> usize {
        self.technical.len() + self.on_chain.len()
    }

    /// Normalized trend strength in [-1, 1].
    pub fn trend_ratio(&self) -> f64 {
        match self.max_possible() {
            0 => 0.0,
            n => self.composite_score() as f64 / n as f64,
        }
    }
}

// ─── Combined signal ─────────────────────────────────────────────────────────

pub const UNDERVALUED_Z: f64 = -1.0;
pub const OVERVALUED_Z: f64 = 1.0;
pub const UPTREND_RATIO: f64 = 0.2;
pub const DOWNTREND_RATIO: f64 = -0.2;

/// The unified output combining SDCA valuation and LTPI trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSignal {
    pub asset: AssetClass,
    pub sdca_z_score: f64,
    pub ltpi_score: i32,
    pub ltpi_ratio: f64,
    pub signal: SignalStrength,
    pub timestamp: NaiveDate,
}

impl CombinedSignal {
    pub fn from_systems(sdca: &SdcaSystem, ltpi: &LtpiSystem) -> Self {
        Self::from_scores(
            sdca.asset,
            sdca.composite_z_score(),
            ltpi.composite_score(),
            ltpi.trend_ratio(),
            sdca.date_updated.max(ltpi.date_updated),
        )
    }

    /// Build from already-aggregated scores.
    pub fn from_scores(
        asset: AssetClass,
        z_score: f64,
        ltpi_score: i32,
        trend_ratio: f64,
        timestamp: NaiveDate,
    ) -> Self {
        Self {
            asset,
            sdca_z_score: crate::stats::round_to(z_score, 4),
            ltpi_score,
            ltpi_ratio: crate::stats::round_to(trend_ratio, 4),
            signal: derive_signal(z_score, trend_ratio),
            timestamp,
        }
    }
}

/// Valuation x trend decision table; the first matching row wins.
///
/// | valuation (z) | trend (ratio)  | signal         |
/// |---------------|----------------|----------------|
/// | z <= -1       | ratio > 0.2    | strongest_buy  |
/// | z <= -1       | ratio <= -0.2  | cautious_buy   |
/// | z <= -1       | otherwise      | light_buy      |
/// | z >= 1        | ratio <= -0.2  | strongest_sell |
/// | z >= 1        | ratio > 0.2    | partial_profit |
/// | z >= 1        | otherwise      | reduce         |
/// | fair          | ratio > 0.2    | light_buy      |
/// | fair          | ratio <= -0.2  | reduce         |
/// | fair          | otherwise      | hold           |
pub fn derive_signal(z_score: f64, trend_ratio: f64) -> SignalStrength {
    let undervalued = z_score <= UNDERVALUED_Z;
    let overvalued = z_score >= OVERVALUED_Z;
    let uptrend = trend_ratio > UPTREND_RATIO;
    let downtrend = trend_ratio <= DOWNTREND_RATIO;

    if undervalued && uptrend {
        SignalStrength::StrongestBuy
    } else if undervalued && downtrend {
        SignalStrength::CautiousBuy
    } else if undervalued {
        SignalStrength::LightBuy
    } else if overvalued && downtrend {
        SignalStrength::StrongestSell
    } else if overvalued && uptrend {
        SignalStrength::PartialProfit
    } else if overvalued {
        SignalStrength::Reduce
    } else if uptrend {
        SignalStrength::LightBuy
    } else if downtrend {
        SignalStrength::Reduce
    } else {
        SignalStrength::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn sdca_draft(name: &str, category: SdcaCategory, z: f64) -> SdcaIndicatorDraft {
        SdcaIndicatorDraft {
            name: name.to_string(),
            category,
            source_url: "https://example.com/ind".to_string(),
            source_website: "example.com".to_string(),
            source_author: None,
            provided_by: IndicatorSource::OwnResearch,
            z_score: z,
            date_updated: date(),
            comments: SdcaComments::default(),
            has_decay: false,
            decay_description: None,
            is_logarithmic: false,
            is_normalized: false,
        }
    }

    fn ltpi_draft(name: &str, score: i32) -> LtpiIndicatorDraft {
        LtpiIndicatorDraft {
            name: name.to_string(),
            category: LtpiCategory::TechnicalBtc,
            source_url: "https://tradingview.com/x".to_string(),
            source_website: "tradingview.com".to_string(),
            author: "author".to_string(),
            indicator_type: "supertrend".to_string(),
            scoring_criteria: "Long above zero".to_string(),
            comment: "Momentum filter".to_string(),
            score,
            repaints: false,
        }
    }

    #[test]
    fn test_decay_requires_description() {
        let mut draft = sdca_draft("MVRV", SdcaCategory::Fundamental, 0.5);
        draft.has_decay = true;
        assert_eq!(
            SdcaIndicator::new(draft.clone()),
            Err(SignalError::DecayUndocumented("MVRV".to_string()))
        );

        draft.decay_description = Some("   ".to_string());
        assert!(SdcaIndicator::new(draft.clone()).is_err());

        draft.decay_description = Some("Peaks compress each cycle".to_string());
        assert!(SdcaIndicator::new(draft).is_ok());
    }

    #[test]
    fn test_z_score_bound_enforced() {
        assert!(SdcaIndicator::new(sdca_draft("a", SdcaCategory::Technical, 5.0)).is_ok());
        assert!(matches!(
            SdcaIndicator::new(sdca_draft("a", SdcaCategory::Technical, -5.5)),
            Err(SignalError::ZScoreOutOfRange { .. })
        ));
        assert!(SdcaIndicator::new(sdca_draft("a", SdcaCategory::Technical, f64::NAN)).is_err());
    }

    #[test]
    fn test_repainting_rejected_at_construction() {
        let mut draft = ltpi_draft("Repainter", 1);
        draft.repaints = true;
        assert_eq!(
            LtpiIndicator::new(draft),
            Err(SignalError::RepaintingIndicator("Repainter".to_string()))
        );
        assert!(matches!(
            LtpiIndicator::new(ltpi_draft("Bad score", 2)),
            Err(SignalError::InvalidTrendScore { value: 2, .. })
        ));
    }

    #[test]
    fn test_deserialization_runs_invariants() {
        let json = r#"{
            "name": "Pi Cycle",
            "category": "technical_btc",
            "author": "someone",
            "indicator_type": "ma_cross",
            "score": 1,
            "repaints": true
        }"#;
        let parsed: Result<LtpiIndicator, _> = serde_json::from_str(json);
        assert!(parsed.is_err());

        let ok = json.replace("\"repaints\": true", "\"repaints\": false");
        let parsed: LtpiIndicator = serde_json::from_str(&ok).unwrap();
        assert_eq!(parsed.score, 1);
    }

    #[test]
    fn test_sdca_aggregates() {
        let system = SdcaSystem {
            asset: AssetClass::Btc,
            indicators: vec![
                SdcaIndicator::new(sdca_draft("f1", SdcaCategory::Fundamental, -2.0)).unwrap(),
                SdcaIndicator::new(sdca_draft("f2", SdcaCategory::Fundamental, -1.0)).unwrap(),
                SdcaIndicator::new(sdca_draft("t1", SdcaCategory::Technical, 0.0)).unwrap(),
            ],
            date_updated: date(),
        };
        assert!((system.composite_z_score() + 1.0).abs() < 1e-12);
        let by_cat = system.result_by_category();
        assert_eq!(by_cat.len(), 2);
        assert!((by_cat[&SdcaCategory::Fundamental] + 1.5).abs() < 1e-12);
        assert_eq!(system.count_in(SdcaCategory::Sentiment), 0);
    }

    #[test]
    fn test_ltpi_trend_ratio() {
        let system = LtpiSystem {
            asset: AssetClass::Eth,
            technical: vec![
                LtpiIndicator::new(ltpi_draft("a", 1)).unwrap(),
                LtpiIndicator::new(ltpi_draft("b", 1)).unwrap(),
                LtpiIndicator::new(ltpi_draft("c", -1)).unwrap(),
            ],
            on_chain: vec![LtpiIndicator::new(ltpi_draft("d", 0)).unwrap()],
            isp: None,
            date_updated: date(),
        };
        assert_eq!(system.composite_score(), 1);
        assert_eq!(system.max_possible(), 4);
        assert!((system.trend_ratio() - 0.25).abs() < 1e-12);

        let empty = LtpiSystem { technical: vec![], on_chain: vec![], ..system };
        assert_eq!(empty.trend_ratio(), 0.0);
    }

    #[test]
    fn test_isp_trade_count() {
        let d = |m| NaiveDate::from_ymd_opt(2023, m, 1).unwrap();
        let mut isp = IntendedSignalPeriod {
            start_date: d(1),
            end_date: d(12),
            timeframe: "1D".to_string(),
            signals: vec![IspSignal { date: d(1), direction: TrendDirection::Long }],
        };
        assert_eq!(isp.trade_count(), 0);

        isp.signals.extend([
            IspSignal { date: d(3), direction: TrendDirection::Long },
            IspSignal { date: d(5), direction: TrendDirection::Short },
            IspSignal { date: d(8), direction: TrendDirection::Long },
        ]);
        assert_eq!(isp.trade_count(), 2);
    }

    #[test]
    fn test_derive_signal_table() {
        assert_eq!(derive_signal(-2.0, 0.8), SignalStrength::StrongestBuy);
        assert_eq!(derive_signal(-1.0, -0.2), SignalStrength::CautiousBuy);
        assert_eq!(derive_signal(-1.5, 0.0), SignalStrength::LightBuy);
        assert_eq!(derive_signal(2.0, -0.8), SignalStrength::StrongestSell);
        assert_eq!(derive_signal(1.0, 0.5), SignalStrength::PartialProfit);
        assert_eq!(derive_signal(1.5, 0.1), SignalStrength::Reduce);
        assert_eq!(derive_signal(0.0, 0.3), SignalStrength::LightBuy);
        assert_eq!(derive_signal(0.0, -0.5), SignalStrength::Reduce);
        assert_eq!(derive_signal(0.0, 0.0), SignalStrength::Hold);
        // Boundary: 0.2 is not an uptrend
        assert_eq!(derive_signal(0.0, 0.2), SignalStrength::Hold);
    }

    #[test]
    fn test_signal_serializes_snake_case() {
        let json = serde_json::to_string(&SignalStrength::PartialProfit).unwrap();
        assert_eq!(json, "\"partial_profit\"");
    }
}
