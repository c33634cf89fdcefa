//! Statistical analyzers over indicator histories: outlier-robust z-scoring,
//! correlation/redundancy analysis and directional coherency.

pub mod coherency;
pub mod correlation;
pub mod zscore;

pub use coherency::{CoherencyAnalyzer, CoherencyReport, OUTLIER_ALIGNMENT};
pub use correlation::{
    effective_n, CorrelationAnalyzer, CorrelationReport, Recommendation, RedundancyPair,
};
pub use zscore::{OutlierMethod, ZScoreConfig, ZScoreEngine, ZScoreResult};
