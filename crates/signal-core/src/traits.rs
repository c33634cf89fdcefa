use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Observation, SignalError};

/// Sampling frequency of a requested history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

/// Source of historical series consumed by the engine.
///
/// The engine itself never performs I/O; hosts implement this over whatever
/// market-data backend they use and fetch histories before calling the pure
/// analyzers.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Historical closing prices for a symbol, ascending.
    async fn fetch_price(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        frequency: DataFrequency,
    ) -> Result<Vec<Observation>, SignalError>;

    /// A named metric (e.g. MVRV, NVT, fear & greed) for a symbol, ascending.
    async fn fetch_metric(
        &self,
        metric: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, SignalError>;

    fn supported_assets(&self) -> Vec<String>;

    fn supported_metrics(&self) -> Vec<String>;
}
