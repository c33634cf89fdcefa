//! Series provider over a directory of CSV files laid out as
//! `<root>/<symbol>/<metric>.csv`, with prices in `price.csv`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use signal_core::{DataFrequency, Observation, SeriesProvider, SignalError, Timestamp};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const PRICE_FILE: &str = "price";

pub struct CsvDirectoryProvider {
    root: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, symbol: &str, metric: &str) -> PathBuf {
        self.root.join(symbol).join(format!("{}.csv", metric))
    }

    async fn load(
        &self,
        path: &Path,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, SignalError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SignalError::Provider(format!("failed to read {}: {}", path.display(), e)))?;
        let points = parse_series(&content)
            .map_err(|e| SignalError::Provider(format!("{}: {}", path.display(), e)))?;

        Ok(points
            .into_iter()
            .filter(|p| {
                let day = p.timestamp.date_naive();
                day >= start && end.map_or(true, |end| day <= end)
            })
            .collect())
    }

    fn symbol_dirs(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", self.root.display(), e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SeriesProvider for CsvDirectoryProvider {
    async fn fetch_price(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        frequency: DataFrequency,
    ) -> Result<Vec<Observation>, SignalError> {
        let points = self.load(&self.path(symbol, PRICE_FILE), start, end).await?;
        Ok(resample(points, frequency))
    }

    async fn fetch_metric(
        &self,
        metric: &str,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, SignalError> {
        self.load(&self.path(symbol, metric), start, end).await
    }

    fn supported_assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self
            .symbol_dirs()
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assets.sort();
        assets
    }

    fn supported_metrics(&self) -> Vec<String> {
        let metrics: BTreeSet<String> = self
            .symbol_dirs()
            .iter()
            .filter_map(|dir| std::fs::read_dir(dir).ok())
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|p| p.file_stem()?.to_str().map(str::to_string))
            .filter(|stem| stem != PRICE_FILE)
            .collect();
        metrics.into_iter().collect()
    }
}

/// Parse `timestamp,value` rows. A blank value is a missing reading.
pub fn parse_series(content: &str) -> Result<Vec<Observation>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut points = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error: {}", e))?;
        let raw_ts = record.get(0).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| format!("row {}: invalid timestamp '{}'", line + 1, raw_ts))?;

        let value = match record.get(1).unwrap_or("") {
            "" => None,
            raw => Some(
                raw.parse::<f64>()
                    .map_err(|e| format!("row {}: invalid value '{}': {}", line + 1, raw, e))?,
            ),
        };
        points.push(Observation { timestamp, value });
    }

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Keep the last observation of each ISO week or calendar month.
fn resample(points: Vec<Observation>, frequency: DataFrequency) -> Vec<Observation> {
    let bucket = |ts: &Timestamp| -> (i32, u32) {
        match frequency {
            DataFrequency::Daily => (ts.year(), ts.ordinal()),
            DataFrequency::Weekly => (ts.iso_week().year(), ts.iso_week().week()),
            DataFrequency::Monthly => (ts.year(), ts.month()),
        }
    };
    if frequency == DataFrequency::Daily {
        return points;
    }

    let mut out: Vec<Observation> = Vec::new();
    for point in points {
        match out.last_mut() {
            Some(last) if bucket(&last.timestamp) == bucket(&point.timestamp) => *last = point,
            _ => out.push(point),
        }
    }
    out
}
