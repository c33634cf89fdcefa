//! Timestamped series and index alignment.
//!
//! Hosts hand the engine histories as ascending `(timestamp, value)` pairs that
//! may contain gaps or missing readings. Every analyzer that combines more than
//! one series aligns them here first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Timestamp = DateTime<Utc>;

/// A single reading; `None` (or a non-finite value) means missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value: Some(value) }
    }

    pub fn missing(timestamp: Timestamp) -> Self {
        Self { timestamp, value: None }
    }

    /// The value if present and finite.
    pub fn finite(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// A named column of observations, e.g. one indicator's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub points: Vec<Observation>,
}

impl NamedSeries {
    pub fn new(name: impl Into<String>, points: Vec<Observation>) -> Self {
        Self { name: name.into(), points }
    }
}

/// Finite values in order, missing readings dropped.
pub fn finite_values(points: &[Observation]) -> Vec<f64> {
    points.iter().filter_map(Observation::finite).collect()
}

/// Finite points in order, missing readings dropped.
pub fn dropna(points: &[Observation]) -> Vec<(Timestamp, f64)> {
    points
        .iter()
        .filter_map(|o| o.finite().map(|v| (o.timestamp, v)))
        .collect()
}

/// Inner join of two series on timestamp. Rows where either side is missing
/// are dropped. Returns the shared index and both value vectors.
pub fn align_pair(a: &[Observation], b: &[Observation]) -> (Vec<Timestamp>, Vec<f64>, Vec<f64>) {
    let right: BTreeMap<Timestamp, f64> = dropna(b).into_iter().collect();
    let left: BTreeMap<Timestamp, f64> = dropna(a).into_iter().collect();

    let mut index = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (ts, x) in left {
        if let Some(&y) = right.get(&ts) {
            index.push(ts);
            xs.push(x);
            ys.push(y);
        }
    }
    (index, xs, ys)
}

/// Several named columns aligned on the union of their timestamps.
/// Column order is preserved from the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedFrame {
    pub names: Vec<String>,
    pub index: Vec<Timestamp>,
    /// `columns[c][row]`
    pub columns: Vec<Vec<Option<f64>>>,
}

impl AlignedFrame {
    pub fn from_series(series: &[NamedSeries]) -> Self {
        let mut index: Vec<Timestamp> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|o| o.timestamp))
            .collect();
        index.sort();
        index.dedup();

        let position: BTreeMap<Timestamp, usize> =
            index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();

        let columns = series
            .iter()
            .map(|s| {
                let mut column = vec![None; index.len()];
                for obs in &s.points {
                    column[position[&obs.timestamp]] = obs.finite();
                }
                column
            })
            .collect();

        Self {
            names: series.iter().map(|s| s.name.clone()).collect(),
            index,
            columns,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    /// Rows where both columns `i` and `j` have a value.
    pub fn pairwise_complete(&self, i: usize, j: usize) -> (Vec<f64>, Vec<f64>) {
        self.columns[i]
            .iter()
            .zip(&self.columns[j])
            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(i: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
    }

    #[test]
    fn test_align_pair_inner_join_drops_missing() {
        let a = vec![
            Observation::new(day(0), 1.0),
            Observation::new(day(1), 2.0),
            Observation::missing(day(2)),
            Observation::new(day(3), 4.0),
        ];
        let b = vec![
            Observation::new(day(1), 20.0),
            Observation::new(day(2), 30.0),
            Observation::new(day(3), f64::NAN),
            Observation::new(day(4), 50.0),
        ];
        let (index, xs, ys) = align_pair(&a, &b);
        assert_eq!(index, vec![day(1)]);
        assert_eq!(xs, vec![2.0]);
        assert_eq!(ys, vec![20.0]);
    }

    #[test]
    fn test_frame_union_index_and_pairwise() {
        let frame = AlignedFrame::from_series(&[
            NamedSeries::new("a", vec![Observation::new(day(0), 1.0), Observation::new(day(2), 3.0)]),
            NamedSeries::new("b", vec![Observation::new(day(1), 2.0), Observation::new(day(2), 6.0)]),
        ]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.columns[0], vec![Some(1.0), None, Some(3.0)]);

        let (x, y) = frame.pairwise_complete(0, 1);
        assert_eq!(x, vec![3.0]);
        assert_eq!(y, vec![6.0]);
    }
}
