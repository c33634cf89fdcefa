//! Feature engineering shared by both detection strategies.

use signal_core::stats::median;
use signal_core::{dropna, Observation, Timestamp};
use statrs::statistics::Statistics;

pub const FEATURE_COUNT: usize = 3;
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["returns", "volatility", "momentum"];

/// Simple returns, rolling volatility and trailing momentum aligned on the
/// rows where all three are defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    pub index: Vec<Timestamp>,
    pub returns: Vec<f64>,
    pub volatility: Vec<f64>,
    pub momentum: Vec<f64>,
    /// Median of the full volatility series, before alignment.
    pub volatility_median: f64,
    /// Median of the full momentum series, before alignment.
    pub momentum_median: f64,
}

impl FeatureFrame {
    /// Build features from a price series. Missing prices are dropped first.
    /// Row `t` exists once `lookback_vol` returns and `lookback_trend` prior
    /// prices are available, so the frame starts after a warm-up period.
    /// The medians cover every point where the feature itself is defined,
    /// so a shorter lookback contributes its earlier values too.
    pub fn from_prices(prices: &[Observation], lookback_vol: usize, lookback_trend: usize) -> Self {
        let points = dropna(prices);
        let n = points.len();
        let start = lookback_vol.max(lookback_trend).max(1);

        let mut frame = FeatureFrame::default();
        if n <= start {
            return frame;
        }

        let simple_returns: Vec<f64> = std::iter::once(f64::NAN)
            .chain(points.windows(2).map(|w| w[1].1 / w[0].1 - 1.0))
            .collect();
        let volatility: Vec<f64> = (0..n)
            .map(|t| {
                if lookback_vol > 0 && t >= lookback_vol {
                    simple_returns[t + 1 - lookback_vol..=t].std_dev()
                } else {
                    f64::NAN
                }
            })
            .collect();
        let momentum: Vec<f64> = (0..n)
            .map(|t| {
                if t >= lookback_trend {
                    points[t].1 / points[t - lookback_trend].1 - 1.0
                } else {
                    f64::NAN
                }
            })
            .collect();

        frame.volatility_median = finite_median(&volatility);
        frame.momentum_median = finite_median(&momentum);

        for t in start..n {
            let (ret, vol, mom) = (simple_returns[t], volatility[t], momentum[t]);
            if !(ret.is_finite() && vol.is_finite() && mom.is_finite()) {
                continue;
            }
            frame.index.push(points[t].0);
            frame.returns.push(ret);
            frame.volatility.push(vol);
            frame.momentum.push(mom);
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Row-major observation vectors in `FEATURE_NAMES` order.
    pub fn rows(&self) -> Vec<[f64; FEATURE_COUNT]> {
        (0..self.len())
            .map(|i| [self.returns[i], self.volatility[i], self.momentum[i]])
            .collect()
    }
}

fn finite_median(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    median(&finite)
}
