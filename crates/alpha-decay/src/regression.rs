//! Ordinary least squares on a single regressor with a two-sided t-test on
//! the slope.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation between x and y
    pub r_value: f64,
    /// Two-sided p-value for the null hypothesis slope == 0
    pub p_value: f64,
    /// Standard error of the slope
    pub std_err: f64,
}

impl LinearFit {
    pub fn r_squared(&self) -> f64 {
        self.r_value * self.r_value
    }
}

/// Keeps the t statistic finite for a perfect fit.
const TINY: f64 = 1e-20;

/// Fit `y = slope * x + intercept`. Returns `None` with fewer than three points
/// or when `x` has no variance. A flat `y` yields r = 0 and p = 1.
pub fn linregress(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        ssxm += dx * dx;
        ssym += dy * dy;
        ssxym += dx * dy;
    }
    if ssxm == 0.0 {
        return None;
    }

    let slope = ssxym / ssxm;
    let intercept = my - slope * mx;
    let df = (n - 2) as f64;

    if ssym == 0.0 {
        return Some(LinearFit {
            slope,
            intercept,
            r_value: 0.0,
            p_value: 1.0,
            std_err: 0.0,
        });
    }

    let r = (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0);
    let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
    let p_value = StudentsT::new(0.0, 1.0, df)
        .map(|dist| 2.0 * dist.sf(t.abs()))
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);
    let std_err = ((1.0 - r * r) * ssym / ssxm / df).sqrt();

    Some(LinearFit {
        slope,
        intercept,
        r_value: r,
        p_value,
        std_err,
    })
}
