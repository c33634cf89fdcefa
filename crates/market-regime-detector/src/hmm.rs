//! Gaussian hidden Markov model with full covariance, fitted by Baum-Welch.
//!
//! Features are standardized per column before fitting so that a single
//! covariance floor works across features of very different scale.
//! Initialization is deterministic: rows are sorted on the first feature and
//! split into contiguous chunks whose means seed the states.

use nalgebra::{Cholesky, Matrix3, Vector3};
use signal_core::SignalError;

use crate::features::FEATURE_COUNT;
use crate::{RegimeModel, StateFit};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianHmm {
    pub n_iter: usize,
    /// Stop when the log-likelihood gain drops below this
    pub tol: f64,
    /// Added to every covariance diagonal
    pub min_covar: f64,
}

impl Default for GaussianHmm {
    fn default() -> Self {
        Self {
            n_iter: 200,
            tol: 1e-2,
            min_covar: 1e-3,
        }
    }
}

/// Fitted parameters in standardized feature space.
#[derive(Debug, Clone)]
pub struct HmmParams {
    pub start: Vec<f64>,
    pub transition: Vec<Vec<f64>>,
    pub means: Vec<Vector3<f64>>,
    pub covars: Vec<Matrix3<f64>>,
    /// Log-likelihood after each E-step
    pub log_likelihoods: Vec<f64>,
}

struct Posteriors {
    gamma: Vec<Vec<f64>>,
    xi_sum: Vec<Vec<f64>>,
    log_likelihood: f64,
}

impl GaussianHmm {
    /// Fit `n_states` states to the observations with Baum-Welch.
    pub fn fit_params(
        &self,
        observations: &[[f64; FEATURE_COUNT]],
        n_states: usize,
    ) -> Result<(HmmParams, Vec<Vector3<f64>>), SignalError> {
        if n_states == 0 || observations.len() < n_states * 2 {
            return Err(SignalError::InsufficientData(format!(
                "{} observations for {} hidden states",
                observations.len(),
                n_states
            )));
        }

        let xs = standardize(observations);
        let mut params = self.initial_params(&xs, n_states);

        for iteration in 0..self.n_iter {
            let emissions = self.log_emissions(&xs, &params)?;
            let post = forward_backward(&params, &emissions)?;
            let ll = post.log_likelihood;
            let converged = params
                .log_likelihoods
                .last()
                .is_some_and(|prev| (ll - prev).abs() < self.tol);
            params.log_likelihoods.push(ll);
            if converged {
                tracing::debug!(iteration, log_likelihood = ll, "HMM converged");
                break;
            }
            self.maximize(&xs, &post, &mut params);
        }

        Ok((params, xs))
    }

    fn initial_params(&self, xs: &[Vector3<f64>], k: usize) -> HmmParams {
        let n = xs.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| xs[a][0].total_cmp(&xs[b][0]));

        let global_mean = xs.iter().fold(Vector3::zeros(), |acc, x| acc + x) / n as f64;
        let global_cov = xs
            .iter()
            .map(|x| (x - global_mean) * (x - global_mean).transpose())
            .fold(Matrix3::zeros(), |acc, m| acc + m)
            / n as f64
            + Matrix3::identity() * self.min_covar;

        let means = (0..k)
            .map(|s| {
                let chunk = &order[s * n / k..(s + 1) * n / k];
                chunk.iter().fold(Vector3::zeros(), |acc, &i| acc + xs[i]) / chunk.len() as f64
            })
            .collect();

        HmmParams {
            start: vec![1.0 / k as f64; k],
            transition: vec![vec![1.0 / k as f64; k]; k],
            means,
            covars: vec![global_cov; k],
            log_likelihoods: Vec::new(),
        }
    }

    fn log_emissions(
        &self,
        xs: &[Vector3<f64>],
        params: &HmmParams,
    ) -> Result<Vec<Vec<f64>>, SignalError> {
        let factors = params
            .covars
            .iter()
            .map(|c| {
                Cholesky::new(*c).ok_or_else(|| {
                    SignalError::Numerical("covariance is not positive definite".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(xs
            .iter()
            .map(|x| {
                factors
                    .iter()
                    .zip(&params.means)
                    .map(|(chol, mean)| log_pdf(chol, mean, x))
                    .collect()
            })
            .collect())
    }

    fn maximize(&self, xs: &[Vector3<f64>], post: &Posteriors, params: &mut HmmParams) {
        let k = params.start.len();
        params.start = post.gamma[0].clone();

        for i in 0..k {
            let total: f64 = post.xi_sum[i].iter().sum();
            if total > 0.0 {
                params.transition[i] = post.xi_sum[i].iter().map(|v| v / total).collect();
            }
        }

        for s in 0..k {
            let weight: f64 = post.gamma.iter().map(|g| g[s]).sum();
            if weight < 1e-10 {
                continue;
            }
            let mean = xs
                .iter()
                .zip(&post.gamma)
                .fold(Vector3::zeros(), |acc, (x, g)| acc + x * g[s])
                / weight;
            let cov = xs
                .iter()
                .zip(&post.gamma)
                .fold(Matrix3::zeros(), |acc, (x, g)| {
                    let d = x - mean;
                    acc + d * d.transpose() * g[s]
                })
                / weight
                + Matrix3::identity() * self.min_covar;
            params.means[s] = mean;
            params.covars[s] = cov;
        }
    }

    /// Most likely state sequence under the fitted parameters.
    pub fn viterbi(&self, params: &HmmParams, xs: &[Vector3<f64>]) -> Result<Vec<usize>, SignalError> {
        let emissions = self.log_emissions(xs, params)?;
        let k = params.start.len();
        let n = xs.len();
        let ln = |p: f64| if p > 0.0 { p.ln() } else { f64::NEG_INFINITY };

        let mut delta: Vec<f64> = (0..k).map(|s| ln(params.start[s]) + emissions[0][s]).collect();
        let mut backpointers = vec![vec![0usize; k]; n];

        for t in 1..n {
            let mut next = vec![f64::NEG_INFINITY; k];
            for j in 0..k {
                let (best_i, best) = (0..k)
                    .map(|i| (i, delta[i] + ln(params.transition[i][j])))
                    .fold((0, f64::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
                next[j] = best + emissions[t][j];
                backpointers[t][j] = best_i;
            }
            delta = next;
        }

        let mut state = (0..k)
            .fold((0, f64::NEG_INFINITY), |acc, s| if delta[s] > acc.1 { (s, delta[s]) } else { acc })
            .0;
        let mut path = vec![0; n];
        for t in (0..n).rev() {
            path[t] = state;
            state = backpointers[t][state];
        }
        Ok(path)
    }

    /// State posteriors for every row under the fitted parameters.
    pub fn posteriors(&self, params: &HmmParams, xs: &[Vector3<f64>]) -> Result<Vec<Vec<f64>>, SignalError> {
        let emissions = self.log_emissions(xs, params)?;
        Ok(forward_backward(params, &emissions)?.gamma)
    }
}

impl RegimeModel for GaussianHmm {
    fn name(&self) -> &'static str {
        "gaussian_hmm"
    }

    fn fit(&self, observations: &[[f64; FEATURE_COUNT]], n_states: usize) -> Result<StateFit, SignalError> {
        let (params, xs) = self.fit_params(observations, n_states)?;
        let states = self.viterbi(&params, &xs)?;
        let gamma = self.posteriors(&params, &xs)?;
        let last_posterior = gamma.last().cloned().unwrap_or_default();

        Ok(StateFit {
            states,
            last_posterior,
            transition: params.transition,
        })
    }
}

fn standardize(observations: &[[f64; FEATURE_COUNT]]) -> Vec<Vector3<f64>> {
    let n = observations.len() as f64;
    let mut mean = [0.0; FEATURE_COUNT];
    let mut scale = [0.0; FEATURE_COUNT];
    for c in 0..FEATURE_COUNT {
        mean[c] = observations.iter().map(|r| r[c]).sum::<f64>() / n;
        let var = observations.iter().map(|r| (r[c] - mean[c]).powi(2)).sum::<f64>() / n;
        scale[c] = if var > 0.0 { var.sqrt() } else { 1.0 };
    }
    observations
        .iter()
        .map(|r| Vector3::from_fn(|c, _| (r[c] - mean[c]) / scale[c]))
        .collect()
}

fn log_pdf(chol: &Cholesky<f64, nalgebra::U3>, mean: &Vector3<f64>, x: &Vector3<f64>) -> f64 {
    let l = chol.l();
    let diff = x - mean;
    let y = l.solve_lower_triangular(&diff).unwrap_or(diff);
    let log_det: f64 = 2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
    -0.5 * (FEATURE_COUNT as f64 * LN_2PI + log_det + y.norm_squared())
}

/// Scaled forward-backward. Emissions are shifted by their per-row maximum
/// before exponentiation and the shift is added back into the likelihood.
fn forward_backward(params: &HmmParams, log_emissions: &[Vec<f64>]) -> Result<Posteriors, SignalError> {
    let k = params.start.len();
    let n = log_emissions.len();

    let mut shifts = Vec::with_capacity(n);
    let emissions: Vec<Vec<f64>> = log_emissions
        .iter()
        .map(|row| {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            shifts.push(max);
            row.iter().map(|v| (v - max).exp()).collect()
        })
        .collect();

    let mut alpha = vec![vec![0.0; k]; n];
    let mut scales = vec![0.0; n];
    for t in 0..n {
        for j in 0..k {
            let prior = if t == 0 {
                params.start[j]
            } else {
                (0..k).map(|i| alpha[t - 1][i] * params.transition[i][j]).sum()
            };
            alpha[t][j] = prior * emissions[t][j];
        }
        let c: f64 = alpha[t].iter().sum();
        if !(c > 0.0 && c.is_finite()) {
            return Err(SignalError::Numerical(format!("forward pass underflow at row {}", t)));
        }
        scales[t] = c;
        alpha[t].iter_mut().for_each(|a| *a /= c);
    }

    let mut beta = vec![vec![1.0; k]; n];
    for t in (0..n.saturating_sub(1)).rev() {
        for i in 0..k {
            beta[t][i] = (0..k)
                .map(|j| params.transition[i][j] * emissions[t + 1][j] * beta[t + 1][j])
                .sum::<f64>()
                / scales[t + 1];
        }
    }

    let gamma: Vec<Vec<f64>> = (0..n)
        .map(|t| {
            let row: Vec<f64> = (0..k).map(|s| alpha[t][s] * beta[t][s]).collect();
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.into_iter().map(|v| v / total).collect()
            } else {
                vec![1.0 / k as f64; k]
            }
        })
        .collect();

    let mut xi_sum = vec![vec![0.0; k]; k];
    for t in 0..n.saturating_sub(1) {
        for i in 0..k {
            for j in 0..k {
                xi_sum[i][j] += alpha[t][i] * params.transition[i][j] * emissions[t + 1][j] * beta[t + 1][j]
                    / scales[t + 1];
            }
        }
    }

    let log_likelihood = scales.iter().map(|c| c.ln()).sum::<f64>() + shifts.iter().sum::<f64>();

    Ok(Posteriors {
        gamma,
        xi_sum,
        log_likelihood,
    })
}
