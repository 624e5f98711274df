//! Test likelihoods used to exercise dynamic nested sampling.

use std::f64::consts::PI;

use dyns_core::log_sum_exp;

/// Log-likelihood function over a physical parameter vector.
pub trait Likelihood {
    /// Returns `ln L(theta)`.
    fn log_likelihood(&self, theta: &[f64]) -> f64;
}

impl<F> Likelihood for F
where
    F: Fn(&[f64]) -> f64,
{
    fn log_likelihood(&self, theta: &[f64]) -> f64 {
        self(theta)
    }
}

/// Normalised spherically symmetric Gaussian centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// Standard deviation in every dimension.
    pub sigma: f64,
}

impl Default for Gaussian {
    fn default() -> Self {
        Self { sigma: 0.5 }
    }
}

impl Likelihood for Gaussian {
    fn log_likelihood(&self, theta: &[f64]) -> f64 {
        gaussian_logl(theta, self.sigma)
    }
}

fn gaussian_logl(theta: &[f64], sigma: f64) -> f64 {
    let dim = theta.len() as f64;
    let r2: f64 = theta.iter().map(|th| th * th).sum();
    -r2 / (2.0 * sigma * sigma) - (2.0 * PI * sigma * sigma).ln() * dim / 2.0
}

/// Gaussian shell of radius `rshell` (unnormalised).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianShell {
    /// Width of the shell.
    pub sigma: f64,
    /// Radius of the shell.
    pub rshell: f64,
}

impl Default for GaussianShell {
    fn default() -> Self {
        Self {
            sigma: 0.2,
            rshell: 2.0,
        }
    }
}

impl Likelihood for GaussianShell {
    fn log_likelihood(&self, theta: &[f64]) -> f64 {
        let r = theta.iter().map(|th| th * th).sum::<f64>().sqrt();
        -((r - self.rshell).powi(2)) / (2.0 * self.sigma * self.sigma)
    }
}

/// Weighted mixture of four Gaussians placed around the origin in the first
/// two dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMix {
    /// Width of every component.
    pub sigma: f64,
    /// Component weights (normalised on use).
    pub weights: Vec<f64>,
    /// Component centres in the first two dimensions.
    pub positions: Vec<[f64; 2]>,
}

impl Default for GaussianMix {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            weights: vec![0.4, 0.3, 0.2, 0.1],
            positions: vec![[0.0, 0.0], [0.0, 4.0], [0.0, -4.0], [4.0, 0.0]],
        }
    }
}

impl Likelihood for GaussianMix {
    fn log_likelihood(&self, theta: &[f64]) -> f64 {
        let total: f64 = self.weights.iter().sum();
        let terms: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.positions)
            .map(|(weight, centre)| {
                let shifted: Vec<f64> = theta
                    .iter()
                    .enumerate()
                    .map(|(dim, th)| th - centre.get(dim).copied().unwrap_or(0.0))
                    .collect();
                (weight / total).ln() + gaussian_logl(&shifted, self.sigma)
            })
            .collect();
        log_sum_exp(&terms)
    }
}

/// Negative Rastrigin function, maximal (zero) at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rastrigin {
    /// Amplitude of the cosine modulation.
    pub a: f64,
}

impl Default for Rastrigin {
    fn default() -> Self {
        Self { a: 10.0 }
    }
}

impl Likelihood for Rastrigin {
    fn log_likelihood(&self, theta: &[f64]) -> f64 {
        let ftheta: f64 = theta
            .iter()
            .map(|th| th * th - self.a * (2.0 * PI * th).cos())
            .sum();
        -(self.a * theta.len() as f64 + ftheta)
    }
}

/// Negative Rosenbrock function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rosenbrock {
    /// Location parameter of the valley.
    pub a: f64,
    /// Curvature of the valley walls.
    pub b: f64,
}

impl Default for Rosenbrock {
    fn default() -> Self {
        Self { a: 1.0, b: 100.0 }
    }
}

impl Likelihood for Rosenbrock {
    fn log_likelihood(&self, theta: &[f64]) -> f64 {
        let ftheta: f64 = theta
            .windows(2)
            .map(|pair| (self.a - pair[0]).powi(2) + self.b * (pair[1] - pair[0].powi(2)).powi(2))
            .sum();
        -ftheta
    }
}
