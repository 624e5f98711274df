//! Prior transforms from the unit hypercube to physical parameters.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erf_inv;

/// Maps a point of the unit hypercube onto the prior.
pub trait Prior {
    /// Returns the physical parameters for hypercube coordinates `cube`.
    fn transform(&self, cube: &[f64]) -> Vec<f64>;
}

impl<F> Prior for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn transform(&self, cube: &[f64]) -> Vec<f64> {
        self(cube)
    }
}

/// Uniform prior on `[-scale, scale]` in every dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    /// Half-width of the prior.
    pub scale: f64,
}

impl Prior for Uniform {
    fn transform(&self, cube: &[f64]) -> Vec<f64> {
        cube.iter()
            .map(|u| (u * 2.0 * self.scale) - self.scale)
            .collect()
    }
}

/// Spherically symmetric Gaussian prior centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// Standard deviation in every dimension.
    pub scale: f64,
}

impl Prior for Gaussian {
    fn transform(&self, cube: &[f64]) -> Vec<f64> {
        cube.iter()
            .map(|u| erf_inv(u * 2.0 - 1.0) * self.scale * SQRT_2)
            .collect()
    }
}
