use dyns_core::errors::ErrorInfo;
use dyns_core::DynError;
use nalgebra::{DMatrix, DVector};

/// Noise filter applied to a raw importance curve before allocation.
pub trait Smoother {
    /// Returns a curve of the same length as `values`.
    fn smooth(&self, values: &[f64]) -> Vec<f64>;
}

impl<F> Smoother for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn smooth(&self, values: &[f64]) -> Vec<f64> {
        self(values)
    }
}

/// Identity filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSmoothing;

impl Smoother for NoSmoothing {
    fn smooth(&self, values: &[f64]) -> Vec<f64> {
        values.to_vec()
    }
}

/// Savitzky-Golay local polynomial filter with "nearest" edge handling.
///
/// Each output is the value at the window centre of the least-squares
/// polynomial fitted to the `window` surrounding inputs; inputs beyond the
/// ends of the curve repeat the edge value.
#[derive(Debug, Clone, PartialEq)]
pub struct SavitzkyGolay {
    window: usize,
    polyorder: usize,
    coefficients: Vec<f64>,
}

impl SavitzkyGolay {
    /// Creates a filter; `window` must be odd and larger than `polyorder`.
    pub fn new(window: usize, polyorder: usize) -> Result<Self, DynError> {
        if window % 2 == 0 || window <= polyorder {
            return Err(DynError::Usage(
                ErrorInfo::new(
                    "savgol-window",
                    "window length must be odd and exceed the polynomial order",
                )
                .with_context("window", window.to_string())
                .with_context("polyorder", polyorder.to_string()),
            ));
        }
        let coefficients = savgol_coefficients(window, polyorder)?;
        Ok(Self {
            window,
            polyorder,
            coefficients,
        })
    }

    /// Default filter for an exploratory run with `ninit` live points:
    /// window `2 * ninit + 1`, cubic fit.
    pub fn for_ninit(ninit: usize) -> Result<Self, DynError> {
        let window = 2 * ninit.max(1) + 1;
        Self::new(window, 3.min(window - 1))
    }

    /// Window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Order of the fitted polynomial.
    pub fn polyorder(&self) -> usize {
        self.polyorder
    }

    /// Convolution weights, centre at index `window / 2`.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Smoother for SavitzkyGolay {
    fn smooth(&self, values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let half = (self.window / 2) as isize;
        let last = values.len() as isize - 1;
        (0..values.len() as isize)
            .map(|centre| {
                self.coefficients
                    .iter()
                    .enumerate()
                    .map(|(offset, coeff)| {
                        let idx = (centre + offset as isize - half).clamp(0, last);
                        coeff * values[idx as usize]
                    })
                    .sum()
            })
            .collect()
    }
}

fn savgol_coefficients(window: usize, polyorder: usize) -> Result<Vec<f64>, DynError> {
    let half = (window / 2) as f64;
    // Positions are scaled to [-1, 1]; the centre value of the fit does not
    // depend on the scale and the system stays well conditioned.
    let positions: Vec<f64> = (0..window)
        .map(|j| if half == 0.0 { 0.0 } else { (j as f64 - half) / half })
        .collect();
    let terms = polyorder + 1;
    // Row k holds x^k; the minimum-norm solution of `vander * c = e_0` is the
    // row of the least-squares pseudo-inverse that evaluates the fit at x = 0.
    let vander = DMatrix::<f64>::from_fn(terms, window, |power, col| {
        positions[col].powi(power as i32)
    });
    let unit = DVector::<f64>::from_fn(terms, |row, _| if row == 0 { 1.0 } else { 0.0 });
    let singular = |reason: &str| {
        DynError::Usage(
            ErrorInfo::new("savgol-singular", "least-squares system is singular")
                .with_context("window", window.to_string())
                .with_context("polyorder", polyorder.to_string())
                .with_context("reason", reason.to_string()),
        )
    };
    let svd = vander.svd(true, true);
    if svd.rank(1e-12) < terms {
        return Err(singular("rank deficient"));
    }
    let coefficients = svd.solve(&unit, 1e-12).map_err(singular)?;
    Ok(coefficients.iter().copied().collect())
}
