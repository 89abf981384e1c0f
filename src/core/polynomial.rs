//! Least-squares polynomial interpolation modes.
//!
//! `Quadratic` fits `a0 + a1*x + a2*x^2` to every grid row, `Biquadratic` fits
//! `a0 + a1*x + a2*y + a3*x^2 + a4*x*y + a5*y^2` to the whole grid. Both use
//! absolute scene coordinates of the tie points, so the coefficients can be
//! evaluated directly at query coordinates.

use crate::core::tie_point_grid::TiePointGrid;
use crate::types::{InterpolationMode, TpgError, TpgResult};
use nalgebra::{DMatrix, DVector};

/// Solve `design * coeffs ≈ values` in the least-squares sense
///
/// Columns are scaled to unit norm before the SVD so that the `1`, `x` and
/// `x^2` terms of large scenes stay comparable; the scaling is undone on the
/// returned coefficients.
pub fn least_squares(design: &DMatrix<f64>, values: &DVector<f64>) -> TpgResult<DVector<f64>> {
    if design.nrows() != values.len() {
        return Err(TpgError::FitFailed(format!(
            "design matrix has {} rows but {} values were given",
            design.nrows(),
            values.len()
        )));
    }

    let scales: Vec<f64> = design
        .column_iter()
        .map(|column| {
            let norm = column.norm();
            if norm > 0.0 {
                norm
            } else {
                1.0
            }
        })
        .collect();

    let mut scaled = design.clone();
    for (mut column, &scale) in scaled.column_iter_mut().zip(scales.iter()) {
        column /= scale;
    }

    let svd = scaled.svd(true, true);
    let sigma_max = svd.singular_values.iter().cloned().fold(0.0f64, f64::max);
    if !sigma_max.is_finite() || sigma_max == 0.0 {
        return Err(TpgError::FitFailed("design matrix is degenerate".to_string()));
    }
    let eps = sigma_max * (design.nrows().max(design.ncols()) as f64) * f64::EPSILON;

    let solution = svd
        .solve(values, eps)
        .map_err(|e| TpgError::FitFailed(e.to_string()))?;

    Ok(DVector::from_iterator(
        solution.len(),
        solution.iter().zip(scales.iter()).map(|(c, s)| c / s),
    ))
}

#[inline]
fn eval_quadratic(coeffs: &[f64; 3], x: f64) -> f64 {
    coeffs[0] + coeffs[1] * x + coeffs[2] * x * x
}

#[inline]
fn eval_biquadratic(coeffs: &[f64; 6], x: f64, y: f64) -> f64 {
    coeffs[0] + coeffs[1] * x + coeffs[2] * y + coeffs[3] * x * x + coeffs[4] * x * y + coeffs[5] * y * y
}

impl TiePointGrid {
    /// Scene x of grid column `c`
    #[inline]
    fn column_x(&self, c: usize) -> f64 {
        self.geometry.offset_x + c as f64 * self.geometry.sub_sampling_x
    }

    /// Scene y of grid row `r`
    #[inline]
    fn row_y(&self, r: usize) -> f64 {
        self.geometry.offset_y + r as f64 * self.geometry.sub_sampling_y
    }

    fn fit_quadratic_rows(&self) -> TpgResult<Vec<[f64; 3]>> {
        let width = self.geometry.width;
        let height = self.geometry.height;
        log::debug!("Fitting quadratic coefficients for {} rows of '{}'", height, self.name);

        let design = DMatrix::from_fn(width, 3, |c, k| self.column_x(c).powi(k as i32));

        let mut coeffs = Vec::with_capacity(height);
        for r in 0..height {
            let values = DVector::from_fn(width, |c, _| self.sample(c, r));
            let solution = least_squares(&design, &values)?;
            coeffs.push([solution[0], solution[1], solution[2]]);
        }
        Ok(coeffs)
    }

    fn fit_biquadratic(&self) -> TpgResult<[f64; 6]> {
        let width = self.geometry.width;
        let n = self.geometry.sample_count();
        log::debug!("Fitting biquadratic surface over {} samples of '{}'", n, self.name);

        let design = DMatrix::from_fn(n, 6, |k, term| {
            let x = self.column_x(k % width);
            let y = self.row_y(k / width);
            match term {
                0 => 1.0,
                1 => x,
                2 => y,
                3 => x * x,
                4 => x * y,
                _ => y * y,
            }
        });
        let values = DVector::from_iterator(n, self.tie_points.iter().map(|&v| v as f64));

        let solution = least_squares(&design, &values)?;
        Ok([solution[0], solution[1], solution[2], solution[3], solution[4], solution[5]])
    }

    /// Per-row quadratic coefficients, fitted on first use
    pub fn quadratic_coefficients(&self) -> TpgResult<&[[f64; 3]]> {
        self.quadratic_coeffs
            .get_or_try_init(|| self.fit_quadratic_rows())
            .map(|coeffs| coeffs.as_slice())
    }

    /// Whole-grid biquadratic coefficients, fitted on first use
    pub fn biquadratic_coefficients(&self) -> TpgResult<&[f64; 6]> {
        self.biquadratic_coeffs.get_or_try_init(|| self.fit_biquadratic())
    }

    /// Value at scene coordinate `(x, y)` using the given interpolation mode
    ///
    /// `Quadratic` does not interpolate between rows: the row at or above `y`
    /// (clamped to the grid) is evaluated at `x`.
    pub fn value_at_mode(&self, x: f64, y: f64, mode: InterpolationMode) -> TpgResult<f64> {
        match mode {
            InterpolationMode::Bilinear => Ok(self.value_at(x, y)),
            InterpolationMode::Quadratic => {
                let coeffs = self.quadratic_coefficients()?;
                let row = self.quadratic_row(y);
                Ok(eval_quadratic(&coeffs[row], x))
            }
            InterpolationMode::Biquadratic => {
                let coeffs = self.biquadratic_coefficients()?;
                Ok(eval_biquadratic(coeffs, x, y))
            }
        }
    }

    /// Value at scene coordinate `(x, y)` for a mode given by name
    pub fn value_at_named(&self, x: f64, y: f64, mode: &str) -> TpgResult<f64> {
        self.value_at_mode(x, y, mode.parse()?)
    }

    fn quadratic_row(&self, y: f64) -> usize {
        let fj = ((y - self.geometry.offset_y) / self.geometry.sub_sampling_y).floor();
        if fj.is_nan() || fj <= 0.0 {
            0
        } else {
            (fj as usize).min(self.geometry.height - 1)
        }
    }
}
