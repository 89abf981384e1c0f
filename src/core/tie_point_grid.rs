use crate::core::angular::AngularGrids;
use crate::types::{Discontinuity, GridGeometry, TpgError, TpgResult};
use once_cell::sync::OnceCell;
use std::fmt;

/// Precomputed cell origin and weights for a scene coordinate
///
/// Grids sharing the same geometry (latitude/longitude, sun/view angles) can
/// reuse one lookup via [`TiePointGrid::value_for_input`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpInput {
    pub wi: f64,
    pub wj: f64,
    pub i0: usize,
    pub j0: usize,
}

/// Sparse grid of samples placed at regular intervals inside a scene raster
pub struct TiePointGrid {
    pub(crate) name: String,
    pub(crate) unit: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) geometry: GridGeometry,
    pub(crate) tie_points: Vec<f32>,
    pub(crate) discontinuity: Discontinuity,
    pub(crate) angular: OnceCell<Box<AngularGrids>>,
    pub(crate) quadratic_coeffs: OnceCell<Vec<[f64; 3]>>,
    pub(crate) biquadratic_coeffs: OnceCell<[f64; 6]>,
}

impl TiePointGrid {
    /// Create a grid holding a plain (non-angular) quantity
    pub fn new(name: impl Into<String>, geometry: GridGeometry, tie_points: Vec<f32>) -> TpgResult<Self> {
        Self::with_discontinuity(name, geometry, tie_points, Discontinuity::None)
    }

    /// Create a grid with an explicit discontinuity mode
    pub fn with_discontinuity(
        name: impl Into<String>,
        geometry: GridGeometry,
        tie_points: Vec<f32>,
        discontinuity: Discontinuity,
    ) -> TpgResult<Self> {
        geometry.validate(tie_points.len())?;

        Ok(Self {
            name: name.into(),
            unit: None,
            description: None,
            geometry,
            tie_points,
            discontinuity,
            angular: OnceCell::new(),
            quadratic_coeffs: OnceCell::new(),
            biquadratic_coeffs: OnceCell::new(),
        })
    }

    /// Grid whose geometry was already validated by its parent
    pub(crate) fn derived(name: String, geometry: GridGeometry, tie_points: Vec<f32>) -> Self {
        debug_assert_eq!(tie_points.len(), geometry.sample_count());
        Self {
            name,
            unit: None,
            description: None,
            geometry,
            tie_points,
            discontinuity: Discontinuity::None,
            angular: OnceCell::new(),
            quadratic_coeffs: OnceCell::new(),
            biquadratic_coeffs: OnceCell::new(),
        }
    }

    /// Create a grid, inferring the wrap point from the samples if they are angles
    pub fn with_angles(
        name: impl Into<String>,
        geometry: GridGeometry,
        tie_points: Vec<f32>,
        contains_angles: bool,
    ) -> TpgResult<Self> {
        let discontinuity = if contains_angles {
            Discontinuity::infer(&tie_points)
        } else {
            Discontinuity::None
        };
        Self::with_discontinuity(name, geometry, tie_points, discontinuity)
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Number of tie points per row
    pub fn width(&self) -> usize {
        self.geometry.width
    }

    /// Number of tie point rows
    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn offset_x(&self) -> f64 {
        self.geometry.offset_x
    }

    pub fn offset_y(&self) -> f64 {
        self.geometry.offset_y
    }

    pub fn sub_sampling_x(&self) -> f64 {
        self.geometry.sub_sampling_x
    }

    pub fn sub_sampling_y(&self) -> f64 {
        self.geometry.sub_sampling_y
    }

    pub fn scene_width(&self) -> usize {
        self.geometry.scene_width()
    }

    pub fn scene_height(&self) -> usize {
        self.geometry.scene_height()
    }

    /// Raw samples, row-major
    pub fn tie_points(&self) -> &[f32] {
        &self.tie_points
    }

    pub fn discontinuity(&self) -> Discontinuity {
        self.discontinuity
    }

    /// Change the discontinuity mode; cached angular grids are dropped
    pub fn set_discontinuity(&mut self, discontinuity: Discontinuity) {
        if discontinuity != self.discontinuity {
            log::debug!(
                "Discontinuity of '{}' changed: {} -> {}",
                self.name,
                self.discontinuity,
                discontinuity
            );
            self.angular.take();
        }
        self.discontinuity = discontinuity;
    }

    /// Sample at grid column `i`, row `j`
    #[inline]
    pub(crate) fn sample(&self, i: usize, j: usize) -> f64 {
        self.tie_points[i + j * self.geometry.width] as f64
    }

    /// Clamped cell origin and weight along x for a fractional grid column
    #[inline]
    pub(crate) fn column_cell(&self, fi: f64) -> (usize, f64) {
        clamped_cell(fi, self.geometry.width)
    }

    /// Clamped cell origin and weight along y for a fractional grid row
    #[inline]
    pub(crate) fn row_cell(&self, fj: f64) -> (usize, f64) {
        clamped_cell(fj, self.geometry.height)
    }

    /// Bilinear interpolation inside cell `(i0, j0)`
    #[inline]
    pub(crate) fn interpolate(&self, wi: f64, wj: f64, i0: usize, j0: usize) -> f64 {
        let width = self.geometry.width;
        let row0 = j0 * width;
        let row1 = row0 + width;
        interpolate_2d(
            wi,
            wj,
            self.tie_points[row0 + i0] as f64,
            self.tie_points[row0 + i0 + 1] as f64,
            self.tie_points[row1 + i0] as f64,
            self.tie_points[row1 + i0 + 1] as f64,
        )
    }

    /// Bilinear value at scene coordinate `(x, y)`
    ///
    /// Coordinates outside the grid are extrapolated flatly from the nearest
    /// edge. Angular grids are interpolated through their sine and cosine
    /// components.
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        if self.discontinuity.is_angular() {
            let grids = self.angular_grids();
            return grids.combine(grids.sin.value_at(x, y), grids.cos.value_at(x, y), self.discontinuity);
        }

        let input = self.interp_input(x, y);
        self.interpolate(input.wi, input.wj, input.i0, input.j0)
    }

    /// Value at the centre of scene pixel `(px, py)`
    pub fn pixel(&self, px: usize, py: usize) -> f64 {
        self.value_at(px as f64 + 0.5, py as f64 + 0.5)
    }

    pub fn pixel_float(&self, px: usize, py: usize) -> f32 {
        self.pixel(px, py) as f32
    }

    /// Pixel value rounded half away from zero
    pub fn pixel_int(&self, px: usize, py: usize) -> i32 {
        self.pixel(px, py).round() as i32
    }

    /// Locate the grid cell and weights for scene coordinate `(x, y)`
    pub fn interp_input(&self, x: f64, y: f64) -> InterpInput {
        let fi = (x - self.geometry.offset_x) / self.geometry.sub_sampling_x;
        let fj = (y - self.geometry.offset_y) / self.geometry.sub_sampling_y;
        let (i0, wi) = self.column_cell(fi);
        let (j0, wj) = self.row_cell(fj);
        InterpInput { wi, wj, i0, j0 }
    }

    /// Evaluate a precomputed cell lookup
    pub fn value_for_input(&self, input: &InterpInput) -> f64 {
        if self.discontinuity.is_angular() {
            let grids = self.angular_grids();
            return grids.combine(
                grids.sin.value_for_input(input),
                grids.cos.value_for_input(input),
                self.discontinuity,
            );
        }
        self.interpolate(input.wi, input.wj, input.i0, input.j0)
    }

    /// Tie points are read-only; always fails
    pub fn set_pixel(&self, px: usize, py: usize, _value: f64) -> TpgResult<()> {
        log::warn!("Rejected write to pixel ({}, {}) of tie-point grid '{}'", px, py, self.name);
        Err(read_only_error(&self.name))
    }

    /// Tie points are read-only; always fails
    pub fn set_pixels(&self, x: usize, y: usize, width: usize, height: usize, _pixels: &[f64]) -> TpgResult<()> {
        log::warn!(
            "Rejected write to {}x{} block at ({}, {}) of tie-point grid '{}'",
            width,
            height,
            x,
            y,
            self.name
        );
        Err(read_only_error(&self.name))
    }

    /// Copy a rectangle of raw samples, in grid coordinates
    pub fn read_raster_data(&self, x: usize, y: usize, width: usize, height: usize) -> TpgResult<Vec<f32>> {
        let grid_width = self.geometry.width;
        let exceeds = |start: usize, len: usize, limit: usize| start.checked_add(len).map_or(true, |end| end > limit);
        if exceeds(x, width, grid_width) || exceeds(y, height, self.geometry.height) {
            return Err(TpgError::InvalidGeometry(format!(
                "region {}x{} at ({}, {}) exceeds {}x{} grid",
                width, height, x, y, grid_width, self.geometry.height
            )));
        }

        let mut data = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * grid_width + x;
            data.extend_from_slice(&self.tie_points[start..start + width]);
        }
        Ok(data)
    }

    /// Deep copy of samples and geometry without any cached state
    pub fn clone_grid(&self) -> Self {
        Self {
            name: self.name.clone(),
            unit: self.unit.clone(),
            description: self.description.clone(),
            geometry: self.geometry,
            tie_points: self.tie_points.clone(),
            discontinuity: self.discontinuity,
            angular: OnceCell::new(),
            quadratic_coeffs: OnceCell::new(),
            biquadratic_coeffs: OnceCell::new(),
        }
    }

    /// Drop angular grids and polynomial coefficients
    pub fn release_caches(&mut self) {
        self.angular.take();
        self.quadratic_coeffs.take();
        self.biquadratic_coeffs.take();
    }

    /// Release the samples together with every cached auxiliary
    pub fn dispose(mut self) {
        log::debug!("Disposing tie-point grid '{}'", self.name);
        self.release_caches();
    }

    #[cfg(test)]
    pub(crate) fn has_angular_cache(&self) -> bool {
        self.angular.get().is_some()
    }
}

impl Clone for TiePointGrid {
    fn clone(&self) -> Self {
        self.clone_grid()
    }
}

impl fmt::Debug for TiePointGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiePointGrid")
            .field("name", &self.name)
            .field("geometry", &self.geometry)
            .field("discontinuity", &self.discontinuity)
            .field("samples", &self.tie_points.len())
            .finish()
    }
}

fn read_only_error(name: &str) -> TpgError {
    TpgError::ReadOnlyViolation(format!("pixels are read-only in tie-point grid '{}'", name))
}

/// Clamp a fractional grid index into `[0, n - 1]` and split it into the
/// origin of its cell (at most `n - 2`) and the weight inside that cell.
#[inline]
pub(crate) fn clamped_cell(f: f64, n: usize) -> (usize, f64) {
    let last = (n - 1) as f64;
    let f = if f.is_nan() { 0.0 } else { f.clamp(0.0, last) };
    let origin = (f.floor() as usize).min(n - 2);
    (origin, f - origin as f64)
}

#[inline]
pub(crate) fn interpolate_2d(wi: f64, wj: f64, v00: f64, v10: f64, v01: f64, v11: f64) -> f64 {
    v00 + wi * (v10 - v00) + wj * (v01 - v00) + wi * wj * (v11 + v00 - v01 - v10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InterpolationMode;
    use approx::assert_abs_diff_eq;

    fn ramp_grid() -> TiePointGrid {
        // value = 10 * column + 100 * row
        let samples = vec![0.0, 10.0, 20.0, 100.0, 110.0, 120.0, 200.0, 210.0, 220.0];
        TiePointGrid::new("ramp", GridGeometry::new(3, 3, 0.5, 0.5, 4.0, 4.0), samples).unwrap()
    }

    #[test]
    fn test_construction_rejects_bad_geometry() {
        let geometry = GridGeometry::new(3, 3, 0.5, 0.5, 4.0, 4.0);
        let err = TiePointGrid::new("bad", geometry, vec![0.0; 8]).unwrap_err();
        assert!(matches!(err, TpgError::InvalidGeometry(_)));

        let geometry = GridGeometry::new(3, 3, 0.5, 0.5, 0.0, 4.0);
        assert!(TiePointGrid::new("bad", geometry, vec![0.0; 9]).is_err());
    }

    #[test]
    fn test_accessors() {
        let grid = ramp_grid().with_unit("deg").with_description("ramp");
        assert_eq!(grid.name(), "ramp");
        assert_eq!(grid.unit(), Some("deg"));
        assert_eq!(grid.description(), Some("ramp"));
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.scene_width(), 9);
        assert_eq!(grid.scene_height(), 9);
        assert_eq!(grid.discontinuity(), Discontinuity::None);
    }

    #[test]
    fn test_value_at_nodes() {
        let grid = ramp_grid();
        for j in 0..3 {
            for i in 0..3 {
                let x = 0.5 + i as f64 * 4.0;
                let y = 0.5 + j as f64 * 4.0;
                assert_abs_diff_eq!(grid.value_at(x, y), grid.sample(i, j), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_value_at_between_nodes() {
        let grid = ramp_grid();
        // a quarter of the way into cell (0, 0) in both directions
        assert_abs_diff_eq!(grid.value_at(1.5, 1.5), 2.5 + 25.0, epsilon = 1e-9);
        // centre of cell (1, 1)
        assert_abs_diff_eq!(grid.value_at(6.5, 6.5), 165.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.pixel(6, 6), 165.0, epsilon = 1e-9);
        assert_eq!(grid.pixel_int(6, 6), 165);
        assert_eq!(grid.pixel_float(6, 6), 165.0f32);
    }

    #[test]
    fn test_flat_extrapolation() {
        let grid = ramp_grid();
        assert_abs_diff_eq!(grid.value_at(-5.0, 0.5), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.value_at(50.0, 50.0), 220.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.value_at(-5.0, 4.5), grid.value_at(0.5, 4.5), epsilon = 1e-9);
    }

    #[test]
    fn test_interp_input_reuse() {
        let grid = ramp_grid();
        let input = grid.interp_input(7.5, 2.5);
        assert_eq!(input.i0, 1);
        assert_eq!(input.j0, 0);
        assert_abs_diff_eq!(grid.value_for_input(&input), grid.value_at(7.5, 2.5), epsilon = 1e-12);
    }

    #[test]
    fn test_clamped_cell() {
        assert_eq!(clamped_cell(-3.0, 4), (0, 0.0));
        assert_eq!(clamped_cell(1.25, 4), (1, 0.25));
        assert_eq!(clamped_cell(3.0, 4), (2, 1.0));
        assert_eq!(clamped_cell(9.0, 4), (2, 1.0));
        assert_eq!(clamped_cell(f64::NAN, 4), (0, 0.0));
    }

    #[test]
    fn test_writes_are_rejected() {
        let grid = ramp_grid();
        let before = grid.tie_points().to_vec();

        assert!(matches!(grid.set_pixel(1, 1, 5.0), Err(TpgError::ReadOnlyViolation(_))));
        assert!(matches!(
            grid.set_pixels(0, 0, 2, 2, &[1.0; 4]),
            Err(TpgError::ReadOnlyViolation(_))
        ));
        assert_eq!(grid.tie_points(), before.as_slice());
    }

    #[test]
    fn test_read_raster_data() {
        let grid = ramp_grid();
        assert_eq!(grid.read_raster_data(1, 1, 2, 2).unwrap(), vec![110.0f32, 120.0, 210.0, 220.0]);
        assert!(grid.read_raster_data(2, 0, 2, 1).is_err());
    }

    #[test]
    fn test_read_raster_data_rejects_overflowing_region() {
        let grid = ramp_grid();
        assert!(matches!(
            grid.read_raster_data(usize::MAX, 0, 2, 1),
            Err(TpgError::InvalidGeometry(_))
        ));
        assert!(matches!(
            grid.read_raster_data(0, 1, 1, usize::MAX),
            Err(TpgError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_release_caches_keeps_values() {
        let mut grid = ramp_grid();
        grid.set_discontinuity(Discontinuity::At360);
        let angle = grid.value_at(3.0, 5.0);
        let quadratic = grid.value_at_mode(3.0, 5.0, InterpolationMode::Quadratic).unwrap();
        let biquadratic = grid.value_at_mode(3.0, 5.0, InterpolationMode::Biquadratic).unwrap();
        assert!(grid.has_angular_cache());
        assert!(grid.quadratic_coeffs.get().is_some());
        assert!(grid.biquadratic_coeffs.get().is_some());

        grid.release_caches();
        assert!(!grid.has_angular_cache());
        assert!(grid.quadratic_coeffs.get().is_none());
        assert!(grid.biquadratic_coeffs.get().is_none());

        assert_abs_diff_eq!(grid.value_at(3.0, 5.0), angle, epsilon = 1e-12);
        assert_abs_diff_eq!(
            grid.value_at_mode(3.0, 5.0, InterpolationMode::Quadratic).unwrap(),
            quadratic,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            grid.value_at_mode(3.0, 5.0, InterpolationMode::Biquadratic).unwrap(),
            biquadratic,
            epsilon = 1e-9
        );

        grid.dispose();
    }

    #[test]
    fn test_clone_is_independent() {
        let mut grid = ramp_grid();
        grid.set_discontinuity(Discontinuity::At360);
        let _ = grid.value_at(1.0, 1.0);
        assert!(grid.has_angular_cache());

        let copy = grid.clone_grid();
        assert!(!copy.has_angular_cache());
        assert_eq!(copy.tie_points(), grid.tie_points());
        assert_eq!(copy.discontinuity(), Discontinuity::At360);
        assert_eq!(copy.geometry(), grid.geometry());
    }

    #[test]
    fn test_set_discontinuity_drops_angular_cache() {
        let mut grid = ramp_grid();
        grid.set_discontinuity(Discontinuity::At180);
        let _ = grid.value_at(2.0, 2.0);
        assert!(grid.has_angular_cache());

        grid.set_discontinuity(Discontinuity::At360);
        assert!(!grid.has_angular_cache());
    }
}
