use crate::core::tie_point_grid::TiePointGrid;
use crate::types::{Discontinuity, GridGeometry, SubsetRegion, TpgError, TpgResult};

const PIXEL_CENTER: f64 = 0.5;

/// First kept tie point and number of kept tie points along one axis
///
/// `t0` is the position of source tie point 0 in subset pixel coordinates and
/// `spacing` the subset tie point spacing. The last tie point at or before the
/// subset origin is kept, plus enough points to reach one point past
/// `extent`, clipped to the `available` source points.
fn axis_window(t0: f64, spacing: f64, extent: f64, available: usize) -> (usize, usize) {
    let skipped = (-t0 / spacing).floor();
    let first = if skipped > 0.0 {
        (skipped as usize).min(available - 2)
    } else {
        0
    };
    let offset = t0 + first as f64 * spacing;

    let needed = (((extent - offset) / spacing).ceil().max(0.0) as usize).saturating_add(2);
    let count = needed.clamp(2, available - first);
    (first, count)
}

impl TiePointGrid {
    /// Tie-point grid for a rectangular scene subset at a decimation step
    ///
    /// The new grid gives the same values at corresponding scene coordinates:
    /// subset pixel `(u, v)` maps to source pixel
    /// `(region.x + u * step_x, region.y + v * step_y)`. `None` takes the
    /// whole scene.
    pub fn create_subset(
        &self,
        region: Option<SubsetRegion>,
        step_x: usize,
        step_y: usize,
    ) -> TpgResult<TiePointGrid> {
        if step_x == 0 || step_y == 0 {
            return Err(TpgError::InvalidGeometry(format!(
                "subset steps must be at least 1, got ({}, {})",
                step_x, step_y
            )));
        }
        let region = region.unwrap_or_else(|| SubsetRegion::new(0, 0, self.scene_width(), self.scene_height()));
        if region.width == 0 || region.height == 0 {
            return Err(TpgError::InvalidGeometry(format!(
                "subset region {}x{} is empty",
                region.width, region.height
            )));
        }

        let src = &self.geometry;
        let spacing_x = src.sub_sampling_x / step_x as f64;
        let spacing_y = src.sub_sampling_y / step_y as f64;
        let t0_x = (src.offset_x - PIXEL_CENTER - region.x as f64) / step_x as f64 + PIXEL_CENTER;
        let t0_y = (src.offset_y - PIXEL_CENTER - region.y as f64) / step_y as f64 + PIXEL_CENTER;
        let extent_x = region.width.div_ceil(step_x) as f64;
        let extent_y = region.height.div_ceil(step_y) as f64;

        let (first_x, width) = axis_window(t0_x, spacing_x, extent_x, src.width);
        let (first_y, height) = axis_window(t0_y, spacing_y, extent_y, src.height);

        let tie_points = self.read_raster_data(first_x, first_y, width, height)?;
        let geometry = GridGeometry::new(
            width,
            height,
            t0_x + first_x as f64 * spacing_x,
            t0_y + first_y as f64 * spacing_y,
            spacing_x,
            spacing_y,
        );

        log::info!(
            "Created subset of '{}': {}x{} tie points from ({}, {}), region {:?}, step {}x{}",
            self.name,
            width,
            height,
            first_x,
            first_y,
            region,
            step_x,
            step_y
        );

        let mut subset = TiePointGrid::with_discontinuity(self.name.clone(), geometry, tie_points, self.discontinuity)?;
        subset.unit = self.unit.clone();
        subset.description = self.description.clone();
        Ok(subset)
    }

    /// Zenith angle grid (`90° - elevation`) from an elevation angle grid
    pub fn zenith_from_elevation(&self) -> TpgResult<TiePointGrid> {
        let zenith = self.tie_points.iter().map(|&elevation| 90.0 - elevation).collect();
        let mut grid =
            TiePointGrid::with_discontinuity(self.name.clone(), self.geometry, zenith, Discontinuity::None)?;
        grid.unit = self.unit.clone();
        grid.description = self.description.clone();
        Ok(grid)
    }
}
