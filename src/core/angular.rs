//! Sine/cosine decomposition for angular tie-point grids.
//!
//! Averaging 359° and 1° directly gives 180°. Interpolating the sine and
//! cosine of the angle instead and recombining with `atan2` gives 0°.

use crate::core::tie_point_grid::TiePointGrid;
use crate::types::Discontinuity;

/// Sine and cosine component grids of an angular grid
#[derive(Debug)]
pub struct AngularGrids {
    pub sin: TiePointGrid,
    pub cos: TiePointGrid,
}

impl AngularGrids {
    /// Build the component grids from angle samples given in degrees
    pub fn build(base: &TiePointGrid) -> Self {
        log::debug!(
            "Building sin/cos grids for '{}' ({}x{})",
            base.name,
            base.geometry.width,
            base.geometry.height
        );

        let (sin_points, cos_points): (Vec<f32>, Vec<f32>) = base
            .tie_points
            .iter()
            .map(|&angle| {
                let (sin, cos) = (angle as f64).to_radians().sin_cos();
                (sin as f32, cos as f32)
            })
            .unzip();

        Self {
            sin: TiePointGrid::derived(base.name.clone(), base.geometry, sin_points),
            cos: TiePointGrid::derived(base.name.clone(), base.geometry, cos_points),
        }
    }

    /// Recombine interpolated components into an angle in degrees
    #[inline]
    pub fn combine(&self, sin: f64, cos: f64, discontinuity: Discontinuity) -> f64 {
        combine_angle(sin, cos, discontinuity)
    }
}

/// `atan2` in degrees, shifted into [0, 360) for `At360` grids
#[inline]
pub fn combine_angle(sin: f64, cos: f64, discontinuity: Discontinuity) -> f64 {
    let angle = sin.atan2(cos).to_degrees();
    if angle < 0.0 && discontinuity == Discontinuity::At360 {
        angle + 360.0
    } else {
        angle
    }
}

impl TiePointGrid {
    /// Component grids, built on first use
    pub(crate) fn angular_grids(&self) -> &AngularGrids {
        self.angular.get_or_init(|| Box::new(AngularGrids::build(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridGeometry;
    use approx::assert_abs_diff_eq;

    fn azimuth_grid(samples: Vec<f32>, discontinuity: Discontinuity) -> TiePointGrid {
        TiePointGrid::with_discontinuity(
            "azimuth",
            GridGeometry::new(2, 2, 0.5, 0.5, 10.0, 10.0),
            samples,
            discontinuity,
        )
        .unwrap()
    }

    fn wrap_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn test_combine_angle_ranges() {
        let (s, c) = (-90.0f64).to_radians().sin_cos();
        assert_abs_diff_eq!(combine_angle(s, c, Discontinuity::At180), -90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(combine_angle(s, c, Discontinuity::At360), 270.0, epsilon = 1e-9);
        assert_abs_diff_eq!(combine_angle(0.0, -1.0, Discontinuity::At180), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wraparound_at_360() {
        let grid = azimuth_grid(vec![358.0, 2.0, 358.0, 2.0], Discontinuity::At360);
        let mid = grid.value_at(5.5, 5.5);
        assert!(wrap_distance(mid, 0.0) < 1e-3, "midpoint was {}", mid);
        assert!((0.0..360.0).contains(&mid));
    }

    #[test]
    fn test_wraparound_at_180() {
        let grid = azimuth_grid(vec![170.0, -170.0, 170.0, -170.0], Discontinuity::At180);
        let mid = grid.value_at(5.5, 0.5);
        assert!(wrap_distance(mid, 180.0) < 1e-3, "midpoint was {}", mid);
        assert!(mid > -180.0 && mid <= 180.0);
    }

    #[test]
    fn test_angular_nodes_recovered() {
        let grid = azimuth_grid(vec![10.0, 80.0, 200.0, 350.0], Discontinuity::At360);
        assert_abs_diff_eq!(grid.value_at(0.5, 0.5), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(grid.value_at(10.5, 0.5), 80.0, epsilon = 1e-4);
        assert_abs_diff_eq!(grid.value_at(0.5, 10.5), 200.0, epsilon = 1e-4);
        assert_abs_diff_eq!(grid.value_at(10.5, 10.5), 350.0, epsilon = 1e-4);
    }

    #[test]
    fn test_component_grids_share_geometry() {
        let grid = azimuth_grid(vec![0.0, 90.0, 180.0, 270.0], Discontinuity::At360);
        let grids = grid.angular_grids();
        assert_eq!(grids.sin.geometry(), grid.geometry());
        assert_eq!(grids.cos.geometry(), grid.geometry());
        assert_abs_diff_eq!(grids.sin.tie_points()[1] as f64, 1.0, epsilon = 1e-7);
        assert_abs_diff_eq!(grids.cos.tie_points()[2] as f64, -1.0, epsilon = 1e-7);
    }
}
