use crate::core::angular::combine_angle;
use crate::core::tie_point_grid::TiePointGrid;
use crate::types::{InterpolationMode, PixelValue, SceneRaster, TpgError, TpgResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Parameters for extracting dense rasters from a tie-point grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterParams {
    /// Interpolation mode used for every pixel
    #[serde(default)]
    pub mode: InterpolationMode,
    /// Rows handed to one worker when extracting in parallel
    #[serde(default = "default_chunk_rows")]
    pub chunk_rows: usize,
}

fn default_chunk_rows() -> usize {
    256
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            mode: InterpolationMode::Bilinear,
            chunk_rows: default_chunk_rows(),
        }
    }
}

/// Pixel count of a block, rejecting extents that overflow `usize`
fn block_len(x0: usize, y0: usize, width: usize, height: usize) -> TpgResult<usize> {
    let n = width.checked_mul(height);
    match (n, x0.checked_add(width), y0.checked_add(height)) {
        (Some(n), Some(_), Some(_)) => Ok(n),
        _ => Err(TpgError::InvalidGeometry(format!(
            "block {}x{} at ({}, {}) overflows the pixel index range",
            width, height, x0, y0
        ))),
    }
}

fn zeroed(n: usize) -> TpgResult<Vec<f64>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(n)
        .map_err(|e| TpgError::InvalidGeometry(format!("cannot allocate {} pixels: {}", n, e)))?;
    values.resize(n, 0.0);
    Ok(values)
}

fn check_buffer(required: usize, actual: usize) -> TpgResult<()> {
    if actual < required {
        return Err(TpgError::BufferTooSmall { required, actual });
    }
    Ok(())
}

impl TiePointGrid {
    /// Fill `out` with bilinear values for the `width` x `height` pixel block at
    /// `(x0, y0)`, row-major, sampling pixel centres
    pub fn fill_block(&self, x0: usize, y0: usize, width: usize, height: usize, out: &mut [f64]) -> TpgResult<()> {
        let n = block_len(x0, y0, width, height)?;
        check_buffer(n, out.len())?;

        if self.discontinuity.is_angular() {
            let grids = self.angular_grids();
            let mut sin_values = vec![0.0; n];
            let mut cos_values = vec![0.0; n];
            grids.sin.fill_block(x0, y0, width, height, &mut sin_values)?;
            grids.cos.fill_block(x0, y0, width, height, &mut cos_values)?;

            for ((value, &sin), &cos) in out[..n].iter_mut().zip(&sin_values).zip(&cos_values) {
                *value = combine_angle(sin, cos, self.discontinuity);
            }
            return Ok(());
        }

        self.fill_block_linear(x0, y0, width, height, &mut out[..n]);
        Ok(())
    }

    /// Separable bilinear scan: column cells once per block, row cells once per row
    fn fill_block_linear(&self, x0: usize, y0: usize, width: usize, height: usize, out: &mut [f64]) {
        if width == 0 {
            return;
        }
        let geometry = &self.geometry;

        let columns: Vec<(usize, f64)> = (x0..x0 + width)
            .map(|x| self.column_cell((x as f64 + 0.5 - geometry.offset_x) / geometry.sub_sampling_x))
            .collect();

        for (row, y) in out.chunks_mut(width).zip(y0..y0 + height) {
            let (j0, wj) = self.row_cell((y as f64 + 0.5 - geometry.offset_y) / geometry.sub_sampling_y);
            for (value, &(i0, wi)) in row.iter_mut().zip(&columns) {
                *value = self.interpolate(wi, wj, i0, j0);
            }
        }
    }

    /// Block fill in any interpolation mode
    ///
    /// Polynomial modes are evaluated pixel by pixel at pixel centres.
    pub fn fill_block_mode(
        &self,
        x0: usize,
        y0: usize,
        width: usize,
        height: usize,
        mode: InterpolationMode,
        out: &mut [f64],
    ) -> TpgResult<()> {
        match mode {
            InterpolationMode::Bilinear => self.fill_block(x0, y0, width, height, out),
            InterpolationMode::Quadratic | InterpolationMode::Biquadratic => {
                check_buffer(block_len(x0, y0, width, height)?, out.len())?;
                if width == 0 {
                    return Ok(());
                }
                for (row, y) in out.chunks_mut(width).zip(y0..y0 + height) {
                    let yc = y as f64 + 0.5;
                    for (value, x) in row.iter_mut().zip(x0..x0 + width) {
                        *value = self.value_at_mode(x as f64 + 0.5, yc, mode)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Block fill converted to the element type of `out`
    ///
    /// Integer outputs are rounded half away from zero.
    pub fn fill_block_as<T: PixelValue>(
        &self,
        x0: usize,
        y0: usize,
        width: usize,
        height: usize,
        mode: InterpolationMode,
        out: &mut [T],
    ) -> TpgResult<()> {
        let n = block_len(x0, y0, width, height)?;
        check_buffer(n, out.len())?;

        let mut values = vec![0.0; n];
        self.fill_block_mode(x0, y0, width, height, mode, &mut values)?;
        for (dst, &src) in out.iter_mut().zip(&values) {
            *dst = T::from_interpolated(src);
        }
        Ok(())
    }

    /// Bilinear block as an array of shape `(height, width)`
    pub fn block(&self, x0: usize, y0: usize, width: usize, height: usize) -> TpgResult<Array2<f64>> {
        self.block_mode(x0, y0, width, height, InterpolationMode::Bilinear)
    }

    pub fn block_mode(
        &self,
        x0: usize,
        y0: usize,
        width: usize,
        height: usize,
        mode: InterpolationMode,
    ) -> TpgResult<Array2<f64>> {
        let mut values = zeroed(block_len(x0, y0, width, height)?)?;
        self.fill_block_mode(x0, y0, width, height, mode, &mut values)?;
        Array2::from_shape_vec((height, width), values)
            .map_err(|e| TpgError::InvalidGeometry(format!("Shape error: {}", e)))
    }

    /// Interpolate the full scene raster
    pub fn scene_raster(&self) -> TpgResult<SceneRaster> {
        self.scene_raster_with(&RasterParams::default())
    }

    pub fn scene_raster_with(&self, params: &RasterParams) -> TpgResult<SceneRaster> {
        let (width, height) = (self.scene_width(), self.scene_height());
        log::info!(
            "Interpolating {}x{} scene raster from '{}' ({})",
            width,
            height,
            self.name,
            params.mode
        );
        self.block_mode(0, 0, width, height, params.mode)
    }

    /// Interpolate the full scene raster, filling row chunks concurrently
    #[cfg(feature = "parallel")]
    pub fn scene_raster_parallel(&self, params: &RasterParams) -> TpgResult<SceneRaster> {
        use rayon::prelude::*;

        let (width, height) = (self.scene_width(), self.scene_height());
        let chunk_rows = params.chunk_rows.clamp(1, height.max(1));
        log::info!(
            "Interpolating {}x{} scene raster from '{}' in parallel ({} rows per chunk, {} threads)",
            width,
            height,
            self.name,
            chunk_rows,
            rayon::current_num_threads()
        );

        let mut values = zeroed(block_len(0, 0, width, height)?)?;
        if width > 0 {
            values
                .par_chunks_mut(width * chunk_rows)
                .enumerate()
                .try_for_each(|(chunk, out)| {
                    let rows = out.len() / width;
                    self.fill_block_mode(0, chunk * chunk_rows, width, rows, params.mode, out)
                })?;
        }

        Array2::from_shape_vec((height, width), values)
            .map_err(|e| TpgError::InvalidGeometry(format!("Shape error: {}", e)))
    }
}
