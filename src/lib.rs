//! tiegrid: Tie-Point Grid Interpolation for Earth-Observation Rasters
//!
//! Satellite products store slowly varying quantities (geolocation, sun and
//! view angles, calibration factors) on sparse tie-point grids. This library
//! turns such a grid into dense per-pixel values with bilinear, per-row
//! quadratic or biquadratic interpolation, and handles angles that wrap at
//! 180° or 360° through sine/cosine decomposition.

pub mod types;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use crate::types::{
    Discontinuity, GridGeometry, InterpolationMode, PixelValue, SceneRaster, SubsetRegion,
    TpgError, TpgResult,
};

pub use crate::core::{InterpInput, RasterParams, TiePointGrid};
