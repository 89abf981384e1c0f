use ndarray::Array2;
use num_traits::{Bounded, NumCast, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense interpolated raster (rows x cols)
pub type SceneRaster = Array2<f64>;

/// Angular wraparound declared for a tie-point grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Discontinuity {
    /// Plain scalar quantity
    #[default]
    None,
    /// Angles in (-180, 180]
    At180,
    /// Angles in [0, 360)
    At360,
}

impl Discontinuity {
    /// Numeric code used by product formats (0, 180 or 360)
    pub fn degrees(&self) -> i32 {
        match self {
            Discontinuity::None => 0,
            Discontinuity::At180 => 180,
            Discontinuity::At360 => 360,
        }
    }

    pub fn is_angular(&self) -> bool {
        !matches!(self, Discontinuity::None)
    }

    /// Guess the wrap point of angular samples: anything above 180° means 0..360.
    pub fn infer(samples: &[f32]) -> Self {
        let max = samples
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f32::NEG_INFINITY, f32::max);

        if max > 180.0 {
            Discontinuity::At360
        } else {
            Discontinuity::At180
        }
    }

    /// Map a value cycle (e.g. a valid range of -180..180) to a discontinuity mode
    pub fn from_cycle(cycle_min: f64, cycle_max: f64) -> TpgResult<Self> {
        if cycle_min == -180.0 && cycle_max == 180.0 {
            Ok(Discontinuity::At180)
        } else if cycle_min == 0.0 && cycle_max == 360.0 {
            Ok(Discontinuity::At360)
        } else if cycle_min == cycle_max {
            Ok(Discontinuity::None)
        } else {
            Err(TpgError::InvalidGeometry(format!(
                "unsupported discontinuity cycle [{}, {}]",
                cycle_min, cycle_max
            )))
        }
    }
}

impl TryFrom<i32> for Discontinuity {
    type Error = TpgError;

    fn try_from(value: i32) -> TpgResult<Self> {
        match value {
            0 => Ok(Discontinuity::None),
            180 => Ok(Discontinuity::At180),
            360 => Ok(Discontinuity::At360),
            other => Err(TpgError::InvalidGeometry(format!(
                "unsupported discontinuity mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Discontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discontinuity::None => write!(f, "none"),
            Discontinuity::At180 => write!(f, "180"),
            Discontinuity::At360 => write!(f, "360"),
        }
    }
}

/// Interpolation scheme used for point and block queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationMode {
    /// Four nearest tie points
    #[default]
    Bilinear,
    /// One least-squares quadratic per grid row
    Quadratic,
    /// One least-squares quadratic surface for the whole grid
    Biquadratic,
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationMode::Bilinear => write!(f, "bilinear"),
            InterpolationMode::Quadratic => write!(f, "quadratic"),
            InterpolationMode::Biquadratic => write!(f, "biquadratic"),
        }
    }
}

impl FromStr for InterpolationMode {
    type Err = TpgError;

    fn from_str(name: &str) -> TpgResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "bilinear" => Ok(InterpolationMode::Bilinear),
            "quadratic" => Ok(InterpolationMode::Quadratic),
            "biquadratic" => Ok(InterpolationMode::Biquadratic),
            _ => Err(TpgError::UnsupportedInterpolationMode(name.to_string())),
        }
    }
}

/// Placement of the tie points inside the scene raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Number of tie points per row
    pub width: usize,
    /// Number of tie point rows
    pub height: usize,
    /// Scene x of the upper-left tie point
    pub offset_x: f64,
    /// Scene y of the upper-left tie point
    pub offset_y: f64,
    /// Scene pixels between adjacent tie points in x
    pub sub_sampling_x: f64,
    /// Scene pixels between adjacent tie points in y
    pub sub_sampling_y: f64,
}

impl GridGeometry {
    pub fn new(
        width: usize,
        height: usize,
        offset_x: f64,
        offset_y: f64,
        sub_sampling_x: f64,
        sub_sampling_y: f64,
    ) -> Self {
        Self {
            width,
            height,
            offset_x,
            offset_y,
            sub_sampling_x,
            sub_sampling_y,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.width * self.height
    }

    /// Width of the scene raster spanned by the grid
    pub fn scene_width(&self) -> usize {
        ((self.width.saturating_sub(1)) as f64 * self.sub_sampling_x + 1.0).round() as usize
    }

    /// Height of the scene raster spanned by the grid
    pub fn scene_height(&self) -> usize {
        ((self.height.saturating_sub(1)) as f64 * self.sub_sampling_y + 1.0).round() as usize
    }

    /// Check the geometry against the number of supplied samples
    pub fn validate(&self, sample_count: usize) -> TpgResult<()> {
        if self.width < 2 || self.height < 2 {
            return Err(TpgError::InvalidGeometry(format!(
                "grid must be at least 2x2, got {}x{}",
                self.width, self.height
            )));
        }
        if sample_count != self.sample_count() {
            return Err(TpgError::InvalidGeometry(format!(
                "data array size {} does not match {}x{}",
                sample_count, self.width, self.height
            )));
        }
        // also rejects NaN
        if !(self.sub_sampling_x > 0.0) || !self.sub_sampling_x.is_finite() {
            return Err(TpgError::InvalidGeometry(format!(
                "sub-sampling x must be positive, got {}",
                self.sub_sampling_x
            )));
        }
        if !(self.sub_sampling_y > 0.0) || !self.sub_sampling_y.is_finite() {
            return Err(TpgError::InvalidGeometry(format!(
                "sub-sampling y must be positive, got {}",
                self.sub_sampling_y
            )));
        }
        if !self.offset_x.is_finite() || !self.offset_y.is_finite() {
            return Err(TpgError::InvalidGeometry(format!(
                "offsets must be finite, got ({}, {})",
                self.offset_x, self.offset_y
            )));
        }
        Ok(())
    }
}

/// Rectangle of the scene raster, in scene pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl SubsetRegion {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }
}

/// Output element of a block fill
///
/// Floating-point outputs take the interpolated value as is; integer outputs
/// round half away from zero and saturate at the bounds of the type.
pub trait PixelValue: Copy + Send + Sync {
    fn from_interpolated(value: f64) -> Self;
}

impl PixelValue for f64 {
    fn from_interpolated(value: f64) -> Self {
        value
    }
}

impl PixelValue for f32 {
    fn from_interpolated(value: f64) -> Self {
        value as f32
    }
}

fn round_to_integer<T>(value: f64) -> T
where
    T: NumCast + Bounded + Zero,
{
    if value.is_nan() {
        return T::zero();
    }
    let rounded = value.round();
    NumCast::from(rounded).unwrap_or_else(|| {
        if rounded < 0.0 {
            T::min_value()
        } else {
            T::max_value()
        }
    })
}

macro_rules! integer_pixel_value {
    ($($t:ty),*) => {
        $(
            impl PixelValue for $t {
                fn from_interpolated(value: f64) -> Self {
                    round_to_integer::<$t>(value)
                }
            }
        )*
    };
}

integer_pixel_value!(i32, i16, u16, u8);

/// Error types for tie-point grid operations
#[derive(Debug, thiserror::Error)]
pub enum TpgError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported interpolation mode: {0}")]
    UnsupportedInterpolationMode(String),

    #[error("Read-only violation: {0}")]
    ReadOnlyViolation(String),

    #[error("Output buffer too small: {required} elements required, {actual} given")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Polynomial fit failed: {0}")]
    FitFailed(String),
}

/// Result type for tie-point grid operations
pub type TpgResult<T> = Result<T, TpgError>;
