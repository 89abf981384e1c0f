//! Core tie-point grid interpolation

pub mod tie_point_grid;
pub mod angular;
pub mod polynomial;
pub mod raster;
pub mod subset;

// Re-export main types
pub use tie_point_grid::{TiePointGrid, InterpInput};
pub use angular::{AngularGrids, combine_angle};
pub use polynomial::least_squares;
pub use raster::RasterParams;
