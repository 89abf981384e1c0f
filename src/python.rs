//! Python module definition

use crate::types::{Discontinuity, GridGeometry, InterpolationMode, TpgError};
use crate::TiePointGrid;
use ndarray::Array2;
use numpy::{IntoPyArray, PyArray2};
use pyo3::prelude::*;

fn to_py_err(e: TpgError) -> PyErr {
    match e {
        TpgError::ReadOnlyViolation(_) => PyErr::new::<pyo3::exceptions::PyPermissionError, _>(format!("{}", e)),
        TpgError::FitFailed(_) => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)),
        _ => PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)),
    }
}

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyTiePointGrid>()?;
    Ok(())
}

/// Python wrapper for TiePointGrid
#[pyclass(name = "TiePointGrid")]
struct PyTiePointGrid {
    inner: TiePointGrid,
}

#[pymethods]
impl PyTiePointGrid {
    #[new]
    #[pyo3(signature = (name, width, height, offset_x, offset_y, sub_sampling_x, sub_sampling_y, tie_points, discontinuity = 0))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        width: usize,
        height: usize,
        offset_x: f64,
        offset_y: f64,
        sub_sampling_x: f64,
        sub_sampling_y: f64,
        tie_points: Vec<f32>,
        discontinuity: i32,
    ) -> PyResult<Self> {
        let geometry = GridGeometry::new(width, height, offset_x, offset_y, sub_sampling_x, sub_sampling_y);
        let discontinuity = Discontinuity::try_from(discontinuity).map_err(to_py_err)?;
        let inner = TiePointGrid::with_discontinuity(name, geometry, tie_points, discontinuity).map_err(to_py_err)?;

        Ok(PyTiePointGrid { inner })
    }

    #[pyo3(signature = (x, y, mode = "bilinear"))]
    fn value_at(&self, x: f64, y: f64, mode: &str) -> PyResult<f64> {
        self.inner.value_at_named(x, y, mode).map_err(to_py_err)
    }

    #[pyo3(signature = (x0, y0, width, height, mode = "bilinear"))]
    fn fill_block<'py>(
        &self,
        py: Python<'py>,
        x0: usize,
        y0: usize,
        width: usize,
        height: usize,
        mode: &str,
    ) -> PyResult<&'py PyArray2<f64>> {
        let mode: InterpolationMode = mode.parse().map_err(to_py_err)?;
        let block: Array2<f64> = self.inner.block_mode(x0, y0, width, height, mode).map_err(to_py_err)?;
        Ok(block.into_pyarray(py))
    }

    fn subset(&self, x: usize, y: usize, width: usize, height: usize, step_x: usize, step_y: usize) -> PyResult<Self> {
        let region = crate::types::SubsetRegion::new(x, y, width, height);
        let inner = self.inner.create_subset(Some(region), step_x, step_y).map_err(to_py_err)?;
        Ok(PyTiePointGrid { inner })
    }

    #[getter]
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[getter]
    fn scene_size(&self) -> (usize, usize) {
        (self.inner.scene_width(), self.inner.scene_height())
    }

    #[getter]
    fn grid_size(&self) -> (usize, usize) {
        (self.inner.width(), self.inner.height())
    }

    #[getter]
    fn offset(&self) -> (f64, f64) {
        (self.inner.offset_x(), self.inner.offset_y())
    }

    #[getter]
    fn sub_sampling(&self) -> (f64, f64) {
        (self.inner.sub_sampling_x(), self.inner.sub_sampling_y())
    }

    #[getter]
    fn discontinuity(&self) -> i32 {
        self.inner.discontinuity().degrees()
    }

    #[setter]
    fn set_discontinuity(&mut self, value: i32) -> PyResult<()> {
        let discontinuity = Discontinuity::try_from(value).map_err(to_py_err)?;
        self.inner.set_discontinuity(discontinuity);
        Ok(())
    }

    fn __repr__(&self) -> String {
        format!(
            "TiePointGrid(name='{}', size={}x{}, discontinuity={})",
            self.inner.name(),
            self.inner.width(),
            self.inner.height(),
            self.inner.discontinuity()
        )
    }
}
