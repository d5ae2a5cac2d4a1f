//! Python interface
//!
//! NOTE: this module is only the glue between Rust and Python. The real work
//! happens in the other modules, which don't use `pyo3`.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use log::{debug, info};
use ndarray::Array1;
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::{
    continuous::{ContinuousProfileModel, IceColumn},
    error::RtmError,
    grid::VerticalGrid,
    irradiance::{SixBandSpectralIrradiance, SpectralIrradiance},
    model::SolverOptions,
    optics::{SurfaceCover, TabulatedOptics, NUM_BANDS},
    six_band::SixBandModel,
};

impl From<RtmError> for PyErr {
    fn from(e: RtmError) -> Self {
        match e {
            RtmError::NotConverged { .. } | RtmError::ThreadPool(_) | RtmError::Cancelled => {
                PyRuntimeError::new_err(e.to_string())
            }
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Spectral irradiance in the ice.
///
/// Fields are dimensioned as (`num_depths`, `num_wavelengths`).
#[pyclass(name = "SpectralIrradiance")]
#[derive(Debug)]
struct PySpectralIrradiance(SpectralIrradiance);

#[pymethods]
impl PySpectralIrradiance {
    #[getter]
    fn z<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.z().to_pyarray(py)
    }

    #[getter]
    fn wavelengths<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.wavelengths().to_pyarray(py)
    }

    #[getter]
    fn upwelling<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.upwelling().to_pyarray(py)
    }

    #[getter]
    fn downwelling<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.downwelling().to_pyarray(py)
    }

    #[getter]
    fn net_irradiance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.net_irradiance().to_pyarray(py)
    }

    #[getter]
    fn albedo<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.albedo().to_pyarray(py)
    }

    #[getter]
    fn transmittance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.transmittance().to_pyarray(py)
    }

    #[getter]
    fn absorption<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.absorption().to_pyarray(py)
    }

    #[getter]
    fn heating<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.heating().to_pyarray(py)
    }
}

/// Six band irradiance in the ice under snow and SSL.
///
/// Fields are dimensioned as (`num_depths`, 6).
#[pyclass(name = "SixBandSpectralIrradiance")]
#[derive(Debug)]
struct PySixBandSpectralIrradiance(SixBandSpectralIrradiance);

#[pymethods]
impl PySixBandSpectralIrradiance {
    #[getter]
    fn z<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.z().to_pyarray(py)
    }

    #[getter]
    fn upwelling<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.upwelling().to_pyarray(py)
    }

    #[getter]
    fn downwelling<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.downwelling().to_pyarray(py)
    }

    #[getter]
    fn snow_depth(&self) -> f64 {
        self.0.snow_depth()
    }

    #[getter]
    fn ssl_depth(&self) -> f64 {
        self.0.ssl_depth()
    }

    #[getter]
    fn albedo<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.albedo().to_pyarray(py)
    }

    #[getter]
    fn transmittance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.transmittance().to_pyarray(py)
    }

    #[getter]
    fn par_transmittance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.par_transmittance().to_pyarray(py)
    }

    #[getter]
    fn plane_par<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.0.plane_par().to_pyarray(py)
    }

    #[getter]
    fn heating<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.0.heating().to_pyarray(py)
    }

    /// Broadband albedo weighted by the cloudy sky band fractions.
    fn broadband_albedo(&self) -> f64 {
        self.0.integrate().albedo()
    }
}

/// Build the ice column from the Python inputs.
fn ice_column(
    z: PyReadonlyArray1<'_, f64>,
    oil_mass_ratio: PyReadonlyArray1<'_, f64>,
    liquid_fraction: Option<PyReadonlyArray1<'_, f64>>,
    ice_scattering_coefficient: f64,
    median_droplet_radius: f64,
    absorption_enhancement_factor: f64,
) -> Result<IceColumn, RtmError> {
    let grid = VerticalGrid::new(z.as_array().to_owned())?;
    let column = IceColumn::new(
        grid,
        oil_mass_ratio.as_array().to_owned(),
        ice_scattering_coefficient,
        median_droplet_radius,
    )?
    .with_absorption_enhancement(absorption_enhancement_factor)?;
    match liquid_fraction {
        Some(liquid) => column.with_liquid_fraction(liquid.as_array().to_owned()),
        None => Ok(column),
    }
}

/// Run `solve` for each of `num_items` on a pool of `num_threads` threads,
/// reporting progress and checking for Ctrl-C from the calling thread.
fn run_with_progress<T, F>(
    py: Python<'_>,
    num_items: usize,
    num_threads: Option<usize>,
    solve: F,
) -> PyResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T, RtmError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .map_err(|e| RtmError::ThreadPool(e.to_string()))?;

    // These atomics keep track of how many solves have finished and whether
    // it's time to cancel the computation or not
    let num_completed = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let mut results: Vec<Result<T, RtmError>> = Vec::new();

    pool.in_place_scope(|s| -> PyResult<()> {
        s.spawn(|_| {
            (0..num_items)
                .into_par_iter()
                .map(|index| {
                    if cancelled.load(Ordering::Relaxed) {
                        return Err(RtmError::Cancelled);
                    }
                    let column = solve(index);
                    if column.is_err() {
                        // No point carrying on
                        cancelled.store(true, Ordering::Relaxed);
                    }
                    num_completed.fetch_add(1, Ordering::Relaxed);
                    column
                })
                .collect_into_vec(&mut results);
        });

        // The work is done in the thread pool, but back here in the main
        // thread, handle progress reporting and checking for early
        // cancellation
        while !cancelled.load(Ordering::Relaxed) {
            if let Err(e) = py.check_signals() {
                cancelled.store(true, Ordering::Relaxed);
                return Err(e);
            }

            let num_completed = num_completed.load(Ordering::Relaxed);
            let progress = num_completed as f32 / num_items as f32 * 100.;
            info!("Completed {num_completed}/{num_items} solves ({progress:0.2}%)");

            if num_completed == num_items {
                break;
            }

            py.allow_threads(|| {
                std::thread::sleep(Duration::from_millis(500));
            });
        }

        Ok(())
    })?;

    // Report a real failure ahead of the cancellations it triggered
    let mut columns = Vec::with_capacity(num_items);
    let mut cancellation = None;
    for result in results {
        match result {
            Ok(column) => columns.push(column),
            Err(RtmError::Cancelled) => cancellation = Some(RtmError::Cancelled),
            Err(e) => return Err(e.into()),
        }
    }
    match cancellation {
        Some(e) => Err(e.into()),
        None => Ok(columns),
    }
}

/// Solve the two-stream model in ice with depth dependent oil and liquid.
///
/// `z`: increasing elevations in m, negative below the ice surface at 0
///
/// `wavelengths`: increasing wavelengths in nm
///
/// `oil_mass_ratio`: oil mass ratio in ng/g at each `z`
///
/// `liquid_fraction`: optional liquid fraction at each `z`
///
/// `ice_scattering_coefficient`: scattering coefficient of the ice in 1/m
///
/// `median_droplet_radius`: median oil droplet radius in µm
///
/// `fast_path_cutoff`: wavelength in nm above which radiation is taken to be
/// absorbed at the surface, or `None` to solve at every wavelength
///
/// The number of worker threads is controlled by `num_threads`. It must be a
/// positive integer, or `None` to automatically choose the number of threads.
#[pyfunction]
#[pyo3(signature = (z, wavelengths, oil_mass_ratio, liquid_fraction=None, ice_scattering_coefficient=1.5, median_droplet_radius=0.5, absorption_enhancement_factor=1.0, fast_path_cutoff=None, tolerance=1e-3, max_nodes=12000, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn solve_continuous(
    py: Python<'_>,
    z: PyReadonlyArray1<'_, f64>,
    wavelengths: PyReadonlyArray1<'_, f64>,
    oil_mass_ratio: PyReadonlyArray1<'_, f64>,
    liquid_fraction: Option<PyReadonlyArray1<'_, f64>>,
    ice_scattering_coefficient: f64,
    median_droplet_radius: f64,
    absorption_enhancement_factor: f64,
    fast_path_cutoff: Option<f64>,
    tolerance: f64,
    max_nodes: usize,
    num_threads: Option<usize>,
) -> PyResult<PySpectralIrradiance> {
    let column = ice_column(
        z,
        oil_mass_ratio,
        liquid_fraction,
        ice_scattering_coefficient,
        median_droplet_radius,
        absorption_enhancement_factor,
    )?;
    let wavelengths: Array1<f64> = wavelengths.as_array().to_owned();
    let model = ContinuousProfileModel::new(column, wavelengths)?;
    debug!("input shapes are consistent");

    let options = SolverOptions {
        tolerance,
        max_nodes,
        fast_path: fast_path_cutoff,
        num_threads,
        ..Default::default()
    };
    model.check_fast_path(&TabulatedOptics, &options)?;

    let num_wavelengths = model.wavelengths().len();
    info!(
        "Solving two-stream model at {num_wavelengths} wavelengths on {} grid points",
        model.column().grid().len()
    );
    let columns = run_with_progress(py, num_wavelengths, num_threads, |index| {
        model.solve_spectral_column(&TabulatedOptics, model.wavelengths()[index], &options)
    })?;

    debug!("copying two-stream output");
    Ok(PySpectralIrradiance(model.irradiance(columns)?))
}

/// Solve the six band model in ice under snow and a surface scattering layer.
///
/// Inputs are as for `solve_continuous`, with `snow_depth` and `ssl_depth` in
/// m replacing the wavelengths.
#[pyfunction]
#[pyo3(signature = (z, oil_mass_ratio, snow_depth, ssl_depth, liquid_fraction=None, ice_scattering_coefficient=1.5, median_droplet_radius=0.5, absorption_enhancement_factor=1.0, tolerance=1e-3, max_nodes=12000, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn solve_six_band(
    py: Python<'_>,
    z: PyReadonlyArray1<'_, f64>,
    oil_mass_ratio: PyReadonlyArray1<'_, f64>,
    snow_depth: f64,
    ssl_depth: f64,
    liquid_fraction: Option<PyReadonlyArray1<'_, f64>>,
    ice_scattering_coefficient: f64,
    median_droplet_radius: f64,
    absorption_enhancement_factor: f64,
    tolerance: f64,
    max_nodes: usize,
    num_threads: Option<usize>,
) -> PyResult<PySixBandSpectralIrradiance> {
    let column = ice_column(
        z,
        oil_mass_ratio,
        liquid_fraction,
        ice_scattering_coefficient,
        median_droplet_radius,
        absorption_enhancement_factor,
    )?;
    let model = SixBandModel::new(column, SurfaceCover::new(snow_depth, ssl_depth)?);
    let options = SolverOptions {
        tolerance,
        max_nodes,
        num_threads,
        ..Default::default()
    };

    let columns = run_with_progress(py, NUM_BANDS, num_threads, |band| {
        model.solve_band_column(&TabulatedOptics, band, &options)
    })?;
    Ok(PySixBandSpectralIrradiance(model.irradiance(columns)?))
}

/// A Python module implemented in Rust.
#[pymodule]
fn sea_ice_rtm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(solve_continuous, m)?)?;
    m.add_function(wrap_pyfunction!(solve_six_band, m)?)?;
    m.add_class::<PySpectralIrradiance>()?;
    m.add_class::<PySixBandSpectralIrradiance>()?;
    Ok(())
}
