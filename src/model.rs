//! Solving any of the two-stream models
//!
//! [`TwoStreamModel`] wraps the model variants so that callers can solve and
//! integrate without caring which one they have.

use log::debug;
use ndarray::Array1;

use crate::{
    analytic::{AnalyticalModel, SingleLayerModel, TwoLayerModel},
    bvp::BvpOptions,
    continuous::ContinuousProfileModel,
    error::RtmError,
    grid::VerticalGrid,
    irradiance::{Irradiance, SixBandIrradiance, SixBandSpectralIrradiance, SpectralIrradiance},
    optics::OpticalPropertyProvider,
    six_band::SixBandModel,
    spectra::IncidentSpectrum,
};

/// Settings for the numerical solves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Tolerance on the collocation residual
    pub tolerance: f64,
    /// Maximum number of mesh nodes before a solve is abandoned
    pub max_nodes: usize,
    /// Number of equally spaced nodes in the starting mesh
    pub initial_nodes: usize,
    /// Wavelength in nm above which radiation is taken to be absorbed at the
    /// surface instead of solved for
    pub fast_path: Option<f64>,
    /// Number of worker threads, or `None` to let rayon decide
    pub num_threads: Option<usize>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_nodes: 12000,
            initial_nodes: 5,
            fast_path: None,
            num_threads: None,
        }
    }
}

impl SolverOptions {
    pub(crate) fn bvp_options(&self) -> BvpOptions {
        BvpOptions {
            tolerance: self.tolerance,
            max_nodes: self.max_nodes,
            ..Default::default()
        }
    }
}

/// One of the two-stream models, ready to solve.
///
/// The closed form models are sampled on a grid and set of wavelengths so
/// that every variant produces an irradiance field.
#[derive(Debug, Clone, PartialEq)]
pub enum TwoStreamModel {
    /// Uniform ice
    SingleLayer {
        /// Physical parameters
        model: SingleLayerModel,
        /// Depths to sample at, within the ice
        grid: VerticalGrid,
        /// Wavelengths in nm
        wavelengths: Array1<f64>,
    },
    /// Oily ice over clean ice
    TwoLayer {
        /// Physical parameters
        model: TwoLayerModel,
        /// Depths to sample at, within the ice
        grid: VerticalGrid,
        /// Wavelengths in nm
        wavelengths: Array1<f64>,
    },
    /// Depth dependent profiles
    Continuous(ContinuousProfileModel),
    /// Depth dependent profiles under snow and SSL, in six bands
    SixBand(SixBandModel),
}

/// Irradiance fields from solving a [`TwoStreamModel`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralSolution {
    /// Depth by wavelength
    Spectral(SpectralIrradiance),
    /// Depth by band
    SixBand(SixBandSpectralIrradiance),
}

/// Broadband irradiance from integrating a [`SpectralSolution`].
#[derive(Debug, Clone, PartialEq)]
pub enum IntegratedSolution {
    /// Integrated over wavelength against an incident spectrum
    Spectral(Irradiance),
    /// Summed over the bands
    SixBand(SixBandIrradiance),
}

/// Solve `model` using a thread pool sized by `options`.
pub fn solve_two_stream_model(
    model: &TwoStreamModel,
    optics: &dyn OpticalPropertyProvider,
    options: &SolverOptions,
) -> Result<SpectralSolution, RtmError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.num_threads.unwrap_or(0))
        .build()
        .map_err(|e| RtmError::ThreadPool(e.to_string()))?;
    debug!("solving on {} threads", pool.current_num_threads());

    pool.install(|| match model {
        TwoStreamModel::SingleLayer {
            model,
            grid,
            wavelengths,
        } => model
            .sample(optics, grid, wavelengths.view())
            .map(SpectralSolution::Spectral),
        TwoStreamModel::TwoLayer {
            model,
            grid,
            wavelengths,
        } => model
            .sample(optics, grid, wavelengths.view())
            .map(SpectralSolution::Spectral),
        TwoStreamModel::Continuous(model) => {
            model.solve(optics, options).map(SpectralSolution::Spectral)
        }
        TwoStreamModel::SixBand(model) => model.solve(optics, options).map(SpectralSolution::SixBand),
    })
}

/// Integrate `solution` over the shortwave.
///
/// A spectral solution needs the normalised incident `spectrum`; a six band
/// solution uses the fixed band fractions and ignores it.
pub fn integrate_over_sw(
    solution: &SpectralSolution,
    spectrum: Option<&dyn IncidentSpectrum>,
) -> Result<IntegratedSolution, RtmError> {
    match solution {
        SpectralSolution::Spectral(irradiance) => {
            let spectrum = spectrum.ok_or(RtmError::MissingSpectrum)?;
            irradiance.integrate(spectrum).map(IntegratedSolution::Spectral)
        }
        SpectralSolution::SixBand(irradiance) => {
            Ok(IntegratedSolution::SixBand(irradiance.integrate()))
        }
    }
}
