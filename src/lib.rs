//! Shortwave radiative transfer in sea ice containing oil droplets
//!
//! Two-stream models of upwelling and downwelling irradiance in sea ice,
//! where oil droplets add to the absorption of the ice. There are four model
//! variants:
//!
//! - [`SingleLayerModel`]: uniform ice, solved in closed form
//! - [`TwoLayerModel`]: oily ice over clean ice, solved in closed form
//! - [`ContinuousProfileModel`]: depth dependent oil and liquid fraction,
//!   solved numerically at each wavelength
//! - [`SixBandModel`]: the continuous model in six wavelength bands under
//!   snow and a surface scattering layer
//!
//! Heating is `k (U + D)`, absorption times the total irradiance. The
//! closed form models also give the heating response of the ice to the solar
//! spectrum, see [`shortwave_heating_in_ice`] and [`par_heating`].
//!
//! Elevations `z` are in m and negative below the ice surface. Grids are
//! increasing so the surface is the last point.
//!
//! With the `python` feature, a Python extension module is also built.

mod analytic;
mod bvp;
mod continuous;
mod error;
mod grid;
mod heating;
mod irradiance;
mod model;
mod optics;
#[cfg(feature = "python")]
mod python;
mod six_band;
mod spectra;

pub use analytic::{
    AnalyticalModel, ClosedFormField, Piecewise, SingleLayerModel, StackedSlabs, TwoLayerModel,
    UniformSlab, DEFAULT_DROPLET_RADIUS,
};
pub use bvp::{solve_bvp, BoundaryValueProblem, BvpOptions, BvpSolution, BvpStatus, State};
pub use continuous::{Column, ContinuousProfileModel, IceColumn};
pub use error::RtmError;
pub use grid::VerticalGrid;
pub use heating::{
    normalised_incident_shortwave, par_heating, par_heating_profile, shortwave_heating_in_ice,
    shortwave_heating_response, PAR_HEATING_BOUNDS,
};
pub use irradiance::{Irradiance, SixBandIrradiance, SixBandSpectralIrradiance, SpectralIrradiance};
pub use model::{
    integrate_over_sw, solve_two_stream_model, IntegratedSolution, SolverOptions,
    SpectralSolution, TwoStreamModel,
};
pub use optics::{
    extinction_coefficient, mushy_scattering, IceType, OilyIceAbsorption,
    OpticalPropertyProvider, SnowAlbedos, SnowExtinctionCoefficients, SslAlbedos,
    SslExtinctionCoefficients, SurfaceCover, TabulatedOptics, BAND_REPRESENTATIVE_WAVELENGTHS,
    CLOUDY_SKY_FRACTIONS, ICE_DENSITY, NUM_BANDS, SURFACE_ABSORBED_BAND, WAVELENGTH_BANDS,
};
pub use six_band::SixBandModel;
pub use spectra::{
    top_of_atmosphere_irradiance, total_top_of_atmosphere_irradiance, BlackBodySpectrum,
    IncidentSpectrum, SkyCondition, BOLTZMANN, LIGHTSPEED, PLANCK,
};
