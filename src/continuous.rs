//! Ice with depth dependent optical properties
//!
//! When oil concentration or liquid fraction vary with depth there is no
//! closed form, so the two-stream equations
//!
//! ```text
//! dU/dz = -(k + r) U + r D
//! dD/dz =  (k + r) D - r U
//! ```
//!
//! are solved as a boundary value problem with `U = 0` at the bottom of the
//! grid and `D` fixed at the surface, one wavelength at a time.

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

use crate::{
    bvp::{solve_bvp, BoundaryValueProblem},
    error::{check_non_negative, RtmError},
    grid::{interp, VerticalGrid},
    irradiance::{stack_columns, SpectralColumn, SpectralIrradiance},
    model::SolverOptions,
    optics::{extinction_coefficient, mushy_scattering, OilyIceAbsorption, OpticalPropertyProvider},
};

/// Optical depth of the column at the fast path cutoff below which we warn
/// that radiation isn't really absorbed at the surface.
const FAST_PATH_MIN_OPTICAL_DEPTH: f64 = 10.;

/// Upwelling and downwelling at each grid point.
pub type Column = (Array1<f64>, Array1<f64>);

/// The two-stream equations with coefficients interpolated from grid values.
#[derive(Debug)]
struct TwoStreamProblem<'a> {
    z: ArrayView1<'a, f64>,
    absorption: Array1<f64>,
    scattering: Array1<f64>,
    top_downwelling: f64,
}

impl TwoStreamProblem<'_> {
    fn coefficients(&self, z: f64) -> (f64, f64) {
        (
            interp(z, self.z, self.absorption.view()),
            interp(z, self.z, self.scattering.view()),
        )
    }
}

impl BoundaryValueProblem for TwoStreamProblem<'_> {
    fn dim(&self) -> usize {
        2
    }

    fn num_left_conditions(&self) -> usize {
        1
    }

    fn rhs(&self, z: f64, y: &[f64], dydz: &mut [f64]) {
        let (k, r) = self.coefficients(z);
        dydz[0] = -(k + r) * y[0] + r * y[1];
        dydz[1] = (k + r) * y[1] - r * y[0];
    }

    fn jacobian(&self, z: f64, _y: &[f64], jac: &mut [f64]) {
        let (k, r) = self.coefficients(z);
        jac.copy_from_slice(&[-(k + r), r, -r, k + r]);
    }

    /// No upwelling enters from below
    fn left_residual(&self, ya: &[f64], residual: &mut [f64]) {
        residual[0] = ya[0];
    }

    fn right_residual(&self, yb: &[f64], residual: &mut [f64]) {
        residual[0] = yb[1] - self.top_downwelling;
    }

    fn left_jacobian(&self, _ya: &[f64], jac: &mut [f64]) {
        jac.copy_from_slice(&[1., 0.]);
    }

    fn right_jacobian(&self, _yb: &[f64], jac: &mut [f64]) {
        jac.copy_from_slice(&[0., 1.]);
    }
}

/// Depth profiles of an ice column on a vertical grid.
///
/// Without a liquid fraction the whole column is ice. Where there is liquid,
/// scattering drops in proportion; oil absorption is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct IceColumn {
    grid: VerticalGrid,
    oil_mass_ratio: Array1<f64>,
    liquid_fraction: Option<Array1<f64>>,
    ice_scattering: f64,
    droplet_radius: f64,
    absorption_enhancement: f64,
}

impl IceColumn {
    /// Column with `oil_mass_ratio` (ng/g) at each grid point, ice scattering
    /// coefficient `ice_scattering` (1/m) and median oil droplet radius
    /// `droplet_radius` (µm).
    pub fn new(
        grid: VerticalGrid,
        oil_mass_ratio: Array1<f64>,
        ice_scattering: f64,
        droplet_radius: f64,
    ) -> Result<Self, RtmError> {
        if oil_mass_ratio.len() != grid.len() {
            return Err(RtmError::InconsistentInputs);
        }
        for &oil in &oil_mass_ratio {
            check_non_negative("oil mass ratio", oil)?;
        }
        Ok(Self {
            grid,
            oil_mass_ratio,
            liquid_fraction: None,
            ice_scattering: check_non_negative("ice scattering coefficient", ice_scattering)?,
            droplet_radius: check_non_negative("droplet radius", droplet_radius)?,
            absorption_enhancement: 1.,
        })
    }

    /// Set the liquid fraction (0 for ice, 1 for liquid) at each grid point.
    pub fn with_liquid_fraction(mut self, liquid_fraction: Array1<f64>) -> Result<Self, RtmError> {
        if liquid_fraction.len() != self.grid.len() {
            return Err(RtmError::InconsistentInputs);
        }
        if let Some(&value) = liquid_fraction.iter().find(|v| !(0. ..=1.).contains(*v)) {
            return Err(RtmError::InvalidParameter {
                name: "liquid fraction",
                value,
            });
        }
        self.liquid_fraction = Some(liquid_fraction);
        Ok(self)
    }

    /// Scale oil absorption by `factor`.
    pub fn with_absorption_enhancement(mut self, factor: f64) -> Result<Self, RtmError> {
        self.absorption_enhancement = check_non_negative("absorption enhancement factor", factor)?;
        Ok(self)
    }

    /// Vertical grid.
    pub fn grid(&self) -> &VerticalGrid {
        &self.grid
    }

    /// Oil mass ratio in ng/g.
    pub fn oil_mass_ratio(&self) -> ArrayView1<'_, f64> {
        self.oil_mass_ratio.view()
    }

    /// Liquid fraction, if the column isn't all ice.
    pub fn liquid_fraction(&self) -> Option<ArrayView1<'_, f64>> {
        self.liquid_fraction.as_ref().map(|l| l.view())
    }

    /// Index of the lowest grid point that isn't fully liquid, which is
    /// where transmittance is measured. The bottom of the grid if there is
    /// no liquid or no ice.
    pub fn ice_base_index(&self) -> usize {
        self.liquid_fraction
            .as_ref()
            .and_then(|l| l.iter().position(|&v| v < 1.))
            .unwrap_or(0)
    }

    /// Scattering coefficient at each grid point in 1/m.
    pub fn scattering(&self) -> Array1<f64> {
        match &self.liquid_fraction {
            Some(liquid) => liquid.mapv(|l| mushy_scattering(l, self.ice_scattering)),
            None => Array1::from_elem(self.grid.len(), self.ice_scattering),
        }
    }

    /// Absorption coefficient at each grid point in 1/m at `wavelength` nm.
    pub fn absorption(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<Array1<f64>, RtmError> {
        let absorption = OilyIceAbsorption::new(
            optics,
            wavelength,
            self.droplet_radius,
            self.absorption_enhancement,
        )?;
        Ok(self.oil_mass_ratio.mapv(|oil| absorption.at(oil)))
    }

    /// Solve for the irradiance at `wavelength` with `top_downwelling`
    /// entering at the surface.
    pub fn solve_column(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
        top_downwelling: f64,
        options: &SolverOptions,
    ) -> Result<Column, RtmError> {
        let z = self.grid.z();
        let problem = TwoStreamProblem {
            z,
            absorption: self.absorption(optics, wavelength)?,
            scattering: self.scattering(),
            top_downwelling,
        };

        let nodes = options.initial_nodes.max(2);
        let mesh = Array1::linspace(self.grid.bottom(), self.grid.top(), nodes);
        let guess = Array2::zeros((nodes, 2));
        let solution = solve_bvp(&problem, mesh.view(), guess.view(), &options.bvp_options())?;
        if !solution.success() {
            return Err(RtmError::NotConverged {
                wavelength,
                message: solution.message().to_string(),
            });
        }
        debug!(
            "solved at {wavelength} nm on {} nodes, albedo {:.4}",
            solution.x.len(),
            solution.y[[solution.x.len() - 1, 0]]
        );

        let mut upwelling = Array1::zeros(z.len());
        let mut downwelling = Array1::zeros(z.len());
        for (i, &zi) in z.iter().enumerate() {
            let y = solution.sol(zi);
            upwelling[i] = y[0];
            downwelling[i] = y[1];
        }
        Ok((upwelling, downwelling))
    }

    /// All radiation absorbed at the surface: nothing anywhere except
    /// `surface_downwelling` at the surface point.
    pub(crate) fn surface_absorbed_column(&self, surface_downwelling: f64) -> Column {
        let upwelling = Array1::zeros(self.grid.len());
        let mut downwelling = Array1::zeros(self.grid.len());
        downwelling[self.grid.surface_index()] = surface_downwelling;
        (upwelling, downwelling)
    }

    /// Warn if radiation at `cutoff` nm still reaches a depth comparable to
    /// the column, where the surface absorption shortcut is poor.
    pub(crate) fn check_fast_path_cutoff(
        &self,
        optics: &dyn OpticalPropertyProvider,
        cutoff: f64,
    ) -> Result<(), RtmError> {
        if !(cutoff.is_finite() && cutoff > 0.) {
            return Err(RtmError::InvalidParameter {
                name: "fast path wavelength cutoff",
                value: cutoff,
            });
        }
        let absorption = match self.absorption(optics, cutoff) {
            Ok(absorption) => absorption,
            Err(e) => {
                debug!("can't check fast path cutoff: {e}");
                return Ok(());
            }
        };
        let surface = self.grid.surface_index();
        let extinction = extinction_coefficient(absorption[surface], self.scattering()[surface]);
        let optical_depth = extinction * (self.grid.top() - self.grid.bottom());
        if optical_depth < FAST_PATH_MIN_OPTICAL_DEPTH {
            warn!(
                "fast path cutoff {cutoff} nm is short: optical depth of the column is only {optical_depth:.2}"
            );
        }
        Ok(())
    }
}

/// Ice column solved across a spectrum of wavelengths with unit incident
/// downwelling irradiance at each.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousProfileModel {
    column: IceColumn,
    wavelengths: Array1<f64>,
}

impl ContinuousProfileModel {
    /// Model of `column` at `wavelengths` in nm, which must be increasing.
    pub fn new(column: IceColumn, wavelengths: Array1<f64>) -> Result<Self, RtmError> {
        let increasing = wavelengths.windows(2).into_iter().all(|w| w[1] > w[0]);
        if wavelengths.is_empty() || !increasing || wavelengths.iter().any(|w| !w.is_finite()) {
            return Err(RtmError::InconsistentInputs);
        }
        Ok(Self {
            column,
            wavelengths,
        })
    }

    /// The ice column.
    pub fn column(&self) -> &IceColumn {
        &self.column
    }

    /// Wavelengths in nm.
    pub fn wavelengths(&self) -> ArrayView1<'_, f64> {
        self.wavelengths.view()
    }

    /// Solve at a single wavelength, which needn't be one of the model's.
    pub fn solve_at_wavelength(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
        options: &SolverOptions,
    ) -> Result<Column, RtmError> {
        self.column.solve_column(optics, wavelength, 1., options)
    }

    /// Solve at every wavelength, in parallel on the current rayon pool.
    ///
    /// Above the fast path cutoff, if there is one, radiation is taken to be
    /// absorbed at the surface instead of solved for. Any failure aborts the
    /// whole solve.
    pub fn solve(
        &self,
        optics: &dyn OpticalPropertyProvider,
        options: &SolverOptions,
    ) -> Result<SpectralIrradiance, RtmError> {
        self.check_fast_path(optics, options)?;
        info!(
            "Solving two-stream model at {} wavelengths on {} grid points",
            self.wavelengths.len(),
            self.column.grid.len()
        );

        let columns = self
            .wavelengths
            .to_vec()
            .into_par_iter()
            .map(|wavelength| self.solve_spectral_column(optics, wavelength, options))
            .collect::<Result<Vec<_>, RtmError>>()?;
        self.irradiance(columns)
    }

    pub(crate) fn check_fast_path(
        &self,
        optics: &dyn OpticalPropertyProvider,
        options: &SolverOptions,
    ) -> Result<(), RtmError> {
        match options.fast_path {
            Some(cutoff) => self.column.check_fast_path_cutoff(optics, cutoff),
            None => Ok(()),
        }
    }

    /// Irradiance and absorption at one wavelength.
    ///
    /// Radiation absorbed at the surface doesn't heat the ice below, so the
    /// fast path column has no absorption.
    pub(crate) fn solve_spectral_column(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
        options: &SolverOptions,
    ) -> Result<SpectralColumn, RtmError> {
        match options.fast_path {
            Some(cutoff) if wavelength > cutoff => {
                let (up, down) = self.column.surface_absorbed_column(1.);
                Ok((up, down, Array1::zeros(self.column.grid.len())))
            }
            _ => {
                let (up, down) = self.solve_at_wavelength(optics, wavelength, options)?;
                Ok((up, down, self.column.absorption(optics, wavelength)?))
            }
        }
    }

    /// Assemble columns solved at each of the model's wavelengths.
    pub(crate) fn irradiance(
        &self,
        columns: Vec<SpectralColumn>,
    ) -> Result<SpectralIrradiance, RtmError> {
        if columns.len() != self.wavelengths.len() {
            return Err(RtmError::InconsistentInputs);
        }
        let (upwelling, downwelling, absorption) = stack_columns(self.column.grid.len(), columns);
        SpectralIrradiance::new(
            self.column.grid.clone(),
            self.wavelengths.clone(),
            upwelling,
            downwelling,
            absorption,
            self.column.ice_base_index(),
        )
    }
}
