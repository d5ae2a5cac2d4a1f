//! Closed form two-stream solutions for ice built from uniform layers
//!
//! A model is an immutable set of physical parameters. Looking it up at one
//! wavelength gives a [`ClosedFormField`], which holds the resolved optical
//! properties and solution coefficients and can be evaluated at any depth
//! without touching the optics again.

mod piecewise;
mod single_layer;
mod two_layer;

use log::debug;
use ndarray::ArrayView1;
use rayon::prelude::*;

use crate::{
    error::RtmError,
    grid::VerticalGrid,
    irradiance::{stack_columns, SpectralColumn, SpectralIrradiance},
    optics::OpticalPropertyProvider,
};

pub use self::piecewise::Piecewise;
pub use self::single_layer::{SingleLayerModel, UniformSlab};
pub use self::two_layer::{StackedSlabs, TwoLayerModel};

/// Median oil droplet radius in µm used unless a model says otherwise.
pub const DEFAULT_DROPLET_RADIUS: f64 = 0.5;

/// Radiation field at a single wavelength with a closed form.
///
/// Depths are elevations in m below the ice surface at 0.
pub trait ClosedFormField {
    /// Upwelling irradiance.
    fn upwelling(&self, z: f64) -> f64;

    /// Downwelling irradiance.
    fn downwelling(&self, z: f64) -> f64;

    /// Absorption coefficient in 1/m.
    fn absorption(&self, z: f64) -> f64;

    /// Albedo.
    fn albedo(&self) -> f64;

    /// Downwelling irradiance at the base.
    fn transmittance(&self) -> f64;

    /// Downwelling minus upwelling.
    fn net_radiation(&self, z: f64) -> f64 {
        self.downwelling(z) - self.upwelling(z)
    }

    /// Radiative heating in 1/m, `k (U + D)`.
    fn heating(&self, z: f64) -> f64 {
        self.absorption(z) * (self.upwelling(z) + self.downwelling(z))
    }
}

/// A model of uniform ice layers with a closed form solution.
pub trait AnalyticalModel: Sync {
    /// Solution at one wavelength.
    type Field: ClosedFormField + Send;

    /// Total ice thickness in m.
    fn thickness(&self) -> f64;

    /// Resolve the optics at `wavelength` (nm).
    fn field(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<Self::Field, RtmError>;

    /// Check `z` lies in the ice.
    fn check_depth(&self, z: f64) -> Result<f64, RtmError> {
        let bottom = -self.thickness();
        if (bottom..=0.).contains(&z) {
            Ok(z)
        } else {
            Err(RtmError::DepthOutOfRange { z, bottom, top: 0. })
        }
    }

    /// Upwelling irradiance at `z` and `wavelength`.
    fn upwelling(
        &self,
        optics: &dyn OpticalPropertyProvider,
        z: f64,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        let z = self.check_depth(z)?;
        Ok(self.field(optics, wavelength)?.upwelling(z))
    }

    /// Downwelling irradiance at `z` and `wavelength`.
    fn downwelling(
        &self,
        optics: &dyn OpticalPropertyProvider,
        z: f64,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        let z = self.check_depth(z)?;
        Ok(self.field(optics, wavelength)?.downwelling(z))
    }

    /// Net irradiance at `z` and `wavelength`.
    fn net_radiation(
        &self,
        optics: &dyn OpticalPropertyProvider,
        z: f64,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        let z = self.check_depth(z)?;
        Ok(self.field(optics, wavelength)?.net_radiation(z))
    }

    /// Radiative heating at `z` and `wavelength`.
    fn heating(
        &self,
        optics: &dyn OpticalPropertyProvider,
        z: f64,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        let z = self.check_depth(z)?;
        Ok(self.field(optics, wavelength)?.heating(z))
    }

    /// Spectral albedo.
    fn albedo(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        Ok(self.field(optics, wavelength)?.albedo())
    }

    /// Spectral transmittance at the ice base.
    fn transmittance(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        Ok(self.field(optics, wavelength)?.transmittance())
    }

    /// Evaluate the irradiance fields on `grid` at each of `wavelengths`.
    ///
    /// The grid must lie within the ice. Wavelengths are resolved in
    /// parallel on the current rayon pool.
    fn sample(
        &self,
        optics: &dyn OpticalPropertyProvider,
        grid: &VerticalGrid,
        wavelengths: ArrayView1<'_, f64>,
    ) -> Result<SpectralIrradiance, RtmError> {
        self.check_depth(grid.bottom())?;
        self.check_depth(grid.top())?;
        debug!(
            "sampling closed form solution at {} depths and {} wavelengths",
            grid.len(),
            wavelengths.len()
        );

        let mut columns = Vec::new();
        wavelengths
            .to_vec()
            .into_par_iter()
            .map(|wavelength| -> Result<SpectralColumn, RtmError> {
                let field = self.field(optics, wavelength)?;
                let z = grid.z();
                Ok((
                    z.mapv(|z| field.upwelling(z)),
                    z.mapv(|z| field.downwelling(z)),
                    z.mapv(|z| field.absorption(z)),
                ))
            })
            .collect_into_vec(&mut columns);
        let columns = columns.into_iter().collect::<Result<Vec<_>, _>>()?;

        let (upwelling, downwelling, absorption) = stack_columns(grid.len(), columns);
        SpectralIrradiance::new(
            grid.clone(),
            wavelengths.to_owned(),
            upwelling,
            downwelling,
            absorption,
            0,
        )
    }
}

/// Reject thicknesses that aren't positive and finite.
pub(crate) fn check_thickness(name: &'static str, value: f64) -> Result<f64, RtmError> {
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(RtmError::NonPositiveThickness { name, value })
    }
}
