//! Optical properties of sea ice containing oil droplets
//!
//! The solvers only see absorption and scattering coefficients in 1/m. Where
//! those come from is behind [`OpticalPropertyProvider`]; [`TabulatedOptics`]
//! is the default, backed by tables that are built once per process and then
//! shared read-only.

mod ice;
mod oil;
mod surface;

use std::str::FromStr;

use num_complex::Complex64;

use crate::error::{check_non_negative, RtmError};

pub use self::surface::{
    SnowAlbedos, SnowExtinctionCoefficients, SslAlbedos, SslExtinctionCoefficients, SurfaceCover,
    BAND_REPRESENTATIVE_WAVELENGTHS, CLOUDY_SKY_FRACTIONS, NUM_BANDS, SURFACE_ABSORBED_BAND,
    WAVELENGTH_BANDS,
};

/// Bulk density of sea ice in kg/m³ (Redmond Roche et al. 2022).
pub const ICE_DENSITY: f64 = 800.;

/// Asymmetry parameter of ice scattering (Redmond Roche et al. 2022).
const ICE_ASYMMETRY_PARAMETER: f64 = 0.98;

/// Source of wavelength dependent optical data.
pub trait OpticalPropertyProvider: Send + Sync {
    /// Wavelength range in nm over which all the data is available.
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index of pure ice at `wavelength` in nm.
    fn ice_refractive_index(&self, wavelength: f64) -> Result<Complex64, RtmError>;

    /// Absorption coefficient of pure ice in 1/m.
    ///
    /// Default implementation derives it from the imaginary part of the
    /// refractive index.
    fn ice_absorption(&self, wavelength: f64) -> Result<f64, RtmError> {
        let index = self.ice_refractive_index(wavelength)?;
        Ok(4. * std::f64::consts::PI * index.im / (wavelength * 1e-9))
    }

    /// Mass absorption coefficient of oil in m²/g for droplets with median
    /// radius `droplet_radius` in µm.
    fn oil_mass_absorption(&self, wavelength: f64, droplet_radius: f64)
        -> Result<f64, RtmError>;
}

/// Optical data from the built-in tables: Warren & Brandt (2008) ice and
/// Romashkino crude oil.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabulatedOptics;

impl OpticalPropertyProvider for TabulatedOptics {
    fn wavelength_range(&self) -> (f64, f64) {
        let (ice_min, ice_max) = ice::ice_wavelength_range();
        let (oil_min, oil_max) = oil::oil_wavelength_range();
        (ice_min.max(oil_min), ice_max.min(oil_max))
    }

    fn ice_refractive_index(&self, wavelength: f64) -> Result<Complex64, RtmError> {
        ice::ice_refractive_index(wavelength)
    }

    fn oil_mass_absorption(
        &self,
        wavelength: f64,
        droplet_radius: f64,
    ) -> Result<f64, RtmError> {
        oil::oil_mass_absorption_coefficient(wavelength, droplet_radius)
    }
}

/// Ice types with distinct (wavelength independent) scattering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IceType {
    /// First year ice
    Fyi,
    /// Multi year ice
    Myi,
    /// Melting ice
    Melt,
}

impl IceType {
    /// Scattering coefficient in 1/m.
    pub fn scattering_coefficient(&self) -> f64 {
        // Scattering mass cross section in m²/kg
        let cross_section = match self {
            Self::Fyi => 0.15,
            Self::Myi => 0.75,
            Self::Melt => 0.03,
        };
        0.5 * (1. - ICE_ASYMMETRY_PARAMETER) * ICE_DENSITY * cross_section
    }
}

impl FromStr for IceType {
    type Err = RtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FYI" => Ok(Self::Fyi),
            "MYI" => Ok(Self::Myi),
            "MELT" => Ok(Self::Melt),
            _ => Err(RtmError::UnknownIceType(s.to_string())),
        }
    }
}

/// How oil in the ice absorbs at one wavelength.
///
/// Absorption at an oil mass ratio `c` (ng oil / g ice) is
/// `ice + per_mass_ratio * c`, so profiles only need the two numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OilyIceAbsorption {
    /// Absorption coefficient of pure ice in 1/m
    pub ice: f64,
    /// Extra absorption in 1/m per ng/g of oil
    pub per_mass_ratio: f64,
}

impl OilyIceAbsorption {
    /// Look up the coefficients at `wavelength` in nm.
    ///
    /// `enhancement` scales the oil absorption to account for the two-stream
    /// approximation of the droplet radiation field; use 1 for none.
    pub fn new(
        optics: &(impl OpticalPropertyProvider + ?Sized),
        wavelength: f64,
        droplet_radius: f64,
        enhancement: f64,
    ) -> Result<Self, RtmError> {
        let enhancement = check_non_negative("absorption enhancement factor", enhancement)?;
        let ice = optics.ice_absorption(wavelength)?;
        let mac = optics.oil_mass_absorption(wavelength, droplet_radius)?;
        // ng/g -> kg/kg, then kg/m³ -> g/m³ to match the MAC units of m²/g
        let per_mass_ratio = enhancement * 1e-9 * ICE_DENSITY * 1e3 * mac;
        Ok(Self {
            ice,
            per_mass_ratio,
        })
    }

    /// Absorption coefficient in 1/m at `oil_mass_ratio` ng/g.
    pub fn at(&self, oil_mass_ratio: f64) -> f64 {
        self.ice + self.per_mass_ratio * oil_mass_ratio
    }
}

/// Two-stream extinction coefficient `sqrt(k² + 2kr)` in 1/m.
pub fn extinction_coefficient(absorption: f64, scattering: f64) -> f64 {
    f64::sqrt(absorption * (absorption + 2. * scattering))
}

/// Scattering coefficient in 1/m of a mushy cell with `liquid_fraction`
/// between 0 (ice) and 1 (liquid, which doesn't scatter).
pub fn mushy_scattering(liquid_fraction: f64, ice_scattering: f64) -> f64 {
    ice_scattering * (1. - liquid_fraction.clamp(0., 1.))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ice_type_scattering() {
        assert_relative_eq!(IceType::Fyi.scattering_coefficient(), 1.2, max_relative = 1e-12);
        assert_relative_eq!(IceType::Myi.scattering_coefficient(), 6.0, max_relative = 1e-12);
        assert_relative_eq!(IceType::Melt.scattering_coefficient(), 0.24, max_relative = 1e-12);
        assert_eq!("fyi".parse::<IceType>().unwrap(), IceType::Fyi);
        assert!("slush".parse::<IceType>().is_err());
    }

    #[test]
    fn oil_adds_absorption() {
        let clean = OilyIceAbsorption::new(&TabulatedOptics, 500., 0.5, 1.).unwrap();
        let enhanced = OilyIceAbsorption::new(&TabulatedOptics, 500., 0.5, 2.).unwrap();
        assert_relative_eq!(clean.at(0.), clean.ice);
        // 1000 ng/g at 0.3495 m²/g gives 0.8 * 0.3495 1/m of extra absorption
        assert_relative_eq!(clean.at(1000.) - clean.ice, 0.8 * 0.3495, max_relative = 1e-9);
        assert_relative_eq!(
            enhanced.at(1000.) - enhanced.ice,
            2. * (clean.at(1000.) - clean.ice),
            max_relative = 1e-12
        );
        assert!(OilyIceAbsorption::new(&TabulatedOptics, 500., 0.5, -1.).is_err());
    }

    #[test]
    fn extinction_is_never_below_absorption() {
        for (k, r) in [(0.1, 1.2), (10., 0.), (1e-4, 6.)] {
            let mu = extinction_coefficient(k, r);
            assert!(mu >= k);
            assert_relative_eq!(mu * mu, k * k + 2. * k * r, max_relative = 1e-12);
        }
    }

    #[test]
    fn liquid_does_not_scatter() {
        assert_relative_eq!(mushy_scattering(0., 1.5), 1.5);
        assert_relative_eq!(mushy_scattering(0.25, 1.5), 1.125);
        assert_relative_eq!(mushy_scattering(1., 1.5), 0.);
    }
}
