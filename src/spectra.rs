//! Incident shortwave spectra

use std::f64::consts::PI;

use crate::error::RtmError;

/// Planck constant in J s
pub const PLANCK: f64 = 6.62607015e-34;
/// Speed of light in m/s
pub const LIGHTSPEED: f64 = 299792458.;
/// Boltzmann constant in J/K
pub const BOLTZMANN: f64 = 1.380649e-23;
/// Mean Earth-Sun distance in m
const AU: f64 = 1.496e11;
/// Radius of the Sun in m
const SUN_RADIUS: f64 = 6.95e8;
/// Effective black body temperature of the Sun in K
const SOLAR_TEMPERATURE: f64 = 5782.;

/// Gauss-Legendre panels used to normalise a spectrum.
const QUADRATURE_PANELS: usize = 400;

/// An incident spectrum, normalised so that it integrates to 1 over the
/// wavelengths of interest.
pub trait IncidentSpectrum: Sync {
    /// Spectral weight in 1/nm at `wavelength` in nm.
    fn irradiance(&self, wavelength: f64) -> Result<f64, RtmError>;
}

impl<F> IncidentSpectrum for F
where
    F: Fn(f64) -> f64 + Sync,
{
    fn irradiance(&self, wavelength: f64) -> Result<f64, RtmError> {
        Ok(self(wavelength))
    }
}

/// Black body spectral radiance in W/m²/sr/m at `wavelength` in m.
fn planck(wavelength: f64, temperature: f64) -> f64 {
    let exponent = PLANCK * LIGHTSPEED / (BOLTZMANN * wavelength * temperature);
    2. * PLANCK * LIGHTSPEED.powi(2) / wavelength.powi(5) / f64::exp_m1(exponent)
}

/// Top of atmosphere solar irradiance in W/m²/nm at `wavelength` in nm,
/// treating the Sun as a black body.
pub fn top_of_atmosphere_irradiance(wavelength: f64) -> f64 {
    planck(wavelength * 1e-9, SOLAR_TEMPERATURE) * (SUN_RADIUS / AU).powi(2) * PI * 1e-9
}

/// Total top of atmosphere solar irradiance in W/m² over all wavelengths,
/// from the Stefan-Boltzmann law.
pub fn total_top_of_atmosphere_irradiance() -> f64 {
    let stefan_boltzmann =
        2. * PI.powi(5) * BOLTZMANN.powi(4) / (15. * PLANCK.powi(3) * LIGHTSPEED.powi(2));
    stefan_boltzmann * SOLAR_TEMPERATURE.powi(4) * (SUN_RADIUS / AU).powi(2)
}

/// Nodes and weights of composite 5 point Gauss-Legendre quadrature over
/// `[a, b]`.
pub(crate) fn gauss_legendre_nodes(
    a: f64,
    b: f64,
    panels: usize,
) -> impl Iterator<Item = (f64, f64)> {
    const NODES: [f64; 5] = [
        -0.906_179_845_938_664,
        -0.538_469_310_105_683,
        0.,
        0.538_469_310_105_683,
        0.906_179_845_938_664,
    ];
    const WEIGHTS: [f64; 5] = [
        0.236_926_885_056_189,
        0.478_628_670_499_366,
        0.568_888_888_888_889,
        0.478_628_670_499_366,
        0.236_926_885_056_189,
    ];

    let width = (b - a) / panels as f64;
    (0..panels).flat_map(move |panel| {
        let centre = a + (panel as f64 + 0.5) * width;
        NODES
            .into_iter()
            .zip(WEIGHTS)
            .map(move |(x, w)| (centre + 0.5 * width * x, 0.5 * width * w))
    })
}

fn gauss_legendre(f: impl Fn(f64) -> f64, a: f64, b: f64, panels: usize) -> f64 {
    gauss_legendre_nodes(a, b, panels).map(|(x, w)| w * f(x)).sum()
}

/// Solar black body spectrum normalised to integrate to 1 between `min` and
/// `max` (nm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackBodySpectrum {
    min: f64,
    max: f64,
    total: f64,
}

impl BlackBodySpectrum {
    /// Spectrum over `[min, max]` nm.
    pub fn new(min: f64, max: f64) -> Result<Self, RtmError> {
        if !(min > 0. && max > min && max.is_finite()) {
            return Err(RtmError::InvalidParameter {
                name: "spectrum wavelength range",
                value: max - min,
            });
        }
        let total = gauss_legendre(top_of_atmosphere_irradiance, min, max, QUADRATURE_PANELS);
        Ok(Self { min, max, total })
    }

    /// Lower limit in nm.
    pub fn min_wavelength(&self) -> f64 {
        self.min
    }

    /// Upper limit in nm.
    pub fn max_wavelength(&self) -> f64 {
        self.max
    }

    /// Top of atmosphere irradiance in W/m² between the limits.
    pub fn total_irradiance(&self) -> f64 {
        self.total
    }
}

impl IncidentSpectrum for BlackBodySpectrum {
    fn irradiance(&self, wavelength: f64) -> Result<f64, RtmError> {
        if !(self.min..=self.max).contains(&wavelength) {
            return Err(RtmError::WavelengthOutOfRange {
                wavelength,
                min: self.min,
                max: self.max,
            });
        }
        Ok(top_of_atmosphere_irradiance(wavelength) / self.total)
    }
}

/// Atmospheric conditions, as a factor scaling the top of atmosphere
/// spectrum to the surface. Ignores spectral features such as ozone
/// absorption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SkyCondition {
    /// No atmosphere
    TopOfAtmosphere,
    /// Very clear atmosphere, sun at zenith
    VeryClearZenith,
    /// Clear atmosphere, sun at 60°
    Clear60,
    /// Hazy atmosphere, sun at 60°
    #[default]
    Hazy60,
    /// Hazy atmosphere, sun near the horizon
    HazyHorizon,
    /// Heavy overcast, sun at zenith
    OvercastZenith,
    /// Heavy overcast, sun near the horizon
    OvercastHorizon,
}

impl SkyCondition {
    /// Fraction of the top of atmosphere irradiance reaching the surface.
    pub fn factor(&self) -> f64 {
        match self {
            Self::TopOfAtmosphere => 1.,
            Self::VeryClearZenith => 500. / 522.,
            Self::Clear60 => 250. / 522.,
            Self::Hazy60 => 175. / 522.,
            Self::HazyHorizon => 50. / 522.,
            Self::OvercastZenith => 125. / 522.,
            Self::OvercastHorizon => 10. / 522.,
        }
    }

    /// Surface solar irradiance in W/m²/nm at `wavelength` in nm.
    pub fn solar_irradiance(&self, wavelength: f64) -> f64 {
        self.factor() * top_of_atmosphere_irradiance(wavelength)
    }
}
