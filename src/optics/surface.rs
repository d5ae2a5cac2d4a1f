//! Band optical properties of the snow cover and the surface scattering layer
//! (SSL) for the six band model.
//!
//! Visible band values are taken at the band midpoints (450, 550, 650 nm),
//! the UV band uses the value extrapolated to 350 nm and the 700-1200 nm band
//! the value at 950 nm. Radiation in the 1200-3000 nm band is taken to be
//! absorbed at the surface, so its extinction is set very large and its
//! albedo to zero.

use crate::error::RtmError;

/// Number of wavelength bands in the six band model.
pub const NUM_BANDS: usize = 6;

/// Wavelength limits in nm of each band.
pub const WAVELENGTH_BANDS: [(f64, f64); NUM_BANDS] = [
    (300., 400.),
    (400., 500.),
    (500., 600.),
    (600., 700.),
    (700., 1200.),
    (1200., 3000.),
];

/// Wavelength in nm at which the ice and oil optics of each band are
/// evaluated. The last band is never solved so it has no representative
/// wavelength of its own; the band midpoint is given for completeness.
pub const BAND_REPRESENTATIVE_WAVELENGTHS: [f64; NUM_BANDS] =
    [350., 450., 550., 650., 950., 2100.];

/// Fraction of the incident broadband shortwave in each band under a cloudy
/// sky, from figure 11 of Grenfell & Perovich (2004) integrated over each band.
pub const CLOUDY_SKY_FRACTIONS: [f64; NUM_BANDS] = [0.086, 0.217, 0.196, 0.155, 0.301, 0.045];

/// Index of the band where everything is absorbed at the surface.
pub const SURFACE_ABSORBED_BAND: usize = 5;

/// E-folding depth in m over which snow albedo saturates.
const SNOW_ALBEDO_DECAY_LENGTH: f64 = 0.02;

/// Stand-in for an infinite extinction coefficient in 1/m.
const LARGE_EXTINCTION: f64 = 1000.;

/// Optically thick snow albedo in each band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SnowAlbedos {
    /// Digitised from figure 10 of Grenfell & Perovich (2004)
    #[default]
    GrenfellPerovich2004,
    /// Caller supplied values
    Custom([f64; NUM_BANDS]),
}

/// Snow extinction coefficient in 1/m in each band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SnowExtinctionCoefficients {
    /// Dry snow, figure 2 of Perovich (1990)
    #[default]
    Perovich1990,
    /// Caller supplied values
    Custom([f64; NUM_BANDS]),
}

/// Optically thick SSL albedo in each band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SslAlbedos {
    /// Figure 2 of Smith et al. (2022), ice with a 4 cm SSL before shovelling
    #[default]
    Smith2022,
    /// Caller supplied values
    Custom([f64; NUM_BANDS]),
}

/// SSL extinction coefficient in 1/m in each band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SslExtinctionCoefficients {
    /// Figure 2 of Perovich (1990)
    #[default]
    Perovich1990,
    /// Caller supplied values
    Custom([f64; NUM_BANDS]),
}

impl SnowAlbedos {
    /// Per band values.
    pub fn values(&self) -> [f64; NUM_BANDS] {
        match self {
            Self::GrenfellPerovich2004 => [0.92, 0.96, 0.98, 0.98, 0.89, 0.],
            Self::Custom(values) => *values,
        }
    }
}

impl SnowExtinctionCoefficients {
    /// Per band values.
    pub fn values(&self) -> [f64; NUM_BANDS] {
        match self {
            Self::Perovich1990 => [16.02, 15.55, 18.7, 30.15, 125.18, LARGE_EXTINCTION],
            Self::Custom(values) => *values,
        }
    }
}

impl SslAlbedos {
    /// Per band values.
    pub fn values(&self) -> [f64; NUM_BANDS] {
        match self {
            Self::Smith2022 => [0.79, 0.8, 0.79, 0.75, 0.5, 0.],
            Self::Custom(values) => *values,
        }
    }
}

impl SslExtinctionCoefficients {
    /// Per band values.
    pub fn values(&self) -> [f64; NUM_BANDS] {
        match self {
            Self::Perovich1990 => [3.02, 3.09, 4.21, 7.70, 85.56, LARGE_EXTINCTION],
            Self::Custom(values) => *values,
        }
    }
}

/// Snow and SSL cover over the ice, with the parameter sets used for its
/// band optics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceCover {
    snow_depth: f64,
    ssl_depth: f64,
    snow_albedos: [f64; NUM_BANDS],
    snow_extinction: [f64; NUM_BANDS],
    ssl_albedos: [f64; NUM_BANDS],
    ssl_extinction: [f64; NUM_BANDS],
}

impl SurfaceCover {
    /// Cover with `snow_depth` and `ssl_depth` in m using the default
    /// parameter sets.
    pub fn new(snow_depth: f64, ssl_depth: f64) -> Result<Self, RtmError> {
        Self::with_parameters(
            snow_depth,
            ssl_depth,
            SnowAlbedos::default(),
            SnowExtinctionCoefficients::default(),
            SslAlbedos::default(),
            SslExtinctionCoefficients::default(),
        )
    }

    /// Bare ice: no snow and no SSL.
    pub fn bare() -> Self {
        Self {
            snow_depth: 0.,
            ssl_depth: 0.,
            snow_albedos: SnowAlbedos::default().values(),
            snow_extinction: SnowExtinctionCoefficients::default().values(),
            ssl_albedos: SslAlbedos::default().values(),
            ssl_extinction: SslExtinctionCoefficients::default().values(),
        }
    }

    /// Cover with explicit parameter sets.
    pub fn with_parameters(
        snow_depth: f64,
        ssl_depth: f64,
        snow_albedos: SnowAlbedos,
        snow_extinction: SnowExtinctionCoefficients,
        ssl_albedos: SslAlbedos,
        ssl_extinction: SslExtinctionCoefficients,
    ) -> Result<Self, RtmError> {
        check_depth("snow depth", snow_depth)?;
        check_depth("SSL depth", ssl_depth)?;
        Ok(Self {
            snow_depth,
            ssl_depth,
            snow_albedos: snow_albedos.values(),
            snow_extinction: snow_extinction.values(),
            ssl_albedos: ssl_albedos.values(),
            ssl_extinction: ssl_extinction.values(),
        })
    }

    /// Snow depth in m.
    pub fn snow_depth(&self) -> f64 {
        self.snow_depth
    }

    /// SSL depth in m.
    pub fn ssl_depth(&self) -> f64 {
        self.ssl_depth
    }

    /// Snow albedo in `band`.
    pub fn snow_albedo(&self, band: usize) -> Result<f64, RtmError> {
        snow_band_albedo(self.snow_depth, check_band(band)?, &self.snow_albedos)
    }

    /// Fraction of incident radiation in `band` transmitted through the snow.
    pub fn snow_transmittance(&self, band: usize) -> Result<f64, RtmError> {
        let albedo = self.snow_albedo(band)?;
        Ok((1. - albedo) * f64::exp(-self.snow_extinction[band] * self.snow_depth))
    }

    /// SSL albedo in `band`.
    pub fn ssl_albedo(&self, band: usize) -> Result<f64, RtmError> {
        ssl_band_albedo(self.ssl_depth, check_band(band)?, &self.ssl_albedos)
    }

    /// Fraction of radiation in `band` transmitted through the SSL.
    pub fn ssl_transmittance(&self, band: usize) -> Result<f64, RtmError> {
        let albedo = self.ssl_albedo(band)?;
        Ok((1. - albedo) * f64::exp(-self.ssl_extinction[band] * self.ssl_depth))
    }

    /// Fraction of the incident radiation in `band` reaching the ice surface.
    pub fn surface_transmittance(&self, band: usize) -> Result<f64, RtmError> {
        Ok(self.snow_transmittance(band)? * self.ssl_transmittance(band)?)
    }

    /// Band albedo of snow, SSL and ice together given the ice albedo (the
    /// upwelling irradiance leaving the ice surface).
    pub fn combined_albedo(&self, band: usize, ice_albedo: f64) -> Result<f64, RtmError> {
        let snow_transmittance = self.snow_transmittance(band)?;
        Ok(self.snow_albedo(band)?
            + snow_transmittance * self.ssl_albedo(band)?
            + snow_transmittance * self.ssl_transmittance(band)? * ice_albedo)
    }
}

fn check_depth(name: &'static str, value: f64) -> Result<f64, RtmError> {
    if value.is_nan() || value < 0. {
        Err(RtmError::NegativeDepth { name, value })
    } else {
        Ok(value)
    }
}

fn check_band(band: usize) -> Result<usize, RtmError> {
    if band < NUM_BANDS {
        Ok(band)
    } else {
        Err(RtmError::InvalidBand(band))
    }
}

/// Albedo of a snow layer `depth` m thick, saturating towards the optically
/// thick value.
pub(crate) fn snow_band_albedo(
    depth: f64,
    band: usize,
    albedos: &[f64; NUM_BANDS],
) -> Result<f64, RtmError> {
    let depth = check_depth("snow depth", depth)?;
    Ok(albedos[check_band(band)?] * (1. - f64::exp(-depth / SNOW_ALBEDO_DECAY_LENGTH)))
}

/// Albedo of an SSL `depth` m thick. Any SSL at all reflects the full
/// optically thick value; a missing SSL reflects nothing.
pub(crate) fn ssl_band_albedo(
    depth: f64,
    band: usize,
    albedos: &[f64; NUM_BANDS],
) -> Result<f64, RtmError> {
    let band = check_band(band)?;
    match check_depth("SSL depth", depth)? {
        depth if depth > 0. => Ok(albedos[band]),
        _ => Ok(0.),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn band_fractions_sum_to_one() {
        assert_relative_eq!(CLOUDY_SKY_FRACTIONS.iter().sum::<f64>(), 1., epsilon = 1e-12);
    }

    #[test]
    fn no_ssl_means_no_attenuation() {
        let cover = SurfaceCover::new(0.1, 0.).unwrap();
        for band in 0..NUM_BANDS {
            assert_eq!(cover.ssl_albedo(band).unwrap(), 0.);
            assert_eq!(cover.ssl_transmittance(band).unwrap(), 1.);
        }
    }

    #[test]
    fn negative_depths_are_rejected() {
        assert!(matches!(
            SurfaceCover::new(0., -0.01),
            Err(RtmError::NegativeDepth { .. })
        ));
        assert!(matches!(
            SurfaceCover::new(-0.01, 0.),
            Err(RtmError::NegativeDepth { .. })
        ));
        assert!(ssl_band_albedo(-1., 0, &SslAlbedos::Smith2022.values()).is_err());
    }

    #[test]
    fn thick_snow_saturates() {
        let cover = SurfaceCover::new(1., 0.).unwrap();
        assert_relative_eq!(cover.snow_albedo(1).unwrap(), 0.96, max_relative = 1e-12);
        // Almost nothing reaches the ice through a metre of snow
        assert!(cover.snow_transmittance(1).unwrap() < 1e-6);
    }

    #[test]
    fn bare_ice_combined_albedo_is_ice_albedo() {
        let cover = SurfaceCover::bare();
        for band in 0..NUM_BANDS {
            assert_eq!(cover.surface_transmittance(band).unwrap(), 1.);
            assert_relative_eq!(cover.combined_albedo(band, 0.4).unwrap(), 0.4);
        }
    }

    #[test]
    fn combined_albedo_decomposition() {
        let cover = SurfaceCover::new(0.05, 0.04).unwrap();
        let band = 2;
        let ts = cover.snow_transmittance(band).unwrap();
        let expected = cover.snow_albedo(band).unwrap()
            + ts * 0.79
            + ts * cover.ssl_transmittance(band).unwrap() * 0.3;
        assert_relative_eq!(cover.combined_albedo(band, 0.3).unwrap(), expected);
        assert!(matches!(cover.snow_albedo(6), Err(RtmError::InvalidBand(6))));
    }
}
