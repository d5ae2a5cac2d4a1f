//! Irradiance fields and their spectral integration
//!
//! All irradiances are non-dimensional: they are fractions of the incident
//! downwelling irradiance at the surface and have to be multiplied by the
//! incident spectrum (or broadband shortwave) to get W/m².

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{
    error::RtmError,
    grid::{trapezoid, VerticalGrid},
    optics::{SurfaceCover, CLOUDY_SKY_FRACTIONS, NUM_BANDS},
    spectra::{IncidentSpectrum, LIGHTSPEED, PLANCK},
};

/// Avogadro's number as used for photon counting.
const MOLE: f64 = 6.023e23;

/// Bands covering photosynthetically active radiation (400-700 nm).
const PAR_BANDS: std::ops::Range<usize> = 1..4;

/// Integral of `λ · w(λ)` over each PAR band, with `w` the normalised cloudy
/// sky spectrum, in m. Converts band irradiance to photon flux.
const PAR_WEIGHTINGS: [f64; 3] = [
    9.809215701925024e-08,
    1.0750608149135324e-07,
    1.0006054876321231e-07,
];

/// Upwelling, downwelling and absorption coefficient on the grid at one
/// wavelength or band.
pub(crate) type SpectralColumn = (Array1<f64>, Array1<f64>, Array1<f64>);

/// Stack columns side by side into (depth, column) upwelling, downwelling
/// and absorption arrays.
pub(crate) fn stack_columns(
    num_points: usize,
    columns: Vec<SpectralColumn>,
) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
    let shape = (num_points, columns.len());
    let mut upwelling = Array2::zeros(shape);
    let mut downwelling = Array2::zeros(shape);
    let mut absorption = Array2::zeros(shape);
    for (index, (up, down, k)) in columns.into_iter().enumerate() {
        upwelling.index_axis_mut(Axis(1), index).assign(&up);
        downwelling.index_axis_mut(Axis(1), index).assign(&down);
        absorption.index_axis_mut(Axis(1), index).assign(&k);
    }
    (upwelling, downwelling, absorption)
}

fn check_shape(
    grid: &VerticalGrid,
    num_columns: usize,
    fields: [&Array2<f64>; 3],
    ice_base_index: usize,
) -> Result<(), RtmError> {
    let expected = (grid.len(), num_columns);
    if fields.iter().any(|f| f.dim() != expected) || ice_base_index >= grid.len() {
        return Err(RtmError::InconsistentInputs);
    }
    Ok(())
}

/// Radiative heating `k (U + D)`.
fn heating(
    absorption: &Array2<f64>,
    upwelling: &Array2<f64>,
    downwelling: &Array2<f64>,
) -> Array2<f64> {
    absorption * &(upwelling + downwelling)
}

/// Upwelling and downwelling irradiance at each depth and wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralIrradiance {
    grid: VerticalGrid,
    wavelengths: Array1<f64>,
    upwelling: Array2<f64>,
    downwelling: Array2<f64>,
    absorption: Array2<f64>,
    ice_base_index: usize,
}

impl SpectralIrradiance {
    /// Wrap fields dimensioned as (depth, wavelength), with the absorption
    /// coefficient in 1/m the irradiance was solved with.
    ///
    /// `ice_base_index` is the grid index transmittance is reported at.
    pub fn new(
        grid: VerticalGrid,
        wavelengths: Array1<f64>,
        upwelling: Array2<f64>,
        downwelling: Array2<f64>,
        absorption: Array2<f64>,
        ice_base_index: usize,
    ) -> Result<Self, RtmError> {
        check_shape(
            &grid,
            wavelengths.len(),
            [&upwelling, &downwelling, &absorption],
            ice_base_index,
        )?;
        Ok(Self {
            grid,
            wavelengths,
            upwelling,
            downwelling,
            absorption,
            ice_base_index,
        })
    }

    /// Vertical grid.
    pub fn grid(&self) -> &VerticalGrid {
        &self.grid
    }

    /// Elevations in m.
    pub fn z(&self) -> ArrayView1<'_, f64> {
        self.grid.z()
    }

    /// Wavelengths in nm.
    pub fn wavelengths(&self) -> ArrayView1<'_, f64> {
        self.wavelengths.view()
    }

    /// Upwelling irradiance, (depth, wavelength).
    pub fn upwelling(&self) -> ArrayView2<'_, f64> {
        self.upwelling.view()
    }

    /// Downwelling irradiance, (depth, wavelength).
    pub fn downwelling(&self) -> ArrayView2<'_, f64> {
        self.downwelling.view()
    }

    /// Absorption coefficient in 1/m, (depth, wavelength).
    pub fn absorption(&self) -> ArrayView2<'_, f64> {
        self.absorption.view()
    }

    /// Grid index of the ice base.
    pub fn ice_base_index(&self) -> usize {
        self.ice_base_index
    }

    /// Downwelling minus upwelling.
    pub fn net_irradiance(&self) -> Array2<f64> {
        &self.downwelling - &self.upwelling
    }

    /// Spectral albedo: the upwelling irradiance at the surface.
    pub fn albedo(&self) -> Array1<f64> {
        self.upwelling.row(self.grid.surface_index()).to_owned()
    }

    /// Spectral transmittance at the ice base.
    pub fn transmittance(&self) -> Array1<f64> {
        self.downwelling.row(self.ice_base_index).to_owned()
    }

    /// Spectral radiative heating `k (U + D)` in 1/m.
    pub fn heating(&self) -> Array2<f64> {
        heating(&self.absorption, &self.upwelling, &self.downwelling)
    }

    /// Integrate over wavelength weighted by a normalised incident spectrum,
    /// using the trapezoidal rule.
    pub fn integrate(&self, spectrum: &dyn IncidentSpectrum) -> Result<Irradiance, RtmError> {
        let weights = self
            .wavelengths
            .iter()
            .map(|&w| spectrum.irradiance(w))
            .collect::<Result<Array1<f64>, _>>()?;

        let integrate = |field: &Array2<f64>| -> Array1<f64> {
            field
                .axis_iter(Axis(0))
                .map(|row| {
                    trapezoid(
                        row.iter().zip(&weights).map(|(v, w)| v * w),
                        self.wavelengths.view(),
                    )
                })
                .collect()
        };

        Ok(Irradiance {
            grid: self.grid.clone(),
            upwelling: integrate(&self.upwelling),
            downwelling: integrate(&self.downwelling),
            heating: integrate(&self.heating()),
            ice_base_index: self.ice_base_index,
        })
    }
}

/// Upwelling and downwelling irradiance at each depth in each of the six
/// wavelength bands, under a snow and SSL cover.
///
/// Radiation absorbed above the ice has no absorption coefficient in the ice
/// so doesn't contribute to its heating.
#[derive(Debug, Clone, PartialEq)]
pub struct SixBandSpectralIrradiance {
    grid: VerticalGrid,
    upwelling: Array2<f64>,
    downwelling: Array2<f64>,
    absorption: Array2<f64>,
    cover: SurfaceCover,
    albedo: [f64; NUM_BANDS],
    ice_base_index: usize,
}

impl SixBandSpectralIrradiance {
    /// Wrap fields dimensioned as (depth, band) in the ice below `cover`.
    pub fn new(
        grid: VerticalGrid,
        upwelling: Array2<f64>,
        downwelling: Array2<f64>,
        absorption: Array2<f64>,
        cover: SurfaceCover,
        ice_base_index: usize,
    ) -> Result<Self, RtmError> {
        check_shape(
            &grid,
            NUM_BANDS,
            [&upwelling, &downwelling, &absorption],
            ice_base_index,
        )?;
        let surface = grid.surface_index();
        let mut albedo = [0.; NUM_BANDS];
        for (band, value) in albedo.iter_mut().enumerate() {
            *value = cover.combined_albedo(band, upwelling[[surface, band]])?;
        }
        Ok(Self {
            grid,
            upwelling,
            downwelling,
            absorption,
            cover,
            albedo,
            ice_base_index,
        })
    }

    /// Vertical grid.
    pub fn grid(&self) -> &VerticalGrid {
        &self.grid
    }

    /// Elevations in m.
    pub fn z(&self) -> ArrayView1<'_, f64> {
        self.grid.z()
    }

    /// Upwelling irradiance, (depth, band).
    pub fn upwelling(&self) -> ArrayView2<'_, f64> {
        self.upwelling.view()
    }

    /// Downwelling irradiance, (depth, band).
    pub fn downwelling(&self) -> ArrayView2<'_, f64> {
        self.downwelling.view()
    }

    /// Absorption coefficient in 1/m at each band's representative
    /// wavelength, (depth, band).
    pub fn absorption(&self) -> ArrayView2<'_, f64> {
        self.absorption.view()
    }

    /// Snow and SSL over the ice.
    pub fn cover(&self) -> &SurfaceCover {
        &self.cover
    }

    /// Snow depth in m.
    pub fn snow_depth(&self) -> f64 {
        self.cover.snow_depth()
    }

    /// SSL depth in m.
    pub fn ssl_depth(&self) -> f64 {
        self.cover.ssl_depth()
    }

    /// Grid index of the ice base.
    pub fn ice_base_index(&self) -> usize {
        self.ice_base_index
    }

    /// Downwelling minus upwelling.
    pub fn net_irradiance(&self) -> Array2<f64> {
        &self.downwelling - &self.upwelling
    }

    /// Band albedo of snow, SSL and ice together.
    pub fn albedo(&self) -> Array1<f64> {
        Array1::from(self.albedo.to_vec())
    }

    /// Band transmittance at the ice base.
    pub fn transmittance(&self) -> Array1<f64> {
        self.downwelling.row(self.ice_base_index).to_owned()
    }

    /// Band radiative heating `k (U + D)` in 1/m.
    pub fn heating(&self) -> Array2<f64> {
        heating(&self.absorption, &self.upwelling, &self.downwelling)
    }

    /// Plane PAR transmittance at each depth: net irradiance in the
    /// 400-700 nm bands relative to the incident PAR, under cloudy skies.
    pub fn par_transmittance(&self) -> Array1<f64> {
        let fractions = &CLOUDY_SKY_FRACTIONS[PAR_BANDS];
        let total: f64 = fractions.iter().sum();
        let net = self.net_irradiance();
        net.slice(s![.., PAR_BANDS])
            .dot(&ArrayView1::from(fractions))
            / total
    }

    /// Plane PAR at each depth in µmol photons/m²/s per W/m² of incident
    /// broadband shortwave.
    ///
    /// Double it for the scalar PAR of an isotropic radiation field.
    pub fn plane_par(&self) -> Array1<f64> {
        let photons = 1e6 / (PLANCK * LIGHTSPEED * MOLE);
        let total = &self.upwelling.slice(s![.., PAR_BANDS]) + &self.downwelling.slice(s![.., PAR_BANDS]);
        total.dot(&ArrayView1::from(&PAR_WEIGHTINGS)) * photons
    }

    /// PAR transmittance at the ice base.
    pub fn ice_base_par_transmittance(&self) -> f64 {
        self.par_transmittance()[self.ice_base_index]
    }

    /// Plane PAR at the ice base.
    pub fn ice_base_plane_par(&self) -> f64 {
        self.plane_par()[self.ice_base_index]
    }

    /// Weighted sum over the bands with the cloudy sky energy fractions.
    pub fn integrate(&self) -> SixBandIrradiance {
        let fractions = ArrayView1::from(&CLOUDY_SKY_FRACTIONS);
        SixBandIrradiance {
            grid: self.grid.clone(),
            upwelling: self.upwelling.dot(&fractions),
            downwelling: self.downwelling.dot(&fractions),
            heating: self.heating().dot(&fractions),
            albedo: self.albedo.iter().zip(&CLOUDY_SKY_FRACTIONS).map(|(a, f)| a * f).sum(),
            ice_base_index: self.ice_base_index,
        }
    }
}

/// Broadband upwelling and downwelling irradiance at each depth.
#[derive(Debug, Clone, PartialEq)]
pub struct Irradiance {
    grid: VerticalGrid,
    upwelling: Array1<f64>,
    downwelling: Array1<f64>,
    heating: Array1<f64>,
    ice_base_index: usize,
}

impl Irradiance {
    /// Elevations in m.
    pub fn z(&self) -> ArrayView1<'_, f64> {
        self.grid.z()
    }

    /// Upwelling irradiance.
    pub fn upwelling(&self) -> ArrayView1<'_, f64> {
        self.upwelling.view()
    }

    /// Downwelling irradiance.
    pub fn downwelling(&self) -> ArrayView1<'_, f64> {
        self.downwelling.view()
    }

    /// Downwelling minus upwelling.
    pub fn net_irradiance(&self) -> Array1<f64> {
        &self.downwelling - &self.upwelling
    }

    /// Broadband albedo.
    pub fn albedo(&self) -> f64 {
        self.upwelling[self.grid.surface_index()]
    }

    /// Broadband transmittance at the ice base.
    pub fn transmittance(&self) -> f64 {
        self.downwelling[self.ice_base_index]
    }

    /// Radiative heating in 1/m.
    pub fn heating(&self) -> ArrayView1<'_, f64> {
        self.heating.view()
    }
}

/// Broadband irradiance from the six band model.
///
/// The albedo includes the snow and SSL so isn't the surface upwelling.
#[derive(Debug, Clone, PartialEq)]
pub struct SixBandIrradiance {
    grid: VerticalGrid,
    upwelling: Array1<f64>,
    downwelling: Array1<f64>,
    heating: Array1<f64>,
    albedo: f64,
    ice_base_index: usize,
}

impl SixBandIrradiance {
    /// Elevations in m.
    pub fn z(&self) -> ArrayView1<'_, f64> {
        self.grid.z()
    }

    /// Upwelling irradiance in the ice.
    pub fn upwelling(&self) -> ArrayView1<'_, f64> {
        self.upwelling.view()
    }

    /// Downwelling irradiance in the ice.
    pub fn downwelling(&self) -> ArrayView1<'_, f64> {
        self.downwelling.view()
    }

    /// Downwelling minus upwelling.
    pub fn net_irradiance(&self) -> Array1<f64> {
        &self.downwelling - &self.upwelling
    }

    /// Broadband albedo of snow, SSL and ice.
    pub fn albedo(&self) -> f64 {
        self.albedo
    }

    /// Broadband transmittance at the ice base.
    pub fn transmittance(&self) -> f64 {
        self.downwelling[self.ice_base_index]
    }

    /// Radiative heating in 1/m.
    pub fn heating(&self) -> ArrayView1<'_, f64> {
        self.heating.view()
    }
}
