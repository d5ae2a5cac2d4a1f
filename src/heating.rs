//! Radiative heating of the ice by incident shortwave
//!
//! The closed form models give heating per unit incident irradiance at each
//! wavelength. Weighting that by the solar spectrum and integrating gives the
//! heating response of the ice, which scales linearly with the broadband
//! shortwave reaching the surface.

use log::debug;
use ndarray::{Array1, ArrayView1};

use crate::{
    analytic::AnalyticalModel,
    error::RtmError,
    grid::VerticalGrid,
    optics::OpticalPropertyProvider,
    spectra::{
        gauss_legendre_nodes, top_of_atmosphere_irradiance, total_top_of_atmosphere_irradiance,
        IncidentSpectrum,
    },
};

/// Wavelengths sampled for the shortwave heating response.
const NUM_RESPONSE_SAMPLES: usize = 20;

/// Wavelength limits in nm of the PAR heating integral.
pub const PAR_HEATING_BOUNDS: (f64, f64) = (350., 700.);

/// 5 nm quadrature panels over the PAR heating bounds.
const PAR_PANELS: usize = 70;

/// Fraction of the total top of atmosphere irradiance that `incident`
/// broadband shortwave in W/m² represents.
pub fn normalised_incident_shortwave(incident: f64) -> f64 {
    incident / total_top_of_atmosphere_irradiance()
}

fn check_wavelength_range(min: f64, max: f64) -> Result<(), RtmError> {
    if min > 0. && max > min && max.is_finite() {
        Ok(())
    } else {
        Err(RtmError::InvalidParameter {
            name: "heating wavelength range",
            value: max - min,
        })
    }
}

/// Heating in W/m³ at each point of `grid` from the top of atmosphere
/// spectrum between `min` and `max` nm.
///
/// The integral uses the trapezoidal rule on a coarse, evenly spaced set of
/// wavelengths.
pub fn shortwave_heating_response<M: AnalyticalModel>(
    model: &M,
    optics: &dyn OpticalPropertyProvider,
    grid: &VerticalGrid,
    min: f64,
    max: f64,
) -> Result<Array1<f64>, RtmError> {
    check_wavelength_range(min, max)?;
    let wavelengths = Array1::linspace(min, max, NUM_RESPONSE_SAMPLES);
    debug!("heating response between {min} and {max} nm");
    let spectral = model.sample(optics, grid, wavelengths.view())?;
    Ok(spectral
        .integrate(&top_of_atmosphere_irradiance)?
        .heating()
        .to_owned())
}

/// Heating in W/m³ at each point of `grid` when `incident` W/m² of
/// broadband shortwave reaches the surface, with the radiation between `min`
/// and `max` nm penetrating the ice.
pub fn shortwave_heating_in_ice<M: AnalyticalModel>(
    incident: f64,
    model: &M,
    optics: &dyn OpticalPropertyProvider,
    grid: &VerticalGrid,
    min: f64,
    max: f64,
) -> Result<Array1<f64>, RtmError> {
    let response = shortwave_heating_response(model, optics, grid, min, max)?;
    Ok(response * normalised_incident_shortwave(incident))
}

/// Heating in W/m³ at `z` from the part of `spectrum` (W/m²/nm) within
/// [`PAR_HEATING_BOUNDS`].
pub fn par_heating<M: AnalyticalModel>(
    model: &M,
    optics: &dyn OpticalPropertyProvider,
    spectrum: &dyn IncidentSpectrum,
    z: f64,
) -> Result<f64, RtmError> {
    let z = model.check_depth(z)?;
    let (min, max) = PAR_HEATING_BOUNDS;
    gauss_legendre_nodes(min, max, PAR_PANELS)
        .map(|(wavelength, weight)| -> Result<f64, RtmError> {
            Ok(weight * spectrum.irradiance(wavelength)? * model.heating(optics, z, wavelength)?)
        })
        .sum()
}

/// [`par_heating`] at each of `z`.
pub fn par_heating_profile<M: AnalyticalModel>(
    model: &M,
    optics: &dyn OpticalPropertyProvider,
    spectrum: &dyn IncidentSpectrum,
    z: ArrayView1<'_, f64>,
) -> Result<Array1<f64>, RtmError> {
    z.iter()
        .map(|&z| par_heating(model, optics, spectrum, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analytic::{SingleLayerModel, TwoLayerModel},
        grid::trapezoid,
        optics::{IceType, TabulatedOptics},
        spectra::SkyCondition,
    };
    use approx::assert_relative_eq;

    fn oily_ice() -> SingleLayerModel {
        SingleLayerModel::new(1., 100., IceType::Fyi).unwrap()
    }

    #[test]
    fn full_sun_is_one() {
        let total = total_top_of_atmosphere_irradiance();
        assert_relative_eq!(normalised_incident_shortwave(total), 1., max_relative = 1e-15);
        assert_relative_eq!(normalised_incident_shortwave(0.5 * total), 0.5, max_relative = 1e-15);
    }

    #[test]
    fn response_is_a_coarse_trapezoid() {
        let model = oily_ice();
        let grid = VerticalGrid::linspace(-1., 0., 5).unwrap();
        let response = shortwave_heating_response(&model, &TabulatedOptics, &grid, 350., 1200.)
            .unwrap();

        let wavelengths = Array1::linspace(350., 1200., 20);
        for (i, &z) in grid.z().iter().enumerate() {
            let integrand = wavelengths.iter().map(|&w| {
                model.heating(&TabulatedOptics, z, w).unwrap() * top_of_atmosphere_irradiance(w)
            });
            let expected = trapezoid(integrand, wavelengths.view());
            assert_relative_eq!(response[i], expected, max_relative = 1e-12);
            assert!(response[i] > 0.);
        }
        // light is absorbed on the way down
        assert!(response[4] > response[0]);
    }

    #[test]
    fn heating_scales_with_the_incident_shortwave() {
        let model = TwoLayerModel::new(0.8, 500., 0.2, IceType::Fyi).unwrap();
        let grid = VerticalGrid::linspace(-0.8, 0., 9).unwrap();
        let response =
            shortwave_heating_response(&model, &TabulatedOptics, &grid, 350., 700.).unwrap();
        let heating =
            shortwave_heating_in_ice(200., &model, &TabulatedOptics, &grid, 350., 700.).unwrap();
        let factor = 200. / total_top_of_atmosphere_irradiance();
        for (h, r) in heating.iter().zip(&response) {
            assert_relative_eq!(*h, factor * r, max_relative = 1e-14);
        }
    }

    #[test]
    fn response_needs_a_wavelength_range() {
        let grid = VerticalGrid::linspace(-1., 0., 5).unwrap();
        assert!(matches!(
            shortwave_heating_response(&oily_ice(), &TabulatedOptics, &grid, 700., 350.),
            Err(RtmError::InvalidParameter { .. })
        ));
        let too_deep = VerticalGrid::linspace(-2., 0., 5).unwrap();
        assert!(matches!(
            shortwave_heating_response(&oily_ice(), &TabulatedOptics, &too_deep, 350., 700.),
            Err(RtmError::DepthOutOfRange { .. })
        ));
    }

    #[test]
    fn par_heating_integrates_the_visible() {
        let model = oily_ice();
        let sky = SkyCondition::default();
        let spectrum = |w: f64| sky.solar_irradiance(w);

        let wavelengths = Array1::linspace(350., 700., 3501);
        for z in [0., -0.5, -1.] {
            let integrand = wavelengths.iter().map(|&w| {
                sky.solar_irradiance(w) * model.heating(&TabulatedOptics, z, w).unwrap()
            });
            let expected = trapezoid(integrand, wavelengths.view());
            let heating = par_heating(&model, &TabulatedOptics, &spectrum, z).unwrap();
            assert_relative_eq!(heating, expected, max_relative = 1e-3);
            assert!(heating > 0.);
        }

        let profile =
            par_heating_profile(&model, &TabulatedOptics, &spectrum, ndarray::array![-1., 0.].view())
                .unwrap();
        assert!(profile[1] > profile[0]);
        assert!(matches!(
            par_heating(&model, &TabulatedOptics, &spectrum, 0.5),
            Err(RtmError::DepthOutOfRange { .. })
        ));
    }
}
