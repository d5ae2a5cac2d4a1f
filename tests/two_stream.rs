use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array, Array1};

use sea_ice_rtm::{
    integrate_over_sw, solve_two_stream_model, AnalyticalModel, BlackBodySpectrum,
    ContinuousProfileModel, IceColumn, IceType, IntegratedSolution, RtmError, SingleLayerModel,
    SixBandModel, SolverOptions, SpectralSolution, SurfaceCover, TabulatedOptics, TwoLayerModel,
    TwoStreamModel, VerticalGrid,
};

const ICE_DEPTH: f64 = 0.8;
const ICE_SCATTERING_COEFFICIENT: f64 = 1.5;

/// Ice down to `ICE_DEPTH` with liquid below it.
fn ice_over_water(num_points: usize, oil: f64) -> IceColumn {
    let grid = VerticalGrid::linspace(-1.5, 0., num_points).unwrap();
    let liquid = grid.z().mapv(|z| if z >= -ICE_DEPTH { 0. } else { 1. });
    let oil = grid.z().mapv(|z| if z >= -ICE_DEPTH { oil } else { 0. });
    IceColumn::new(grid, oil, ICE_SCATTERING_COEFFICIENT, 0.5)
        .unwrap()
        .with_liquid_fraction(liquid)
        .unwrap()
}

/// Geometrically spaced, with the ends pinned to the table limits.
fn shortwave() -> Array1<f64> {
    let mut wavelengths = Array::geomspace(350., 3000., 50).unwrap();
    wavelengths[0] = 350.;
    wavelengths[49] = 3000.;
    wavelengths
}

#[test]
fn first_year_ice_scenario() {
    let model = SingleLayerModel::new(1., 0., IceType::Fyi).unwrap();
    let albedo = model.albedo(&TabulatedOptics, 400.).unwrap();
    assert_abs_diff_eq!(albedo, 0.5454, epsilon = 1e-3);
}

#[test]
fn ice_over_water_integrates_over_the_shortwave() {
    let model = TwoStreamModel::Continuous(
        ContinuousProfileModel::new(ice_over_water(300, 100.), shortwave()).unwrap(),
    );
    let options = SolverOptions {
        fast_path: Some(1200.),
        ..Default::default()
    };
    let solution = solve_two_stream_model(&model, &TabulatedOptics, &options).unwrap();
    let spectrum = BlackBodySpectrum::new(350., 3000.).unwrap();
    let IntegratedSolution::Spectral(broadband) =
        integrate_over_sw(&solution, Some(&spectrum)).unwrap()
    else {
        panic!("expected a spectral integral");
    };

    let albedo = broadband.albedo();
    let transmittance = broadband.transmittance();
    assert!(albedo > 0. && albedo < 1.);
    assert!(transmittance > 0. && albedo + transmittance < 1.);
    // transmittance is measured at the ice base, not the bottom of the water
    assert!(transmittance > broadband.downwelling()[0]);
    assert_relative_eq!(
        broadband.net_irradiance()[299],
        broadband.downwelling()[299] - albedo
    );
    assert!(broadband.heating().iter().all(|&h| h > 0.));
}

#[test]
fn only_water_reflects_nothing() {
    let grid = VerticalGrid::linspace(-1.5, 0., 100).unwrap();
    let column = IceColumn::new(grid, Array1::zeros(100), ICE_SCATTERING_COEFFICIENT, 0.5)
        .unwrap()
        .with_liquid_fraction(Array1::ones(100))
        .unwrap();
    assert_eq!(column.ice_base_index(), 0);
    let model = ContinuousProfileModel::new(column, Array1::linspace(350., 700., 8)).unwrap();
    let solution = model
        .solve(&TabulatedOptics, &SolverOptions::default())
        .unwrap();
    for &albedo in &solution.albedo() {
        assert_abs_diff_eq!(albedo, 0., epsilon = 1e-10);
    }
    for &transmittance in &solution.transmittance() {
        assert!(transmittance > 0. && transmittance < 1.);
    }
}

#[test]
fn oil_darkens_every_model() {
    let options = SolverOptions {
        tolerance: 1e-6,
        ..Default::default()
    };
    for wavelength in [400., 550., 700.] {
        let mut previous = (f64::INFINITY, f64::INFINITY, f64::INFINITY, f64::INFINITY);
        for oil in [0., 10., 100., 1000.] {
            let single = SingleLayerModel::new(1., oil, IceType::Fyi).unwrap();
            let double = TwoLayerModel::new(1., oil, 0.3, IceType::Fyi).unwrap();
            let (upwelling, downwelling) = ice_over_water(200, oil)
                .solve_column(&TabulatedOptics, wavelength, 1., &options)
                .unwrap();

            let single_albedo = single.albedo(&TabulatedOptics, wavelength).unwrap();
            let single_transmittance = single.transmittance(&TabulatedOptics, wavelength).unwrap();
            let double_albedo = double.albedo(&TabulatedOptics, wavelength).unwrap();
            let continuous_albedo = upwelling[199];

            assert!(single_albedo <= previous.0);
            assert!(single_transmittance <= previous.1);
            assert!(double_albedo <= previous.2);
            assert!(continuous_albedo <= previous.3 + 1e-9);
            assert!(single_albedo + single_transmittance <= 1.);
            assert!(continuous_albedo + downwelling[0] <= 1.);
            previous = (
                single_albedo,
                single_transmittance,
                double_albedo,
                continuous_albedo,
            );
        }
    }
}

#[test]
fn six_band_under_snow() {
    let grid = VerticalGrid::linspace(-1., 0., 500).unwrap();
    let column = IceColumn::new(
        grid,
        Array1::from_elem(500, 1000.),
        800. * 0.15 * 0.75144 * 2.,
        0.05,
    )
    .unwrap()
    .with_absorption_enhancement(2.)
    .unwrap();
    let cover = SurfaceCover::new(0.2, 0.04).unwrap();
    let model = TwoStreamModel::SixBand(SixBandModel::new(column, cover));
    let solution =
        solve_two_stream_model(&model, &TabulatedOptics, &SolverOptions::default()).unwrap();

    let SpectralSolution::SixBand(bands) = &solution else {
        panic!("expected a six band solution");
    };
    assert_eq!(bands.snow_depth(), 0.2);
    assert_eq!(bands.ssl_depth(), 0.04);
    for band in 0..5 {
        assert_relative_eq!(
            bands.downwelling()[[499, band]],
            cover.surface_transmittance(band).unwrap(),
            max_relative = 1e-10
        );
    }
    let par = bands.par_transmittance();
    assert!(par[499] > par[0]);
    assert!(bands.ice_base_plane_par() >= 0.);

    let IntegratedSolution::SixBand(broadband) = integrate_over_sw(&solution, None).unwrap() else {
        panic!("expected a six band integral");
    };
    // 20 cm of snow reflects most of the light
    assert!(broadband.albedo() > 0.5 && broadband.albedo() < 1.);
    assert!(broadband.transmittance() < 1. - broadband.albedo());
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(matches!(
        SingleLayerModel::new(-1., 0., IceType::Fyi),
        Err(RtmError::NonPositiveThickness { .. })
    ));
    assert!(matches!(
        TwoLayerModel::new(1., 0., 1., IceType::Fyi),
        Err(RtmError::ThicknessRatioOutOfRange(_))
    ));
    assert!(matches!(
        SurfaceCover::new(0.1, -0.1),
        Err(RtmError::NegativeDepth { .. })
    ));
    let model = SingleLayerModel::new(1., 0., IceType::Fyi).unwrap();
    assert!(matches!(
        model.albedo(&TabulatedOptics, 5000.),
        Err(RtmError::WavelengthOutOfRange { .. })
    ));
    assert!(matches!(
        "SLUSH".parse::<IceType>(),
        Err(RtmError::UnknownIceType(_))
    ));
}
