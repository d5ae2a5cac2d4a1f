//! Six band model under snow and a surface scattering layer
//!
//! Each band is solved at a single representative wavelength with the
//! radiation that makes it through the snow and SSL entering the ice. The
//! longest band never reaches the ice: it is all absorbed at the surface.

use log::{debug, info};
use ndarray::Array1;
use rayon::prelude::*;

use crate::{
    continuous::{Column, IceColumn},
    error::RtmError,
    irradiance::{stack_columns, SixBandSpectralIrradiance, SpectralColumn},
    model::SolverOptions,
    optics::{
        OpticalPropertyProvider, SurfaceCover, BAND_REPRESENTATIVE_WAVELENGTHS, NUM_BANDS,
        SURFACE_ABSORBED_BAND,
    },
};

/// An ice column under a snow and SSL cover, solved in six wavelength bands.
#[derive(Debug, Clone, PartialEq)]
pub struct SixBandModel {
    column: IceColumn,
    cover: SurfaceCover,
}

impl SixBandModel {
    /// Model of `column` under `cover`.
    pub fn new(column: IceColumn, cover: SurfaceCover) -> Self {
        Self { column, cover }
    }

    /// The ice column.
    pub fn column(&self) -> &IceColumn {
        &self.column
    }

    /// Snow and SSL cover.
    pub fn cover(&self) -> &SurfaceCover {
        &self.cover
    }

    /// Solve in a single `band`, with irradiance relative to the incident
    /// irradiance above the snow.
    pub fn solve_band(
        &self,
        optics: &dyn OpticalPropertyProvider,
        band: usize,
        options: &SolverOptions,
    ) -> Result<Column, RtmError> {
        if band == SURFACE_ABSORBED_BAND {
            let surface = self.cover.snow_transmittance(band)?;
            return Ok(self.column.surface_absorbed_column(surface));
        }
        let top_downwelling = self.cover.surface_transmittance(band)?;
        let wavelength = BAND_REPRESENTATIVE_WAVELENGTHS
            .get(band)
            .copied()
            .ok_or(RtmError::InvalidBand(band))?;
        debug!("band {band}: {top_downwelling:.4} of incident radiation reaches the ice");
        self.column
            .solve_column(optics, wavelength, top_downwelling, options)
    }

    /// Solve in `band` along with the ice absorption at the band's
    /// representative wavelength. The surface absorbed band puts nothing
    /// into the ice.
    pub(crate) fn solve_band_column(
        &self,
        optics: &dyn OpticalPropertyProvider,
        band: usize,
        options: &SolverOptions,
    ) -> Result<SpectralColumn, RtmError> {
        let (up, down) = self.solve_band(optics, band, options)?;
        let absorption = if band == SURFACE_ABSORBED_BAND {
            Array1::zeros(self.column.grid().len())
        } else {
            self.column
                .absorption(optics, BAND_REPRESENTATIVE_WAVELENGTHS[band])?
        };
        Ok((up, down, absorption))
    }

    /// Assemble the solutions in each band, in band order.
    pub(crate) fn irradiance(
        &self,
        columns: Vec<SpectralColumn>,
    ) -> Result<SixBandSpectralIrradiance, RtmError> {
        if columns.len() != NUM_BANDS {
            return Err(RtmError::InconsistentInputs);
        }
        let (upwelling, downwelling, absorption) =
            stack_columns(self.column.grid().len(), columns);
        SixBandSpectralIrradiance::new(
            self.column.grid().clone(),
            upwelling,
            downwelling,
            absorption,
            self.cover,
            self.column.ice_base_index(),
        )
    }

    /// Solve all six bands in parallel on the current rayon pool.
    ///
    /// The fast path option doesn't apply here.
    pub fn solve(
        &self,
        optics: &dyn OpticalPropertyProvider,
        options: &SolverOptions,
    ) -> Result<SixBandSpectralIrradiance, RtmError> {
        info!(
            "Solving six band model under {} m snow and {} m SSL",
            self.cover.snow_depth(),
            self.cover.ssl_depth()
        );
        let columns = (0..NUM_BANDS)
            .into_par_iter()
            .map(|band| self.solve_band_column(optics, band, options))
            .collect::<Result<Vec<_>, RtmError>>()?;
        self.irradiance(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::VerticalGrid,
        optics::{IceType, TabulatedOptics},
    };
    use crate::analytic::{ClosedFormField, UniformSlab};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::Axis;

    fn oily_column() -> IceColumn {
        let grid = VerticalGrid::linspace(-1., 0., 200).unwrap();
        IceColumn::new(grid, Array1::from_elem(200, 1000.), 800. * 0.15 * 0.75144 * 2., 0.05)
            .unwrap()
            .with_absorption_enhancement(2.)
            .unwrap()
    }

    #[test]
    fn longest_band_is_absorbed_at_the_surface() {
        let cover = SurfaceCover::new(0.2, 0.04).unwrap();
        let model = SixBandModel::new(oily_column(), cover);
        let solution = model.solve(&TabulatedOptics, &SolverOptions::default()).unwrap();

        let band = SURFACE_ABSORBED_BAND;
        let upwelling = solution.upwelling().index_axis(Axis(1), band).to_owned();
        let downwelling = solution.downwelling().index_axis(Axis(1), band).to_owned();
        assert!(upwelling.iter().all(|&u| u == 0.));
        assert!(downwelling.iter().take(199).all(|&d| d == 0.));
        assert_relative_eq!(downwelling[199], cover.snow_transmittance(band).unwrap());
        assert!(solution.heating().column(band).iter().all(|&h| h == 0.));
    }

    #[test]
    fn band_heating_matches_a_uniform_slab() {
        let grid = VerticalGrid::linspace(-1., 0., 11).unwrap();
        let scattering = IceType::Fyi.scattering_coefficient();
        let column = IceColumn::new(grid, Array1::from_elem(11, 1000.), scattering, 0.5).unwrap();
        let cover = SurfaceCover::new(0.05, 0.02).unwrap();
        let model = SixBandModel::new(column, cover);
        let options = SolverOptions {
            tolerance: 1e-6,
            ..Default::default()
        };
        let solution = model.solve(&TabulatedOptics, &options).unwrap();
        let heating = solution.heating();

        for band in 0..SURFACE_ABSORBED_BAND {
            let absorption = solution.absorption()[[0, band]];
            let slab = UniformSlab::coupled(
                absorption,
                scattering,
                1.,
                cover.surface_transmittance(band).unwrap(),
                0.,
            )
            .unwrap();
            for (i, &z) in solution.z().iter().enumerate() {
                assert_relative_eq!(
                    heating[[i, band]],
                    slab.heating(z),
                    epsilon = 10. * options.tolerance * absorption,
                    max_relative = 1e-4
                );
            }
        }
    }

    #[test]
    fn top_boundary_is_the_cover_transmittance() {
        let cover = SurfaceCover::new(0.05, 0.02).unwrap();
        let model = SixBandModel::new(oily_column(), cover);
        let options = SolverOptions {
            tolerance: 1e-6,
            ..Default::default()
        };
        for band in 0..SURFACE_ABSORBED_BAND {
            let (upwelling, downwelling) = model.solve_band(&TabulatedOptics, band, &options).unwrap();
            assert_relative_eq!(
                downwelling[199],
                cover.surface_transmittance(band).unwrap(),
                max_relative = 1e-10
            );
            assert_abs_diff_eq!(upwelling[0], 0., epsilon = 1e-12);
        }
    }

    #[test]
    fn bare_ice_sees_all_the_radiation() {
        let model = SixBandModel::new(oily_column(), SurfaceCover::bare());
        let solution = model.solve(&TabulatedOptics, &SolverOptions::default()).unwrap();
        let albedo = solution.albedo();
        for band in 0..SURFACE_ABSORBED_BAND {
            assert_relative_eq!(solution.downwelling()[[199, band]], 1., max_relative = 1e-10);
            // no snow or SSL: combined albedo is just the ice albedo
            assert_relative_eq!(albedo[band], solution.upwelling()[[199, band]]);
        }
        assert_eq!(albedo[SURFACE_ABSORBED_BAND], 0.);
    }

    #[test]
    fn zero_ssl_depth_adds_nothing() {
        let cover = SurfaceCover::new(0.1, 0.).unwrap();
        for band in 0..NUM_BANDS {
            assert_eq!(cover.ssl_albedo(band).unwrap(), 0.);
            assert_eq!(cover.ssl_transmittance(band).unwrap(), 1.);
            assert_relative_eq!(
                cover.surface_transmittance(band).unwrap(),
                cover.snow_transmittance(band).unwrap()
            );
        }
        assert!(matches!(
            SurfaceCover::new(0.1, -0.01),
            Err(RtmError::NegativeDepth { .. })
        ));
    }

    #[test]
    fn cover_and_ice_albedos_combine() {
        let cover = SurfaceCover::new(0.2, 0.04).unwrap();
        let model = SixBandModel::new(oily_column(), cover);
        let solution = model.solve(&TabulatedOptics, &SolverOptions::default()).unwrap();
        let albedo = solution.albedo();
        for band in 0..NUM_BANDS {
            let ice = solution.upwelling()[[199, band]];
            let snow_transmittance = cover.snow_transmittance(band).unwrap();
            let expected = cover.snow_albedo(band).unwrap()
                + snow_transmittance * cover.ssl_albedo(band).unwrap()
                + snow_transmittance * cover.ssl_transmittance(band).unwrap() * ice;
            assert_relative_eq!(albedo[band], expected);
            assert!((0. ..=1.).contains(&albedo[band]));
        }
    }
}
