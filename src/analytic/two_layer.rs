//! Oily ice over clean ice.
//!
//! All the oil sits in a top layer occupying a fraction `f` of the ice, at
//! `1 / f` times the concentration it would have if it was spread through the
//! full thickness. The layer below holds no oil. Each layer is a
//! [`UniformSlab`]; the bottom one is lit by whatever the top one transmits and
//! reflects back its own albedo, which couples the pair.

use crate::{
    error::{check_non_negative, RtmError},
    optics::{IceType, OilyIceAbsorption, OpticalPropertyProvider},
};

use super::{
    check_thickness, AnalyticalModel, ClosedFormField, Piecewise, UniformSlab,
    DEFAULT_DROPLET_RADIUS,
};

/// Solution in two stacked uniform slabs sharing a scattering coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedSlabs {
    layers: Piecewise<UniformSlab>,
    albedo: f64,
}

impl StackedSlabs {
    /// Stack a slab with `top_absorption` over one with `bottom_absorption`,
    /// lit by unit irradiance with nothing reflecting below.
    pub fn new(
        top_absorption: f64,
        top_thickness: f64,
        bottom_absorption: f64,
        bottom_thickness: f64,
        scattering: f64,
    ) -> Result<Self, RtmError> {
        // Albedo of the bottom slab on its own is what the top slab sees below
        let bottom_albedo =
            UniformSlab::new(bottom_absorption, scattering, bottom_thickness)?.albedo();
        let top = UniformSlab::coupled(
            top_absorption,
            scattering,
            top_thickness,
            1.,
            bottom_albedo,
        )?;
        let bottom = UniformSlab::coupled(
            bottom_absorption,
            scattering,
            bottom_thickness,
            top.downwelling(-top_thickness),
            0.,
        )?;

        let top_albedo = top.albedo();
        let numerator = top.extinction_coth() - (top_absorption + scattering);
        let denominator = bottom.extinction_coth() + bottom_absorption + scattering;
        let albedo = top_albedo / (1. - top_albedo * bottom_albedo) * (1. + numerator / denominator);

        Ok(Self {
            layers: Piecewise::new([(top_thickness, top), (bottom_thickness, bottom)])?,
            albedo,
        })
    }

    /// Elevation of the interface between the slabs.
    pub fn interface(&self) -> f64 {
        self.layers.interfaces()[0]
    }

    /// The two slabs, top first.
    pub fn layers(&self) -> &Piecewise<UniformSlab> {
        &self.layers
    }
}

impl ClosedFormField for StackedSlabs {
    fn upwelling(&self, z: f64) -> f64 {
        let (slab, z) = self.layers.locate(z);
        slab.upwelling(z)
    }

    fn downwelling(&self, z: f64) -> f64 {
        let (slab, z) = self.layers.locate(z);
        slab.downwelling(z)
    }

    fn absorption(&self, z: f64) -> f64 {
        let (slab, z) = self.layers.locate(z);
        slab.absorption(z)
    }

    fn albedo(&self) -> f64 {
        self.albedo
    }

    fn transmittance(&self) -> f64 {
        self.layers.bottom().transmittance()
    }
}

/// Ice with all its oil concentrated in a top layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoLayerModel {
    thickness: f64,
    oil_mass_ratio: f64,
    thickness_ratio: f64,
    ice_type: IceType,
    droplet_radius: f64,
    absorption_enhancement: f64,
}

impl TwoLayerModel {
    /// Ice `thickness` m thick with a uniform equivalent `oil_mass_ratio`
    /// (ng/g), all held in the top `thickness_ratio` of the ice.
    pub fn new(
        thickness: f64,
        oil_mass_ratio: f64,
        thickness_ratio: f64,
        ice_type: IceType,
    ) -> Result<Self, RtmError> {
        if !(thickness_ratio > 0. && thickness_ratio < 1.) {
            return Err(RtmError::ThicknessRatioOutOfRange(thickness_ratio));
        }
        Ok(Self {
            thickness: check_thickness("ice thickness", thickness)?,
            oil_mass_ratio: check_non_negative("oil mass ratio", oil_mass_ratio)?,
            thickness_ratio,
            ice_type,
            droplet_radius: DEFAULT_DROPLET_RADIUS,
            absorption_enhancement: 1.,
        })
    }

    /// Use droplets of median radius `radius` µm.
    pub fn with_droplet_radius(mut self, radius: f64) -> Result<Self, RtmError> {
        self.droplet_radius = check_non_negative("droplet radius", radius)?;
        Ok(self)
    }

    /// Scale oil absorption by `factor`.
    pub fn with_absorption_enhancement(mut self, factor: f64) -> Result<Self, RtmError> {
        self.absorption_enhancement = check_non_negative("absorption enhancement factor", factor)?;
        Ok(self)
    }

    /// Oil mass ratio in the top layer in ng/g.
    pub fn top_oil_mass_ratio(&self) -> f64 {
        self.oil_mass_ratio / self.thickness_ratio
    }

    /// Elevation of the base of the oily layer.
    pub fn interface(&self) -> f64 {
        -self.thickness_ratio * self.thickness
    }
}

impl AnalyticalModel for TwoLayerModel {
    type Field = StackedSlabs;

    fn thickness(&self) -> f64 {
        self.thickness
    }

    fn field(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<StackedSlabs, RtmError> {
        let absorption = OilyIceAbsorption::new(
            optics,
            wavelength,
            self.droplet_radius,
            self.absorption_enhancement,
        )?;
        let top_thickness = self.thickness_ratio * self.thickness;
        StackedSlabs::new(
            absorption.at(self.top_oil_mass_ratio()),
            top_thickness,
            absorption.ice,
            self.thickness - top_thickness,
            self.ice_type.scattering_coefficient(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::SingleLayerModel;
    use crate::optics::TabulatedOptics;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn fluxes_are_continuous_across_the_interface() {
        for ratio in [0.05, 0.3, 0.5, 0.9] {
            for wavelength in [400., 550., 700., 900.] {
                let model = TwoLayerModel::new(1.2, 200., ratio, IceType::Fyi).unwrap();
                let field = model.field(&TabulatedOptics, wavelength).unwrap();
                let [top, bottom] = field.layers().layers() else {
                    panic!("expected two layers");
                };
                let depth = ratio * 1.2;
                assert_relative_eq!(
                    top.upwelling(-depth),
                    bottom.upwelling(0.),
                    max_relative = 1e-9
                );
                assert_relative_eq!(
                    top.downwelling(-depth),
                    bottom.downwelling(0.),
                    max_relative = 1e-9
                );
            }
        }
    }

    #[test]
    fn stacking_formula_is_the_surface_upwelling() {
        for (k1, d1, k2, d2, r) in [
            (2., 0.2, 0.01, 0.8, 1.2),
            (0.05, 1., 0.5, 1., 6.),
            (40., 0.1, 3., 2., 0.24),
        ] {
            let field = StackedSlabs::new(k1, d1, k2, d2, r).unwrap();
            assert_relative_eq!(field.albedo(), field.upwelling(0.), max_relative = 1e-10);
            assert_relative_eq!(field.downwelling(0.), 1., max_relative = 1e-12);
            assert_abs_diff_eq!(field.upwelling(-(d1 + d2)), 0., epsilon = 1e-14);
        }
    }

    #[test]
    fn clean_layers_match_a_single_layer() {
        let single = SingleLayerModel::new(1., 0., IceType::Myi).unwrap();
        let double = TwoLayerModel::new(1., 0., 0.4, IceType::Myi).unwrap();
        for wavelength in [350., 600., 1100.] {
            let expected = single.albedo(&TabulatedOptics, wavelength).unwrap();
            let albedo = double.albedo(&TabulatedOptics, wavelength).unwrap();
            assert_relative_eq!(albedo, expected, max_relative = 1e-10);
            assert_relative_eq!(
                double.transmittance(&TabulatedOptics, wavelength).unwrap(),
                single.transmittance(&TabulatedOptics, wavelength).unwrap(),
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn full_oily_layer_reduces_to_a_single_layer() {
        let oil = 500.;
        let single = SingleLayerModel::new(0.8, oil, IceType::Fyi).unwrap();
        let double = TwoLayerModel::new(0.8, oil, 1. - 1e-9, IceType::Fyi).unwrap();
        for wavelength in [400., 500., 650.] {
            assert_relative_eq!(
                double.albedo(&TabulatedOptics, wavelength).unwrap(),
                single.albedo(&TabulatedOptics, wavelength).unwrap(),
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn thickness_ratio_must_be_a_fraction() {
        for ratio in [0., 1., -0.2, 1.5, f64::NAN] {
            assert!(TwoLayerModel::new(1., 10., ratio, IceType::Fyi).is_err());
        }
        assert!(matches!(
            TwoLayerModel::new(1., 10., 0., IceType::Fyi),
            Err(RtmError::ThicknessRatioOutOfRange(_))
        ));
    }

    #[test]
    fn concentrated_oil() {
        let model = TwoLayerModel::new(2., 50., 0.25, IceType::Fyi).unwrap();
        assert_relative_eq!(model.top_oil_mass_ratio(), 200.);
        assert_relative_eq!(model.interface(), -0.5);
        let field = model.field(&TabulatedOptics, 500.).unwrap();
        assert_relative_eq!(field.interface(), -0.5);
        // oily ice absorbs more than the clean ice beneath it
        assert!(field.absorption(-0.1) > field.absorption(-1.));
        assert!(field.heating(-0.5) > 0.);
    }

    #[test]
    fn energy_is_conserved() {
        for oil in [0., 10., 100., 1000.] {
            let model = TwoLayerModel::new(1., oil, 0.2, IceType::Fyi).unwrap();
            let albedo = model.albedo(&TabulatedOptics, 500.).unwrap();
            let transmittance = model.transmittance(&TabulatedOptics, 500.).unwrap();
            assert!(albedo > 0. && transmittance > 0.);
            assert!(albedo + transmittance <= 1.);
        }
    }
}
