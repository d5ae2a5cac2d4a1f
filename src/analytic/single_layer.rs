//! A single uniform layer of oily ice.
//!
//! Within a slab of uniform absorption `k` and scattering `r` the two-stream
//! equations have exponential solutions `e^{±μz}` with `μ = sqrt(k² + 2kr)`.
//! Writing them in terms of decaying exponentials measured from either face
//!
//! ```text
//! D(x) = a e^{-μx} + b s e^{-μ(d-x)}
//! U(x) = a s e^{-μx} + b e^{-μ(d-x)}
//! ```
//!
//! for depth `x` below the top of a slab of thickness `d`, with `s` the
//! optically thick albedo, keeps every term bounded however optically thick
//! the slab is.

use crate::{
    error::{check_non_negative, RtmError},
    optics::{extinction_coefficient, IceType, OilyIceAbsorption, OpticalPropertyProvider},
};

use super::{check_thickness, AnalyticalModel, ClosedFormField, DEFAULT_DROPLET_RADIUS};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Coefficients {
    /// Amplitudes of the wave decaying from the top and from the bottom
    Exponential { a: f64, b: f64 },
    /// Without absorption the net flux is constant and both fluxes are linear
    Conservative { net: f64, top_upwelling: f64 },
}

/// Two-stream solution in one slab of uniform ice.
///
/// Depth is measured in the slab's own coordinate, from 0 at its top to
/// `-thickness` at its base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSlab {
    absorption: f64,
    scattering: f64,
    thickness: f64,
    extinction: f64,
    incident: f64,
    coefficients: Coefficients,
}

impl UniformSlab {
    /// Slab lit by unit downwelling irradiance from above with nothing
    /// reflecting from below.
    pub fn new(absorption: f64, scattering: f64, thickness: f64) -> Result<Self, RtmError> {
        Self::coupled(absorption, scattering, thickness, 1., 0.)
    }

    /// Slab lit by `incident` downwelling irradiance from above and sitting
    /// on a medium that reflects a fraction `below` of the downwelling
    /// irradiance leaving its base.
    pub fn coupled(
        absorption: f64,
        scattering: f64,
        thickness: f64,
        incident: f64,
        below: f64,
    ) -> Result<Self, RtmError> {
        let absorption = check_non_negative("absorption coefficient", absorption)?;
        let scattering = check_non_negative("scattering coefficient", scattering)?;
        let thickness = check_thickness("layer thickness", thickness)?;
        if !(0. ..=1.).contains(&below) || (absorption == 0. && below == 1.) {
            return Err(RtmError::InvalidParameter {
                name: "reflectance below layer",
                value: below,
            });
        }
        let extinction = extinction_coefficient(absorption, scattering);

        let coefficients = if absorption == 0. {
            let net = incident * (1. - below) / (1. + scattering * thickness * (1. - below));
            Coefficients::Conservative {
                net,
                top_upwelling: incident - net,
            }
        } else {
            let s = (extinction - absorption) / (extinction + absorption);
            let decay = f64::exp(-extinction * thickness);
            let ratio = decay * (below - s) / (1. - below * s);
            let a = incident / (1. + s * decay * ratio);
            Coefficients::Exponential { a, b: a * ratio }
        };

        Ok(Self {
            absorption,
            scattering,
            thickness,
            extinction,
            incident,
            coefficients,
        })
    }

    /// Thickness in m.
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Scattering coefficient in 1/m.
    pub fn scattering(&self) -> f64 {
        self.scattering
    }

    /// Extinction coefficient `μ` in 1/m.
    pub fn extinction(&self) -> f64 {
        self.extinction
    }

    /// Optical depth `μ d`.
    pub fn optical_depth(&self) -> f64 {
        self.extinction * self.thickness
    }

    /// `μ coth(μ d)`, which tends to `1 / d` without absorption.
    pub(crate) fn extinction_coth(&self) -> f64 {
        let optical_depth = self.optical_depth();
        if optical_depth == 0. {
            1. / self.thickness
        } else {
            self.extinction / optical_depth.tanh()
        }
    }

    /// Albedo of infinitely thick ice with the same optical properties,
    /// `(μ - k) / (μ + k)`.
    pub fn optically_thick_albedo(&self) -> f64 {
        if self.absorption == 0. {
            1.
        } else {
            (self.extinction - self.absorption) / (self.extinction + self.absorption)
        }
    }

    /// Upwelling over downwelling at the top, including whatever lies below.
    pub fn reflectance(&self) -> f64 {
        self.upwelling(0.) / self.incident
    }

    /// Both irradiances at local elevation `z`.
    fn fluxes(&self, z: f64) -> (f64, f64) {
        let depth = -z;
        match self.coefficients {
            Coefficients::Exponential { a, b } => {
                let s = self.optically_thick_albedo();
                let from_top = a * f64::exp(-self.extinction * depth);
                let from_bottom = b * f64::exp(-self.extinction * (self.thickness - depth));
                (s * from_top + from_bottom, from_top + s * from_bottom)
            }
            Coefficients::Conservative { net, top_upwelling } => {
                let upwelling = top_upwelling - self.scattering * net * depth;
                (upwelling, upwelling + net)
            }
        }
    }
}

impl ClosedFormField for UniformSlab {
    fn upwelling(&self, z: f64) -> f64 {
        self.fluxes(z).0
    }

    fn downwelling(&self, z: f64) -> f64 {
        self.fluxes(z).1
    }

    fn absorption(&self, _z: f64) -> f64 {
        self.absorption
    }

    /// Albedo of the slab on its own, `r / (k + r + μ coth(μ d))`, ignoring
    /// reflection from below.
    fn albedo(&self) -> f64 {
        self.scattering / (self.absorption + self.scattering + self.extinction_coth())
    }

    fn transmittance(&self) -> f64 {
        self.downwelling(-self.thickness)
    }
}

/// Ice of uniform oil concentration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleLayerModel {
    thickness: f64,
    oil_mass_ratio: f64,
    ice_type: IceType,
    droplet_radius: f64,
    absorption_enhancement: f64,
}

impl SingleLayerModel {
    /// Ice `thickness` m thick holding `oil_mass_ratio` ng/g of oil.
    pub fn new(thickness: f64, oil_mass_ratio: f64, ice_type: IceType) -> Result<Self, RtmError> {
        Ok(Self {
            thickness: check_thickness("ice thickness", thickness)?,
            oil_mass_ratio: check_non_negative("oil mass ratio", oil_mass_ratio)?,
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

    /// Oil mass ratio in ng/g.
    pub fn oil_mass_ratio(&self) -> f64 {
        self.oil_mass_ratio
    }

    /// Ice type.
    pub fn ice_type(&self) -> IceType {
        self.ice_type
    }

    /// Albedo in the limit of infinitely thick ice.
    pub fn optically_thick_albedo(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<f64, RtmError> {
        Ok(self.field(optics, wavelength)?.optically_thick_albedo())
    }
}

impl AnalyticalModel for SingleLayerModel {
    type Field = UniformSlab;

    fn thickness(&self) -> f64 {
        self.thickness
    }

    fn field(
        &self,
        optics: &dyn OpticalPropertyProvider,
        wavelength: f64,
    ) -> Result<UniformSlab, RtmError> {
        let absorption = OilyIceAbsorption::new(
            optics,
            wavelength,
            self.droplet_radius,
            self.absorption_enhancement,
        )?;
        UniformSlab::new(
            absorption.at(self.oil_mass_ratio),
            self.ice_type.scattering_coefficient(),
            self.thickness,
        )
    }
}
