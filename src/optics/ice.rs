//! Complex refractive index of pure ice.
//!
//! The table is a digitised subset of the Warren & Brandt (2008) compilation
//! covering the solar shortwave. Between tabulated points the imaginary part
//! is interpolated linearly in log-log space, the real part linearly.

use std::sync::OnceLock;

use num_complex::Complex64;

use crate::error::RtmError;

const NPOINTS: usize = 33;

/// Tabulated ice refractive index
struct IceRefractiveIndex {
    /// Wavelength in µm
    wavelength: [f64; NPOINTS],
    /// Real part of the refractive index
    real: [f64; NPOINTS],
    /// Natural log of the imaginary part of the refractive index
    log_imag: [f64; NPOINTS],
}

impl IceRefractiveIndex {
    /// Initialize the table.
    fn new() -> Self {
        let wavelength = [
            0.250, 0.300, 0.350, 0.390, 0.400, 0.450, 0.500, 0.550, 0.600, 0.650, 0.700, 0.750,
            0.800, 0.850, 0.900, 0.950, 1.000, 1.030, 1.100, 1.200, 1.300, 1.400, 1.500, 1.600,
            1.800, 2.000, 2.200, 2.500, 2.800, 3.000, 3.200, 3.500, 4.000,
        ];
        let real = [
            1.341, 1.325, 1.318, 1.315, 1.314, 1.311, 1.309, 1.307, 1.306, 1.306, 1.305, 1.304,
            1.303, 1.302, 1.302, 1.301, 1.300, 1.300, 1.299, 1.297, 1.296, 1.295, 1.294, 1.292,
            1.287, 1.276, 1.269, 1.233, 1.130, 1.218, 1.495, 1.409, 1.332,
        ];
        let imag: [f64; NPOINTS] = [
            3.0e-11, 1.6e-11, 8.0e-12, 6.5e-12, 6.8e-12, 1.1e-11, 3.0e-11, 1.1e-10, 1.2e-9,
            3.0e-9, 1.0e-8, 2.5e-8, 4.5e-8, 8.0e-8, 2.0e-7, 4.5e-7, 1.6e-6, 2.0e-6, 1.5e-6,
            8.0e-6, 1.5e-5, 1.0e-4, 5.5e-4, 2.8e-4, 1.0e-4, 1.6e-3, 3.0e-4, 7.0e-4, 1.5e-2,
            2.5e-1, 1.0e-1, 9.0e-3, 1.2e-2,
        ];

        Self {
            wavelength,
            real,
            log_imag: imag.map(f64::ln),
        }
    }

    /// Wavelength limits of the table in nm.
    fn range_nm(&self) -> (f64, f64) {
        (self.wavelength[0] * 1e3, self.wavelength[NPOINTS - 1] * 1e3)
    }
}

fn table() -> &'static IceRefractiveIndex {
    /// Ensure the table is only initialized once.
    static TABLE: OnceLock<IceRefractiveIndex> = OnceLock::new();
    TABLE.get_or_init(IceRefractiveIndex::new)
}

/// Wavelength range in nm over which the ice data is defined.
pub(crate) fn ice_wavelength_range() -> (f64, f64) {
    table().range_nm()
}

/// Complex refractive index of ice at `wavelength` in nm.
pub(crate) fn ice_refractive_index(wavelength: f64) -> Result<Complex64, RtmError> {
    let table = table();
    let (min, max) = table.range_nm();
    if !(min..=max).contains(&wavelength) {
        return Err(RtmError::WavelengthOutOfRange {
            wavelength,
            min,
            max,
        });
    }

    let microns = wavelength * 1e-3;
    let upper = table
        .wavelength
        .iter()
        .position(|&w| w >= microns)
        .unwrap_or(NPOINTS - 1)
        .max(1);
    let lower = upper - 1;

    let (w0, w1) = (table.wavelength[lower], table.wavelength[upper]);
    let t_lin = (microns - w0) / (w1 - w0);
    let t_log = (microns.ln() - w0.ln()) / (w1.ln() - w0.ln());

    let real = table.real[lower] + t_lin * (table.real[upper] - table.real[lower]);
    let log_imag =
        table.log_imag[lower] + t_log * (table.log_imag[upper] - table.log_imag[lower]);

    Ok(Complex64::new(real, log_imag.exp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::{OpticalPropertyProvider, TabulatedOptics};
    use approx::assert_relative_eq;

    #[test]
    fn tabulated_points_are_reproduced() {
        let index = ice_refractive_index(400.).unwrap();
        assert_relative_eq!(index.re, 1.314, max_relative = 1e-12);
        assert_relative_eq!(index.im, 6.8e-12, max_relative = 1e-9);
    }

    #[test]
    fn imaginary_part_is_log_log_interpolated() {
        // Halfway between 0.5 and 0.55 µm in log space
        let microns = (0.5f64.ln() + 0.55f64.ln()) / 2.;
        let index = ice_refractive_index(microns.exp() * 1e3).unwrap();
        let expected = ((3.0e-11f64).ln() / 2. + (1.1e-10f64).ln() / 2.).exp();
        assert_relative_eq!(index.im, expected, max_relative = 1e-9);
    }

    #[test]
    fn absorption_grows_into_the_infrared() {
        let visible = TabulatedOptics.ice_absorption(450.).unwrap();
        let near_ir = TabulatedOptics.ice_absorption(1000.).unwrap();
        let infrared = TabulatedOptics.ice_absorption(3000.).unwrap();
        assert!(visible < 1e-2);
        assert!(near_ir > 1.);
        assert!(infrared > 1e5);
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(matches!(
            ice_refractive_index(200.),
            Err(RtmError::WavelengthOutOfRange { .. })
        ));
        assert!(ice_refractive_index(4500.).is_err());
        assert!(ice_refractive_index(250.).is_ok());
        assert!(ice_refractive_index(4000.).is_ok());
    }
}
