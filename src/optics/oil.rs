//! Mass absorption coefficient (MAC) of Romashkino crude oil droplets in ice.
//!
//! The oil is dispersed as droplets whose radii follow a log-normal
//! distribution; the table is keyed by the median radius. Values are in m²/g
//! following Redmond Roche et al. (2022) and are bilinearly interpolated in
//! (wavelength, median radius). Points outside the table are rejected rather
//! than extrapolated.

use std::sync::OnceLock;

use crate::error::RtmError;

const NWAVELENGTHS: usize = 18;
const NRADII: usize = 7;

/// Tabulated oil mass absorption coefficients
struct OilMassAbsorption {
    /// Wavelength in nm
    wavelength: [f64; NWAVELENGTHS],
    /// Median droplet radius in µm
    radius: [f64; NRADII],
    /// MAC in m²/g indexed as `[wavelength][radius]`
    mac: [[f64; NRADII]; NWAVELENGTHS],
}

impl OilMassAbsorption {
    /// Initialize the table.
    #[allow(clippy::excessive_precision)]
    fn new() -> Self {
        let wavelength = [
            300., 350., 400., 450., 500., 550., 600., 650., 700., 750., 800., 900., 1000., 1200.,
            1500., 2000., 2500., 3000.,
        ];
        let radius = [0.05, 0.25, 0.5, 1.5, 2.5, 3.5, 5.0];
        let mac = [
            [2.047, 1.951, 1.843, 1.508, 1.276, 1.106, 0.9213],
            [1.350, 1.287, 1.215, 0.9943, 0.8414, 0.7292, 0.6076],
            [0.8909, 0.8489, 0.8018, 0.656, 0.5551, 0.4811, 0.4009],
            [0.588, 0.5603, 0.5292, 0.433, 0.3663, 0.3175, 0.2646],
            [0.3883, 0.37, 0.3495, 0.2859, 0.2419, 0.2097, 0.1747],
            [0.2566, 0.2446, 0.231, 0.189, 0.1599, 0.1386, 0.1155],
            [0.1699, 0.1619, 0.1529, 0.1251, 0.1058, 0.09173, 0.07644],
            [0.1127, 0.1074, 0.1014, 0.08295, 0.07019, 0.06083, 0.05069],
            [0.07494, 0.07141, 0.06745, 0.05518, 0.04669, 0.04047, 0.03372],
            [0.05008, 0.04772, 0.04507, 0.03687, 0.0312, 0.02704, 0.02253],
            [0.03369, 0.0321, 0.03032, 0.0248, 0.02099, 0.01819, 0.01516],
            [0.01576, 0.01502, 0.01418, 0.0116, 0.009818, 0.008509, 0.00709],
            [0.007965, 0.00759, 0.007168, 0.005865, 0.004963, 0.004301, 0.003584],
            [0.003107, 0.00296, 0.002796, 0.002288, 0.001936, 0.001678, 0.001398],
            [0.002068, 0.001971, 0.001861, 0.001523, 0.001289, 0.001117, 0.0009307],
            [0.001977, 0.001884, 0.001779, 0.001456, 0.001232, 0.001067, 0.0008895],
            [0.001975, 0.001882, 0.001778, 0.001455, 0.001231, 0.001067, 0.0008889],
            [0.001975, 0.001882, 0.001778, 0.001455, 0.001231, 0.001067, 0.0008889],
        ];
        Self {
            wavelength,
            radius,
            mac,
        }
    }
}

fn table() -> &'static OilMassAbsorption {
    /// Ensure the table is only initialized once.
    static TABLE: OnceLock<OilMassAbsorption> = OnceLock::new();
    TABLE.get_or_init(OilMassAbsorption::new)
}

/// Wavelength range in nm covered by the table.
pub(crate) fn oil_wavelength_range() -> (f64, f64) {
    let wavelengths = &table().wavelength;
    (wavelengths[0], wavelengths[NWAVELENGTHS - 1])
}

/// Bracketing indices and weight of the upper point for `x` in `xs`.
fn bracket(xs: &[f64], x: f64) -> (usize, f64) {
    let upper = xs.iter().position(|&v| v >= x).unwrap_or(xs.len() - 1).max(1);
    let lower = upper - 1;
    (lower, (x - xs[lower]) / (xs[upper] - xs[lower]))
}

/// Oil mass absorption coefficient in m²/g.
///
/// For a `wavelength` in nm and a median droplet radius `radius` in µm.
pub(crate) fn oil_mass_absorption_coefficient(
    wavelength: f64,
    radius: f64,
) -> Result<f64, RtmError> {
    let OilMassAbsorption {
        wavelength: wavelengths,
        radius: radii,
        mac,
    } = table();

    let (min, max) = (wavelengths[0], wavelengths[NWAVELENGTHS - 1]);
    if !(min..=max).contains(&wavelength) {
        return Err(RtmError::WavelengthOutOfRange {
            wavelength,
            min,
            max,
        });
    }
    let (min, max) = (radii[0], radii[NRADII - 1]);
    if !(min..=max).contains(&radius) {
        return Err(RtmError::DropletRadiusOutOfRange { radius, min, max });
    }

    let (i, tw) = bracket(wavelengths, wavelength);
    let (j, tr) = bracket(radii, radius);

    let low = mac[i][j] + tr * (mac[i][j + 1] - mac[i][j]);
    let high = mac[i + 1][j] + tr * (mac[i + 1][j + 1] - mac[i + 1][j]);
    Ok(low + tw * (high - low))
}
