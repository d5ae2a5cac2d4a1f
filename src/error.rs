use thiserror::Error;

/// Possible RTM errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RtmError {
    /// The inputs don't have the expected shape(s)
    #[error("inputs to RTM have the wrong shape")]
    InconsistentInputs,
    /// The vertical grid is too short or not strictly increasing
    #[error("vertical grid must have at least two strictly increasing points")]
    InvalidGrid,
    /// A layer thickness that must be positive is not
    #[error("{name} must be positive, got {value}")]
    NonPositiveThickness {
        /// Which thickness was rejected
        name: &'static str,
        /// The rejected value in m
        value: f64,
    },
    /// A layer depth that must be non-negative is negative
    #[error("{name} must be non-negative, got {value}")]
    NegativeDepth {
        /// Which depth was rejected
        name: &'static str,
        /// The rejected value in m
        value: f64,
    },
    /// The two layer thickness ratio is not in the open interval (0, 1)
    #[error("thickness ratio must lie strictly between 0 and 1, got {0}")]
    ThicknessRatioOutOfRange(f64),
    /// A wavelength lies outside the tabulated optical data
    #[error("wavelength {wavelength} nm is outside the supported range [{min}, {max}] nm")]
    WavelengthOutOfRange {
        /// Requested wavelength in nm
        wavelength: f64,
        /// Lower limit of the data in nm
        min: f64,
        /// Upper limit of the data in nm
        max: f64,
    },
    /// A droplet radius lies outside the tabulated oil data
    #[error("droplet radius {radius} µm is outside the supported range [{min}, {max}] µm")]
    DropletRadiusOutOfRange {
        /// Requested radius in µm
        radius: f64,
        /// Smallest tabulated radius in µm
        min: f64,
        /// Largest tabulated radius in µm
        max: f64,
    },
    /// A physical parameter is negative or not finite
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Which parameter was rejected
        name: &'static str,
        /// The rejected value
        value: f64,
    },
    /// An evaluation depth lies outside the modelled layer
    #[error("depth {z} m is outside the domain [{bottom}, {top}] m")]
    DepthOutOfRange {
        /// Requested elevation in m
        z: f64,
        /// Bottom of the domain in m
        bottom: f64,
        /// Top of the domain in m
        top: f64,
    },
    /// A wavelength band index is not one of the six bands
    #[error("wavelength band index {0} is out of range")]
    InvalidBand(usize),
    /// An ice type tag couldn't be parsed
    #[error("unknown ice type {0:?}")]
    UnknownIceType(String),
    /// The boundary value solver failed for a wavelength
    #[error("boundary value problem did not converge at {wavelength} nm: {message}")]
    NotConverged {
        /// Wavelength (or band representative wavelength) in nm
        wavelength: f64,
        /// Diagnostic message from the solver
        message: String,
    },
    /// Integration over a continuous spectrum was requested without a spectrum
    #[error("an incident spectrum must be provided to integrate a spectral irradiance")]
    MissingSpectrum,
    /// The worker thread pool couldn't be started
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
    /// The operation was aborted early
    #[error("operation cancelled early")]
    Cancelled,
}

/// Reject negative or non-finite values of a physical parameter.
pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<f64, RtmError> {
    if value.is_finite() && value >= 0. {
        Ok(value)
    } else {
        Err(RtmError::InvalidParameter { name, value })
    }
}
