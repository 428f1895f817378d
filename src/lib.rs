mod sys;
mod config;
mod device;
mod waveform;
mod generator;
mod calib;
mod procedure;
mod terminal;

/// Status codes used by the vendor library for the conditions this crate reports itself.
pub mod status {
    pub const OK: i32 = 0;
    pub const EOOR: i32 = 6;
    pub const EIPV: i32 = 15;
    pub const EUF: i32 = 16;
    pub const ENN: i32 = 17;
}

#[derive(Debug)]
pub enum Error {
    /// A parameter is outside of the range accepted by the hardware.
    OutOfRange,
    /// Arbitrary waveform data is not normalized to `-1.0..=1.0`.
    NotNormalized,
    /// A parameter value is not valid for the requested operation.
    InvalidParameter,
    /// The requested feature is not supported by the hardware.
    Unsupported,
    /// The vendor library returned a non-zero status code.
    Library(i32),
    /// A calibration file does not contain exactly one calibration record.
    CorruptCalibration { len: usize },
    /// The operator asked to stop the calibration procedure.
    Aborted,
    Io(std::io::Error),
    Other(Box<dyn std::error::Error + Sync + Send + 'static>),
}

impl Error {
    /// Returns the vendor library status code corresponding to this error, if there is one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::OutOfRange => Some(status::EOOR),
            Self::NotNormalized => Some(status::ENN),
            Self::InvalidParameter => Some(status::EIPV),
            Self::Unsupported => Some(status::EUF),
            Self::Library(code) => Some(*code),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::OutOfRange =>
                write!(f, "value out of range"),
            Self::NotNormalized =>
                write!(f, "data not normalized"),
            Self::InvalidParameter =>
                write!(f, "invalid parameter value"),
            Self::Unsupported =>
                write!(f, "unsupported feature"),
            Self::Library(code) =>
                write!(f, "vendor library error (status {})", code),
            Self::CorruptCalibration { len } =>
                write!(f, "calibration file has {} bytes, expected {}", len, CalibrationParams::SIZE),
            Self::Aborted =>
                write!(f, "aborted by operator"),
            Self::Io(io_error) =>
                write!(f, "I/O error: {}", io_error),
            Self::Other(error) =>
                write!(f, "{}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            &Self::Io(ref io_error) => Some(io_error),
            _ => None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.downcast::<Self>() {
            Ok(error) => error,
            Err(error) => Error::Io(error),
        }
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use config::{
    Channel,
    ChannelMask,
    GenMode,
    TriggerSource,
    ChannelConfiguration,
    GeneratorConfiguration,
};

pub use waveform::{
    Waveform,
    BUFFER_LENGTH,
    load_samples,
    parse_samples,
};

pub use generator::limits;

pub use calib::{
    CalibrationParams,
    DEFAULT_CALIBRATION_FILE,
    full_scale_from_volts,
    full_scale_to_volts,
};

pub use procedure::{
    Decision,
    Operator,
    Procedure,
    Step,
};

pub use terminal::TerminalOperator;

pub use sys::Driver;
pub use sys::sim::{Call, SimulatedDriver, SimulatedFrontEnd};
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use sys::librp::LibRpDriver;


pub type Device =
    device::Device<crate::sys::imp::DriverImpl>;
