pub mod gpiod;
pub mod lcd;
pub mod raw;
pub mod clock;
pub mod delay;
pub mod sim;

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

pub use clock::PortClock;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("line already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A single digital line, addressed as a bit within a port.
///
/// What a "port" is depends on the backend: a 32-line register bank for
/// [raw::RawGpioDriver], a `/dev/gpiochipN` character device for
/// [gpiod::GpiodDriver], or an in-memory register for [sim::SimGpioDriver].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GpioLine {
    pub port: usize,
    pub bit: u8,
}

impl GpioLine {
    pub const fn new(port: usize, bit: u8) -> Self {
        GpioLine { port, bit }
    }

    /// Splits a flat line number into a port and bit, given the port width.
    pub fn from_flat(index: usize, lines_per_port: usize) -> Self {
        GpioLine {
            port: index / lines_per_port,
            bit: (index % lines_per_port) as u8,
        }
    }

    /// Inverse of [GpioLine::from_flat].
    pub fn to_flat(&self, lines_per_port: usize) -> usize {
        self.port * lines_per_port + self.bit as usize
    }
}

impl Display for GpioLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.port, self.bit)
    }
}

/// Parses `port:bit`.
impl FromStr for GpioLine {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (port, bit) = s.trim().split_once(':').ok_or(GpioError::InvalidArgument)?;
        let port = port.trim().parse().map_err(|_| GpioError::InvalidArgument)?;
        let bit = bit.trim().parse().map_err(|_| GpioError::InvalidArgument)?;
        Ok(GpioLine { port, bit })
    }
}

pub trait GpioDriver: PortClock {
    /// Gets the amount of ports available.
    fn port_count(&self) -> usize;

    /// Gets the amount of lines in a single port.
    fn lines_per_port(&self, port: usize) -> GpioResult<usize>;

    /// Claims the line and configures it for digital output, driven low.
    ///
    /// This is the one-time preparation of a line. The line stays claimed until the returned
    /// output is dropped.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the line does not exist.
    /// - `GpioError::AlreadyInUse` if the line is already claimed.
    fn configure_as_output(&self, line: GpioLine) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Checks that the line exists on this driver.
    fn check_line(&self, line: GpioLine) -> GpioResult<()> {
        if line.port >= self.port_count() || line.bit as usize >= self.lines_per_port(line.port)? {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }
}

pub trait GpioOutput: Debug {
    /// Gets the line this output drives.
    fn line(&self) -> GpioLine;

    /// Drives the line high.
    fn set(&self) -> GpioResult<()>;

    /// Drives the line low.
    fn clear(&self) -> GpioResult<()>;

    /// Inverts the current level of the line.
    fn toggle(&self) -> GpioResult<()>;

    /// Drives the line to the given level.
    fn write(&self, high: bool) -> GpioResult<()> {
        if high { self.set() } else { self.clear() }
    }
}
