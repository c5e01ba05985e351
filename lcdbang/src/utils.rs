use std::str::FromStr;
use lcdbang_gpio::{GpioDriver, GpioError, GpioLine, GpioResult};
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PinParseError {
    #[error("invalid pin `{0}`, expected `port:bit` or a line number")]
    Invalid(String),
    #[error("expected 4 or 8 data pins, got {0}")]
    DataPinCount(usize),
}

/// A line as written in the environment: either `port:bit`, or a number counted across all ports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PinSpec {
    Line(GpioLine),
    Flat(usize),
}

impl PinSpec {
    /// Resolves the spec against the ports of the driver.
    pub fn resolve(&self, gpio: &dyn GpioDriver) -> GpioResult<GpioLine> {
        match *self {
            PinSpec::Line(line) => Ok(line),
            PinSpec::Flat(mut index) => {
                for port in 0..gpio.port_count() {
                    let lines = gpio.lines_per_port(port)?;
                    if index < lines {
                        return Ok(GpioLine::new(port, index as u8));
                    }
                    index -= lines;
                }
                Err(GpioError::InvalidArgument)
            }
        }
    }
}

impl FromStr for PinSpec {
    type Err = PinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            s.parse().map(PinSpec::Line)
        } else {
            s.parse().map(PinSpec::Flat).map_err(|_| GpioError::InvalidArgument)
        }
        .map_err(|_| PinParseError::Invalid(s.to_string()))
    }
}

/// Parses the data pins, D7 first, separated by commas, spaces or semicolons.
pub fn parse_pin_bus(pin_str: &str) -> Result<Vec<PinSpec>, PinParseError> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?;

    match pins.len() {
        4 | 8 => Ok(pins),
        n => Err(PinParseError::DataPinCount(n)),
    }
}

/// Cuts a string to at most `columns` characters.
pub fn truncate_to(s: &str, columns: u8) -> &str {
    match s.char_indices().nth(columns as usize) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
