//! HD44780 character LCD module.
//!
//! The driver is split in three layers:
//! - [driver::BusEncoder] puts bytes on a 4- or 8-line data bus and pulses the enable line,
//! - [driver::HD44780Driver] (implemented by [driver::GpioHD44780Driver]) handles the RS/RW mode
//!   lines, the power-on handshake and the instruction set,
//! - [display::Display] keeps track of the cursor and offers text-oriented operations.
//!
//! A typical setup claims the lines and then initializes the display:
//!
//! ```no_run
//! use lcdbang_gpio::delay::SpinDelay;
//! use lcdbang_gpio::lcd::hd44780::display::Display;
//! use lcdbang_gpio::lcd::hd44780::driver::{GpioHD44780Driver, LcdPins};
//! use lcdbang_gpio::lcd::hd44780::geometry::Geometry;
//! use lcdbang_gpio::raw::RawGpioDriver;
//! use lcdbang_gpio::GpioLine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gpio = RawGpioDriver::new_gpiomem()?;
//! let pins = LcdPins::new_4bit(
//!     [21, 20, 16, 26].map(|n| GpioLine::from_flat(n, 32)),
//!     GpioLine::new(0, 22),
//!     GpioLine::new(0, 27),
//!     GpioLine::new(0, 17),
//! );
//! let driver = GpioHD44780Driver::claim(&gpio, &pins, SpinDelay::default())?;
//! let mut lcd = Display::init(driver, Geometry::LCD1602)?;
//! lcd.set_cursor(1, 0)?;
//! lcd.write_str("Hello")?;
//! # Ok(())
//! # }
//! ```

pub mod display;
pub mod driver;
pub mod geometry;

use crate::GpioError;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("coordinate ({row}, {column}) is outside of the display")]
    InvalidCoordinate { row: u8, column: u8 },
    #[error("protocol sequence violation: {0}")]
    ProtocolSequenceViolation(&'static str),
    #[error("expected {expected} data lines, got {actual}")]
    PinCount { expected: usize, actual: usize },
}

pub type LcdResult<T> = Result<T, LcdError>;
