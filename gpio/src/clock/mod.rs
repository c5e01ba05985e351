//! Port clock domains.
//!
//! On many microcontrollers a GPIO port has to have its clock enabled before its registers react to
//! anything. Other platforms (the BCM283x used by [crate::raw::RawGpioDriver], or the Linux character
//! device interface) keep the ports clocked all the time. Drivers implement [PortClock] either way,
//! so callers can enable the clock of every port they use without knowing which kind they got.

use std::fmt::Debug;
use crate::GpioResult;

/// Enables the clock domain of a port.
pub trait PortClock: Debug {
    /// Enables the clock of the given port. Enabling an already enabled clock is a no-op.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the port does not exist.
    fn enable_port_clock(&self, port: usize) -> GpioResult<()>;

    /// Checks whether the clock of the port is enabled.
    ///
    /// Backends without clock gating always return `true`.
    fn port_clock_enabled(&self, _port: usize) -> GpioResult<bool> {
        Ok(true)
    }
}

/// Clock-enable register layout: which bit of the enable register belongs to which port.
///
/// Ports without a bit are not gated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClockEnableMap {
    bits: &'static [Option<u8>],
}

impl ClockEnableMap {
    /// STM32F411-style AHB1ENR layout: ports A, B, C at bits 0..3, H at bit 7.
    /// Ports D..G do not exist on that package and have no bit.
    pub const STM32F411: ClockEnableMap = ClockEnableMap {
        bits: &[Some(0), Some(1), Some(2), None, None, None, None, Some(7)],
    };

    pub const fn new(bits: &'static [Option<u8>]) -> Self {
        ClockEnableMap { bits }
    }

    /// Gets the enable-register bit for the port, if it is gated.
    pub fn bit_for(&self, port: usize) -> Option<u8> {
        self.bits.get(port).copied().flatten()
    }

    /// Gets the amount of ports the layout describes.
    pub fn port_count(&self) -> usize {
        self.bits.len()
    }
}
