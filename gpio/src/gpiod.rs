//! GpiodDriver implementation for driving lines through the Linux GPIO character devices.
//!
//! Every `/dev/gpiochipN` handed to the driver becomes one port, so `GpioLine { port: 0, bit: 17 }`
//! is offset 17 of the first chip.
use crate::{GpioDriver, GpioError, GpioLine, GpioOutput, GpioResult, PortClock};
use bitvec::vec::BitVec;
use log::debug;
use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO lines.
pub struct GpiodDriver {
    chips: Vec<gpiod::Chip>,
    used_lines: Vec<BitVec<AtomicU8>>,
}

impl GpiodDriver {
    pub fn new(chips: Vec<gpiod::Chip>) -> Self {
        let used_lines = chips
            .iter()
            .map(|chip| BitVec::repeat(false, chip.num_lines() as usize))
            .collect();
        Self { chips, used_lines }
    }

    /// Opens the chips at the given paths, in port order.
    pub fn open<P: AsRef<std::path::Path>>(paths: &[P]) -> GpioResult<Self> {
        let chips = paths
            .iter()
            .map(|path| gpiod::Chip::new(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for chip in &chips {
            debug!("Opened {} ({} lines)", chip.name(), chip.num_lines());
        }
        Ok(Self::new(chips))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.chips.iter().map(|chip| chip.name()).collect();
        write!(f, "GpiodDriver({})", names.join(", "))
    }
}

impl PortClock for GpiodDriver {
    fn enable_port_clock(&self, port: usize) -> GpioResult<()> {
        // The kernel driver owns the clocks of the chip
        if port >= self.chips.len() {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }
}

impl GpioDriver for GpiodDriver {
    fn port_count(&self) -> usize {
        self.chips.len()
    }

    fn lines_per_port(&self, port: usize) -> GpioResult<usize> {
        let chip = self.chips.get(port).ok_or(GpioError::InvalidArgument)?;
        Ok(chip.num_lines() as usize)
    }

    fn configure_as_output(&self, line: GpioLine) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.check_line(line)?;

        let used = &self.used_lines[line.port];
        if used[line.bit as usize] {
            return Err(GpioError::AlreadyInUse);
        }

        let lines = self.chips[line.port].request_lines(
            gpiod::Options::output([line.bit as u32])
                .consumer(env!("CARGO_PKG_NAME")),
        )?;
        lines.set_values([false])?;

        used.set_aliased(line.bit as usize, true);

        Ok(Box::new(GpiodOutput {
            driver: self,
            line,
            lines,
            level: Cell::new(false),
        }))
    }
}

struct GpiodOutput<'a> {
    driver: &'a GpiodDriver,
    line: GpioLine,
    lines: gpiod::Lines<gpiod::Output>,
    level: Cell<bool>,
}

impl GpiodOutput<'_> {
    fn drive(&self, high: bool) -> GpioResult<()> {
        self.lines.set_values([high])?;
        self.level.set(high);
        Ok(())
    }
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.line)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn line(&self) -> GpioLine {
        self.line
    }

    fn set(&self) -> GpioResult<()> {
        self.drive(true)
    }

    fn clear(&self) -> GpioResult<()> {
        self.drive(false)
    }

    fn toggle(&self) -> GpioResult<()> {
        self.drive(!self.level.get())
    }
}

impl Drop for GpiodOutput<'_> {
    fn drop(&mut self) {
        self.driver.used_lines[self.line.port].set_aliased(self.line.bit as usize, false);
    }
}
