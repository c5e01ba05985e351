use crate::{GpioDriver, GpioError, GpioLine, GpioOutput, GpioResult, PortClock};
use bitvec::vec::BitVec;
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// GPIO driver writing straight into the memory-mapped BCM283x GPIO registers.
///
/// Ports are the 32-line register banks of the chip (`GPSET0`/`GPSET1` and friends), so line
/// `1:8` is BCM GPIO 40. The GPIO block has no clock gating, so [PortClock::enable_port_clock]
/// only validates the port.
pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    // 0x7e200000
    // #[cfg(target_pointer_width = "64")]
    // const GPIO_BASE: u32 = 0xFE200000;
    // #[cfg(target_pointer_width = "32")]
    const GPIO_BASE: u32 = 0x3F200000;
    // const GPIO_BASE: u32 = 0x20200000;

    const PIN_COUNT: usize = 58;
    const LINES_PER_BANK: usize = 32;

    const FUNCTION_INPUT: u8 = 0b000;
    const FUNCTION_OUTPUT: u8 = 0b001;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
                .offset(offset)
                .len(4096)
                .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps the GPIO block through `/dev/gpiomem`, which doesn't need root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    /// Maps the GPIO block through `/dev/mem`.
    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE as u64)
    }

    fn pin_index(&self, line: GpioLine) -> GpioResult<usize> {
        self.check_line(line)?;
        Ok(line.to_flat(Self::LINES_PER_BANK))
    }

    fn raw_set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 || pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift); // Clear the bits for this pin
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        trace!("Set pin function: pin_index={} function={}", pin_index, function);

        Ok(())
    }

    fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr = unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + pin_index / 32) };
        let shift = pin_index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };

        Ok(())
    }

    fn raw_get_pin_level(&self, pin_index: usize) -> GpioResult<bool> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_ptr() as *const u32;
        // GPLEVn register
        let register_ptr = unsafe { mmap.add((0x34 / 4) + pin_index / 32) };
        let shift = pin_index % 32;

        let register_value = unsafe { register_ptr.read_volatile() };
        Ok((register_value >> shift) & 1 != 0)
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl PortClock for RawGpioDriver {
    fn enable_port_clock(&self, port: usize) -> GpioResult<()> {
        if port >= self.port_count() {
            return Err(GpioError::InvalidArgument);
        }
        trace!("Bank {} is always clocked", port);
        Ok(())
    }
}

impl GpioDriver for RawGpioDriver {
    fn port_count(&self) -> usize {
        Self::PIN_COUNT.div_ceil(Self::LINES_PER_BANK)
    }

    fn lines_per_port(&self, port: usize) -> GpioResult<usize> {
        if port >= self.port_count() {
            return Err(GpioError::InvalidArgument);
        }
        Ok((Self::PIN_COUNT - port * Self::LINES_PER_BANK).min(Self::LINES_PER_BANK))
    }

    fn configure_as_output(&self, line: GpioLine) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let pin_index = self.pin_index(line)?;

        if self.used_pins[pin_index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(pin_index, true);
        // Latch low first so the line doesn't glitch high when the function switches
        self.raw_set_pin_output(pin_index, false)?;
        self.raw_set_pin_function(pin_index, Self::FUNCTION_OUTPUT)?;

        Ok(Box::new(RawGpioOutput {
            driver: self,
            line,
            pin_index,
        }))
    }
}

struct RawGpioOutput<'a> {
    driver: &'a RawGpioDriver,
    line: GpioLine,
    pin_index: usize,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.line)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn line(&self) -> GpioLine {
        self.line
    }

    fn set(&self) -> GpioResult<()> {
        self.driver.raw_set_pin_output(self.pin_index, true)
    }

    fn clear(&self) -> GpioResult<()> {
        self.driver.raw_set_pin_output(self.pin_index, false)
    }

    fn toggle(&self) -> GpioResult<()> {
        let level = self.driver.raw_get_pin_level(self.pin_index)?;
        self.driver.raw_set_pin_output(self.pin_index, !level)
    }
}

impl Drop for RawGpioOutput<'_> {
    fn drop(&mut self) {
        _ = self.driver.raw_set_pin_function(self.pin_index, RawGpioDriver::FUNCTION_INPUT);
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}
