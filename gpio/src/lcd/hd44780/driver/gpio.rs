use crate::delay::Delay;
use crate::lcd::hd44780::driver::{BusEncoder, BusWidth, DataBus, HD44780Driver, ReadWrite, RegisterSelect};
use crate::lcd::hd44780::{LcdError, LcdResult};
use crate::{GpioDriver, GpioLine, GpioOutput, GpioResult};
use log::{debug, trace};

/// Which lines the display is wired to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LcdPins {
    /// Data lines, D7 first. With a 4-line bus only the first four are used.
    pub data: Vec<GpioLine>,
    /// Register select.
    pub rs: GpioLine,
    /// Read/write select.
    pub rw: GpioLine,
    /// Enable (strobe).
    pub e: GpioLine,
    pub width: BusWidth,
}

impl LcdPins {
    pub fn new_4bit(data: [GpioLine; 4], rs: GpioLine, rw: GpioLine, e: GpioLine) -> Self {
        LcdPins { data: data.to_vec(), rs, rw, e, width: BusWidth::Four }
    }

    pub fn new_8bit(data: [GpioLine; 8], rs: GpioLine, rw: GpioLine, e: GpioLine) -> Self {
        LcdPins { data: data.to_vec(), rs, rw, e, width: BusWidth::Eight }
    }

    /// Gets the data lines that are actually wired for the bus width, D7 first.
    ///
    /// # Errors
    /// - `LcdError::PinCount` if there are fewer data lines than the width needs.
    pub fn data_lines(&self) -> LcdResult<&[GpioLine]> {
        let expected = self.width.line_count();
        self.data.get(..expected).ok_or(LcdError::PinCount {
            expected,
            actual: self.data.len(),
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    PowerOn,
    Reset,
    Running,
}

/// HD44780 driver bit-banging the parallel bus over GPIO lines.
///
/// The RW line is driven but never raised by any of the operations; the display is write-only.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, D: Delay> {
    pin_rs: Box<dyn GpioOutput + 'a>,
    pin_rw: Box<dyn GpioOutput + 'a>,
    encoder: BusEncoder<'a, D>,
    phase: Phase,
}

impl<'a, D: Delay> GpioHD44780Driver<'a, D> {
    pub fn new(
        pin_rs: Box<dyn GpioOutput + 'a>,
        pin_rw: Box<dyn GpioOutput + 'a>,
        encoder: BusEncoder<'a, D>,
    ) -> Self {
        GpioHD44780Driver {
            pin_rs,
            pin_rw,
            encoder,
            phase: Phase::PowerOn,
        }
    }

    /// Enables the port clock of every line in `pins` and configures the lines as outputs, data
    /// lines first (D7 down), then RS, RW and E.
    pub fn claim<G: GpioDriver + ?Sized>(gpio: &'a G, pins: &LcdPins, delay: D) -> LcdResult<Self> {
        let configure = |line: GpioLine| -> GpioResult<Box<dyn GpioOutput + 'a>> {
            gpio.enable_port_clock(line.port)?;
            let output = gpio.configure_as_output(line)?;
            debug!("Configured {} as output", line);
            Ok(output)
        };

        let data = pins
            .data_lines()?
            .iter()
            .map(|&line| configure(line))
            .collect::<GpioResult<Vec<_>>>()?;
        let data = DataBus::new(pins.width, data)?;
        let pin_rs = configure(pins.rs)?;
        let pin_rw = configure(pins.rw)?;
        let pin_e = configure(pins.e)?;

        Ok(Self::new(pin_rs, pin_rw, BusEncoder::new(data, pin_e, delay)))
    }

    fn write_mode_line(line: &dyn GpioOutput, high: bool) -> GpioResult<()> {
        line.clear()?;
        if high {
            line.set()?;
        }
        Ok(())
    }
}

impl<D: Delay> HD44780Driver for GpioHD44780Driver<'_, D> {
    fn bus_width(&self) -> BusWidth {
        self.encoder.width()
    }

    fn send_command(&mut self, rs: RegisterSelect, rw: ReadWrite, byte: u8) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {:?}, RW: {:?}", byte, rs, rw);

        // A command that fails halfway still ends the handshake
        self.phase = Phase::Running;

        Self::write_mode_line(&*self.pin_rs, rs == RegisterSelect::Data)?;
        Self::write_mode_line(&*self.pin_rw, rw == ReadWrite::Read)?;
        self.encoder.transmit(byte)?;
        Ok(())
    }

    fn reset(&mut self) -> LcdResult<()> {
        debug!("Resetting controller");

        self.pin_rs.clear()?;
        self.encoder.force_upper_nibble(0b0011)?;
        for _ in 0..3 {
            self.encoder.pulse_strobe()?;
        }

        self.phase = Phase::Reset;
        Ok(())
    }

    fn enable_four_bit_mode(&mut self) -> LcdResult<()> {
        if self.bus_width() != BusWidth::Four {
            return Err(LcdError::ProtocolSequenceViolation(
                "four-bit mode enabled on an 8-line bus",
            ));
        }
        if self.phase != Phase::Reset {
            return Err(LcdError::ProtocolSequenceViolation(
                "four-bit mode enable must directly follow the reset",
            ));
        }

        debug!("Enabling four-bit mode");

        self.pin_rs.clear()?;
        self.encoder.force_upper_nibble(0b0010)?;
        self.encoder.pulse_strobe()?;

        self.phase = Phase::Running;
        Ok(())
    }
}
