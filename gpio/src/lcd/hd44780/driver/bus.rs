use crate::delay::Delay;
use crate::lcd::hd44780::{LcdError, LcdResult};
use crate::{GpioOutput, GpioResult};
use log::trace;
use std::fmt::{Debug, Formatter};

/// Width of the parallel data bus between the host and the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusWidth {
    /// Only D7..D4 are wired; every byte goes over the bus as two nibbles, high nibble first.
    Four,
    /// D7..D0 are wired; every byte is a single transaction.
    Eight,
}

impl BusWidth {
    /// Gets the amount of data lines used by this width.
    pub fn line_count(&self) -> usize {
        match self {
            BusWidth::Four => 4,
            BusWidth::Eight => 8,
        }
    }
}

/// The data lines of the bus, most significant line (D7) first.
pub enum DataBus<'a> {
    Four([Box<dyn GpioOutput + 'a>; 4]),
    Eight([Box<dyn GpioOutput + 'a>; 8]),
}

impl<'a> DataBus<'a> {
    /// Builds the bus from lines ordered D7 first.
    ///
    /// # Errors
    /// - `LcdError::PinCount` if the amount of lines doesn't match the width.
    pub fn new(width: BusWidth, lines: Vec<Box<dyn GpioOutput + 'a>>) -> LcdResult<Self> {
        let pin_count = |lines: Vec<_>| LcdError::PinCount {
            expected: width.line_count(),
            actual: lines.len(),
        };
        Ok(match width {
            BusWidth::Four => DataBus::Four(lines.try_into().map_err(pin_count)?),
            BusWidth::Eight => DataBus::Eight(lines.try_into().map_err(pin_count)?),
        })
    }

    pub fn width(&self) -> BusWidth {
        match self {
            DataBus::Four(_) => BusWidth::Four,
            DataBus::Eight(_) => BusWidth::Eight,
        }
    }

    fn lines(&self) -> &[Box<dyn GpioOutput + 'a>] {
        match self {
            DataBus::Four(lines) => lines.as_slice(),
            DataBus::Eight(lines) => lines.as_slice(),
        }
    }

    /// Puts the low `lines.len()` bits of `value` on the lines, the most significant bit on the
    /// first line. Each line is cleared first and then set if its bit is one.
    fn write_bits(&self, value: u8) -> GpioResult<()> {
        let lines = self.lines();
        for (i, line) in lines.iter().enumerate() {
            let bit = lines.len() - 1 - i;
            line.clear()?;
            if (value >> bit) & 1 != 0 {
                line.set()?;
            }
        }
        Ok(())
    }

    /// Drives D7..D4 straight to the given nibble, without the clear-then-set of regular writes.
    fn force_upper_nibble(&self, nibble: u8) -> GpioResult<()> {
        for (i, line) in self.lines()[..4].iter().enumerate() {
            if (nibble >> (3 - i)) & 1 != 0 {
                line.set()?;
            } else {
                line.clear()?;
            }
        }
        Ok(())
    }
}

impl Debug for DataBus<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<_> = self.lines().iter().map(|line| line.line()).collect();
        write!(f, "DataBus{:?}", lines)
    }
}

/// Serializes bytes onto the data bus and latches them with pulses on the enable (strobe) line.
///
/// Each pulse drives the strobe high, waits one settle period, drives it low, and waits again.
/// There's no acknowledgement, so a successful return only means the lines were driven.
#[derive(Debug)]
pub struct BusEncoder<'a, D: Delay> {
    data: DataBus<'a>,
    strobe: Box<dyn GpioOutput + 'a>,
    delay: D,
}

impl<'a, D: Delay> BusEncoder<'a, D> {
    pub fn new(data: DataBus<'a>, strobe: Box<dyn GpioOutput + 'a>, delay: D) -> Self {
        BusEncoder { data, strobe, delay }
    }

    pub fn width(&self) -> BusWidth {
        self.data.width()
    }

    /// Transmits a byte: one transaction on an 8-line bus, two on a 4-line bus (high nibble first).
    pub fn transmit(&mut self, byte: u8) -> GpioResult<()> {
        match self.data.width() {
            BusWidth::Eight => {
                self.data.write_bits(byte)?;
                self.pulse_strobe()?;
            }
            BusWidth::Four => {
                let high_nibble = (byte >> 4) & 0x0F;
                let low_nibble = byte & 0x0F;
                trace!("Writing HN: {:04b}", high_nibble);
                self.data.write_bits(high_nibble)?;
                self.pulse_strobe()?;
                trace!("Writing LN: {:04b}", low_nibble);
                self.data.write_bits(low_nibble)?;
                self.pulse_strobe()?;
            }
        }
        Ok(())
    }

    /// Puts a nibble on D7..D4 without pulsing. Used by the power-on handshake.
    pub fn force_upper_nibble(&mut self, nibble: u8) -> GpioResult<()> {
        trace!("Forcing D7..D4: {:04b}", nibble & 0x0F);
        self.data.force_upper_nibble(nibble)
    }

    /// Issues one raw strobe pulse, latching whatever is on the bus.
    pub fn pulse_strobe(&mut self) -> GpioResult<()> {
        self.strobe.set()?;
        self.delay.busy_wait();
        self.strobe.clear()?;
        self.delay.busy_wait();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimEvent, SimGpioDriver};
    use crate::{GpioDriver, GpioLine};

    const STROBE: GpioLine = GpioLine::new(0, 0);

    fn data_lines(width: BusWidth) -> Vec<GpioLine> {
        (0..width.line_count() as u8).map(|bit| GpioLine::new(1, bit)).collect()
    }

    fn encoder(sim: &SimGpioDriver, width: BusWidth) -> BusEncoder<'_, crate::sim::SimDelay<'_>> {
        let lines = data_lines(width)
            .into_iter()
            .map(|line| sim.configure_as_output(line).unwrap())
            .collect();
        BusEncoder::new(
            DataBus::new(width, lines).unwrap(),
            sim.configure_as_output(STROBE).unwrap(),
            sim.delay(),
        )
    }

    fn bits(value: u8, count: usize) -> Vec<bool> {
        (0..count).rev().map(|bit| (value >> bit) & 1 != 0).collect()
    }

    #[test]
    fn four_line_bus_sends_high_nibble_first() {
        let sim = SimGpioDriver::new(2, 8);
        let mut encoder = encoder(&sim, BusWidth::Four);
        let mark = sim.mark();

        encoder.transmit(0xA5).unwrap();

        let latches = sim.latches_since(mark, STROBE, &data_lines(BusWidth::Four));
        assert_eq!(latches, vec![bits(0b1010, 4), bits(0b0101, 4)]);
    }

    #[test]
    fn eight_line_bus_sends_one_transaction() {
        let sim = SimGpioDriver::new(2, 8);
        let mut encoder = encoder(&sim, BusWidth::Eight);
        let mark = sim.mark();

        encoder.transmit(0xA5).unwrap();

        let latches = sim.latches_since(mark, STROBE, &data_lines(BusWidth::Eight));
        assert_eq!(latches, vec![bits(0xA5, 8)]);
        // D7 is the first line, D0 the last
        assert!(sim.level(GpioLine::new(1, 0)).unwrap());
        assert!(!sim.level(GpioLine::new(1, 1)).unwrap());
        assert!(sim.level(GpioLine::new(1, 7)).unwrap());
    }

    #[test]
    fn pulse_settles_on_both_edges() {
        let sim = SimGpioDriver::new(2, 8);
        let mut encoder = encoder(&sim, BusWidth::Four);
        let mark = sim.mark();

        encoder.pulse_strobe().unwrap();

        assert_eq!(
            sim.events_since(mark),
            vec![SimEvent::Set(STROBE), SimEvent::Delay, SimEvent::Clear(STROBE), SimEvent::Delay]
        );
    }

    #[test]
    fn bit_writes_clear_before_set() {
        let sim = SimGpioDriver::new(2, 8);
        let mut encoder = encoder(&sim, BusWidth::Four);
        let mark = sim.mark();

        encoder.transmit(0x90).unwrap();

        let d7 = GpioLine::new(1, 0);
        let d6 = GpioLine::new(1, 1);
        let events = sim.events_since(mark);
        assert_eq!(&events[..3], &[SimEvent::Clear(d7), SimEvent::Set(d7), SimEvent::Clear(d6)]);
    }

    #[test]
    fn writing_the_same_byte_twice_is_idempotent() {
        let sim = SimGpioDriver::new(2, 8);
        let mut encoder = encoder(&sim, BusWidth::Eight);

        encoder.transmit(0x3C).unwrap();
        let first = sim.output_data(1).unwrap();
        encoder.transmit(0x3C).unwrap();
        assert_eq!(sim.output_data(1).unwrap(), first);
    }

    #[test]
    fn forced_nibble_skips_pulse() {
        let sim = SimGpioDriver::new(2, 8);
        let mut encoder = encoder(&sim, BusWidth::Eight);
        let mark = sim.mark();

        encoder.force_upper_nibble(0b0011).unwrap();

        assert_eq!(sim.pulses_since(mark, STROBE), 0);
        // D7 D6 D5 D4 = 0 0 1 1 live on bits 0..4 of port 1, reversed
        assert_eq!(sim.output_data(1).unwrap(), 0b1100);
        assert_eq!(
            sim.events_since(mark),
            vec![
                SimEvent::Clear(GpioLine::new(1, 0)),
                SimEvent::Clear(GpioLine::new(1, 1)),
                SimEvent::Set(GpioLine::new(1, 2)),
                SimEvent::Set(GpioLine::new(1, 3)),
            ]
        );
    }

    #[test]
    fn wrong_line_count_is_rejected() {
        let sim = SimGpioDriver::new(2, 8);
        let lines = (0..3)
            .map(|bit| sim.configure_as_output(GpioLine::new(1, bit)).unwrap())
            .collect();
        assert_eq!(
            DataBus::new(BusWidth::Four, lines).unwrap_err(),
            LcdError::PinCount { expected: 4, actual: 3 }
        );
    }
}
