//! In-memory GPIO backend.
//!
//! Models a microcontroller's GPIO ports as plain registers: a clock-enable register, and per port
//! an output-mode mask and an output data register. Every operation is also appended to a journal,
//! so tests (and the dry-run mode of the application) can replay exactly what happened on the lines,
//! including where the settle delays were.
use crate::clock::ClockEnableMap;
use crate::delay::Delay;
use crate::{GpioDriver, GpioError, GpioLine, GpioOutput, GpioResult, PortClock};
use bitvec::vec::BitVec;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// Something that happened on the simulated hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    ClockEnabled(usize),
    ConfiguredOutput(GpioLine),
    Released(GpioLine),
    Set(GpioLine),
    Clear(GpioLine),
    Toggle(GpioLine),
    Delay,
}

#[derive(Copy, Clone, Debug, Default)]
struct SimPort {
    output_mask: u32,
    output_data: u32,
}

#[derive(Debug, Default)]
struct SimState {
    clock_enable: u32,
    ports: Vec<SimPort>,
    journal: Vec<SimEvent>,
}

pub struct SimGpioDriver {
    clock_map: Option<ClockEnableMap>,
    lines_per_port: usize,
    state: RefCell<SimState>,
    used_lines: BitVec<AtomicU8>,
}

impl SimGpioDriver {
    /// Creates a simulation with `port_count` ungated ports.
    ///
    /// # Panics
    /// If `lines_per_port` doesn't fit into a 32-bit register.
    pub fn new(port_count: usize, lines_per_port: usize) -> Self {
        assert!(lines_per_port <= 32, "ports are modelled as 32-bit registers");
        SimGpioDriver {
            clock_map: None,
            lines_per_port,
            state: RefCell::new(SimState {
                ports: vec![SimPort::default(); port_count],
                ..Default::default()
            }),
            used_lines: BitVec::repeat(false, port_count * lines_per_port),
        }
    }

    /// Creates a simulation whose ports have to be clocked before they can be configured.
    pub fn with_clock_map(clock_map: ClockEnableMap, lines_per_port: usize) -> Self {
        let mut sim = Self::new(clock_map.port_count(), lines_per_port);
        sim.clock_map = Some(clock_map);
        sim
    }

    /// An STM32F411-like chip: ports A..H, 16 lines each, clock gated through AHB1ENR.
    pub fn stm32f411() -> Self {
        Self::with_clock_map(ClockEnableMap::STM32F411, 16)
    }

    /// Gets a delay that records each settle period into the journal instead of waiting.
    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay { sim: self }
    }

    /// Gets the raw clock-enable register.
    pub fn clock_enable_register(&self) -> u32 {
        self.state.borrow().clock_enable
    }

    /// Gets the output data register of a port.
    pub fn output_data(&self, port: usize) -> GpioResult<u32> {
        let state = self.state.borrow();
        let port = state.ports.get(port).ok_or(GpioError::InvalidArgument)?;
        Ok(port.output_data)
    }

    /// Gets the current level of a line.
    pub fn level(&self, line: GpioLine) -> GpioResult<bool> {
        self.check_line(line)?;
        Ok(self.output_data(line.port)? & (1 << line.bit) != 0)
    }

    /// Checks whether the line is configured as an output.
    pub fn is_output(&self, line: GpioLine) -> GpioResult<bool> {
        self.check_line(line)?;
        let state = self.state.borrow();
        Ok(state.ports[line.port].output_mask & (1 << line.bit) != 0)
    }

    /// Gets the position in the journal, to be used with the `*_since` methods.
    pub fn mark(&self) -> usize {
        self.state.borrow().journal.len()
    }

    /// Gets a copy of the whole journal.
    pub fn journal(&self) -> Vec<SimEvent> {
        self.state.borrow().journal.clone()
    }

    /// Gets the events recorded after `mark`.
    pub fn events_since(&self, mark: usize) -> Vec<SimEvent> {
        let state = self.state.borrow();
        state.journal.get(mark..).unwrap_or_default().to_vec()
    }

    /// Replays the journal and samples `lines` at every rising edge of `strobe` after `mark`.
    ///
    /// Each sample lists the levels of `lines` in the given order, which is what the device on the
    /// other end latched.
    pub fn latches_since(&self, mark: usize, strobe: GpioLine, lines: &[GpioLine]) -> Vec<Vec<bool>> {
        let state = self.state.borrow();
        let mut levels: HashMap<GpioLine, bool> = HashMap::new();
        let mut latches = Vec::new();

        for (index, event) in state.journal.iter().enumerate() {
            match *event {
                SimEvent::ConfiguredOutput(line) | SimEvent::Clear(line) | SimEvent::Released(line) => {
                    levels.insert(line, false);
                }
                SimEvent::Set(line) => {
                    let was_high = levels.insert(line, true).unwrap_or(false);
                    if line == strobe && !was_high && index >= mark {
                        latches.push(
                            lines.iter().map(|l| levels.get(l).copied().unwrap_or(false)).collect(),
                        );
                    }
                }
                SimEvent::Toggle(line) => {
                    let level = levels.entry(line).or_insert(false);
                    *level = !*level;
                    if line == strobe && *level && index >= mark {
                        latches.push(
                            lines.iter().map(|l| levels.get(l).copied().unwrap_or(false)).collect(),
                        );
                    }
                }
                SimEvent::ClockEnabled(_) | SimEvent::Delay => {}
            }
        }

        latches
    }

    /// Counts the rising edges of `strobe` after `mark`.
    pub fn pulses_since(&self, mark: usize, strobe: GpioLine) -> usize {
        self.latches_since(mark, strobe, &[]).len()
    }

    fn record(&self, event: SimEvent) {
        trace!("sim: {:?}", event);
        self.state.borrow_mut().journal.push(event);
    }

    fn modify_port(&self, line: GpioLine, event: SimEvent, f: impl FnOnce(&mut SimPort, u32)) {
        {
            let mut state = self.state.borrow_mut();
            let port = &mut state.ports[line.port];
            f(port, 1 << line.bit);
        }
        self.record(event);
    }
}

impl Debug for SimGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimGpioDriver({}x{})", self.port_count(), self.lines_per_port)
    }
}

impl PortClock for SimGpioDriver {
    fn enable_port_clock(&self, port: usize) -> GpioResult<()> {
        if port >= self.port_count() {
            return Err(GpioError::InvalidArgument);
        }
        if let Some(bit) = self.clock_map.and_then(|map| map.bit_for(port)) {
            self.state.borrow_mut().clock_enable |= 1 << bit;
        }
        self.record(SimEvent::ClockEnabled(port));
        Ok(())
    }

    fn port_clock_enabled(&self, port: usize) -> GpioResult<bool> {
        if port >= self.port_count() {
            return Err(GpioError::InvalidArgument);
        }
        Ok(match self.clock_map.and_then(|map| map.bit_for(port)) {
            Some(bit) => self.clock_enable_register() & (1 << bit) != 0,
            None => true,
        })
    }
}

impl GpioDriver for SimGpioDriver {
    fn port_count(&self) -> usize {
        self.state.borrow().ports.len()
    }

    fn lines_per_port(&self, port: usize) -> GpioResult<usize> {
        if port >= self.port_count() {
            return Err(GpioError::InvalidArgument);
        }
        Ok(self.lines_per_port)
    }

    fn configure_as_output(&self, line: GpioLine) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.check_line(line)?;

        let index = line.to_flat(self.lines_per_port);
        if self.used_lines[index] {
            return Err(GpioError::AlreadyInUse);
        }
        if !self.port_clock_enabled(line.port)? {
            return Err(GpioError::Other(format!("port {} clock is disabled", line.port)));
        }

        self.used_lines.set_aliased(index, true);
        self.modify_port(line, SimEvent::ConfiguredOutput(line), |port, mask| {
            port.output_mask |= mask;
            port.output_data &= !mask;
        });

        Ok(Box::new(SimOutput { driver: self, line }))
    }
}

struct SimOutput<'a> {
    driver: &'a SimGpioDriver,
    line: GpioLine,
}

impl Debug for SimOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.line)
    }
}

impl GpioOutput for SimOutput<'_> {
    fn line(&self) -> GpioLine {
        self.line
    }

    fn set(&self) -> GpioResult<()> {
        self.driver.modify_port(self.line, SimEvent::Set(self.line), |port, mask| {
            port.output_data |= mask;
        });
        Ok(())
    }

    fn clear(&self) -> GpioResult<()> {
        self.driver.modify_port(self.line, SimEvent::Clear(self.line), |port, mask| {
            port.output_data &= !mask;
        });
        Ok(())
    }

    fn toggle(&self) -> GpioResult<()> {
        self.driver.modify_port(self.line, SimEvent::Toggle(self.line), |port, mask| {
            port.output_data ^= mask;
        });
        Ok(())
    }
}

impl Drop for SimOutput<'_> {
    fn drop(&mut self) {
        self.driver.modify_port(self.line, SimEvent::Released(self.line), |port, mask| {
            port.output_mask &= !mask;
            port.output_data &= !mask;
        });
        self.driver
            .used_lines
            .set_aliased(self.line.to_flat(self.driver.lines_per_port), false);
    }
}

/// Delay for [SimGpioDriver] that only journals.
pub struct SimDelay<'a> {
    sim: &'a SimGpioDriver,
}

impl Debug for SimDelay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[delay]", self.sim)
    }
}

impl Delay for SimDelay<'_> {
    fn busy_wait(&mut self) {
        self.sim.record(SimEvent::Delay);
    }
}
