//! Settle delays for bit-banged protocols.
//!
//! Displays like the HD44780 need a minimum enable pulse width and some time to latch each
//! transaction. The delay is a busy-wait on purpose: it can't be cut short, and it doesn't depend
//! on the scheduler waking us up in time.

use log::debug;
use std::fmt::Debug;
use std::hint::{black_box, spin_loop};
use std::time::{Duration, Instant};

/// A fixed, non-interruptible settle delay.
pub trait Delay: Debug {
    /// Busy-waits for one settle period.
    fn busy_wait(&mut self);
}

/// Spins for a fixed amount of iterations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpinDelay {
    iterations: u32,
}

impl SpinDelay {
    /// Iteration count that gave a slow (16 MHz) microcontroller enough pulse width.
    pub const DEFAULT_ITERATIONS: u32 = 10_000;

    const CALIBRATION_PROBE: u32 = 100_000;

    pub fn new(iterations: u32) -> Self {
        SpinDelay { iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Measures the spin rate of the host and returns a delay lasting at least `min_duration`.
    pub fn calibrate(min_duration: Duration) -> Self {
        let start = Instant::now();
        Self::spin(Self::CALIBRATION_PROBE);
        let elapsed = start.elapsed().max(Duration::from_nanos(1));

        let iterations = Self::iterations_for(min_duration, elapsed, Self::CALIBRATION_PROBE);
        debug!(
            "Calibrated spin delay: {} iterations per {:?} ({:?} per {} probe iterations)",
            iterations, min_duration, elapsed, Self::CALIBRATION_PROBE
        );
        SpinDelay { iterations }
    }

    fn iterations_for(min_duration: Duration, probe_elapsed: Duration, probe_iterations: u32) -> u32 {
        let per_iteration = probe_elapsed.as_nanos() as f64 / probe_iterations as f64;
        let iterations = (min_duration.as_nanos() as f64 / per_iteration).ceil();
        iterations.clamp(1.0, u32::MAX as f64) as u32
    }

    fn spin(iterations: u32) {
        for i in 0..iterations {
            black_box(i);
            spin_loop();
        }
    }
}

impl Default for SpinDelay {
    fn default() -> Self {
        SpinDelay::new(Self::DEFAULT_ITERATIONS)
    }
}

impl Delay for SpinDelay {
    fn busy_wait(&mut self) {
        Self::spin(self.iterations);
    }
}

/// Doesn't wait at all. Only for backends that are slow enough on their own, or simulations.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    #[inline]
    fn busy_wait(&mut self) {}
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn busy_wait(&mut self) {
        (**self).busy_wait()
    }
}

impl<D: Delay + ?Sized> Delay for Box<D> {
    fn busy_wait(&mut self) {
        (**self).busy_wait()
    }
}
