//! Digital output lines.
//!
//! The shift register driver never talks to GPIO hardware directly; it is
//! composed from the two line types in this module. A `DigitalLine` is a
//! single output pin with a fixed active polarity, a `ClockLine` is a
//! `DigitalLine` plus a `pulse()` operation. The raw pin behind a line is
//! anything implementing `GpioOut`: a real sysfs pin on the target, or a
//! `SimulatedPin` that records every level written so tests can assert
//! whole edge sequences.

use errors::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use sysfs_gpio::{Direction, Pin};

/// Active polarity of a digital line.
///
/// An active-low line drives the physical pin low when asserted. The
/// 74HC595's /MR (clear) and /OE (output enable) inputs are active low,
/// the data and clock inputs are active high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Raw output pin capability.
pub trait GpioOut {
    /// Prepares the pin as an output. Called once when a line is built.
    fn init_output(&self) -> Result<()>;

    /// Drives the physical level, `0` or `1`.
    fn set_output(&self, value: u8) -> Result<()>;
}

impl GpioOut for Pin {
    fn init_output(&self) -> Result<()> {
        self.export()?;
        self.set_direction(Direction::Out)?;
        Ok(())
    }

    fn set_output(&self, value: u8) -> Result<()> {
        self.set_value(value)?;
        Ok(())
    }
}

/// In-memory stand-in for a GPIO pin.
///
/// Every `set_output` call is appended to a shared buffer, so a clone of
/// the pin kept by a test sees all levels the driver wrote to it, in
/// order.
///
/// # Examples
///
/// ```
/// use shift595::pin::{GpioOut, SimulatedPin};
///
/// let pin = SimulatedPin::new();
/// pin.set_output(1).unwrap();
/// pin.set_output(0).unwrap();
/// assert_eq!(pin.writes(), vec![1, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulatedPin {
    writes: Rc<RefCell<Vec<u8>>>,
}

impl SimulatedPin {
    pub fn new() -> Self {
        SimulatedPin::default()
    }

    /// All levels written to this pin so far, oldest first.
    pub fn writes(&self) -> Vec<u8> {
        self.writes.borrow().clone()
    }

    /// The most recently written level, if any.
    pub fn level(&self) -> Option<u8> {
        self.writes.borrow().last().cloned()
    }

    /// Forgets the recorded history. The driver writes initial levels at
    /// construction; tests call this afterwards to start from a clean slate.
    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl GpioOut for SimulatedPin {
    fn init_output(&self) -> Result<()> {
        Ok(())
    }

    fn set_output(&self, value: u8) -> Result<()> {
        self.writes.borrow_mut().push(value);
        Ok(())
    }
}

/// A single GPIO output with a fixed active polarity.
///
/// The polarity and the initial logical state are fixed at construction;
/// afterwards the line is mutated only through `set`.
#[derive(Debug)]
pub struct DigitalLine<P: GpioOut> {
    pin: P,
    polarity: Polarity,
}

impl<P: GpioOut> DigitalLine<P> {
    pub fn new(pin: P, polarity: Polarity, initial: bool) -> Result<Self> {
        pin.init_output()?;
        let line = DigitalLine {
            pin: pin,
            polarity: polarity,
        };
        line.set(initial)?;
        Ok(line)
    }

    /// Asserts or deasserts the line, mapping through its polarity.
    pub fn set(&self, asserted: bool) -> Result<()> {
        let level = match (self.polarity, asserted) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => 1,
            _ => 0,
        };
        self.pin.set_output(level)
    }
}

/// A clock line: a `DigitalLine` that is driven in pulses.
///
/// Construction leaves the line deasserted; that is the idle state a
/// pulse returns to.
#[derive(Debug)]
pub struct ClockLine<P: GpioOut> {
    line: DigitalLine<P>,
    settle: Duration,
}

impl<P: GpioOut> ClockLine<P> {
    pub fn new(pin: P, polarity: Polarity, settle: Duration) -> Result<Self> {
        Ok(ClockLine {
            line: DigitalLine::new(pin, polarity, false)?,
            settle: settle,
        })
    }

    /// One pulse: assert, hold for the settle time, deassert, hold again.
    ///
    /// On an active-high line this is a rising edge followed by a falling
    /// edge; on an active-low line the reverse. The settle time must cover
    /// the target chip's setup/hold requirements.
    pub fn pulse(&self) -> Result<()> {
        self.line.set(true)?;
        thread::sleep(self.settle);
        self.line.set(false)?;
        thread::sleep(self.settle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_high_line_writes_levels_as_given() {
        let pin = SimulatedPin::new();
        let line = DigitalLine::new(pin.clone(), Polarity::ActiveHigh, false).unwrap();
        line.set(true).unwrap();
        line.set(false).unwrap();
        assert_eq!(pin.writes(), vec![0, 1, 0]);
    }

    #[test]
    fn active_low_line_inverts_levels() {
        let pin = SimulatedPin::new();
        let line = DigitalLine::new(pin.clone(), Polarity::ActiveLow, false).unwrap();
        line.set(true).unwrap();
        line.set(false).unwrap();
        assert_eq!(pin.writes(), vec![1, 0, 1]);
    }

    #[test]
    fn initial_state_is_written_at_construction() {
        let pin = SimulatedPin::new();
        let _line = DigitalLine::new(pin.clone(), Polarity::ActiveHigh, true).unwrap();
        assert_eq!(pin.writes(), vec![1]);
    }

    #[test]
    fn pulse_is_assert_then_deassert() {
        let pin = SimulatedPin::new();
        let clock = ClockLine::new(pin.clone(), Polarity::ActiveHigh, Duration::new(0, 0)).unwrap();
        pin.clear_writes();
        clock.pulse().unwrap();
        assert_eq!(pin.writes(), vec![1, 0]);
    }

    #[test]
    fn active_low_pulse_is_a_falling_edge() {
        let pin = SimulatedPin::new();
        let clock = ClockLine::new(pin.clone(), Polarity::ActiveLow, Duration::new(0, 0)).unwrap();
        // idle level is high
        assert_eq!(pin.level(), Some(1));
        pin.clear_writes();
        clock.pulse().unwrap();
        assert_eq!(pin.writes(), vec![0, 1]);
    }
}
