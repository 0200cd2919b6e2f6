//! Bit banged driver for 74HC595 serial-in parallel-out shift registers.
//!
//! The driver shifts words given as '0'/'1' strings into a register chain
//! over sysfs GPIO and latches them to the parallel outputs. A simulated
//! pin backend records every level written, so the full edge sequences
//! can be checked without hardware.

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate serde_derive;
extern crate rand;
extern crate serde;
extern crate sysfs_gpio;

pub mod errors;
pub mod pin;
pub mod shift_register;

pub use pin::{ClockLine, DigitalLine, GpioOut, Polarity, SimulatedPin};
pub use shift_register::{ShiftRegister, ShiftRegisterConfig};
