//! 74HC595 shift register driver.
//!
//! The relays and LEDs of the target platform hang off 8bit serial-in
//! parallel-out shift registers. This module drives such a register (or a
//! daisy chain of them) by bit banging its control lines: serial data,
//! shift clock, latch clock, and optionally /MR (clear) and /OE (output
//! enable). Words are given as strings of '0'/'1', first character shifted
//! in first.

use errors::*;
use pin::{ClockLine, DigitalLine, GpioOut, Polarity, SimulatedPin};
use rand::Rng;
use std::thread;
use std::time::Duration;
use sysfs_gpio::Pin;

/// Pin assignment and timing for one shift register chain.
///
/// Pin numbers are BCM/GPIO numbers; they are deployment configuration,
/// not protocol. `settle` is how long every signal is held stable after a
/// change. Pick it to satisfy the target chip's datasheet setup/hold
/// times; the default of 1µs is comfortably above the 74HC595's
/// requirements at any sysfs write rate.
#[derive(Debug, Clone)]
#[derive(Serialize, Deserialize)]
pub struct ShiftRegisterConfig {
    pub ds_pin: u64,
    pub shift_clock_pin: u64,
    pub latch_clock_pin: u64,
    pub clear_pin: Option<u64>,
    pub oe_pin: Option<u64>,
    pub chip_count: usize,
    pub settle: Duration,
}

impl ShiftRegisterConfig {
    /// Configuration for a single chip on the given three mandatory lines,
    /// with no clear or output-enable wired and the default settle time.
    pub fn new(ds_pin: u64, shift_clock_pin: u64, latch_clock_pin: u64) -> Self {
        ShiftRegisterConfig {
            ds_pin: ds_pin,
            shift_clock_pin: shift_clock_pin,
            latch_clock_pin: latch_clock_pin,
            clear_pin: None,
            oe_pin: None,
            chip_count: 1,
            settle: Duration::new(0, 1_000),
        }
    }
}

/// Driver for a chain of 74HC595 shift registers.
///
/// Owns one serial data line, two clock lines and optionally a clear and
/// an output-enable line. The word length is fixed at construction to
/// 8 bits per chained chip.
///
/// All operations are synchronous and blocking; every delay suspends the
/// calling thread. The driver holds no lock, callers must serialize
/// access to one instance themselves.
#[derive(Debug)]
pub struct ShiftRegister<P: GpioOut> {
    data: DigitalLine<P>,
    shift_clock: ClockLine<P>,
    latch_clock: ClockLine<P>,
    clear_line: Option<ClockLine<P>>,
    output_enable: Option<DigitalLine<P>>,
    word_length: usize,
    settle: Duration,
}

impl ShiftRegister<Pin> {
    /// Builds a driver over real sysfs GPIO pins.
    ///
    /// Exports all configured pins, switches them to output and drives
    /// them to their idle levels. With an output-enable line wired, /OE is
    /// driven low, so the parallel outputs are enabled from the start.
    ///
    /// # Parameters
    ///
    /// * `config`     - pin assignment and timing, see `ShiftRegisterConfig`
    pub fn new(config: &ShiftRegisterConfig) -> Result<Self> {
        ShiftRegister::with_pins(
            Pin::new(config.ds_pin),
            Pin::new(config.shift_clock_pin),
            Pin::new(config.latch_clock_pin),
            config.clear_pin.map(Pin::new),
            config.oe_pin.map(Pin::new),
            config.chip_count,
            config.settle,
        )
    }
}

impl ShiftRegister<SimulatedPin> {
    /// Builds a driver over simulated pins, with all optional lines wired
    /// and a settle time of zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use shift595::ShiftRegister;
    ///
    /// let sr = ShiftRegister::simulated(2).unwrap();
    /// assert_eq!(sr.word_length(), 16);
    /// ```
    pub fn simulated(chip_count: usize) -> Result<Self> {
        ShiftRegister::with_pins(
            SimulatedPin::new(),
            SimulatedPin::new(),
            SimulatedPin::new(),
            Some(SimulatedPin::new()),
            Some(SimulatedPin::new()),
            chip_count,
            Duration::new(0, 0),
        )
    }
}

impl<P: GpioOut> ShiftRegister<P> {
    /// Builds a driver from raw pins.
    ///
    /// # Parameters
    ///
    /// * `data`            - serial data input (DS)
    /// * `shift_clock`     - shift clock (SHCP)
    /// * `latch_clock`     - storage register clock (STCP)
    /// * `clear`           - /MR, if wired
    /// * `output_enable`   - /OE, if wired
    /// * `chip_count`      - number of daisy chained chips, at least 1
    /// * `settle`          - hold time after every signal change
    ///
    /// Fails with `ErrorKind::InvalidConfig` for a chip count of zero.
    pub fn with_pins(
        data: P,
        shift_clock: P,
        latch_clock: P,
        clear: Option<P>,
        output_enable: Option<P>,
        chip_count: usize,
        settle: Duration,
    ) -> Result<Self> {
        if chip_count < 1 {
            bail!(ErrorKind::InvalidConfig(
                "chip count must be at least 1".to_string(),
            ));
        }

        let data = DigitalLine::new(data, Polarity::ActiveHigh, false)?;
        let shift_clock = ClockLine::new(shift_clock, Polarity::ActiveHigh, settle)?;
        let latch_clock = ClockLine::new(latch_clock, Polarity::ActiveHigh, settle)?;
        // /MR idles high, a pulse drives it low.
        let clear_line = match clear {
            Some(pin) => Some(ClockLine::new(pin, Polarity::ActiveLow, settle)?),
            None => None,
        };
        // /OE low == outputs enabled.
        let output_enable = match output_enable {
            Some(pin) => Some(DigitalLine::new(pin, Polarity::ActiveLow, true)?),
            None => None,
        };

        Ok(ShiftRegister {
            data: data,
            shift_clock: shift_clock,
            latch_clock: latch_clock,
            clear_line: clear_line,
            output_enable: output_enable,
            word_length: chip_count * 8,
            settle: settle,
        })
    }

    /// Word length in bits, 8 per chained chip.
    pub fn word_length(&self) -> usize {
        self.word_length
    }

    /// Shifts a single bit into the register.
    ///
    /// Sets the serial data line, holds it stable for the settle time,
    /// then pulses the shift clock once. The chip advances its internal
    /// register by one position on that edge.
    pub fn write_bit(&mut self, value: bool) -> Result<()> {
        self.data.set(value)?;
        thread::sleep(self.settle);
        self.shift_clock.pulse()
    }

    /// Shifts a full word into the register, without latching.
    ///
    /// The word must be exactly `word_length()` characters of '0'/'1';
    /// the first character is shifted in first. Validation happens before
    /// any pin is touched, so a rejected word causes zero pin transitions.
    ///
    /// # Examples
    ///
    /// ```
    /// use shift595::ShiftRegister;
    ///
    /// let mut sr = ShiftRegister::simulated(1).unwrap();
    /// assert!(sr.write_word("10110000").is_ok());
    /// assert!(sr.write_word("1011000").is_err());   // too short
    /// assert!(sr.write_word("1011000x").is_err());  // not binary
    /// ```
    pub fn write_word(&mut self, word: &str) -> Result<()> {
        self.validate_word(word)?;
        for bit in word.chars() {
            self.write_bit(bit == '1')?;
        }
        Ok(())
    }

    /// Copies the shifted contents to the parallel outputs.
    ///
    /// One latch clock pulse. Latching twice without an intervening write
    /// reproduces the same output state.
    pub fn latch(&mut self) -> Result<()> {
        self.latch_clock.pulse()
    }

    /// Shifts a word and latches it. The primary entry point.
    ///
    /// With `reverse` the word is reversed as a whole before shifting,
    /// switching between LSB-first and MSB-first output pin ordering. For
    /// multi chip chains the reversal spans the whole word, the caller
    /// arranges bit order across chip boundaries.
    ///
    /// # Examples
    ///
    /// ```
    /// use shift595::ShiftRegister;
    ///
    /// let mut sr = ShiftRegister::simulated(1).unwrap();
    /// sr.write_and_latch("00000001", false).unwrap();
    /// sr.write_and_latch("00000001", true).unwrap(); // same as "10000000"
    /// ```
    pub fn write_and_latch(&mut self, word: &str, reverse: bool) -> Result<()> {
        if reverse {
            let reversed: String = word.chars().rev().collect();
            self.write_word(&reversed)?;
        } else {
            self.write_word(word)?;
        }
        self.latch()
    }

    /// Pulses /MR, zeroing the internal shift contents.
    ///
    /// The currently latched outputs are unaffected; follow up with
    /// `latch()` to drive them all low. Fails with
    /// `ErrorKind::InvalidConfig` if no clear line is wired.
    pub fn clear(&mut self) -> Result<()> {
        match self.clear_line {
            Some(ref line) => line.pulse(),
            None => bail!(ErrorKind::InvalidConfig(
                "no clear line wired".to_string(),
            )),
        }
    }

    /// Enables or disables the parallel outputs via /OE.
    ///
    /// Fails with `ErrorKind::InvalidConfig` if no output-enable line is
    /// wired.
    pub fn set_output_enabled(&mut self, enabled: bool) -> Result<()> {
        match self.output_enable {
            Some(ref line) => line.set(enabled),
            None => bail!(ErrorKind::InvalidConfig(
                "no output-enable line wired".to_string(),
            )),
        }
    }

    /// Shifts an all-zero word and latches it, driving every output low.
    ///
    /// Works without a clear line, a full zero word is shifted instead.
    pub fn reset(&mut self) -> Result<()> {
        let zeros = zero_word(self.word_length);
        self.write_and_latch(&zeros, false)
    }

    /// Lamp test: switches every output on, waits `hold`, switches every
    /// output off again.
    ///
    /// # Examples
    ///
    /// ```
    /// use shift595::ShiftRegister;
    /// use std::time::Duration;
    ///
    /// let mut sr = ShiftRegister::simulated(1).unwrap();
    /// sr.lamp_test(Duration::from_millis(1)).unwrap();
    /// ```
    pub fn lamp_test(&mut self, hold: Duration) -> Result<()> {
        let ones: String = (0..self.word_length).map(|_| '1').collect();
        self.write_and_latch(&ones, false)?;
        thread::sleep(hold);
        self.reset()
    }

    /// Random lamp test: latches a random word, waits `hold`, then
    /// switches every output off again.
    pub fn test_random(&mut self, hold: Duration) -> Result<()> {
        let mut rng = ::rand::thread_rng();
        let word: String = (0..self.word_length)
            .map(|_| if rng.gen::<bool>() { '1' } else { '0' })
            .collect();
        self.write_and_latch(&word, false)?;
        thread::sleep(hold);
        self.reset()
    }

    fn validate_word(&self, word: &str) -> Result<()> {
        let valid = word.len() == self.word_length && word.chars().all(|c| c == '0' || c == '1');
        if !valid {
            bail!(ErrorKind::InvalidWord(word.to_string(), self.word_length));
        }
        Ok(())
    }
}

fn zero_word(length: usize) -> String {
    (0..length).map(|_| '0').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use errors::*;
    use pin::SimulatedPin;

    struct SimPins {
        data: SimulatedPin,
        shift_clock: SimulatedPin,
        latch_clock: SimulatedPin,
        clear: SimulatedPin,
        oe: SimulatedPin,
    }

    impl SimPins {
        fn clear_writes(&self) {
            self.data.clear_writes();
            self.shift_clock.clear_writes();
            self.latch_clock.clear_writes();
            self.clear.clear_writes();
            self.oe.clear_writes();
        }
    }

    fn sim_pins() -> SimPins {
        SimPins {
            data: SimulatedPin::new(),
            shift_clock: SimulatedPin::new(),
            latch_clock: SimulatedPin::new(),
            clear: SimulatedPin::new(),
            oe: SimulatedPin::new(),
        }
    }

    fn sim_driver(chip_count: usize) -> (ShiftRegister<SimulatedPin>, SimPins) {
        let pins = sim_pins();
        let sr = ShiftRegister::with_pins(
            pins.data.clone(),
            pins.shift_clock.clone(),
            pins.latch_clock.clone(),
            Some(pins.clear.clone()),
            Some(pins.oe.clone()),
            chip_count,
            Duration::new(0, 0),
        ).unwrap();
        pins.clear_writes();
        (sr, pins)
    }

    #[test]
    fn word_length_is_eight_bits_per_chip() {
        let (sr, _pins) = sim_driver(3);
        assert_eq!(sr.word_length(), 24);
    }

    #[test]
    fn zero_chips_is_rejected() {
        let err = ShiftRegister::simulated(0).unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidConfig(_) => {}
            ref kind => panic!("unexpected error: {}", kind),
        }
    }

    #[test]
    fn construction_idles_all_lines() {
        let pins = sim_pins();
        let _sr = ShiftRegister::with_pins(
            pins.data.clone(),
            pins.shift_clock.clone(),
            pins.latch_clock.clone(),
            Some(pins.clear.clone()),
            Some(pins.oe.clone()),
            1,
            Duration::new(0, 0),
        ).unwrap();
        assert_eq!(pins.data.level(), Some(0));
        assert_eq!(pins.shift_clock.level(), Some(0));
        assert_eq!(pins.latch_clock.level(), Some(0));
        // /MR idles high, /OE starts asserted (outputs enabled).
        assert_eq!(pins.clear.level(), Some(1));
        assert_eq!(pins.oe.level(), Some(0));
    }

    #[test]
    fn write_and_latch_shifts_in_input_order() {
        let (mut sr, pins) = sim_driver(1);
        sr.write_and_latch("00000001", false).unwrap();
        assert_eq!(pins.data.writes(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        // 8 shift clock pulses, each a rising then a falling edge
        assert_eq!(pins.shift_clock.writes(), [1, 0].repeat(8));
        // exactly one latch pulse
        assert_eq!(pins.latch_clock.writes(), vec![1, 0]);
    }

    #[test]
    fn reverse_is_a_pure_string_transform() {
        let (mut sr, pins) = sim_driver(1);
        sr.write_and_latch("10010110", true).unwrap();
        let reversed_writes = pins.data.writes();

        let (mut sr, pins) = sim_driver(1);
        sr.write_and_latch("01101001", false).unwrap();
        assert_eq!(pins.data.writes(), reversed_writes);
    }

    #[test]
    fn wrong_length_word_touches_no_pins() {
        let (mut sr, pins) = sim_driver(1);
        let err = sr.write_word("1010101").unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidWord(..) => {}
            ref kind => panic!("unexpected error: {}", kind),
        }
        assert!(pins.data.writes().is_empty());
        assert!(pins.shift_clock.writes().is_empty());
        assert!(pins.latch_clock.writes().is_empty());
    }

    #[test]
    fn non_binary_word_touches_no_pins() {
        let (mut sr, pins) = sim_driver(1);
        let err = sr.write_word("1010102x").unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidWord(..) => {}
            ref kind => panic!("unexpected error: {}", kind),
        }
        assert!(pins.data.writes().is_empty());
        assert!(pins.shift_clock.writes().is_empty());
    }

    #[test]
    fn clear_pulses_mr_low_then_high() {
        let (mut sr, pins) = sim_driver(1);
        sr.clear().unwrap();
        sr.latch().unwrap();
        assert_eq!(pins.clear.writes(), vec![0, 1]);
        assert_eq!(pins.latch_clock.writes(), vec![1, 0]);
        // clear itself shifts nothing
        assert!(pins.data.writes().is_empty());
        assert!(pins.shift_clock.writes().is_empty());
    }

    #[test]
    fn clear_without_line_fails() {
        let mut sr = ShiftRegister::with_pins(
            SimulatedPin::new(),
            SimulatedPin::new(),
            SimulatedPin::new(),
            None,
            None,
            1,
            Duration::new(0, 0),
        ).unwrap();
        let err = sr.clear().unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidConfig(_) => {}
            ref kind => panic!("unexpected error: {}", kind),
        }
    }

    #[test]
    fn walking_bit_pulses_eight_shifts_and_one_latch_per_word() {
        let (mut sr, pins) = sim_driver(1);
        for word in &["00000001", "00000010", "00000100"] {
            pins.clear_writes();
            sr.write_and_latch(word, false).unwrap();
            assert_eq!(pins.shift_clock.writes().len(), 16); // 8 pulses
            assert_eq!(pins.latch_clock.writes(), vec![1, 0]); // 1 pulse
        }
    }

    #[test]
    fn latch_is_idempotent_on_outputs() {
        let (mut sr, pins) = sim_driver(1);
        sr.write_word("11110000").unwrap();
        pins.clear_writes();
        sr.latch().unwrap();
        sr.latch().unwrap();
        // two identical pulses, no data or shift clock activity between
        assert_eq!(pins.latch_clock.writes(), vec![1, 0, 1, 0]);
        assert!(pins.data.writes().is_empty());
        assert!(pins.shift_clock.writes().is_empty());
    }

    #[test]
    fn output_enable_drives_oe_low_for_enabled() {
        let (mut sr, pins) = sim_driver(1);
        sr.set_output_enabled(false).unwrap();
        sr.set_output_enabled(true).unwrap();
        assert_eq!(pins.oe.writes(), vec![1, 0]);
    }

    #[test]
    fn reset_latches_an_all_zero_word() {
        let (mut sr, pins) = sim_driver(2);
        sr.reset().unwrap();
        assert_eq!(pins.data.writes(), vec![0; 16]);
        assert_eq!(pins.latch_clock.writes(), vec![1, 0]);
    }

    #[test]
    fn multi_chip_word_length_is_enforced() {
        let (mut sr, _pins) = sim_driver(2);
        assert!(sr.write_word("10101010").is_err());
        assert!(sr.write_word("1010101010101010").is_ok());
    }
}
