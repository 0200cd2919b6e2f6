#[macro_use]
extern crate clap;
#[macro_use]
extern crate error_chain;
extern crate shift595;

use clap::{App, Arg};
use shift595::errors::*;
use shift595::pin::GpioOut;
use shift595::{ShiftRegister, ShiftRegisterConfig};
use std::thread;
use std::time::Duration;

quick_main!(run);

fn run() -> Result<()> {
    let matches = App::new("shift595")
        .version(crate_version!())
        .about("Drives test patterns on a 74HC595 shift register chain")
        .arg(
            Arg::with_name("data")
                .long("data")
                .help("BCM pin for serial data (DS)")
                .takes_value(true)
                .default_value("17"),
        )
        .arg(
            Arg::with_name("shift-clock")
                .long("shift-clock")
                .help("BCM pin for the shift clock (SHCP)")
                .takes_value(true)
                .default_value("27"),
        )
        .arg(
            Arg::with_name("latch-clock")
                .long("latch-clock")
                .help("BCM pin for the latch clock (STCP)")
                .takes_value(true)
                .default_value("22"),
        )
        .arg(
            Arg::with_name("clear")
                .long("clear-pin")
                .help("BCM pin for /MR, if wired")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("oe")
                .long("oe-pin")
                .help("BCM pin for /OE, if wired")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("chips")
                .long("chips")
                .help("Number of daisy chained chips")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::with_name("pattern")
                .long("pattern")
                .help("Test pattern to run")
                .takes_value(true)
                .possible_values(&["blinken", "chase", "count", "random", "lamp"])
                .default_value("chase"),
        )
        .get_matches();

    let mut config = ShiftRegisterConfig::new(
        value_t!(matches, "data", u64).unwrap_or_else(|e| e.exit()),
        value_t!(matches, "shift-clock", u64).unwrap_or_else(|e| e.exit()),
        value_t!(matches, "latch-clock", u64).unwrap_or_else(|e| e.exit()),
    );
    if matches.is_present("clear") {
        config.clear_pin = Some(value_t!(matches, "clear", u64).unwrap_or_else(|e| e.exit()));
    }
    if matches.is_present("oe") {
        config.oe_pin = Some(value_t!(matches, "oe", u64).unwrap_or_else(|e| e.exit()));
    }
    config.chip_count = value_t!(matches, "chips", usize).unwrap_or_else(|e| e.exit());

    let mut sr = ShiftRegister::new(&config)?;

    match matches.value_of("pattern").unwrap_or("chase") {
        "blinken" => blinken(&mut sr),
        "count" => count(&mut sr),
        "random" => random(&mut sr),
        "lamp" => lamp(&mut sr),
        _ => chase(&mut sr),
    }
}

/// Alternating checkerboard, swapped 5 times a second.
fn blinken<P: GpioOut>(sr: &mut ShiftRegister<P>) -> Result<()> {
    let even = checkerboard(sr.word_length(), true);
    let odd = checkerboard(sr.word_length(), false);
    loop {
        sr.write_and_latch(&even, false)?;
        thread::sleep(Duration::from_millis(200));
        sr.write_and_latch(&odd, false)?;
        thread::sleep(Duration::from_millis(200));
    }
}

/// Single lit bit walking up the chain and back down.
fn chase<P: GpioOut>(sr: &mut ShiftRegister<P>) -> Result<()> {
    let len = sr.word_length();
    loop {
        for pos in 0..len {
            sr.write_and_latch(&walking_bit(len, pos), false)?;
            thread::sleep(Duration::from_millis(200));
        }
        for pos in (0..len).rev() {
            sr.write_and_latch(&walking_bit(len, pos), false)?;
            thread::sleep(Duration::from_millis(200));
        }
    }
}

/// Binary counter 0..255, first with reversed then with normal bit order.
fn count<P: GpioOut>(sr: &mut ShiftRegister<P>) -> Result<()> {
    let len = sr.word_length();
    loop {
        for x in 0..256u32 {
            let word = format!("{:0width$b}", x, width = len);
            sr.write_and_latch(&word, true)?;
            thread::sleep(Duration::from_millis(50));
        }
        for x in 0..256u32 {
            let word = format!("{:0width$b}", x, width = len);
            sr.write_and_latch(&word, false)?;
            thread::sleep(Duration::from_millis(50));
        }
    }
}

fn random<P: GpioOut>(sr: &mut ShiftRegister<P>) -> Result<()> {
    loop {
        sr.test_random(Duration::from_secs(1))?;
    }
}

fn lamp<P: GpioOut>(sr: &mut ShiftRegister<P>) -> Result<()> {
    loop {
        sr.lamp_test(Duration::from_secs(1))?;
        thread::sleep(Duration::from_secs(1));
    }
}

fn checkerboard(len: usize, phase: bool) -> String {
    (0..len)
        .map(|i| if (i % 2 == 0) == phase { '1' } else { '0' })
        .collect()
}

fn walking_bit(len: usize, pos: usize) -> String {
    (0..len).map(|i| if i == pos { '1' } else { '0' }).collect()
}
