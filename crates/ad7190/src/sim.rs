//! A simulated AD7190 for exercising the driver without hardware.
//!
//! [`Simulator`] holds the register file and hands out a [`SimSpi`] and a [`SimReady`]
//! that share it, so the driver sees one consistent device on both interfaces.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

use crate::registers::{
    ConfigRegister, ModeRegister, OperatingMode, Register, COMM_CREAD, COMM_EXIT_CREAD, COMM_READ,
    COMM_WEN, REG24_MASK, STAT_RDY,
};

/// Bus-visible activity, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write { address: u8, value: u32 },
    Read { address: u8 },
    ContinuousRead,
    Reset,
    ReadyPoll,
}

/// Injected transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

const POWER_ON: [u32; 8] = [
    0x80,
    ModeRegister::POWER_ON.0,
    ConfigRegister::POWER_ON.0,
    0x00_0000,
    0xA4,
    0x00,
    0x80_0000,
    0x55_0000,
];

#[derive(Clone, Copy)]
enum Phase {
    Command,
    Write { address: u8, remaining: u8, value: u32 },
    Read { bytes: [u8; 4], len: usize, pos: usize },
}

struct State {
    registers: [u32; 8],
    samples: VecDeque<u32>,
    ready_latency: Option<u32>,
    polls_left: Option<u32>,
    converting: bool,
    ready_low: bool,
    continuous_read: bool,
    phase: Phase,
    ones: usize,
    events: Vec<Event>,
    transactions: usize,
    fail: bool,
}

impl State {
    fn mode(&self) -> ModeRegister {
        ModeRegister(self.registers[1])
    }

    fn width(&self, address: u8) -> u8 {
        match Register::from_address(address) {
            Some(Register::Data) => self.mode().data_width(),
            Some(register) => register.width(),
            None => 0,
        }
    }

    fn set_mode(&mut self, mode: OperatingMode) {
        self.registers[1] = self.mode().with_mode(mode).bits();
    }

    fn reset(&mut self) {
        self.registers = POWER_ON;
        self.converting = false;
        self.ready_low = false;
        self.continuous_read = false;
        self.events.push(Event::Reset);
    }

    fn mode_written(&mut self) {
        self.ready_low = false;

        match self.mode().mode() {
            OperatingMode::Idle | OperatingMode::PowerDown => self.converting = false,
            _ => {
                self.converting = true;
                self.polls_left = self.ready_latency;
            }
        }
    }

    fn poll_ready(&mut self) -> bool {
        self.events.push(Event::ReadyPoll);

        if self.ready_low || !self.converting {
            return self.ready_low;
        }

        match self.polls_left {
            Some(0) => {
                self.ready_low = true;

                if self.mode().mode().is_calibration() {
                    self.set_mode(OperatingMode::Idle);
                    self.converting = false;
                }
            }
            Some(n) => self.polls_left = Some(n - 1),
            None => {}
        }

        self.ready_low
    }

    /// Conversion result as clocked out of DATA.
    fn take_sample(&mut self) -> u32 {
        let code = self.samples.pop_front().unwrap_or(0) & REG24_MASK;
        let mode = self.mode();

        self.ready_low = false;

        match mode.mode() {
            OperatingMode::Single => {
                self.set_mode(OperatingMode::Idle);
                self.converting = false;
            }
            OperatingMode::Continuous => self.polls_left = self.ready_latency,
            _ => {}
        }

        if mode.status_append() {
            let channels = ConfigRegister(self.registers[2]).channels();
            let channel = if channels == 0 { 0 } else { channels.trailing_zeros() as u32 };
            (code << 8) | channel
        } else {
            code
        }
    }

    fn register_value(&mut self, address: u8) -> u32 {
        match address {
            0 => {
                let rdy = if self.ready_low { 0 } else { STAT_RDY as u32 };
                (self.registers[0] & !(STAT_RDY as u32)) | rdy
            }
            3 => self.take_sample(),
            _ => self.registers[address as usize],
        }
    }

    fn start_read(&mut self, address: u8) {
        let len = self.width(address) as usize;
        let value = self.register_value(address);

        let mut bytes = [0; 4];
        bytes[..len].copy_from_slice(&value.to_be_bytes()[4 - len..]);

        self.phase = Phase::Read { bytes, len, pos: 0 };
    }

    /// Clock one byte in each direction.
    fn exchange(&mut self, out: u8) -> u8 {
        match self.phase {
            Phase::Command if self.continuous_read => {
                if out == COMM_EXIT_CREAD {
                    self.continuous_read = false;
                    self.start_read(3);
                    0
                } else {
                    self.start_read(3);
                    self.exchange(out)
                }
            }
            Phase::Command => {
                if out & COMM_WEN != 0 {
                    self.ones = if out == 0xFF { self.ones + 1 } else { 0 };

                    if self.ones == 5 {
                        self.reset();
                    }

                    return 0;
                }

                self.ones = 0;
                let address = (out >> 3) & 0x7;

                if out & COMM_READ != 0 {
                    if address == 3 && out & COMM_CREAD != 0 {
                        self.continuous_read = true;
                        self.events.push(Event::ContinuousRead);
                    } else {
                        self.events.push(Event::Read { address });
                        self.start_read(address);
                    }
                } else if address != 0 {
                    self.phase = Phase::Write {
                        address,
                        remaining: self.width(address),
                        value: 0,
                    };
                }

                0
            }
            Phase::Write {
                address,
                remaining,
                value,
            } => {
                let value = (value << 8) | out as u32;

                if remaining > 1 {
                    self.phase = Phase::Write {
                        address,
                        remaining: remaining - 1,
                        value,
                    };
                } else {
                    self.phase = Phase::Command;

                    // DATA, ID and STAT are read only
                    if !matches!(address, 3 | 4) {
                        self.registers[address as usize] = value & REG24_MASK;
                    }
                    self.events.push(Event::Write { address, value });

                    if address == 1 {
                        self.mode_written();
                    }
                }

                0
            }
            Phase::Read {
                bytes,
                len,
                pos,
            } => {
                self.phase = if pos + 1 < len {
                    Phase::Read {
                        bytes,
                        len,
                        pos: pos + 1,
                    }
                } else {
                    Phase::Command
                };

                bytes[pos]
            }
        }
    }
}

/// Shared handle to a simulated AD7190.
#[derive(Clone)]
pub struct Simulator(Rc<RefCell<State>>);

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// A device in its power-on state whose conversions finish on the second RDY poll.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(State {
            registers: POWER_ON,
            samples: VecDeque::new(),
            ready_latency: Some(1),
            polls_left: None,
            converting: false,
            ready_low: false,
            continuous_read: false,
            phase: Phase::Command,
            ones: 0,
            events: Vec::new(),
            transactions: 0,
            fail: false,
        })))
    }

    pub fn spi(&self) -> SimSpi {
        SimSpi(self.0.clone())
    }

    pub fn ready(&self) -> SimReady {
        SimReady(self.0.clone())
    }

    /// Queue conversion codes returned by successive DATA reads.
    pub fn push_samples(&self, samples: impl IntoIterator<Item = u32>) {
        self.0.borrow_mut().samples.extend(samples);
    }

    pub fn pending_samples(&self) -> usize {
        self.0.borrow().samples.len()
    }

    /// RDY polls a conversion takes before RDY goes low. `None` never finishes.
    pub fn set_ready_latency(&self, polls: Option<u32>) {
        self.0.borrow_mut().ready_latency = polls;
    }

    pub fn register(&self, address: u8) -> u32 {
        self.0.borrow().registers[address as usize & 0x7]
    }

    pub fn set_register(&self, address: u8, value: u32) {
        self.0.borrow_mut().registers[address as usize & 0x7] = value;
    }

    pub fn continuous_read(&self) -> bool {
        self.0.borrow().continuous_read
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn ready_polls(&self) -> usize {
        self.0
            .borrow()
            .events
            .iter()
            .filter(|e| **e == Event::ReadyPoll)
            .count()
    }

    /// Number of SPI transactions seen so far.
    pub fn transactions(&self) -> usize {
        self.0.borrow().transactions
    }

    /// Make every following SPI transaction fail.
    pub fn fail_transfers(&self, fail: bool) {
        self.0.borrow_mut().fail = fail;
    }
}

/// SPI side of the simulator. Each transaction is one chip-select assertion.
pub struct SimSpi(Rc<RefCell<State>>);

impl ErrorType for SimSpi {
    type Error = SimError;
}

impl SpiDevice for SimSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();

        if state.fail {
            return Err(SimError);
        }

        state.transactions += 1;

        for operation in operations.iter_mut() {
            match operation {
                Operation::Read(words) => {
                    for word in words.iter_mut() {
                        *word = state.exchange(0x00);
                    }
                }
                Operation::Write(words) => {
                    for &word in words.iter() {
                        state.exchange(word);
                    }
                }
                Operation::Transfer(read, write) => {
                    for i in 0..read.len().max(write.len()) {
                        let word = state.exchange(write.get(i).copied().unwrap_or(0x00));
                        if let Some(slot) = read.get_mut(i) {
                            *slot = word;
                        }
                    }
                }
                Operation::TransferInPlace(words) => {
                    for word in words.iter_mut() {
                        *word = state.exchange(*word);
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }

        // chip select released
        state.phase = Phase::Command;
        state.ones = 0;

        Ok(())
    }
}

/// RDY line of the simulator.
pub struct SimReady(Rc<RefCell<State>>);

impl digital::ErrorType for SimReady {
    type Error = core::convert::Infallible;
}

impl InputPin for SimReady {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow_mut().poll_ready())
    }
}

/// Delay that returns immediately.
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
