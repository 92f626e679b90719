// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Simulated hardware for the unit tests. Every handle is a cheap clone sharing state with
//! the simulation, so a test can give one copy to the driver and inspect the other.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use embedded_storage::{ReadStorage, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Busy-wait stand-in that only counts the time it was asked to wait.
#[derive(Clone, Default)]
pub struct SimDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl SimDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns.get()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.get() / 1_000_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(ns));
    }
}

/// Output line that remembers every level it was driven to.
#[derive(Clone, Default)]
pub struct SimOutputPin {
    history: Rc<RefCell<Vec<bool>>>,
    failing: Rc<Cell<bool>>,
}

impl SimOutputPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    pub fn level(&self) -> Option<bool> {
        self.history.borrow().last().copied()
    }

    fn drive(&mut self, level: bool) -> Result<(), SimPinError> {
        if self.failing.get() {
            return Err(SimPinError);
        }
        self.history.borrow_mut().push(level);
        Ok(())
    }
}

impl ErrorType for SimOutputPin {
    type Error = SimPinError;
}

impl OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

#[derive(Default)]
struct Hx711State {
    queued: VecDeque<[u8; 3]>,
    polls_before_ready: usize,
    polls_remaining: usize,
    shifting: Option<u32>,
    clock_high: bool,
    pulses: usize,
    pulse_log: Vec<usize>,
    clock_history: Vec<bool>,
}

impl Hx711State {
    fn data_line(&mut self) -> bool {
        if let Some(word) = self.shifting {
            if self.clock_high || self.pulses < 24 {
                let bit = self.pulses.wrapping_sub(1);
                if self.clock_high && bit < 24 {
                    return (word >> (23 - bit)) & 0x1 == 0x1;
                }
                return true;
            }
            self.shifting = None;
        }

        if self.queued.is_empty() {
            return true;
        }
        if self.polls_remaining > 0 {
            self.polls_remaining -= 1;
            return true;
        }

        let bytes = self.queued.pop_front().unwrap_or([0xFF; 3]);
        self.shifting = Some(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]));
        self.pulses = 0;
        self.polls_remaining = self.polls_before_ready;
        self.pulse_log.push(0);
        false
    }

    fn clock(&mut self, level: bool) {
        if level && !self.clock_high && self.shifting.is_some() {
            self.pulses += 1;
            if let Some(last) = self.pulse_log.last_mut() {
                *last = self.pulses;
            }
        }
        self.clock_high = level;
        self.clock_history.push(level);
    }
}

/// HX711 model: DOUT idles high, drops low once a conversion is queued and the configured
/// number of ready polls has passed, then shifts the queued word out MSB first on the
/// rising clock edges.
#[derive(Clone, Default)]
pub struct SimHx711 {
    state: Rc<RefCell<Hx711State>>,
}

impl SimHx711 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the three bytes exactly as the chip would put them on the wire.
    pub fn queue_bytes(&self, bytes: [u8; 3]) {
        self.state.borrow_mut().queued.push_back(bytes);
    }

    /// Queue a conversion that the driver should report as `reading`, i.e. undo the top bit
    /// fix-up the driver applies.
    pub fn queue_reading(&self, reading: i32) {
        let word = (reading as u32 ^ 0x80_0000) & 0xFF_FFFF;
        let bytes = word.to_be_bytes();
        self.queue_bytes([bytes[1], bytes[2], bytes[3]]);
    }

    pub fn queue_readings(&self, reading: i32, count: usize) {
        for _ in 0..count {
            self.queue_reading(reading);
        }
    }

    pub fn set_polls_before_ready(&self, polls: usize) {
        let mut state = self.state.borrow_mut();
        state.polls_before_ready = polls;
        state.polls_remaining = polls;
    }

    pub fn pending_readings(&self) -> usize {
        self.state.borrow().queued.len()
    }

    /// Clock pulses seen in each transaction so far, in order.
    pub fn pulses_per_read(&self) -> Vec<usize> {
        self.state.borrow().pulse_log.clone()
    }

    pub fn clock_history(&self) -> Vec<bool> {
        self.state.borrow().clock_history.clone()
    }

    pub fn clock_pin(&self) -> SimClockPin {
        SimClockPin {
            state: self.state.clone(),
        }
    }

    pub fn data_pin(&self) -> SimDataPin {
        SimDataPin {
            state: self.state.clone(),
        }
    }
}

pub struct SimClockPin {
    state: Rc<RefCell<Hx711State>>,
}

impl ErrorType for SimClockPin {
    type Error = SimPinError;
}

impl OutputPin for SimClockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().clock(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().clock(true);
        Ok(())
    }
}

pub struct SimDataPin {
    state: Rc<RefCell<Hx711State>>,
}

impl ErrorType for SimDataPin {
    type Error = SimPinError;
}

impl InputPin for SimDataPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.borrow_mut().data_line())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.state.borrow_mut().data_line())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimStorageError;

struct StorageState {
    bytes: Vec<u8>,
    writes: usize,
    failing: bool,
}

/// Byte addressable non-volatile memory, erased to 0xFF.
#[derive(Clone)]
pub struct SimStorage {
    state: Rc<RefCell<StorageState>>,
}

impl SimStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(StorageState {
                bytes: vec![0xFF; capacity],
                writes: 0,
                failing: false,
            })),
        }
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        self.state.borrow().bytes[offset..offset + len].to_vec()
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    pub fn fail_next_operations(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }
}

impl ReadStorage for SimStorage {
    type Error = SimStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let state = self.state.borrow();
        if state.failing {
            return Err(SimStorageError);
        }
        let start = offset as usize;
        bytes.copy_from_slice(&state.bytes[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.state.borrow().bytes.len()
    }
}

impl Storage for SimStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(SimStorageError);
        }
        let start = offset as usize;
        state.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        state.writes += 1;
        Ok(())
    }
}
