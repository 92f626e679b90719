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

use crate::weight::interface::StrainGaugeInterface;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hx711Gain {
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    fn tick_count(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => {25}
            Hx711Gain::Gain64 => {27}
            Hx711Gain::Gain32ChannelB => {26}
        }
    }
}

pub const DEFAULT_READY_TIMEOUT_MS: u32 = 3000;

const POWER_MODE_CHANGE_DELAY_US: u32 = 60;
const RESET_PULSE_US: u32 = 100;
const CLK_HALF_PERIOD_NS: u32 = 1000;
const READY_POLL_INTERVAL_US: u32 = 100;
const VALID_DATA_BITS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<OutPinE, InPinE> {
    OutPin(OutPinE),
    InPin(InPinE),
    /// DOUT never went low within the ready timeout, no data was clocked out
    Timeout,
}

/// Converts the three bytes shifted out of the chip (most significant first) into a reading.
///
/// The top bit is inverted rather than sign extended: the chip's two's complement word becomes
/// an offset binary value in `0..2^24`, with zero input at `0x80_0000`. That keeps every
/// reading positive so the sums taken by the averaging never have to deal with signs.
pub fn decode_reading(data: [u8; 3]) -> i32 {
    i32::from_be_bytes([0, data[0] ^ 0x80, data[1], data[2]])
}

/// Bit-banged HX711. Blocking, the clocking of a conversion runs inside a critical section
/// because holding SCK high for more than 60us powers the chip down mid-transfer.
pub struct Hx711<CLK, DATA, DELAY> {
    clock_pin: CLK,
    data_pin: DATA,
    delay: DELAY,
    gain_clocks: usize,
    ready_timeout_ms: u32,
    powered_up: bool,
}

impl<CLK, DATA, DELAY, ClkE, DataE> Hx711<CLK, DATA, DELAY>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    DELAY: DelayNs,
{
    pub fn new(clock_pin: CLK, data_pin: DATA, delay: DELAY, gain: Hx711Gain) -> Self {
        Self {
            clock_pin,
            data_pin,
            delay,
            gain_clocks: gain.tick_count(),
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            powered_up: false,
        }
    }

    pub fn with_ready_timeout_ms(mut self, ready_timeout_ms: u32) -> Self {
        self.ready_timeout_ms = ready_timeout_ms;
        self
    }

    /// Takes effect from the conversion after the next read, the chip latches it from the
    /// trailing clock pulses.
    pub fn set_gain(&mut self, gain: Hx711Gain) {
        self.gain_clocks = gain.tick_count();
    }

    pub fn ready_timeout_ms(&self) -> u32 {
        self.ready_timeout_ms
    }

    pub fn is_powered_up(&self) -> bool {
        self.powered_up
    }

    pub fn release(self) -> (CLK, DATA, DELAY) {
        (self.clock_pin, self.data_pin, self.delay)
    }

    /// Single conversion with an explicit ready timeout instead of the configured one.
    pub fn read_with_timeout(&mut self, timeout_ms: u32) -> Result<i32, Error<ClkE, DataE>> {
        if !self.powered_up {
            self.power_up()?;
        }

        self.wait_for_ready(timeout_ms)?;
        let data = critical_section::with(|_cs| self.shift_in())?;
        let reading = decode_reading(data);
        trace!("HX711 reading = {}", reading);
        Ok(reading)
    }

    fn wait_for_ready(&mut self, timeout_ms: u32) -> Result<(), Error<ClkE, DataE>> {
        let timeout_us = u64::from(timeout_ms) * 1000;
        let mut waited_us: u64 = 0;

        // DOUT goes low when conversion is ready
        while self.data_pin.is_high().map_err(Error::InPin)? {
            if waited_us >= timeout_us {
                warn!("HX711 not ready after {} ms", timeout_ms);
                return Err(Error::Timeout);
            }
            self.delay.delay_us(READY_POLL_INTERVAL_US);
            waited_us += u64::from(READY_POLL_INTERVAL_US);
        }
        Ok(())
    }

    fn clock_pulse(&mut self) -> Result<(), Error<ClkE, DataE>> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        self.delay.delay_ns(CLK_HALF_PERIOD_NS);
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.delay.delay_ns(CLK_HALF_PERIOD_NS);
        Ok(())
    }

    fn clock_bit(&mut self) -> Result<bool, Error<ClkE, DataE>> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        self.delay.delay_ns(CLK_HALF_PERIOD_NS);
        let bit = self.data_pin.is_high().map_err(Error::InPin)?;
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.delay.delay_ns(CLK_HALF_PERIOD_NS);
        Ok(bit)
    }

    fn shift_in(&mut self) -> Result<[u8; 3], Error<ClkE, DataE>> {
        let mut data = [0u8; 3];
        for byte in data.iter_mut() {
            for _ in 0..8 {
                *byte <<= 1;
                if self.clock_bit()? {
                    *byte |= 0x1;
                }
            }
        }

        // pulses past the data bits select gain and channel for the next conversion
        for _ in VALID_DATA_BITS..self.gain_clocks {
            self.clock_pulse()?;
        }
        Ok(data)
    }
}

impl<CLK, DATA, DELAY, ClkE, DataE> StrainGaugeInterface for Hx711<CLK, DATA, DELAY>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    DELAY: DelayNs,
{
    type Error = Error<ClkE, DataE>;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        self.delay.delay_us(RESET_PULSE_US);
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.powered_up = true;
        Ok(())
    }

    fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        self.read_with_timeout(self.ready_timeout_ms)
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US);
        self.powered_up = false;
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US);
        self.powered_up = true;
        Ok(())
    }
}
