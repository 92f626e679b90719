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

use core::convert::Infallible;
use embedded_hal::digital::OutputPin;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExcitationPhase {
    Off,
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<PowerE, PolarityE> {
    PowerPin(PowerE),
    PolarityPin(PolarityE),
}

/// Drive of the load cell bridge.
pub trait ExcitationControl {
    type Error;

    /// True when the bridge polarity can be reversed and readings should be taken as a
    /// positive/negative pair.
    fn is_differential(&self) -> bool;

    fn set_phase(&mut self, phase: ExcitationPhase) -> Result<(), Self::Error>;
}

/// Combines a positive and a negative phase reading into one value.
///
/// Arithmetic shift, so odd differences round toward negative infinity: `201 >> 1 == 100`
/// but `-201 >> 1 == -101`. Worked in `i64`, so any pair of `i32` readings combines without
/// overflow.
pub fn combine_differential(positive: i32, negative: i32) -> i32 {
    // half of any i32 difference fits back into an i32
    ((i64::from(negative) - i64::from(positive)) >> 1) as i32
}

/// Bridge permanently powered from the supply, readings are single ended.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExcitation;

impl ExcitationControl for NoExcitation {
    type Error = Infallible;

    fn is_differential(&self) -> bool {
        false
    }

    fn set_phase(&mut self, _phase: ExcitationPhase) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// AC excitation through two lines: one switching the bridge supply, one selecting which
/// side of the bridge is driven. Reversing the drive flips the sign of the signal but not
/// of the offset and thermal errors, so the difference of the two phases cancels them.
pub struct AcExcitation<PWR, POL> {
    power_pin: PWR,
    polarity_pin: POL,
    phase: ExcitationPhase,
}

impl<PWR, POL, PwrE, PolE> AcExcitation<PWR, POL>
where
    PWR: OutputPin<Error = PwrE>,
    POL: OutputPin<Error = PolE>,
{
    /// Takes the lines and switches the bridge off.
    pub fn new(power_pin: PWR, polarity_pin: POL) -> Result<Self, Error<PwrE, PolE>> {
        let mut excitation = Self {
            power_pin,
            polarity_pin,
            phase: ExcitationPhase::Off,
        };
        excitation.set_phase(ExcitationPhase::Off)?;
        Ok(excitation)
    }

    pub fn phase(&self) -> ExcitationPhase {
        self.phase
    }

    pub fn release(self) -> (PWR, POL) {
        (self.power_pin, self.polarity_pin)
    }
}

impl<PWR, POL, PwrE, PolE> ExcitationControl for AcExcitation<PWR, POL>
where
    PWR: OutputPin<Error = PwrE>,
    POL: OutputPin<Error = PolE>,
{
    type Error = Error<PwrE, PolE>;

    fn is_differential(&self) -> bool {
        true
    }

    fn set_phase(&mut self, phase: ExcitationPhase) -> Result<(), Self::Error> {
        match phase {
            ExcitationPhase::Off => {
                self.power_pin.set_low().map_err(Error::PowerPin)?;
                self.polarity_pin.set_low().map_err(Error::PolarityPin)?;
            }
            ExcitationPhase::Positive => {
                self.polarity_pin.set_low().map_err(Error::PolarityPin)?;
                self.power_pin.set_high().map_err(Error::PowerPin)?;
            }
            ExcitationPhase::Negative => {
                self.polarity_pin.set_high().map_err(Error::PolarityPin)?;
                self.power_pin.set_high().map_err(Error::PowerPin)?;
            }
        }
        self.phase = phase;
        Ok(())
    }
}
