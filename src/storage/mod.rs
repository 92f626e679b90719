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

pub mod calibration_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    SaveError,
    RetrieveError,
    /// The calibration slots do not fit inside the storage capacity
    OutOfRange,
}

/// Two-point calibration of the weighing system.
///
/// `offset` is the combined reading with nothing on the load cell, `scale` is the number of
/// raw counts per unit of the calibration weight.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationState {
    pub offset: i32,
    pub scale: f32,
}

impl CalibrationState {
    /// A scale of zero, infinity or NaN cannot be divided by to get a weight.
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && self.scale != 0.0
    }
}

/// Non-volatile home of the calibration. Each value is written on its own, there is no
/// guarantee that a pair of writes lands together.
pub trait CalibrationStore {
    type Error;

    /// Read both values. Nothing is validated, an erased store gives back whatever the erased
    /// bytes decode to.
    fn load(&mut self) -> Result<CalibrationState, Self::Error>;

    fn save_offset(&mut self, offset: i32) -> Result<(), Self::Error>;

    fn save_scale(&mut self, scale: f32) -> Result<(), Self::Error>;
}
