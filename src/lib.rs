#![cfg_attr(not(test), no_std)]
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

//! Load cell acquisition for an HX711 style 24-bit bridge ADC.
//!
//! The driver is blocking: the transport bit-bangs the two wire protocol with
//! busy-wait delays, averages bursts of readings, optionally reverses the bridge
//! excitation to cancel offset drift, and converts the result into a weight using
//! a two-point calibration kept in non-volatile storage.

// must stay first so the macros are visible to the modules below
mod fmt;

pub mod config;
pub mod storage;
pub mod weight;

#[cfg(test)]
pub(crate) mod sim;

pub use config::WeightScaleConfig;
pub use storage::calibration_store::EepromCalibrationStore;
pub use storage::{CalibrationState, CalibrationStore, StorageError};
pub use weight::excitation::{AcExcitation, ExcitationControl, ExcitationPhase, NoExcitation};
pub use weight::fixed_point::{from_fixed_point, to_fixed_point, FIXED_POINT_FRACTIONAL_BITS};
pub use weight::interface::hx711::{Hx711, Hx711Gain};
pub use weight::interface::StrainGaugeInterface;
pub use weight::weight::WeightScale;
pub use weight::WeighingSystem;
