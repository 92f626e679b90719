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

use core::num::NonZeroU8;

pub const DEFAULT_AVERAGE_SAMPLES: NonZeroU8 = NonZeroU8::new(2).unwrap();
pub const DEFAULT_READ_SAMPLES: NonZeroU8 = NonZeroU8::new(15).unwrap();
pub const DEFAULT_CALIBRATION_SAMPLES: NonZeroU8 = NonZeroU8::new(30).unwrap();
pub const DEFAULT_CALIBRATION_SETTLE_MS: u32 = 5000;
pub const DEFAULT_EXCITATION_WARMUP_MS: u32 = 50;
pub const DEFAULT_POLARITY_SETTLE_MS: u32 = 10;

/// Tunables for [`crate::WeightScale`]. All of them affect the quality of the result, the
/// delays in particular must cover the settling time of the bridge and the ADC filter.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WeightScaleConfig {
    /// Readings averaged for every weight measurement
    pub read_samples: NonZeroU8,
    /// Readings averaged when calibrating
    pub calibration_samples: NonZeroU8,
    /// Readings taken and thrown away during initialisation
    pub init_samples: NonZeroU8,
    /// Busy-wait before a calibration burst so the load can come to rest
    pub calibration_settle_ms: u32,
    /// Settle time after powering the bridge (positive phase)
    pub excitation_warmup_ms: u32,
    /// Settle time after reversing the bridge polarity (negative phase)
    pub polarity_settle_ms: u32,
}

impl Default for WeightScaleConfig {
    fn default() -> Self {
        Self {
            read_samples: DEFAULT_READ_SAMPLES,
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
            init_samples: DEFAULT_AVERAGE_SAMPLES,
            calibration_settle_ms: DEFAULT_CALIBRATION_SETTLE_MS,
            excitation_warmup_ms: DEFAULT_EXCITATION_WARMUP_MS,
            polarity_settle_ms: DEFAULT_POLARITY_SETTLE_MS,
        }
    }
}
