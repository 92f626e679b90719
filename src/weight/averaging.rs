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
use core::num::NonZeroU8;

/// Takes `count` consecutive readings and returns their mean, truncated toward zero.
///
/// A failed reading aborts the whole burst, it is never folded into the sum.
pub fn average_readings<StrainGauge>(
    strain_gauge: &mut StrainGauge,
    count: NonZeroU8,
) -> Result<i32, StrainGauge::Error>
where
    StrainGauge: StrainGaugeInterface,
{
    let mut sum: i64 = 0;
    for _ in 0..count.get() {
        sum += i64::from(strain_gauge.get_next_reading()?);
    }

    let mean = sum / i64::from(count.get());
    trace!("Mean of {} readings = {}", count.get(), mean);
    // the mean of i32 values always fits back into an i32
    Ok(mean as i32)
}
