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

pub const FIXED_POINT_FRACTIONAL_BITS: u32 = 4;

const FIXED_POINT_ONE: f32 = (1u32 << FIXED_POINT_FRACTIONAL_BITS) as f32;

/// Weight as a Q-format integer with [`FIXED_POINT_FRACTIONAL_BITS`] fractional bits, for
/// sending over a narrow link. Truncates toward zero and saturates at the `i32` limits, NaN
/// becomes 0.
pub fn to_fixed_point(value: f32) -> i32 {
    (value * FIXED_POINT_ONE) as i32
}

pub fn from_fixed_point(value: i32) -> f32 {
    value as f32 / FIXED_POINT_ONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_and_half_units() {
        assert_eq!(to_fixed_point(1.5), 24);
        assert_eq!(to_fixed_point(100.0), 1600);
        assert_eq!(to_fixed_point(0.0), 0);
    }

    #[test]
    fn fractions_below_resolution_are_truncated() {
        assert_eq!(to_fixed_point(1.99), 31);
        assert_eq!(to_fixed_point(0.05), 0);
        assert_eq!(to_fixed_point(-1.99), -31);
    }

    #[test]
    fn out_of_range_saturates() {
        assert_eq!(to_fixed_point(f32::MAX), i32::MAX);
        assert_eq!(to_fixed_point(f32::NEG_INFINITY), i32::MIN);
        assert_eq!(to_fixed_point(f32::NAN), 0);
    }

    #[test]
    fn decoding_restores_representable_values() {
        assert_eq!(from_fixed_point(24), 1.5);
        assert_eq!(from_fixed_point(to_fixed_point(-12.25)), -12.25);
    }
}
