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

pub mod averaging;
pub mod excitation;
pub mod fixed_point;
pub mod interface;
pub mod weight;


pub trait WeighingSystem {

    type Error;

    /// Zero point calibration with nothing on the scale. Returns the reading it was taken at.
    fn tare(&mut self) -> Result<i32, Self::Error>;

    /// Span calibration with `calibration_mass` on the scale. Returns the reading it was
    /// taken at.
    fn calibrate(&mut self, calibration_mass: f32) -> Result<i32, Self::Error>;

    fn read_weight(&mut self) -> Result<f32, Self::Error>;
}
