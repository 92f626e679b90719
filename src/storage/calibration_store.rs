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

use crate::storage::{CalibrationState, CalibrationStore, StorageError};
use embedded_storage::Storage;

pub const DEFAULT_CALIBRATION_BASE_ADDRESS: u32 = 100;

const OFFSET_SLOT: u32 = 0;
const SCALE_SLOT: u32 = 4;
const SLOT_SIZE: usize = 4;
const CALIBRATION_BLOCK_SIZE: usize = 8;

/// Keeps the calibration in two fixed 32-bit slots of a byte addressable store (EEPROM, or
/// flash behind a read-modify-write adapter). Offset first, then the scale as an IEEE float,
/// both little-endian.
pub struct EepromCalibrationStore<S> {
    storage: S,
    base_address: u32,
}

impl<S> EepromCalibrationStore<S>
where
    S: Storage,
{
    pub fn new(storage: S) -> Self {
        Self::new_at(storage, DEFAULT_CALIBRATION_BASE_ADDRESS)
    }

    pub fn new_at(storage: S, base_address: u32) -> Self {
        Self {
            storage,
            base_address,
        }
    }

    pub fn base_address(&self) -> u32 {
        self.base_address
    }

    pub fn release(self) -> S {
        self.storage
    }

    fn check_range(&self) -> Result<(), StorageError> {
        let end = self.base_address as usize + CALIBRATION_BLOCK_SIZE;
        if end > self.storage.capacity() {
            warn!(
                "Calibration block at {} does not fit in {} bytes of storage",
                self.base_address,
                self.storage.capacity()
            );
            return Err(StorageError::OutOfRange);
        }
        Ok(())
    }

    fn read_slot(&mut self, slot: u32) -> Result<[u8; SLOT_SIZE], StorageError> {
        self.check_range()?;
        let mut bytes = [0u8; SLOT_SIZE];
        self.storage
            .read(self.base_address + slot, &mut bytes)
            .map_err(|_| {
                warn!("Unable to read calibration slot {}", slot);
                StorageError::RetrieveError
            })?;
        Ok(bytes)
    }

    fn write_slot(&mut self, slot: u32, bytes: [u8; SLOT_SIZE]) -> Result<(), StorageError> {
        self.check_range()?;
        self.storage
            .write(self.base_address + slot, &bytes)
            .map_err(|_| {
                warn!("Unable to save calibration slot {}", slot);
                StorageError::SaveError
            })
    }
}

impl<S> CalibrationStore for EepromCalibrationStore<S>
where
    S: Storage,
{
    type Error = StorageError;

    fn load(&mut self) -> Result<CalibrationState, Self::Error> {
        let offset = i32::from_le_bytes(self.read_slot(OFFSET_SLOT)?);
        let scale = f32::from_le_bytes(self.read_slot(SCALE_SLOT)?);
        trace!("Loaded calibration slots: offset = {}, scale = {}", offset, scale);
        Ok(CalibrationState { offset, scale })
    }

    fn save_offset(&mut self, offset: i32) -> Result<(), Self::Error> {
        self.write_slot(OFFSET_SLOT, offset.to_le_bytes())
    }

    fn save_scale(&mut self, scale: f32) -> Result<(), Self::Error> {
        self.write_slot(SCALE_SLOT, scale.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimStorage;

    #[test]
    fn values_land_in_fixed_little_endian_slots() {
        let storage = SimStorage::new(256);
        let mut store = EepromCalibrationStore::new(storage.clone());

        store.save_offset(0x0012_3456).unwrap();
        store.save_scale(10.0).unwrap();

        assert_eq!(storage.bytes(100, 4), vec![0x56, 0x34, 0x12, 0x00]);
        assert_eq!(storage.bytes(104, 4), 10.0f32.to_le_bytes().to_vec());
        assert_eq!(storage.write_count(), 2);
    }

    #[test]
    fn load_returns_what_was_saved() {
        let storage = SimStorage::new(256);
        let mut store = EepromCalibrationStore::new(storage.clone());
        store.save_offset(-42).unwrap();
        store.save_scale(742.0).unwrap();

        let mut reopened = EepromCalibrationStore::new(storage);
        assert_eq!(
            reopened.load().unwrap(),
            CalibrationState {
                offset: -42,
                scale: 742.0
            }
        );
    }

    #[test]
    fn erased_storage_loads_without_validation() {
        let mut store = EepromCalibrationStore::new(SimStorage::new(256));
        let state = store.load().unwrap();
        assert_eq!(state.offset, -1);
        assert!(state.scale.is_nan());
        assert!(!state.is_valid());
    }

    #[test]
    fn saving_one_value_leaves_the_other_alone() {
        let storage = SimStorage::new(256);
        let mut store = EepromCalibrationStore::new(storage.clone());
        store.save_scale(2.5).unwrap();
        store.save_offset(7).unwrap();
        store.save_offset(9).unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.offset, 9);
        assert_eq!(state.scale, 2.5);
    }

    #[test]
    fn custom_base_address_is_honoured() {
        let storage = SimStorage::new(64);
        let mut store = EepromCalibrationStore::new_at(storage.clone(), 8);
        store.save_offset(1).unwrap();
        assert_eq!(storage.bytes(8, 4), vec![1, 0, 0, 0]);
        assert_eq!(store.base_address(), 8);
    }

    #[test]
    fn block_beyond_capacity_is_rejected() {
        let mut store = EepromCalibrationStore::new(SimStorage::new(104));
        assert_eq!(store.save_offset(1), Err(StorageError::OutOfRange));
        assert_eq!(store.load(), Err(StorageError::OutOfRange));
    }

    #[test]
    fn storage_failures_are_mapped() {
        let storage = SimStorage::new(256);
        storage.fail_next_operations(true);
        let mut store = EepromCalibrationStore::new(storage.clone());
        assert_eq!(store.save_scale(1.0), Err(StorageError::SaveError));
        assert_eq!(store.load(), Err(StorageError::RetrieveError));
    }
}
