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

use crate::config::WeightScaleConfig;
use crate::storage::{CalibrationState, CalibrationStore};
use crate::weight::averaging::average_readings;
use crate::weight::excitation::{combine_differential, ExcitationControl, ExcitationPhase};
use crate::weight::interface::hx711;
use crate::weight::interface::StrainGaugeInterface;
use crate::weight::WeighingSystem;
use core::num::NonZeroU8;
use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<StrainGaugeE, ExcitationE, StorageE> {
    StrainGaugeReadingError(StrainGaugeE),
    ExcitationError(ExcitationE),
    StorageError(StorageE),
    /// Scale is zero or not a number, or a calibration would have made it so
    InvalidCalibration,
}

impl<OutPinE, InPinE, ExcitationE, StorageE>
    Error<hx711::Error<OutPinE, InPinE>, ExcitationE, StorageE>
{
    /// The HX711 never signalled a conversion. Retrying is up to the caller.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::StrainGaugeReadingError(hx711::Error::Timeout)
        )
    }
}

/// The weighing system: strain gauge readings, bridge excitation and the stored two-point
/// calibration.
///
/// Every operation blocks until done. Calibration in particular busy-waits for
/// [`WeightScaleConfig::calibration_settle_ms`] before sampling.
pub struct WeightScale<StrainGauge, Excitation, Store, Delay> {
    strain_gauge: StrainGauge,
    excitation: Excitation,
    store: Store,
    delay: Delay,
    config: WeightScaleConfig,
    calibration: CalibrationState,
}

impl<StrainGauge, Excitation, Store, Delay, StrainGaugeE, ExcitationE, StorageE>
    WeightScale<StrainGauge, Excitation, Store, Delay>
where
    StrainGauge: StrainGaugeInterface<Error = StrainGaugeE>,
    Excitation: ExcitationControl<Error = ExcitationE>,
    Store: CalibrationStore<Error = StorageE>,
    Delay: DelayNs,
{
    /// Nothing is touched until [`Self::init`] is called.
    pub fn new(
        strain_gauge: StrainGauge,
        excitation: Excitation,
        store: Store,
        delay: Delay,
        config: WeightScaleConfig,
    ) -> Self {
        Self {
            strain_gauge,
            excitation,
            store,
            delay,
            config,
            calibration: CalibrationState {
                offset: 0,
                scale: 0.0,
            },
        }
    }

    /// Loads the calibration, power cycles the gauge and throws away the first readings.
    ///
    /// The calibration is in memory before the gauge is touched, so a gauge that is not
    /// ready yet still leaves a usable scale behind once it comes up.
    pub fn init(&mut self) -> Result<(), Error<StrainGaugeE, ExcitationE, StorageE>> {
        self.calibration = self.store.load().map_err(Error::StorageError)?;
        debug!(
            "Calibration loaded: offset = {}, scale = {}",
            self.calibration.offset,
            self.calibration.scale
        );
        if !self.calibration.is_valid() {
            warn!("Stored calibration scale is unusable, calibrate before weighing");
        }

        self.strain_gauge
            .initialize()
            .map_err(Error::StrainGaugeReadingError)?;
        let discarded = self.average_sample(self.config.init_samples)?;
        trace!("Discarded initial reading {}", discarded);
        Ok(())
    }

    /// Mean of `count` readings straight from the strain gauge, no excitation handling.
    pub fn average_sample(
        &mut self,
        count: NonZeroU8,
    ) -> Result<i32, Error<StrainGaugeE, ExcitationE, StorageE>> {
        average_readings(&mut self.strain_gauge, count).map_err(Error::StrainGaugeReadingError)
    }

    /// Averaged reading with the excitation applied. For a differential bridge this is half
    /// the difference of the negative and positive phase means, otherwise the plain mean.
    pub fn read_combined_sample(
        &mut self,
        count: NonZeroU8,
    ) -> Result<i32, Error<StrainGaugeE, ExcitationE, StorageE>> {
        if !self.excitation.is_differential() {
            // combine_differential(0, reading << 1) without the shift overflowing
            return self.average_sample(count);
        }

        let burst = self.differential_burst(count);
        // bridge goes off even when the burst failed
        let switched_off = self.set_excitation(ExcitationPhase::Off);
        let combined = burst?;
        switched_off?;
        Ok(combined)
    }

    fn differential_burst(
        &mut self,
        count: NonZeroU8,
    ) -> Result<i32, Error<StrainGaugeE, ExcitationE, StorageE>> {
        // power comes up already on the positive polarity
        self.set_excitation(ExcitationPhase::Positive)?;
        self.delay.delay_ms(self.config.excitation_warmup_ms);
        self.delay.delay_ms(self.config.polarity_settle_ms);
        let positive = self.average_sample(count)?;

        self.set_excitation(ExcitationPhase::Negative)?;
        self.delay.delay_ms(self.config.polarity_settle_ms);
        let negative = self.average_sample(count)?;

        let combined = combine_differential(positive, negative);
        trace!(
            "Positive = {}, negative = {}, combined = {}",
            positive,
            negative,
            combined
        );
        Ok(combined)
    }

    fn set_excitation(
        &mut self,
        phase: ExcitationPhase,
    ) -> Result<(), Error<StrainGaugeE, ExcitationE, StorageE>> {
        self.excitation
            .set_phase(phase)
            .map_err(Error::ExcitationError)
    }

    /// Weight in whatever unit the span calibration weight was given in.
    pub fn read_weight(&mut self) -> Result<f32, Error<StrainGaugeE, ExcitationE, StorageE>> {
        if !self.calibration.is_valid() {
            warn!("Weight requested with unusable scale {}", self.calibration.scale);
            return Err(Error::InvalidCalibration);
        }

        let reading = self.read_combined_sample(self.config.read_samples)?;
        let tared_reading = i64::from(reading) - i64::from(self.calibration.offset);
        let weight = tared_reading as f32 / self.calibration.scale;
        trace!("Reading = {}, tared = {}, weight = {}", reading, tared_reading, weight);
        Ok(weight)
    }

    /// Calibrates against `known_weight` and persists the result straight away.
    ///
    /// A weight of zero sets the offset. Any other weight sets the scale relative to the
    /// current offset, so the zero point has to be established first. Returns the combined
    /// reading the calibration was based on.
    pub fn calibrate(
        &mut self,
        known_weight: f32,
    ) -> Result<i32, Error<StrainGaugeE, ExcitationE, StorageE>> {
        if !known_weight.is_finite() {
            error!("Calibration weight {} is not a number", known_weight);
            return Err(Error::InvalidCalibration);
        }

        self.delay.delay_ms(self.config.calibration_settle_ms);
        let reading = self.read_combined_sample(self.config.calibration_samples)?;
        debug!("Calibrating at {} with reading {}", known_weight, reading);

        if known_weight == 0.0 {
            self.store
                .save_offset(reading)
                .map_err(Error::StorageError)?;
            self.calibration.offset = reading;
            info!("Zero calibration, offset = {}", reading);
        } else {
            let scale = ((f64::from(reading) - f64::from(self.calibration.offset))
                / f64::from(known_weight)) as f32;
            let candidate = CalibrationState {
                offset: self.calibration.offset,
                scale,
            };
            if !candidate.is_valid() {
                error!(
                    "Calibration at {} gives unusable scale {}, offset {} reading {}",
                    known_weight,
                    scale,
                    self.calibration.offset,
                    reading
                );
                return Err(Error::InvalidCalibration);
            }

            self.store.save_scale(scale).map_err(Error::StorageError)?;
            self.calibration.scale = scale;
            info!("Span calibration, scale = {} counts per unit", scale);
        }
        Ok(reading)
    }

    pub fn power_down(&mut self) -> Result<(), Error<StrainGaugeE, ExcitationE, StorageE>> {
        self.strain_gauge
            .power_down()
            .map_err(Error::StrainGaugeReadingError)
    }

    pub fn power_up(&mut self) -> Result<(), Error<StrainGaugeE, ExcitationE, StorageE>> {
        self.strain_gauge
            .power_up()
            .map_err(Error::StrainGaugeReadingError)
    }

    pub fn offset(&self) -> i32 {
        self.calibration.offset
    }

    /// In memory only, storage keeps the last calibrated value.
    pub fn set_offset(&mut self, offset: i32) {
        self.calibration.offset = offset;
    }

    pub fn scale(&self) -> f32 {
        self.calibration.scale
    }

    /// In memory only, storage keeps the last calibrated value.
    pub fn set_scale(&mut self, scale: f32) {
        self.calibration.scale = scale;
    }

    pub fn calibration(&self) -> CalibrationState {
        self.calibration
    }

    pub fn config(&self) -> &WeightScaleConfig {
        &self.config
    }

    pub fn release(self) -> (StrainGauge, Excitation, Store, Delay) {
        (self.strain_gauge, self.excitation, self.store, self.delay)
    }
}

impl<StrainGauge, Excitation, Store, Delay, StrainGaugeE, ExcitationE, StorageE> WeighingSystem
    for WeightScale<StrainGauge, Excitation, Store, Delay>
where
    StrainGauge: StrainGaugeInterface<Error = StrainGaugeE>,
    Excitation: ExcitationControl<Error = ExcitationE>,
    Store: CalibrationStore<Error = StorageE>,
    Delay: DelayNs,
{
    type Error = Error<StrainGaugeE, ExcitationE, StorageE>;

    fn tare(&mut self) -> Result<i32, Self::Error> {
        WeightScale::calibrate(self, 0.0)
    }

    fn calibrate(&mut self, calibration_mass: f32) -> Result<i32, Self::Error> {
        WeightScale::calibrate(self, calibration_mass)
    }

    fn read_weight(&mut self) -> Result<f32, Self::Error> {
        WeightScale::read_weight(self)
    }
}
