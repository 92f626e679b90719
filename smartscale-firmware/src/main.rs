#![no_std]
#![no_main]
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


mod messaging;
mod weighing_manager;

use embassy_executor::{Executor, Spawner};
use embassy_time::{Delay, Duration, Timer};
#[allow(unused_imports)]
use {defmt_rtt as _, panic_probe as _};

use crate::messaging::{
    WeightChannel, WeightChannelPublisher, WeightChannelSubscriber, WeightEvents, WeightRequest,
    WeightRequestChannel, WeightRequestPublisher, WeightRequestSubscriber,
};
use crate::weighing_manager::WeighingManager;
use assign_resources::assign_resources;
use defmt::{info, warn};
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals;
use embassy_sync::pubsub::{PubSubChannel, WaitResult};
use embedded_storage::nor_flash::RmwNorFlashStorage;
use smartscale::{EepromCalibrationStore, Hx711, Hx711Gain, WeightScale, WeightScaleConfig};
use static_cell::StaticCell;

pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
/// Calibration lives in the last flash sector, kept out of the image by memory.x
const CALIBRATION_BASE_ADDRESS: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;
const CALIBRATION_MASS_GRAMS: f32 = 100.0;
const BUTTON_DEBOUNCE: Duration = Duration::from_millis(200);

static WEIGHT_EVENT_CHANNEL: WeightChannel = PubSubChannel::new();
static WEIGHT_REQUEST_CHANNEL: WeightRequestChannel = PubSubChannel::new();

assign_resources! {
    strain_gauge_io: StrainGaugeResources {
        clk_pin: PIN_14,
        data_pin: PIN_15,
    },
    excitation_io: ExcitationResources {
        power_pin: PIN_12,
        polarity_pin: PIN_13,
    },
    buttons: ButtonResources {
        tare_btn_pin: PIN_6,
        calibrate_btn_pin: PIN_7,
    },
    storage: StorageResources {
        flash: FLASH,
    }
}

static EXECUTOR0: StaticCell<Executor> = StaticCell::new();
static FLASH_MERGE_BUFFER: StaticCell<[u8; ERASE_SIZE]> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());
    let resources = split_resources!{p};

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| core0_main(spawner, resources));
}

fn core0_main(spawner: Spawner, resources: AssignedResources)
{
    spawner.spawn(button_task(resources.buttons, WEIGHT_REQUEST_CHANNEL.publisher().unwrap())).unwrap();
    spawner.spawn(weight_report_task(WEIGHT_EVENT_CHANNEL.subscriber().unwrap())).unwrap();
    spawner.spawn(weighing_task(resources.strain_gauge_io, resources.excitation_io, resources.storage,
                                WEIGHT_REQUEST_CHANNEL.subscriber().unwrap(), WEIGHT_EVENT_CHANNEL.publisher().unwrap())).unwrap();
}

#[embassy_executor::task]
async fn weighing_task(strain_gauge_resources: StrainGaugeResources,
                       excitation_resources: ExcitationResources,
                       storage_resources: StorageResources,
                       request_subscriber: WeightRequestSubscriber<'static>,
                       weight_event_publisher: WeightChannelPublisher<'static>)
{
    let clk_pin_out = Output::new(strain_gauge_resources.clk_pin, Level::Low);
    let data_pin = Input::new(strain_gauge_resources.data_pin, Pull::Up);
    let strain_gauge = Hx711::new(clk_pin_out, data_pin, Delay, Hx711Gain::Gain128);

    #[cfg(feature = "ac_excitation")]
    let excitation = smartscale::AcExcitation::new(
        Output::new(excitation_resources.power_pin, Level::Low),
        Output::new(excitation_resources.polarity_pin, Level::Low),
    ).unwrap();
    #[cfg(not(feature = "ac_excitation"))]
    let excitation = {
        let _ = excitation_resources;
        smartscale::NoExcitation
    };

    let flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(storage_resources.flash);
    let merge_buffer = FLASH_MERGE_BUFFER.init([0u8; ERASE_SIZE]);
    let storage = RmwNorFlashStorage::new(flash, merge_buffer);
    let store = EepromCalibrationStore::new_at(storage, CALIBRATION_BASE_ADDRESS);

    let mut weight_scale = WeightScale::new(strain_gauge, excitation, store, Delay, WeightScaleConfig::default());
    if let Err(e) = weight_scale.init() {
        warn!("Weighing system initialisation failed: {}", e);
    }

    let mut weighing_manager = WeighingManager::new(request_subscriber, weight_event_publisher, weight_scale);
    weighing_manager.run().await;
}

#[embassy_executor::task]
async fn button_task(button_pins: ButtonResources, request_publisher: WeightRequestPublisher<'static>)
{
    let mut tare_btn = Input::new(button_pins.tare_btn_pin, Pull::Up);
    let mut calibrate_btn = Input::new(button_pins.calibrate_btn_pin, Pull::Up);

    loop {
        match embassy_futures::select::select(tare_btn.wait_for_falling_edge(), calibrate_btn.wait_for_falling_edge()).await {
            embassy_futures::select::Either::First(_) => {
                info!("Tare requested");
                request_publisher.publish_immediate(WeightRequest::Tare);
            }
            embassy_futures::select::Either::Second(_) => {
                info!("Calibration at {} g requested", CALIBRATION_MASS_GRAMS);
                request_publisher.publish_immediate(WeightRequest::CalibrationAtMass(CALIBRATION_MASS_GRAMS));
            }
        }
        Timer::after(BUTTON_DEBOUNCE).await;
    }
}

#[embassy_executor::task]
async fn weight_report_task(mut weight_event_subscriber: WeightChannelSubscriber<'static>)
{
    loop {
        match weight_event_subscriber.next_message().await {
            WaitResult::Message(WeightEvents::WeightUpdate { grams, fixed_point }) => {
                info!("Weight {} g (fixed point {})", grams, fixed_point);
            }
            WaitResult::Message(WeightEvents::RequestCompleted(request)) => {
                info!("Completed {}", request);
            }
            WaitResult::Message(WeightEvents::RequestFailed(e)) => {
                warn!("Weighing request failed: {}", e);
            }
            WaitResult::Lagged(missed) => {
                warn!("Missed {} weight events", missed);
            }
        }
    }
}
