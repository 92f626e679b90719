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


use crate::messaging::{
    WeighingError, WeightChannelPublisher, WeightEvents, WeightRequest, WeightRequestSubscriber,
};
use defmt::{warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_sync::pubsub::WaitResult;
use embassy_time::{Duration, Timer};
use smartscale::{to_fixed_point, WeighingSystem};

/// Idle time between the end of one measurement and the start of the next
const MEASUREMENT_PERIOD: Duration = Duration::from_millis(250);

/// Acts as a bridge between the pubsub channels and the blocking weight scale
pub struct WeighingManager<WS> {
    request_subscriber: WeightRequestSubscriber<'static>,
    weight_channel_publisher: WeightChannelPublisher<'static>,
    weight_scale: WS,
}

impl<WS> WeighingManager<WS>
where
    WS: WeighingSystem,
    WS::Error: core::fmt::Debug,
{
    pub fn new(
        request_subscriber: WeightRequestSubscriber<'static>,
        weight_channel_publisher: WeightChannelPublisher<'static>,
        weight_scale: WS,
    ) -> Self {
        Self {
            request_subscriber,
            weight_channel_publisher,
            weight_scale,
        }
    }

    pub async fn run(&mut self) -> ! {
        // Every scale operation busy-waits for far longer than the period. A fresh timer per
        // pass, plus a yield after each operation, keeps the other tasks running.
        loop {
            let request_or_timer = select(
                self.request_subscriber.next_message(),
                Timer::after(MEASUREMENT_PERIOD),
            )
            .await;
            match request_or_timer {
                Either::First(message) => match message {
                    WaitResult::Message(weight_request) => {
                        self.handle_request(weight_request);
                    }
                    WaitResult::Lagged(missed) => {
                        warn!("Missed {} requests", missed);
                    }
                },
                Either::Second(_) => {
                    self.do_measurement();
                }
            }
            yield_now().await;
        }
    }

    fn handle_request(&mut self, request: WeightRequest) {
        match request {
            WeightRequest::Tare => match self.weight_scale.tare() {
                Ok(..) => self
                    .weight_channel_publisher
                    .publish_immediate(WeightEvents::RequestCompleted(WeightRequest::Tare)),
                Err(e) => {
                    warn!("Tare failed: {}", Debug2Format(&e));
                    self.weight_channel_publisher
                        .publish_immediate(WeightEvents::RequestFailed(WeighingError::TareFailed))
                }
            },
            WeightRequest::CalibrationAtMass(mass) => {
                match self.weight_scale.calibrate(mass) {
                    Ok(..) => self.weight_channel_publisher.publish_immediate(
                        WeightEvents::RequestCompleted(WeightRequest::CalibrationAtMass(mass)),
                    ),
                    Err(e) => {
                        warn!("Calibration at {} failed: {}", mass, Debug2Format(&e));
                        self.weight_channel_publisher.publish_immediate(
                            WeightEvents::RequestFailed(WeighingError::CalibrationFailed),
                        )
                    }
                }
            }
            WeightRequest::Weight => {
                self.do_measurement();
            }
        }
    }

    fn do_measurement(&mut self) {
        match self.weight_scale.read_weight() {
            Ok(grams) => self
                .weight_channel_publisher
                .publish_immediate(WeightEvents::WeightUpdate {
                    grams,
                    fixed_point: to_fixed_point(grams),
                }),
            Err(e) => {
                warn!("Measurement failed: {}", Debug2Format(&e));
                self.weight_channel_publisher
                    .publish_immediate(WeightEvents::RequestFailed(
                        WeighingError::MeasurementFailed,
                    ))
            }
        }
    }
}
