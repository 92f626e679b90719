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


use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};

#[derive(Clone, Copy, Debug, PartialEq, Format)]
pub enum WeighingError {
    TareFailed,
    CalibrationFailed,
    MeasurementFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Format)]
pub enum WeightRequest {
    Tare,
    CalibrationAtMass(f32),
    Weight,
}

#[derive(Debug, PartialEq, Clone, Copy, Format)]
pub enum WeightEvents {
    /// Weight in grams, plus the same value in the fixed point form used on the wire
    WeightUpdate { grams: f32, fixed_point: i32 },
    RequestFailed(WeighingError),
    RequestCompleted(WeightRequest),
}

const CHANNEL_DEPTH: usize = 10;
const CHANNEL_SUBS: usize = 2;
const CHANNEL_PUBS: usize = 2;

pub type WeightChannel = PubSubChannel<CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelSubscriber<'a> = Subscriber<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightChannelPublisher<'a> = Publisher<'a, CriticalSectionRawMutex, WeightEvents, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;

pub type WeightRequestChannel = PubSubChannel<CriticalSectionRawMutex, WeightRequest, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightRequestSubscriber<'a> = Subscriber<'a, CriticalSectionRawMutex, WeightRequest, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
pub type WeightRequestPublisher<'a> = Publisher<'a, CriticalSectionRawMutex, WeightRequest, CHANNEL_DEPTH, CHANNEL_SUBS, CHANNEL_PUBS>;
