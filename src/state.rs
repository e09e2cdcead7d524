/// Per-device state: decoded readings merged with signal strength and battery
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::models::{DeviceReading, MeasurementRecord, ReadingKey};

#[derive(Debug, Clone)]
pub struct DeviceState {
    address: String,
    readings: BTreeMap<ReadingKey, DeviceReading>,
    rssi: Option<i16>,
    battery: Option<u8>,
    next_sequence: u64,
    last_seen: Option<OffsetDateTime>,
}

impl DeviceState {
    pub fn new(address: impl Into<String>) -> Self {
        DeviceState {
            address: address.into(),
            readings: BTreeMap::new(),
            rssi: None,
            battery: None,
            next_sequence: 0,
            last_seen: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    pub fn battery(&self) -> Option<u8> {
        self.battery
    }

    pub fn set_rssi(&mut self, rssi: Option<i16>) {
        self.rssi = rssi;
    }

    pub fn set_battery(&mut self, battery: Option<u8>) {
        self.battery = battery;
    }

    /// Store a decoded record with the current signal strength and battery.
    ///
    /// A record carrying the same timestamp as a stored one replaces it.
    /// Records without a timestamp are keyed by arrival order and never
    /// collide with each other.
    pub fn record(&mut self, record: MeasurementRecord) -> &DeviceReading {
        let reading = DeviceReading {
            record,
            rssi: self.rssi,
            battery: self.battery,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.last_seen = Some(OffsetDateTime::now_utc());

        let key = reading.key();
        self.readings.insert(key, reading);
        &self.readings[&key]
    }

    /// The reading with the greatest key: newest device timestamp if any
    /// reading has one, otherwise the last one to arrive.
    pub fn latest(&self) -> Option<&DeviceReading> {
        self.readings.values().next_back()
    }

    /// Readings in key order.
    pub fn readings(&self) -> impl Iterator<Item = &DeviceReading> {
        self.readings.values()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// When the last record was stored.
    pub fn last_seen(&self) -> Option<OffsetDateTime> {
        self.last_seen
    }
}
