use std::collections::{HashMap, HashSet};
use time::PrimitiveDateTime;

/// One decoded Blood Pressure Measurement notification.
///
/// Pressure values are reported exactly as the device encodes them. The unit
/// flag of the payload is not applied, consumers treat them as mmHg.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub systolic: f64,
    pub diastolic: f64,
    pub mean_arterial_pressure: f64,
    pub timestamp: Option<PrimitiveDateTime>,
    pub pulse_rate: Option<f64>,
    pub user_id: Option<u8>,
    pub measurement_status: Option<u16>,
}

/// Advertisement metadata of a discovered device.
#[derive(Debug, Clone, Default)]
pub struct DeviceIdentity {
    pub name: Option<String>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub service_uuids: HashSet<String>,
}

/// A measurement merged with the out-of-band values known when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    pub record: MeasurementRecord,
    pub rssi: Option<i16>,
    pub battery: Option<u8>,
    pub sequence: u64,
}

/// Key under which a reading is stored.
///
/// Readings without a device timestamp fall back to their arrival sequence.
/// Variant order matters: every arrival-keyed reading sorts below every
/// timestamped one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadingKey {
    Arrival(u64),
    Timestamp(PrimitiveDateTime),
}

impl DeviceReading {
    pub fn key(&self) -> ReadingKey {
        match self.record.timestamp {
            Some(ts) => ReadingKey::Timestamp(ts),
            None => ReadingKey::Arrival(self.sequence),
        }
    }
}
