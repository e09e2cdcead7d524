/// Sensor-style view over a device state
///
/// Each sensor observes one value of the latest reading. A sensor keeps its
/// previous value when an update does not carry its field, and can be seeded
/// with a value restored by the host before the first reading arrives.
use log::{debug, warn};
use std::fmt;

use crate::models::DeviceReading;
use crate::state::DeviceState;
use crate::utils::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Systolic,
    Diastolic,
    MeanArterialPressure,
    PulseRate,
    UserId,
    SignalStrength,
    Battery,
    LastMeasurement,
}

impl SensorKind {
    pub const ALL: [SensorKind; 8] = [
        SensorKind::MeanArterialPressure,
        SensorKind::SignalStrength,
        SensorKind::PulseRate,
        SensorKind::Systolic,
        SensorKind::Diastolic,
        SensorKind::UserId,
        SensorKind::LastMeasurement,
        SensorKind::Battery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Systolic => "Systolic Pressure",
            SensorKind::Diastolic => "Diastolic Pressure",
            SensorKind::MeanArterialPressure => "Mean Arterial Pressure",
            SensorKind::PulseRate => "Heart Rate",
            SensorKind::UserId => "User Id",
            SensorKind::SignalStrength => "Signal Strength",
            SensorKind::Battery => "Battery Level",
            SensorKind::LastMeasurement => "Last Measurement",
        }
    }

    fn unique_id_suffix(self) -> &'static str {
        match self {
            SensorKind::Systolic => "systolic",
            SensorKind::Diastolic => "diastolic",
            SensorKind::MeanArterialPressure => "mean_arterial",
            SensorKind::PulseRate => "pulse",
            SensorKind::UserId => "user_id",
            SensorKind::SignalStrength => "rssi",
            SensorKind::Battery => "battery",
            SensorKind::LastMeasurement => "timestamp",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            SensorKind::Systolic | SensorKind::Diastolic | SensorKind::MeanArterialPressure => {
                Some("mmHg")
            }
            SensorKind::PulseRate => Some("bpm"),
            SensorKind::SignalStrength => Some("dBm"),
            SensorKind::Battery => Some("%"),
            SensorKind::UserId | SensorKind::LastMeasurement => None,
        }
    }

    /// The value this sensor reads from a reading, if the reading carries it.
    pub fn value_from(self, reading: &DeviceReading) -> Option<SensorValue> {
        let record = &reading.record;
        match self {
            SensorKind::Systolic => Some(SensorValue::Float(record.systolic)),
            SensorKind::Diastolic => Some(SensorValue::Float(record.diastolic)),
            SensorKind::MeanArterialPressure => {
                Some(SensorValue::Float(record.mean_arterial_pressure))
            }
            SensorKind::PulseRate => record.pulse_rate.map(SensorValue::Float),
            SensorKind::UserId => record.user_id.map(|id| SensorValue::Integer(id.into())),
            SensorKind::SignalStrength => reading.rssi.map(|rssi| SensorValue::Integer(rssi.into())),
            SensorKind::Battery => reading.battery.map(|b| SensorValue::Integer(b.into())),
            SensorKind::LastMeasurement => record
                .timestamp
                .map(|ts| SensorValue::Text(format_timestamp(&ts))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Float(f64),
    Integer(i64),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Float(v) => write!(f, "{}", v),
            SensorValue::Integer(v) => write!(f, "{}", v),
            SensorValue::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    kind: SensorKind,
    unique_id: String,
    native_value: Option<SensorValue>,
}

impl Sensor {
    pub fn new(kind: SensorKind, address: &str) -> Self {
        Sensor {
            kind,
            unique_id: format!("medisana_bp_{}_{}", kind.unique_id_suffix(), address),
            native_value: None,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn unit(&self) -> Option<&'static str> {
        self.kind.unit()
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn native_value(&self) -> Option<&SensorValue> {
        self.native_value.as_ref()
    }

    /// Seed the sensor with a host-restored value. Ignored once a value is held.
    pub fn restore(&mut self, previous: Option<SensorValue>) {
        if self.native_value.is_some() {
            return;
        }
        if let Some(value) = previous {
            debug!("Restored {}: {}", self.name(), value);
            self.native_value = Some(value);
        }
    }

    /// Take this sensor's value from the latest reading of `state`.
    pub fn handle_update(&mut self, state: &DeviceState) {
        let Some(reading) = state.latest() else {
            warn!("No data received for {}", self.name());
            return;
        };

        match self.kind.value_from(reading) {
            Some(value) => {
                debug!("Update {} updated: {}", self.name(), value);
                self.native_value = Some(value);
            }
            None => warn!("Update {} not available in data", self.name()),
        }
    }
}

/// All sensors exposed for one device.
pub fn sensors_for(address: &str) -> Vec<Sensor> {
    SensorKind::ALL
        .iter()
        .map(|kind| Sensor::new(*kind, address))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeasurementRecord;
    use time::{Date, Month, PrimitiveDateTime, Time};

    const MAC: &str = "AA:BB:CC:DD:EE:FF";

    fn record(pulse_rate: Option<f64>) -> MeasurementRecord {
        MeasurementRecord {
            systolic: 120.0,
            diastolic: 80.0,
            mean_arterial_pressure: 95.0,
            timestamp: None,
            pulse_rate,
            user_id: Some(1),
            measurement_status: None,
        }
    }

    #[test]
    fn sensors_cover_every_kind() {
        let sensors = sensors_for(MAC);
        assert_eq!(sensors.len(), 8);
        assert!(sensors
            .iter()
            .any(|s| s.unique_id() == "medisana_bp_mean_arterial_AA:BB:CC:DD:EE:FF"));
        assert!(sensors.iter().all(|s| s.native_value().is_none()));
    }

    #[test]
    fn units_match_kinds() {
        assert_eq!(SensorKind::Systolic.unit(), Some("mmHg"));
        assert_eq!(SensorKind::PulseRate.unit(), Some("bpm"));
        assert_eq!(SensorKind::SignalStrength.unit(), Some("dBm"));
        assert_eq!(SensorKind::Battery.unit(), Some("%"));
        assert_eq!(SensorKind::UserId.unit(), None);
    }

    #[test]
    fn update_takes_latest_reading() {
        let mut state = DeviceState::new(MAC);
        state.set_rssi(Some(-70));
        state.record(record(Some(64.0)));

        let mut pulse = Sensor::new(SensorKind::PulseRate, MAC);
        let mut rssi = Sensor::new(SensorKind::SignalStrength, MAC);
        pulse.handle_update(&state);
        rssi.handle_update(&state);

        assert_eq!(pulse.native_value(), Some(&SensorValue::Float(64.0)));
        assert_eq!(rssi.native_value(), Some(&SensorValue::Integer(-70)));
    }

    #[test]
    fn update_keeps_previous_value_when_field_absent() {
        let mut state = DeviceState::new(MAC);
        let mut pulse = Sensor::new(SensorKind::PulseRate, MAC);

        state.record(record(Some(64.0)));
        pulse.handle_update(&state);
        state.record(record(None));
        pulse.handle_update(&state);

        assert_eq!(pulse.native_value(), Some(&SensorValue::Float(64.0)));
    }

    #[test]
    fn update_without_data_changes_nothing() {
        let state = DeviceState::new(MAC);
        let mut systolic = Sensor::new(SensorKind::Systolic, MAC);
        systolic.handle_update(&state);
        assert!(systolic.native_value().is_none());
    }

    #[test]
    fn restore_only_fills_empty_sensor() {
        let mut battery = Sensor::new(SensorKind::Battery, MAC);
        battery.restore(None);
        assert!(battery.native_value().is_none());

        battery.restore(Some(SensorValue::Integer(90)));
        battery.restore(Some(SensorValue::Integer(10)));
        assert_eq!(battery.native_value(), Some(&SensorValue::Integer(90)));
    }

    #[test]
    fn last_measurement_uses_device_timestamp() {
        let mut state = DeviceState::new(MAC);
        let mut with_ts = record(None);
        with_ts.timestamp = Some(PrimitiveDateTime::new(
            Date::from_calendar_date(2023, Month::August, 27).unwrap(),
            Time::from_hms(14, 30, 45).unwrap(),
        ));
        state.record(with_ts);

        let mut last = Sensor::new(SensorKind::LastMeasurement, MAC);
        last.handle_update(&state);
        assert_eq!(
            last.native_value().map(ToString::to_string),
            Some("27.08.2023 - 14:30:45".to_string())
        );
    }
}
