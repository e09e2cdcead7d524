//! Integration tests for the measurement decoder, matcher and device state.

use std::collections::{HashMap, HashSet};

use medisana_bp::bluetooth::decoder::{
    MeasurementFlags, MEASUREMENT_STATUS_PRESENT, PULSE_RATE_PRESENT, TIMESTAMP_PRESENT,
    USER_ID_PRESENT,
};
use medisana_bp::{decode, is_supported, DecodeError, DeviceIdentity, DeviceState, Sfloat};
use time::Month;

fn sf(value: i16) -> [u8; 2] {
    Sfloat::new(value, 0).unwrap().to_le_bytes()
}

/// Payload with every field its flags ask for.
fn payload(flags: u8) -> Vec<u8> {
    let mut data = vec![flags];
    data.extend_from_slice(&sf(120));
    data.extend_from_slice(&sf(80));
    data.extend_from_slice(&sf(95));
    if flags & TIMESTAMP_PRESENT != 0 {
        data.extend_from_slice(&2023u16.to_le_bytes());
        data.extend_from_slice(&[8, 27, 14, 30, 45]);
    }
    if flags & PULSE_RATE_PRESENT != 0 {
        data.extend_from_slice(&sf(72));
    }
    if flags & USER_ID_PRESENT != 0 {
        data.push(3);
    }
    if flags & MEASUREMENT_STATUS_PRESENT != 0 {
        data.extend_from_slice(&0x1234u16.to_le_bytes());
    }
    data
}

#[test]
fn basic_measurement() {
    let data = [0x00, 0x78, 0x00, 0x50, 0x00, 0x5F, 0x00];
    let record = decode(&data).unwrap();

    assert_eq!(record.systolic, 120.0);
    assert_eq!(record.diastolic, 80.0);
    assert_eq!(record.mean_arterial_pressure, 95.0);
    assert_eq!(record.timestamp, None);
    assert_eq!(record.pulse_rate, None);
    assert_eq!(record.user_id, None);
    assert_eq!(record.measurement_status, None);
}

#[test]
fn user_id_and_status() {
    let data = payload(USER_ID_PRESENT | MEASUREMENT_STATUS_PRESENT);
    let record = decode(&data).unwrap();

    assert_eq!(record.systolic, 120.0);
    assert_eq!(record.user_id, Some(3));
    assert_eq!(record.measurement_status, Some(0x1234));
    assert_eq!(record.timestamp, None);
    assert_eq!(record.pulse_rate, None);
}

#[test]
fn timestamp_and_pulse() {
    let record = decode(&payload(TIMESTAMP_PRESENT | PULSE_RATE_PRESENT)).unwrap();

    let ts = record.timestamp.unwrap();
    assert_eq!(ts.year(), 2023);
    assert_eq!(ts.month(), Month::August);
    assert_eq!(ts.day(), 27);
    assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 30, 45));
    assert_eq!(record.pulse_rate, Some(72.0));
    assert_eq!(record.user_id, None);
}

#[test]
fn every_flag_combination() {
    for flags in 0u8..0x20 {
        let record = decode(&payload(flags)).unwrap();

        assert_eq!(record.systolic, 120.0, "flags {flags:#04x}");
        assert_eq!(record.diastolic, 80.0, "flags {flags:#04x}");
        assert_eq!(record.mean_arterial_pressure, 95.0, "flags {flags:#04x}");
        assert_eq!(
            record.timestamp.is_some(),
            flags & TIMESTAMP_PRESENT != 0,
            "flags {flags:#04x}"
        );
        assert_eq!(
            record.pulse_rate,
            (flags & PULSE_RATE_PRESENT != 0).then_some(72.0),
            "flags {flags:#04x}"
        );
        assert_eq!(
            record.user_id,
            (flags & USER_ID_PRESENT != 0).then_some(3),
            "flags {flags:#04x}"
        );
        assert_eq!(
            record.measurement_status,
            (flags & MEASUREMENT_STATUS_PRESENT != 0).then_some(0x1234),
            "flags {flags:#04x}"
        );
    }
}

#[test]
fn every_short_payload_is_truncated() {
    for flags in 0u8..0x20 {
        let data = payload(flags);
        assert_eq!(data.len(), MeasurementFlags::from(flags).payload_len());

        for len in 0..data.len() {
            match decode(&data[..len]) {
                Err(DecodeError::Truncated { offset, .. }) => assert!(offset <= len),
                other => panic!("flags {flags:#04x}, len {len}: {other:?}"),
            }
        }
    }
}

#[test]
fn sfloat_roundtrip_recovers_value() {
    for mantissa in [0i16, 1, -1, 2047, -2048] {
        for exponent in -8i8..=7 {
            let encoded = Sfloat::new(mantissa, exponent).unwrap().to_le_bytes();
            let decoded = Sfloat::from_le_bytes(encoded);

            let expected = if exponent >= 0 {
                f64::from(mantissa) * 10f64.powi(exponent.into())
            } else {
                f64::from(mantissa) / 10f64.powi((-exponent).into())
            };
            assert_eq!(decoded.mantissa(), mantissa);
            assert_eq!(decoded.exponent(), exponent);
            assert_eq!(decoded.value(), expected, "{mantissa}e{exponent}");
        }
    }
}

#[test]
fn invalid_timestamp_degrades_to_none() {
    let mut data = payload(TIMESTAMP_PRESENT | PULSE_RATE_PRESENT | USER_ID_PRESENT);
    data[9] = 13; // month

    let record = decode(&data).unwrap();
    assert_eq!(record.timestamp, None);
    assert_eq!(record.systolic, 120.0);
    assert_eq!(record.pulse_rate, Some(72.0));
    assert_eq!(record.user_id, Some(3));
}

#[test]
fn matcher_scenarios() {
    let by_name = DeviceIdentity {
        name: Some("1872BXYZ".to_string()),
        ..Default::default()
    };
    assert!(is_supported(&by_name));

    let other = DeviceIdentity {
        name: Some("Other".to_string()),
        manufacturer_data: HashMap::from([(0x004C, vec![0x01])]),
        service_uuids: HashSet::from(["0000180f-0000-1000-8000-00805f9b34fb".to_string()]),
    };
    assert!(!is_supported(&other));

    let by_manufacturer = DeviceIdentity {
        name: None,
        manufacturer_data: HashMap::from([(31256, vec![0x01])]),
        ..Default::default()
    };
    assert!(is_supported(&by_manufacturer));
}

#[test]
fn decoded_records_feed_device_state() {
    let mut state = DeviceState::new("AA:BB:CC:DD:EE:FF");
    state.set_rssi(Some(-60));
    state.set_battery(Some(100));

    for data in [payload(0x00), payload(0x00), vec![0x04, 0x78]] {
        if let Ok(record) = decode(&data) {
            state.record(record);
        }
    }

    // Two untimestamped readings kept apart, the truncated one never stored
    assert_eq!(state.len(), 2);
    let latest = state.latest().unwrap();
    assert_eq!(latest.sequence, 1);
    assert_eq!(latest.rssi, Some(-60));
    assert_eq!(latest.battery, Some(100));
}
