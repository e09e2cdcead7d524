/// Blood Pressure Measurement payload decoding
use thiserror::Error;
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::models::MeasurementRecord;

// Flags byte bit masks
pub const UNIT_KPA: u8 = 0x01; // Not applied, values are reported as encoded
pub const TIMESTAMP_PRESENT: u8 = 0x02;
pub const PULSE_RATE_PRESENT: u8 = 0x04;
pub const USER_ID_PRESENT: u8 = 0x08;
pub const MEASUREMENT_STATUS_PRESENT: u8 = 0x10;

const SFLOAT_LEN: usize = 2;
const TIMESTAMP_LEN: usize = 7;
const USER_ID_LEN: usize = 1;
const MEASUREMENT_STATUS_LEN: usize = 2;

/// Errors returned by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload ended before a field required by its flags.
    #[error("payload truncated at {field} (offset {offset}): need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Reasons a timestamp field does not form a valid calendar date and time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("year {0} is out of range")]
    Year(u16),
    #[error(transparent)]
    Component(#[from] time::error::ComponentRange),
}

/// IEEE 11073-20601 16-bit short float: 4-bit signed exponent, 12-bit signed
/// mantissa, value = mantissa * 10^exponent.
///
/// The reserved NaN/NRes/+INF/-INF patterns are decoded as ordinary numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sfloat {
    mantissa: i16,
    exponent: i8,
}

impl Sfloat {
    pub const MANTISSA_MIN: i16 = -0x800;
    pub const MANTISSA_MAX: i16 = 0x7FF;
    pub const EXPONENT_MIN: i8 = -8;
    pub const EXPONENT_MAX: i8 = 7;

    pub const fn from_raw(raw: u16) -> Self {
        let mut mantissa = (raw & 0x0FFF) as i16;
        let mut exponent = ((raw >> 12) & 0x0F) as i8;

        // Sign-extend both nibble fields
        if exponent >= 0x8 {
            exponent -= 0x10;
        }
        if mantissa >= 0x800 {
            mantissa -= 0x1000;
        }

        Sfloat { mantissa, exponent }
    }

    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self::from_raw(u16::from_le_bytes(bytes))
    }

    /// Build a value from its parts, `None` if either part does not fit.
    pub fn new(mantissa: i16, exponent: i8) -> Option<Self> {
        let mantissa_ok = (Self::MANTISSA_MIN..=Self::MANTISSA_MAX).contains(&mantissa);
        let exponent_ok = (Self::EXPONENT_MIN..=Self::EXPONENT_MAX).contains(&exponent);
        (mantissa_ok && exponent_ok).then_some(Sfloat { mantissa, exponent })
    }

    pub const fn to_raw(self) -> u16 {
        ((self.exponent as u16 & 0x0F) << 12) | (self.mantissa as u16 & 0x0FFF)
    }

    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.to_raw().to_le_bytes()
    }

    pub const fn mantissa(self) -> i16 {
        self.mantissa
    }

    pub const fn exponent(self) -> i8 {
        self.exponent
    }

    /// Numeric value of the short float.
    ///
    /// Negative exponents divide by an exact power of ten so the result is
    /// the closest `f64` to the decimal value.
    pub fn value(self) -> f64 {
        let mantissa = f64::from(self.mantissa);
        let exponent = i32::from(self.exponent);
        if exponent >= 0 {
            mantissa * 10f64.powi(exponent)
        } else {
            mantissa / 10f64.powi(-exponent)
        }
    }
}

/// Presence gates carried in the leading flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementFlags(u8);

impl MeasurementFlags {
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn timestamp_present(self) -> bool {
        self.0 & TIMESTAMP_PRESENT != 0
    }

    pub const fn pulse_rate_present(self) -> bool {
        self.0 & PULSE_RATE_PRESENT != 0
    }

    pub const fn user_id_present(self) -> bool {
        self.0 & USER_ID_PRESENT != 0
    }

    pub const fn measurement_status_present(self) -> bool {
        self.0 & MEASUREMENT_STATUS_PRESENT != 0
    }

    /// Number of payload bytes these flags require, flags byte included.
    pub const fn payload_len(self) -> usize {
        let mut len = 1 + 3 * SFLOAT_LEN;
        if self.timestamp_present() {
            len += TIMESTAMP_LEN;
        }
        if self.pulse_rate_present() {
            len += SFLOAT_LEN;
        }
        if self.user_id_present() {
            len += USER_ID_LEN;
        }
        if self.measurement_status_present() {
            len += MEASUREMENT_STATUS_LEN;
        }
        len
    }
}

impl From<u8> for MeasurementFlags {
    fn from(bits: u8) -> Self {
        MeasurementFlags(bits)
    }
}

/// Bounds-checked little-endian reader over a notification payload.
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let bytes = self
            .data
            .get(self.offset..)
            .and_then(|rest| rest.get(..N))
            .ok_or(DecodeError::Truncated {
                field,
                offset: self.offset,
                needed: N,
                available: self.data.len().saturating_sub(self.offset),
            })?;

        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.offset += N;
        Ok(out)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.take::<1>(field).map(|[b]| b)
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.take::<2>(field).map(u16::from_le_bytes)
    }

    fn sfloat(&mut self, field: &'static str) -> Result<f64, DecodeError> {
        self.take::<2>(field)
            .map(|bytes| Sfloat::from_le_bytes(bytes).value())
    }
}

/// Decode the 7-byte date/time field: year (u16 LE), month, day, hour,
/// minute, second.
pub fn decode_timestamp(bytes: [u8; 7]) -> Result<PrimitiveDateTime, TimestampError> {
    let [y0, y1, month, day, hour, minute, second] = bytes;
    let year = u16::from_le_bytes([y0, y1]);
    if year == 0 {
        return Err(TimestampError::Year(year));
    }

    let date = Date::from_calendar_date(i32::from(year), Month::try_from(month)?, day)?;
    let time = Time::from_hms(hour, minute, second)?;
    Ok(PrimitiveDateTime::new(date, time))
}

/// Decode a Blood Pressure Measurement notification into structured data
///
/// The payload is a flags byte followed by fields whose presence the flags
/// decide, all little-endian:
/// - Byte 0: Flags
/// - Bytes 1-2: Systolic (SFLOAT)
/// - Bytes 3-4: Diastolic (SFLOAT)
/// - Bytes 5-6: Mean arterial pressure (SFLOAT)
/// - 7 bytes: Timestamp (flag 0x02)
/// - 2 bytes: Pulse rate, SFLOAT (flag 0x04)
/// - 1 byte: User id (flag 0x08)
/// - 2 bytes: Measurement status (flag 0x10)
///
/// An invalid calendar timestamp decodes as `None` instead of failing the
/// whole payload. Bytes after the last flagged field are ignored.
///
/// # Arguments
/// * `data` - Raw notification bytes
///
/// # Returns
/// The decoded record, or `DecodeError::Truncated` if the payload is shorter
/// than its flags require
pub fn decode(data: &[u8]) -> Result<MeasurementRecord, DecodeError> {
    let mut cursor = Cursor::new(data);

    let flags = MeasurementFlags::from(cursor.u8("flags")?);

    let systolic = cursor.sfloat("systolic")?;
    let diastolic = cursor.sfloat("diastolic")?;
    let mean_arterial_pressure = cursor.sfloat("mean arterial pressure")?;

    let timestamp = if flags.timestamp_present() {
        decode_timestamp(cursor.take::<TIMESTAMP_LEN>("timestamp")?).ok()
    } else {
        None
    };

    let pulse_rate = if flags.pulse_rate_present() {
        Some(cursor.sfloat("pulse rate")?)
    } else {
        None
    };

    let user_id = if flags.user_id_present() {
        Some(cursor.u8("user id")?)
    } else {
        None
    };

    let measurement_status = if flags.measurement_status_present() {
        Some(cursor.u16("measurement status")?)
    } else {
        None
    };

    Ok(MeasurementRecord {
        systolic,
        diastolic,
        mean_arterial_pressure,
        timestamp,
        pulse_rate,
        user_id,
        measurement_status,
    })
}
