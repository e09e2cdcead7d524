//! Decoding and per-device state for Medisana BLE blood pressure monitors.
//!
//! The payload decoder and device matcher are pure and usable without a
//! Bluetooth stack; `bluetooth::scanner` and `bluetooth::session` drive a
//! BlueZ adapter through `bluer`.

pub mod bluetooth;
pub mod config;
pub mod models;
pub mod sensor;
pub mod state;
pub mod utils;

pub use bluetooth::decoder::{decode, DecodeError, Sfloat};
pub use bluetooth::matcher::{is_supported, SupportedDeviceCriteria};
pub use models::{DeviceIdentity, DeviceReading, MeasurementRecord};
pub use state::DeviceState;
