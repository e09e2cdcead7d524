use log::{debug, info};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::utils::mask_mac;

const DEFAULT_SCAN_DURATION_SECS: u64 = 20;
const DEFAULT_NOTIFICATION_WINDOW_SECS: u64 = 60; // Device pushes stored readings after connect
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} must be greater than 0")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Devices accepted regardless of what they advertise, MAC -> name
    pub devices: HashMap<String, String>,
    pub scan_duration: Duration,
    pub notification_window: Duration,
    pub poll_interval: Duration,
}

impl SensorConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let devices = lookup("MEDISANA_DEVICES")
            .map(|list| parse_devices(&list))
            .unwrap_or_default();

        info!("Configured devices: {}", devices.len());
        for (mac, name) in &devices {
            debug!("Device: {} -> {}", mask_mac(mac), name);
        }

        let scan_duration = seconds(&lookup, "SCAN_DURATION_SECS", DEFAULT_SCAN_DURATION_SECS)?;
        let notification_window = seconds(
            &lookup,
            "NOTIFICATION_WINDOW_SECS",
            DEFAULT_NOTIFICATION_WINDOW_SECS,
        )?;
        let poll_interval = seconds(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;

        if notification_window.is_zero() {
            return Err(ConfigError::Zero("NOTIFICATION_WINDOW_SECS"));
        }
        if scan_duration.is_zero() {
            return Err(ConfigError::Zero("SCAN_DURATION_SECS"));
        }

        Ok(SensorConfig {
            devices,
            scan_duration,
            notification_window,
            poll_interval,
        })
    }

    pub fn is_configured(&self, mac: &str) -> bool {
        self.devices.contains_key(&mac.to_uppercase())
    }
}

/// Parse `MAC=Name` pairs separated by commas. A bare MAC gets a default name.
fn parse_devices(list: &str) -> HashMap<String, String> {
    let mut devices = HashMap::new();

    for pair in list.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (mac, name) = match pair.split_once('=') {
            Some((mac, name)) => (mac.trim(), name.trim()),
            None => (pair, ""),
        };
        if mac.is_empty() {
            continue;
        }

        let name = if name.is_empty() {
            "Medisana Blood Pressure Monitor"
        } else {
            name
        };
        devices.insert(mac.to_uppercase(), name.to_string());
    }

    devices
}

fn seconds<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(Duration::from_secs(default)),
    }
}
