/// GATT session with one monitor: battery read plus a window of notifications
use futures_util::{pin_mut, StreamExt};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::timeout;

use crate::bluetooth::decoder::{decode, MeasurementFlags};
use crate::models::MeasurementRecord;
use crate::utils::{hex, mask_mac};

pub const BP_MEASUREMENT_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0x00002a35_0000_1000_8000_00805f9b34fb);
pub const BATTERY_LEVEL_UUID: bluer::Uuid =
    bluer::Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);

/// What one session produced
#[derive(Debug, Clone, Default)]
pub struct SessionOutcome {
    pub battery: Option<u8>,
    pub records: Vec<MeasurementRecord>,
    pub rejected: usize,
}

/// Decode one notification, logging instead of failing on bad payloads
///
/// A malformed notification is discarded so it never ends the session.
pub fn handle_notification(mac: &str, data: &[u8]) -> Option<MeasurementRecord> {
    debug!("Notification from {}: {}", mac, hex(data));

    match decode(data) {
        Ok(record) => {
            let flags = data.first().copied().map(MeasurementFlags::from);
            if flags.is_some_and(|f| f.timestamp_present()) && record.timestamp.is_none() {
                warn!("Invalid timestamp in data from {}: {}", mac, hex(data));
            }
            debug!("Parsed data: {:?}", record);
            Some(record)
        }
        Err(e) => {
            warn!("Discarding notification from {}: {}", mac, e);
            None
        }
    }
}

async fn find_characteristic(
    device: &bluer::Device,
    uuid: bluer::Uuid,
) -> Result<Option<bluer::gatt::remote::Characteristic>, bluer::Error> {
    for service in device.services().await? {
        for characteristic in service.characteristics().await? {
            if characteristic.uuid().await? == uuid {
                return Ok(Some(characteristic));
            }
        }
    }
    Ok(None)
}

async fn read_battery(device: &bluer::Device, mac: &str) -> Result<Option<u8>, bluer::Error> {
    let Some(characteristic) = find_characteristic(device, BATTERY_LEVEL_UUID).await? else {
        debug!("No battery characteristic on {}", mac);
        return Ok(None);
    };

    match characteristic.read().await {
        Ok(payload) => Ok(payload.first().copied()),
        Err(e) => {
            warn!("Failed to read battery level of {}: {}", mac, e);
            Ok(None)
        }
    }
}

async fn run_session(
    device: &bluer::Device,
    mac: &str,
    window: Duration,
) -> Result<SessionOutcome, Box<dyn std::error::Error>> {
    let mut outcome = SessionOutcome {
        battery: read_battery(device, mac).await?,
        ..Default::default()
    };

    let measurement = find_characteristic(device, BP_MEASUREMENT_UUID)
        .await?
        .ok_or("Blood Pressure Measurement characteristic not found")?;

    debug!("Connected to {}, subscribing to notifications", mac);
    let notifications = measurement.notify().await?;

    // The device only pushes while connected, keep the link open for the window
    let collect = async {
        pin_mut!(notifications);
        while let Some(data) = notifications.next().await {
            match handle_notification(mac, &data) {
                Some(record) => outcome.records.push(record),
                None => outcome.rejected += 1,
            }
        }
    };
    if timeout(window, collect).await.is_ok() {
        debug!("Notification stream of {} ended before the window", mac);
    }

    // Dropping the stream stops notifications
    debug!("Stopped notifications for {}", mac);
    Ok(outcome)
}

/// Connect to a monitor and collect its measurements
///
/// Reads the battery level, subscribes to Blood Pressure Measurement
/// notifications and decodes them for `window`, then disconnects.
///
/// # Arguments
/// * `adapter` - Powered Bluetooth adapter
/// * `address` - Device address
/// * `window` - How long to hold the connection open for notifications
///
/// # Returns
/// Battery level and decoded records, or error if the GATT session fails
pub async fn collect_readings(
    adapter: &bluer::Adapter,
    address: bluer::Address,
    window: Duration,
) -> Result<SessionOutcome, Box<dyn std::error::Error>> {
    let device = adapter.device(address)?;
    let mac = mask_mac(&address.to_string());

    info!("Connecting to {} to start notifications", mac);
    if !device.is_connected().await? {
        device.connect().await?;
    }

    let result = run_session(&device, &mac, window).await;

    if let Err(e) = device.disconnect().await {
        warn!("Failed to disconnect from {}: {}", mac, e);
    }

    if let Ok(outcome) = &result {
        info!(
            "Session with {} done: {} readings, {} rejected",
            mac,
            outcome.records.len(),
            outcome.rejected
        );
    }
    result
}
