/// Bluetooth Low Energy discovery of supported blood pressure monitors
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::time::sleep;

use crate::bluetooth::matcher::SupportedDeviceCriteria;
use crate::config::SensorConfig;
use crate::models::DeviceIdentity;
use crate::utils::mask_mac;

const DEFAULT_DEVICE_NAME: &str = "Medisana BP";

/// A supported device seen during a scan
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub address: bluer::Address,
    pub mac: String,
    pub name: String,
    pub identity: DeviceIdentity,
    pub rssi: Option<i16>,
}

/// Get the default adapter of a session and make sure it is powered on
pub async fn open_adapter(
    session: &bluer::Session,
) -> Result<bluer::Adapter, Box<dyn std::error::Error>> {
    let adapter = match session.default_adapter().await {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get default Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e.into());
    }

    Ok(adapter)
}

/// Read the advertisement metadata BlueZ holds for a device
pub async fn device_identity(device: &bluer::Device) -> Result<DeviceIdentity, bluer::Error> {
    let name = device.name().await?;
    let manufacturer_data = device.manufacturer_data().await?.unwrap_or_default();
    let service_uuids = device
        .uuids()
        .await?
        .unwrap_or_default()
        .iter()
        .map(|uuid| uuid.to_string())
        .collect();

    Ok(DeviceIdentity {
        name,
        manufacturer_data,
        service_uuids,
    })
}

/// Scan for supported blood pressure monitors
///
/// Runs LE discovery for the configured duration, then classifies every
/// device BlueZ knows about. Devices listed in the configuration are accepted
/// even if their advertisement does not match.
///
/// # Arguments
/// * `adapter` - Powered Bluetooth adapter
/// * `config` - Configuration with scan duration and explicit devices
///
/// # Returns
/// Result containing the supported devices found, or error if scan fails
pub async fn scan_for_devices(
    adapter: &bluer::Adapter,
    config: &SensorConfig,
) -> Result<Vec<DiscoveredDevice>, Box<dyn std::error::Error>> {
    let criteria = SupportedDeviceCriteria::medisana();
    let mut found = Vec::new();

    // Configure discovery filter for Low Energy devices only
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: false,
        ..Default::default()
    };

    // Apply the discovery filter (warn if it fails, but continue)
    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    // Start device discovery in background
    let discovery_handle = match adapter.discover_devices().await {
        Ok(discovery_stream) => tokio::spawn(async move {
            let mut stream = discovery_stream;
            while let Some(event) = stream.next().await {
                debug!("Discovery event: {:?}", event);
            }
        }),
        Err(e) => {
            error!("Failed to start device discovery: {}", e);
            return Err(e.into());
        }
    };

    sleep(config.scan_duration).await;

    discovery_handle.abort();

    let addresses = match adapter.device_addresses().await {
        Ok(addresses) => addresses,
        Err(e) => {
            error!("Failed to get device addresses: {}", e);
            return Err(e.into());
        }
    };

    for address in addresses {
        let device = match adapter.device(address) {
            Ok(device) => device,
            Err(_) => continue,
        };

        let mac = address.to_string().to_uppercase();

        let identity = match device_identity(&device).await {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Failed to read advertisement of {}: {}", mask_mac(&mac), e);
                continue;
            }
        };

        if !criteria.is_supported(&identity) && !config.is_configured(&mac) {
            continue;
        }

        let rssi = device.rssi().await.unwrap_or(None);
        let name = config
            .devices
            .get(&mac)
            .cloned()
            .or_else(|| identity.name.clone())
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());

        info!(
            "Found supported device {} ({}), rssi={:?}",
            mask_mac(&mac),
            name,
            rssi
        );

        found.push(DiscoveredDevice {
            address,
            mac,
            name,
            identity,
            rssi,
        });
    }

    Ok(found)
}
