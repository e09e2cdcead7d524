use log::{error, info, warn};
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::time::sleep;

use medisana_bp::bluetooth::scanner::{open_adapter, scan_for_devices};
use medisana_bp::bluetooth::session::collect_readings;
use medisana_bp::config::SensorConfig;
use medisana_bp::sensor::{sensors_for, Sensor};
use medisana_bp::state::DeviceState;
use medisana_bp::utils::{format_datetime, mask_mac};

fn log_summary(name: &str, state: &DeviceState, sensors: &[Sensor]) {
    info!("Summary for {} ({}):", name, mask_mac(state.address()));
    for sensor in sensors {
        match sensor.native_value() {
            Some(value) => info!(
                "  {}: {} {}",
                sensor.name(),
                value,
                sensor.unit().unwrap_or_default()
            ),
            None => info!("  {}: unknown", sensor.name()),
        }
    }
    if let Some(last_seen) = state.last_seen() {
        info!("  Last seen: {}", format_datetime(&last_seen));
    }
    info!("  Based on {} readings", state.len());
}

async fn main_loop(config: SensorConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting blood pressure monitor service");

    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };
    let adapter = open_adapter(&session).await?;

    let mut states: HashMap<String, DeviceState> = HashMap::new();
    let mut sensors: HashMap<String, Vec<Sensor>> = HashMap::new();

    loop {
        info!(
            "Starting scan at: {}",
            format_datetime(&OffsetDateTime::now_utc())
        );

        let devices = match scan_for_devices(&adapter, &config).await {
            Ok(devices) => devices,
            Err(e) => {
                error!("Scan failed: {}", e);
                sleep(config.poll_interval).await;
                continue;
            }
        };

        if devices.is_empty() {
            info!("No supported devices in range");
        }

        for device in devices {
            let state = states
                .entry(device.mac.clone())
                .or_insert_with(|| DeviceState::new(device.mac.clone()));
            state.set_rssi(device.rssi);

            let outcome =
                match collect_readings(&adapter, device.address, config.notification_window).await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("Session with {} failed: {}", mask_mac(&device.mac), e);
                        continue;
                    }
                };

            if outcome.battery.is_some() {
                state.set_battery(outcome.battery);
            }

            if outcome.records.is_empty() {
                warn!("No readings received from {}", mask_mac(&device.mac));
                continue;
            }

            for record in outcome.records {
                state.record(record);
            }

            let device_sensors = sensors
                .entry(device.mac.clone())
                .or_insert_with(|| sensors_for(&device.mac));
            for sensor in device_sensors.iter_mut() {
                sensor.handle_update(state);
            }

            log_summary(&device.name, state, device_sensors);
        }

        sleep(config.poll_interval).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match SensorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
