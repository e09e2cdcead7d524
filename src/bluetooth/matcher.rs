/// Classification of advertisements as supported blood pressure monitors
use std::collections::HashSet;

use crate::models::DeviceIdentity;

// Medisana advertisement constants
pub const SUPPORTED_NAME_PREFIX: &str = "1872B";
pub const SUPPORTED_MANUFACTURER_IDS: [u16; 2] = [18498, 31256];
pub const SUPPORTED_SERVICE_UUIDS: [&str; 4] = [
    "0000fcf1-0000-1000-8000-00805f9b34fb", // Vendor-specific
    "0000fd69-0000-1000-8000-00805f9b34fb", // Vendor-specific
    "00001810-0000-1000-8000-00805f9b34fb", // Blood Pressure service
    "00002a35-0000-1000-8000-00805f9b34fb", // Blood Pressure Measurement characteristic
];

/// What an advertisement must show to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedDeviceCriteria {
    name_prefix: String,
    manufacturer_ids: HashSet<u16>,
    service_uuids: HashSet<String>,
}

impl SupportedDeviceCriteria {
    pub fn new<I, S>(name_prefix: &str, manufacturer_ids: &[u16], service_uuids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SupportedDeviceCriteria {
            name_prefix: name_prefix.to_string(),
            manufacturer_ids: manufacturer_ids.iter().copied().collect(),
            service_uuids: service_uuids
                .into_iter()
                .map(|uuid| uuid.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Criteria for the Medisana monitors handled by this crate.
    pub fn medisana() -> Self {
        Self::new(
            SUPPORTED_NAME_PREFIX,
            &SUPPORTED_MANUFACTURER_IDS,
            SUPPORTED_SERVICE_UUIDS,
        )
    }

    /// True if the name, a manufacturer id or a service UUID matches.
    ///
    /// Names match case-sensitively by prefix; UUIDs match ignoring case.
    pub fn is_supported(&self, identity: &DeviceIdentity) -> bool {
        let name_matches = identity
            .name
            .as_deref()
            .is_some_and(|name| name.starts_with(&self.name_prefix));

        name_matches
            || identity
                .manufacturer_data
                .keys()
                .any(|id| self.manufacturer_ids.contains(id))
            || identity
                .service_uuids
                .iter()
                .any(|uuid| self.service_uuids.contains(&uuid.to_lowercase()))
    }
}

impl Default for SupportedDeviceCriteria {
    fn default() -> Self {
        Self::medisana()
    }
}

/// Check an advertisement against the Medisana criteria.
pub fn is_supported(identity: &DeviceIdentity) -> bool {
    SupportedDeviceCriteria::medisana().is_supported(identity)
}
