/// Utility functions for formatting and log hygiene
use time::{format_description, OffsetDateTime, PrimitiveDateTime};

const DATETIME_FORMAT: &str = "[day].[month].[year] - [hour]:[minute]:[second]";

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse(DATETIME_FORMAT) {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Format a device timestamp (no offset) the same way as [`format_datetime`].
pub fn format_timestamp(dt: &PrimitiveDateTime) -> String {
    match format_description::parse(DATETIME_FORMAT) {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Mask a MAC address for logging, keeping the first three and last octet
///
/// Strings that are not six colon-separated parts are returned unchanged.
pub fn mask_mac(mac: &str) -> String {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return mac.to_string();
    }
    format!("{}:{}:{}:XX:XX:{}", parts[0], parts[1], parts[2], parts[5])
}

/// Lowercase hex dump of a payload for debug logging
pub fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
