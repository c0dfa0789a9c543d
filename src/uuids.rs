//! Protocol UUID constants for the FG detector
//!
//! All services and characteristics the firmware exposes, in 128-bit
//! Bluetooth base-UUID form, plus human-readable labels for diagnostics.

use uuid::Uuid;

/// Advertisement name prefix that identifies an FG detector.
/// Matched case-insensitively; fixed by the protocol, not configurable.
pub const DEVICE_NAME_PREFIX: &str = "fg";

// Generic Access Service (0x1800)
pub const GENERIC_ACCESS_SERVICE: Uuid = Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);
pub const DEVICE_NAME: Uuid = Uuid::from_u128(0x00002a00_0000_1000_8000_00805f9b34fb);
pub const APPEARANCE: Uuid = Uuid::from_u128(0x00002a01_0000_1000_8000_00805f9b34fb);

// Generic Attribute Service (0x1801), discovery only
pub const GENERIC_ATTRIBUTE_SERVICE: Uuid = Uuid::from_u128(0x00001801_0000_1000_8000_00805f9b34fb);
pub const SERVICE_CHANGED: Uuid = Uuid::from_u128(0x00002a05_0000_1000_8000_00805f9b34fb);

// Device Information Service (0x180A)
pub const DEVICE_INFORMATION_SERVICE: Uuid =
    Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);
pub const MANUFACTURER_NAME: Uuid = Uuid::from_u128(0x00002a29_0000_1000_8000_00805f9b34fb);
pub const MODEL_NUMBER: Uuid = Uuid::from_u128(0x00002a24_0000_1000_8000_00805f9b34fb);
pub const SERIAL_NUMBER: Uuid = Uuid::from_u128(0x00002a25_0000_1000_8000_00805f9b34fb);
pub const SYSTEM_ID: Uuid = Uuid::from_u128(0x00002a23_0000_1000_8000_00805f9b34fb);
// Not read by anything yet, kept so discovery diagnostics can label it
pub const PRESENTATION_FORMAT: Uuid = Uuid::from_u128(0x00002a3d_0000_1000_8000_00805f9b34fb);

// Alert Notification Service (0x1811)
pub const ALERT_NOTIFICATION_SERVICE: Uuid =
    Uuid::from_u128(0x00001811_0000_1000_8000_00805f9b34fb);
pub const ALERT_STATUS: Uuid = Uuid::from_u128(0x00002a3f_0000_1000_8000_00805f9b34fb);

// Environmental Sensing Service (0x181A)
pub const ENVIRONMENTAL_SENSING_SERVICE: Uuid =
    Uuid::from_u128(0x0000181a_0000_1000_8000_00805f9b34fb);
pub const METHANE: Uuid = Uuid::from_u128(0x00002bd1_0000_1000_8000_00805f9b34fb);
pub const TEMPERATURE: Uuid = Uuid::from_u128(0x00002a6e_0000_1000_8000_00805f9b34fb);
pub const MEASUREMENT_INTERVAL: Uuid = Uuid::from_u128(0x00002a21_0000_1000_8000_00805f9b34fb);

// Media Control Service (0x1848)
pub const MEDIA_CONTROL_SERVICE: Uuid = Uuid::from_u128(0x00001848_0000_1000_8000_00805f9b34fb);
pub const MEDIA_CONTROL_POINT: Uuid = Uuid::from_u128(0x00002ba4_0000_1000_8000_00805f9b34fb);

// Custom FG Settings Service
pub const FG_SETTINGS_SERVICE: Uuid = Uuid::from_u128(0x1b7e8251_2877_41c3_b46e_cf057c562024);
pub const FULL_SCALE: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078901);
pub const ALARM_LEVEL: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078902);
pub const WARN_LEVEL: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078903);
pub const LOWEST_LEVEL: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078904);
pub const RESPONSE_TIME: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078905);
pub const BLOCK_DELAY: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078906);
pub const SELECT_GAS_TYPE: Uuid = Uuid::from_u128(0x889bf2a8_f93f_4481_a67e_3b2f4a078907);

const SERVICE_LABELS: &[(Uuid, &str)] = &[
    (GENERIC_ACCESS_SERVICE, "Generic Access"),
    (GENERIC_ATTRIBUTE_SERVICE, "Generic Attribute"),
    (DEVICE_INFORMATION_SERVICE, "Device Information"),
    (ALERT_NOTIFICATION_SERVICE, "Alert Notification"),
    (ENVIRONMENTAL_SENSING_SERVICE, "Environmental Sensing"),
    (MEDIA_CONTROL_SERVICE, "Media Control"),
    (FG_SETTINGS_SERVICE, "FG Settings"),
];

const CHARACTERISTIC_LABELS: &[(Uuid, &str)] = &[
    (DEVICE_NAME, "Device Name"),
    (APPEARANCE, "Appearance"),
    (SERVICE_CHANGED, "Service Changed"),
    (MANUFACTURER_NAME, "Manufacturer Name"),
    (MODEL_NUMBER, "Model Number"),
    (SERIAL_NUMBER, "Serial Number"),
    (SYSTEM_ID, "System ID"),
    (PRESENTATION_FORMAT, "Presentation Format"),
    (ALERT_STATUS, "Alert Status"),
    (METHANE, "Methane Concentration"),
    (TEMPERATURE, "Temperature"),
    (MEASUREMENT_INTERVAL, "Measurement Interval"),
    (MEDIA_CONTROL_POINT, "Media Control Point"),
    (FULL_SCALE, "Full Scale"),
    (ALARM_LEVEL, "Alarm Level"),
    (WARN_LEVEL, "Warn Level"),
    (LOWEST_LEVEL, "Lowest Level"),
    (RESPONSE_TIME, "Response Time"),
    (BLOCK_DELAY, "Block Delay"),
    (SELECT_GAS_TYPE, "Select Gas Type"),
];

/// Human-readable name of a known service UUID
pub fn service_label(uuid: Uuid) -> Option<&'static str> {
    SERVICE_LABELS
        .iter()
        .find(|(u, _)| *u == uuid)
        .map(|(_, label)| *label)
}

/// Human-readable name of a known characteristic UUID
pub fn characteristic_label(uuid: Uuid) -> Option<&'static str> {
    CHARACTERISTIC_LABELS
        .iter()
        .find(|(u, _)| *u == uuid)
        .map(|(_, label)| *label)
}

/// True if an advertised device name identifies an FG detector
pub fn is_fg_device_name(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with(DEVICE_NAME_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_prefix_case_insensitive() {
        assert!(is_fg_device_name("fg-detector-01"));
        assert!(is_fg_device_name("FG Sensor"));
        assert!(is_fg_device_name("Fg"));
        assert!(!is_fg_device_name("f"));
        assert!(!is_fg_device_name("not-fg"));
        assert!(!is_fg_device_name(""));
    }

    #[test]
    fn test_labels() {
        assert_eq!(service_label(FG_SETTINGS_SERVICE), Some("FG Settings"));
        assert_eq!(characteristic_label(ALERT_STATUS), Some("Alert Status"));
        assert_eq!(characteristic_label(GENERIC_ACCESS_SERVICE), None);
    }

    #[test]
    fn test_base_uuid_form() {
        assert_eq!(
            DEVICE_NAME.to_string(),
            "00002a00-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            FG_SETTINGS_SERVICE.to_string(),
            "1b7e8251-2877-41c3-b46e-cf057c562024"
        );
    }
}
