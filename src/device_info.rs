//! Device Information service (0x180A)

use log::info;
use serde::Serialize;

use crate::accessor;
use crate::codec;
use crate::link::CharacteristicAddress;
use crate::session::Session;
use crate::uuids;

const MANUFACTURER: CharacteristicAddress =
    CharacteristicAddress::new(uuids::DEVICE_INFORMATION_SERVICE, uuids::MANUFACTURER_NAME);
const MODEL_NUMBER: CharacteristicAddress =
    CharacteristicAddress::new(uuids::DEVICE_INFORMATION_SERVICE, uuids::MODEL_NUMBER);
const SERIAL_NUMBER: CharacteristicAddress =
    CharacteristicAddress::new(uuids::DEVICE_INFORMATION_SERVICE, uuids::SERIAL_NUMBER);
const SYSTEM_ID: CharacteristicAddress =
    CharacteristicAddress::new(uuids::DEVICE_INFORMATION_SERVICE, uuids::SYSTEM_ID);

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceInformation {
    pub manufacturer: Option<String>,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    /// System ID rendered as colon-separated hex (8 bytes on the wire)
    pub system_id: Option<String>,
}

/// Read the device information characteristics. A characteristic that
/// fails to read leaves its field `None` rather than failing the whole
/// snapshot.
pub async fn read_device_information(session: &Session) -> DeviceInformation {
    info!("Reading device information...");
    let manufacturer = accessor::read_string(session, MANUFACTURER).await;
    let model_number = accessor::read_string(session, MODEL_NUMBER).await;
    let serial_number = accessor::read_string(session, SERIAL_NUMBER).await;
    let system_id = accessor::read_raw(session, SYSTEM_ID)
        .await
        .map(|bytes| codec::format_system_id(&bytes));

    DeviceInformation {
        manufacturer,
        model_number,
        serial_number,
        system_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::fake::{FakeCharacteristic, FakeTransport};
    use crate::session::SessionManager;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_partial_failure_keeps_other_fields() {
        let transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")])
            .with_characteristic(
                MANUFACTURER,
                FakeCharacteristic {
                    value: b"Acme Sensors".to_vec(),
                    ..Default::default()
                },
            )
            .with_characteristic(
                SYSTEM_ID,
                FakeCharacteristic {
                    value: vec![0x00, 0x1b, 0xdc, 0x06, 0x30, 0x39, 0xaf, 0xfe],
                    ..Default::default()
                },
            );
        let manager = SessionManager::new(Arc::new(transport));
        let session = manager.connect().await.unwrap();

        let info = read_device_information(&session).await;
        assert_eq!(info.manufacturer.as_deref(), Some("Acme Sensors"));
        assert_eq!(info.model_number, None);
        assert_eq!(info.serial_number, None);
        assert_eq!(info.system_id.as_deref(), Some("00:1b:dc:06:30:39:af:fe"));
    }
}
