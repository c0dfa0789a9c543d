//! Generic Access service (0x1800)

use serde::Serialize;

use crate::accessor;
use crate::link::CharacteristicAddress;
use crate::session::Session;
use crate::uuids;

const DEVICE_NAME: CharacteristicAddress =
    CharacteristicAddress::new(uuids::GENERIC_ACCESS_SERVICE, uuids::DEVICE_NAME);
const APPEARANCE: CharacteristicAddress =
    CharacteristicAddress::new(uuids::GENERIC_ACCESS_SERVICE, uuids::APPEARANCE);

#[derive(Debug, Clone, Serialize)]
pub struct GenericAccessInfo {
    pub device_name: String,
    /// Appearance code, u16 little-endian; absence is tolerated
    pub appearance: Option<u16>,
}

pub async fn read_generic_access(session: &Session) -> GenericAccessInfo {
    let device_name = accessor::read_string(session, DEVICE_NAME)
        .await
        .unwrap_or_else(|| "Unknown".to_string());
    let appearance = accessor::read_u16_le(session, APPEARANCE).await;

    GenericAccessInfo {
        device_name,
        appearance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::fake::{FakeCharacteristic, FakeTransport};
    use crate::session::SessionManager;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_name_reads_as_unknown() {
        let transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")])
            .with_characteristic(
                APPEARANCE,
                FakeCharacteristic {
                    value: vec![0x41, 0x03],
                    ..Default::default()
                },
            );
        let manager = SessionManager::new(Arc::new(transport));
        let session = manager.connect().await.unwrap();

        let info = read_generic_access(&session).await;
        assert_eq!(info.device_name, "Unknown");
        assert_eq!(info.appearance, Some(0x0341));
    }

    #[tokio::test]
    async fn test_name_and_appearance() {
        let transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")])
            .with_characteristic(
                DEVICE_NAME,
                FakeCharacteristic {
                    value: b"fg-detector-01".to_vec(),
                    ..Default::default()
                },
            );
        let manager = SessionManager::new(Arc::new(transport));
        let session = manager.connect().await.unwrap();

        let info = read_generic_access(&session).await;
        assert_eq!(info.device_name, "fg-detector-01");
        assert_eq!(info.appearance, None);
    }
}
