//! Typed characteristic accessor
//!
//! One read or write per call against the live session, decoded and
//! encoded through the transport codec. Failures are recovered here:
//! the cause is logged with enough context to tell "no device" from
//! "device rejected" from "malformed payload", but every caller just
//! sees `None` or `false`. Range and validity rules belong to the
//! calling service modules, not here.

use log::{error, warn};

use crate::codec;
use crate::link::CharacteristicAddress;
use crate::session::Session;
use crate::types::{FgError, TypedValue, ValueShape, WriteMode};
use crate::uuids;

fn label(address: CharacteristicAddress) -> String {
    uuids::characteristic_label(address.characteristic)
        .map(str::to_string)
        .unwrap_or_else(|| address.characteristic.to_string())
}

/// Read and decode one characteristic according to its declared shape
pub async fn read_typed(
    session: &Session,
    address: CharacteristicAddress,
    shape: ValueShape,
) -> Option<TypedValue> {
    let bytes = match session.read(address).await {
        Ok(bytes) => bytes,
        Err(FgError::NoDevice) => {
            warn!("Read of {}: no active device", label(address));
            return None;
        }
        Err(e) => {
            error!("Device rejected read of {}: {}", label(address), e);
            return None;
        }
    };
    match codec::decode_value(shape, &bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(
                "Malformed {} payload from {} ({} bytes): {}",
                shape,
                label(address),
                bytes.len(),
                e
            );
            None
        }
    }
}

pub async fn read_string(session: &Session, address: CharacteristicAddress) -> Option<String> {
    read_typed(session, address, ValueShape::Utf8Text)
        .await
        .and_then(|v| v.as_text().map(str::to_string))
}

pub async fn read_u8(session: &Session, address: CharacteristicAddress) -> Option<u8> {
    read_typed(session, address, ValueShape::U8)
        .await
        .and_then(|v| v.as_u8())
}

pub async fn read_u16_be(session: &Session, address: CharacteristicAddress) -> Option<u16> {
    read_typed(session, address, ValueShape::U16Be)
        .await
        .and_then(|v| v.as_u16())
}

pub async fn read_u16_le(session: &Session, address: CharacteristicAddress) -> Option<u16> {
    read_typed(session, address, ValueShape::U16Le)
        .await
        .and_then(|v| v.as_u16())
}

/// Raw read, for characteristics with no fixed shape (System ID)
pub async fn read_raw(session: &Session, address: CharacteristicAddress) -> Option<Vec<u8>> {
    match session.read(address).await {
        Ok(bytes) if bytes.is_empty() => {
            error!("Empty payload from {}", label(address));
            None
        }
        Ok(bytes) => Some(bytes),
        Err(FgError::NoDevice) => {
            warn!("Read of {}: no active device", label(address));
            None
        }
        Err(e) => {
            error!("Device rejected read of {}: {}", label(address), e);
            None
        }
    }
}

pub async fn write_raw(
    session: &Session,
    address: CharacteristicAddress,
    data: &[u8],
    mode: WriteMode,
) -> bool {
    match session.write(address, data, mode).await {
        Ok(()) => true,
        Err(FgError::NoDevice) => {
            warn!("Write to {}: no active device", label(address));
            false
        }
        Err(e) => {
            error!("Write to {} {} failed: {}", label(address), mode, e);
            false
        }
    }
}

/// Encode and write one characteristic according to its declared shape
pub async fn write_typed(
    session: &Session,
    address: CharacteristicAddress,
    shape: ValueShape,
    value: &TypedValue,
    mode: WriteMode,
) -> bool {
    let data = match codec::encode_value(shape, value) {
        Ok(data) => data,
        Err(e) => {
            error!("Cannot encode value for {}: {}", label(address), e);
            return false;
        }
    };
    write_raw(session, address, &data, mode).await
}

pub async fn write_u8(
    session: &Session,
    address: CharacteristicAddress,
    value: u8,
    mode: WriteMode,
) -> bool {
    write_raw(session, address, &codec::encode_u8(value), mode).await
}

pub async fn write_u16_be(
    session: &Session,
    address: CharacteristicAddress,
    value: u16,
    mode: WriteMode,
) -> bool {
    write_raw(session, address, &codec::encode_u16_be(value), mode).await
}

pub async fn write_u16_le(
    session: &Session,
    address: CharacteristicAddress,
    value: u16,
    mode: WriteMode,
) -> bool {
    write_raw(session, address, &codec::encode_u16_le(value), mode).await
}

pub async fn write_string(
    session: &Session,
    address: CharacteristicAddress,
    value: &str,
    mode: WriteMode,
) -> bool {
    write_raw(session, address, &codec::encode_string(value), mode).await
}

/// Two-step write policy: attempt with response, retry once without.
/// Bounded and observable; only the passkey path uses it.
pub async fn write_with_fallback(
    session: &Session,
    address: CharacteristicAddress,
    data: &[u8],
) -> bool {
    match session.write(address, data, WriteMode::WithResponse).await {
        Ok(()) => true,
        Err(FgError::NoDevice) => {
            warn!("Write to {}: no active device", label(address));
            false
        }
        Err(e) => {
            warn!(
                "Write to {} with response failed ({}), retrying without response",
                label(address),
                e
            );
            match session
                .write(address, data, WriteMode::WithoutResponse)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    error!("Write to {} without response failed: {}", label(address), e);
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::fake::{FakeCharacteristic, FakeTransport};
    use crate::session::SessionManager;
    use crate::uuids;
    use std::sync::Arc;

    const METHANE: CharacteristicAddress =
        CharacteristicAddress::new(uuids::ENVIRONMENTAL_SENSING_SERVICE, uuids::METHANE);
    const GAS_TYPE: CharacteristicAddress =
        CharacteristicAddress::new(uuids::FG_SETTINGS_SERVICE, uuids::SELECT_GAS_TYPE);

    async fn ready_session(
        transport: FakeTransport,
    ) -> (Arc<FakeTransport>, Arc<crate::session::Session>) {
        let transport = Arc::new(transport);
        let manager = SessionManager::new(transport.clone());
        let session = manager.connect().await.expect("fake connect");
        (transport, session)
    }

    fn fg_transport() -> FakeTransport {
        FakeTransport::new(vec![FakeTransport::adv("fg-unit")])
    }

    #[tokio::test]
    async fn test_read_u16_both_orders() {
        let transport = fg_transport().with_characteristic(
            METHANE,
            FakeCharacteristic {
                value: vec![0x01, 0x02],
                ..Default::default()
            },
        );
        let (_, session) = ready_session(transport).await;

        assert_eq!(read_u16_be(&session, METHANE).await, Some(0x0102));
        assert_eq!(read_u16_le(&session, METHANE).await, Some(0x0201));
    }

    #[tokio::test]
    async fn test_short_payload_reads_as_none() {
        let transport = fg_transport().with_characteristic(
            METHANE,
            FakeCharacteristic {
                value: vec![0x01],
                ..Default::default()
            },
        );
        let (_, session) = ready_session(transport).await;

        assert_eq!(read_u16_be(&session, METHANE).await, None);
        // The single byte is still a valid u8
        assert_eq!(read_u8(&session, METHANE).await, Some(0x01));
    }

    #[tokio::test]
    async fn test_unknown_characteristic_reads_as_none() {
        let (_, session) = ready_session(fg_transport()).await;
        assert_eq!(read_u16_be(&session, METHANE).await, None);
    }

    #[tokio::test]
    async fn test_read_string() {
        let transport = fg_transport().with_characteristic(
            METHANE,
            FakeCharacteristic {
                value: b"Acme Sensors".to_vec(),
                ..Default::default()
            },
        );
        let (_, session) = ready_session(transport).await;
        assert_eq!(
            read_string(&session, METHANE).await.as_deref(),
            Some("Acme Sensors")
        );
    }

    #[tokio::test]
    async fn test_write_records_mode() {
        let (transport, session) = ready_session(fg_transport()).await;

        assert!(write_u16_le(&session, METHANE, 0x1234, WriteMode::WithResponse).await);
        let writes = transport.written(METHANE);
        assert_eq!(
            writes,
            vec![(vec![0x34, 0x12], WriteMode::WithResponse)]
        );
    }

    #[tokio::test]
    async fn test_write_fallback_order() {
        let transport = fg_transport().with_characteristic(
            GAS_TYPE,
            FakeCharacteristic {
                reject_with_response: true,
                ..Default::default()
            },
        );
        let (transport, session) = ready_session(transport).await;

        assert!(write_with_fallback(&session, GAS_TYPE, b"123456").await);
        let writes = transport.written(GAS_TYPE);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1, WriteMode::WithResponse);
        assert_eq!(writes[1].1, WriteMode::WithoutResponse);
    }

    #[tokio::test]
    async fn test_write_without_fallback_is_single_attempt() {
        let transport = fg_transport().with_characteristic(
            GAS_TYPE,
            FakeCharacteristic {
                reject_with_response: true,
                ..Default::default()
            },
        );
        let (transport, session) = ready_session(transport).await;

        assert!(!write_u16_be(&session, GAS_TYPE, 7, WriteMode::WithResponse).await);
        assert_eq!(transport.written(GAS_TYPE).len(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_write_fails() {
        let transport = Arc::new(fg_transport());
        let manager = SessionManager::new(transport.clone());
        let session = manager.connect().await.unwrap();
        manager.disconnect().await;

        assert!(!write_u16_le(&session, METHANE, 1, WriteMode::WithResponse).await);
        assert!(read_u16_le(&session, METHANE).await.is_none());
        assert!(transport.written(METHANE).is_empty());
    }
}
