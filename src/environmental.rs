//! Environmental Sensing service (0x181A): methane, temperature,
//! measurement interval
//!
//! Methane reads are big-endian but methane notifications decode
//! little-endian, same asymmetry as the alert status word. Preserved
//! as observed.

use std::sync::Arc;

use log::warn;

use crate::accessor;
use crate::link::CharacteristicAddress;
use crate::notify::{self, Subscription};
use crate::session::Session;
use crate::types::{TypedValue, ValueShape, WriteMode};
use crate::uuids;

const METHANE: CharacteristicAddress =
    CharacteristicAddress::new(uuids::ENVIRONMENTAL_SENSING_SERVICE, uuids::METHANE);
const TEMPERATURE: CharacteristicAddress =
    CharacteristicAddress::new(uuids::ENVIRONMENTAL_SENSING_SERVICE, uuids::TEMPERATURE);
const MEASUREMENT_INTERVAL: CharacteristicAddress = CharacteristicAddress::new(
    uuids::ENVIRONMENTAL_SENSING_SERVICE,
    uuids::MEASUREMENT_INTERVAL,
);

/// Valid measurement interval range in seconds
pub const MIN_MEASUREMENT_INTERVAL_SECS: u16 = 1;
pub const MAX_MEASUREMENT_INTERVAL_SECS: u16 = 60;

/// Methane concentration (%LEL raw units)
pub async fn read_methane(session: &Session) -> Option<u16> {
    accessor::read_u16_be(session, METHANE).await
}

/// Temperature in the device's raw units
pub async fn read_temperature(session: &Session) -> Option<u16> {
    accessor::read_u16_le(session, TEMPERATURE).await
}

/// Measurement interval in seconds
pub async fn read_measurement_interval(session: &Session) -> Option<u16> {
    accessor::read_u16_le(session, MEASUREMENT_INTERVAL).await
}

/// Write the measurement interval. Range checking lives here, not in
/// the accessor.
pub async fn write_measurement_interval(session: &Session, seconds: u16) -> bool {
    if !(MIN_MEASUREMENT_INTERVAL_SECS..=MAX_MEASUREMENT_INTERVAL_SECS).contains(&seconds) {
        warn!(
            "Measurement interval must be {}-{} s, got {}",
            MIN_MEASUREMENT_INTERVAL_SECS, MAX_MEASUREMENT_INTERVAL_SECS, seconds
        );
        return false;
    }
    accessor::write_u16_le(
        session,
        MEASUREMENT_INTERVAL,
        seconds,
        WriteMode::WithResponse,
    )
    .await
}

/// Subscribe to live methane updates (little-endian on the notify path)
pub async fn subscribe_methane<F>(
    session: &Arc<Session>,
    consumer: &str,
    on_value: F,
) -> Option<Subscription>
where
    F: Fn(u16) + Send + 'static,
{
    notify::subscribe(
        session,
        METHANE,
        ValueShape::U16Le,
        consumer,
        move |value| {
            if let TypedValue::U16(ppm) = value {
                on_value(ppm);
            }
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::fake::{FakeCharacteristic, FakeTransport};
    use crate::session::SessionManager;

    async fn connected(transport: FakeTransport) -> (Arc<FakeTransport>, Arc<Session>) {
        let transport = Arc::new(transport);
        let manager = SessionManager::new(transport.clone());
        let session = manager.connect().await.unwrap();
        (transport, session)
    }

    #[tokio::test]
    async fn test_methane_read_is_big_endian() {
        let transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")])
            .with_characteristic(
                METHANE,
                FakeCharacteristic {
                    value: vec![0x01, 0x2c],
                    ..Default::default()
                },
            );
        let (_, session) = connected(transport).await;
        assert_eq!(read_methane(&session).await, Some(300));
    }

    #[tokio::test]
    async fn test_interval_range_enforced_here() {
        let transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")]);
        let (transport, session) = connected(transport).await;

        assert!(!write_measurement_interval(&session, 0).await);
        assert!(!write_measurement_interval(&session, 61).await);
        assert!(transport.written(MEASUREMENT_INTERVAL).is_empty());

        assert!(write_measurement_interval(&session, 5).await);
        assert_eq!(
            transport.written(MEASUREMENT_INTERVAL),
            vec![(vec![0x05, 0x00], WriteMode::WithResponse)]
        );
    }
}
