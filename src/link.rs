//! Transport seam: traits the session layer drives the radio through
//!
//! The session manager, accessor, and subscription manager only ever talk
//! to `BleTransport` and `DeviceLink`, so everything above this seam is
//! testable without hardware. The bluer-backed implementation lives in
//! `bluez.rs`; the tests use the in-memory fake at the bottom of this file.

use std::pin::Pin;

use futures::Stream;
use serde::Serialize;
use uuid::Uuid;

use crate::types::{Result, WriteMode};

/// A peripheral advertisement seen during scanning
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub address: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// Immutable (service, characteristic) UUID pair, the lookup key for
/// every read, write, and notify operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CharacteristicAddress {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl CharacteristicAddress {
    pub const fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

/// Supported operation set of one characteristic, probed once during
/// discovery and read-only afterwards
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CharacteristicCapabilities {
    pub readable: bool,
    pub writable_with_response: bool,
    pub writable_without_response: bool,
    pub notifiable: bool,
    pub indicatable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub label: Option<&'static str>,
    pub capabilities: CharacteristicCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub label: Option<&'static str>,
    pub characteristics: Vec<CharacteristicInfo>,
}

pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Advertisement> + Send>>;
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Entry point to the radio: scanning and connecting
#[async_trait::async_trait]
pub trait BleTransport: Send + Sync {
    /// Begin passive discovery. Dropping the returned stream stops the
    /// scan, so both outcomes of the scan race stop it exactly once.
    async fn scan(&self) -> Result<AdvertisementStream>;

    /// Establish the physical link to a peripheral by address
    async fn connect(&self, address: &str) -> Result<Box<dyn DeviceLink>>;
}

/// One live physical link to a peripheral
#[async_trait::async_trait]
pub trait DeviceLink: Send + Sync {
    fn address(&self) -> &str;

    fn name(&self) -> Option<&str>;

    /// Enumerate all services and characteristics with their supported
    /// operation sets. Exposed for diagnostics; operations are issued by
    /// known address regardless of this table.
    async fn discover_capabilities(&self) -> Result<Vec<ServiceInfo>>;

    async fn read(&self, address: CharacteristicAddress) -> Result<Vec<u8>>;

    async fn write(
        &self,
        address: CharacteristicAddress,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<()>;

    async fn subscribe(&self, address: CharacteristicAddress) -> Result<NotificationStream>;

    async fn disconnect(&self) -> Result<()>;
}
