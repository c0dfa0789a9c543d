//! BlueZ-backed transport implementation
//!
//! Real Bluetooth via bluer. `BluezTransport` covers adapter access and
//! scanning, `BluezLink` one connected peripheral. The powered-adapter
//! check in `new()` is the precondition gate: `connect()` is only
//! reachable after it succeeds.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use bluer::gatt::remote::{Characteristic, CharacteristicWriteRequest};
use bluer::gatt::WriteOp;
use bluer::{Adapter, AdapterEvent, Address, Device};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::time::sleep;

use crate::link::{
    Advertisement, AdvertisementStream, BleTransport, CharacteristicAddress,
    CharacteristicCapabilities, CharacteristicInfo, DeviceLink, NotificationStream, ServiceInfo,
};
use crate::types::{FgError, Result, WriteMode};
use crate::uuids;

/// Maximum wait for BlueZ to resolve the GATT database after connect
const SERVICES_RESOLVED_TIMEOUT_SECS: u32 = 30;

pub struct BluezTransport {
    adapter: Adapter,
}

impl BluezTransport {
    /// Open the default adapter. Fails if Bluetooth is unavailable or
    /// powered off, so callers never reach `connect()` without a radio.
    pub async fn new() -> Result<Self> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        if !adapter.is_powered().await? {
            return Err(FgError::AdapterNotPowered);
        }
        info!("Using Bluetooth adapter {}", adapter.name());
        Ok(Self { adapter })
    }
}

#[async_trait::async_trait]
impl BleTransport for BluezTransport {
    async fn scan(&self) -> Result<AdvertisementStream> {
        let events = self.adapter.discover_devices().await?;
        let adapter = self.adapter.clone();
        // Dropping the stream drops the discovery session, which stops
        // the scan; both outcomes of the scan race go through that drop.
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                match event {
                    AdapterEvent::DeviceAdded(address) => {
                        let device = adapter.device(address).ok()?;
                        let name = device.name().await.ok().flatten();
                        let rssi = device.rssi().await.ok().flatten();
                        Some(Advertisement {
                            address: address.to_string(),
                            name,
                            rssi,
                        })
                    }
                    _ => None,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn connect(&self, address: &str) -> Result<Box<dyn DeviceLink>> {
        let address: Address = address
            .parse()
            .map_err(|_| FgError::Connection(format!("invalid address: {}", address)))?;
        let device = self.adapter.device(address)?;

        if device.is_connected().await? {
            debug!("Device {} already connected", address);
        } else {
            device.connect().await?;
        }
        // Let the link settle before the first GATT exchange
        sleep(Duration::from_millis(500)).await;

        let name = device.name().await?;
        Ok(Box::new(BluezLink {
            address: address.to_string(),
            name,
            device,
            characteristics: StdMutex::new(HashMap::new()),
        }))
    }
}

pub struct BluezLink {
    address: String,
    name: Option<String>,
    device: Device,
    characteristics: StdMutex<HashMap<CharacteristicAddress, Characteristic>>,
}

impl BluezLink {
    async fn wait_services_resolved(&self) -> Result<()> {
        let mut attempts = 0;
        loop {
            match self.device.is_services_resolved().await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    attempts += 1;
                    if attempts >= SERVICES_RESOLVED_TIMEOUT_SECS {
                        return Err(FgError::Discovery(
                            "timeout waiting for GATT services to resolve".into(),
                        ));
                    }
                    sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    // Some BlueZ versions refuse the query; give the stack
                    // a moment and try the enumeration anyway
                    warn!("Could not check services-resolved status: {}", e);
                    sleep(Duration::from_secs(2)).await;
                    return Ok(());
                }
            }
        }
    }

    /// Look up a characteristic by address, walking the remote GATT tree
    /// on a cache miss. Operations are issued by known address, so this
    /// works even when discovery diagnostics were never requested.
    async fn resolve(&self, address: CharacteristicAddress) -> Result<Characteristic> {
        if let Some(ch) = self.characteristics.lock().unwrap().get(&address) {
            return Ok(ch.clone());
        }
        self.wait_services_resolved().await?;
        for service in self.device.services().await? {
            if service.uuid().await? != address.service {
                continue;
            }
            for characteristic in service.characteristics().await? {
                if characteristic.uuid().await? == address.characteristic {
                    self.characteristics
                        .lock()
                        .unwrap()
                        .insert(address, characteristic.clone());
                    return Ok(characteristic);
                }
            }
        }
        Err(FgError::Discovery(format!(
            "characteristic {} not found in service {}",
            address.characteristic, address.service
        )))
    }
}

#[async_trait::async_trait]
impl DeviceLink for BluezLink {
    fn address(&self) -> &str {
        &self.address
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn discover_capabilities(&self) -> Result<Vec<ServiceInfo>> {
        self.wait_services_resolved().await?;

        let mut result = Vec::new();
        for service in self.device.services().await? {
            let service_uuid = service.uuid().await?;
            let mut characteristics = Vec::new();
            for characteristic in service.characteristics().await? {
                let uuid = characteristic.uuid().await?;
                let flags = characteristic.flags().await?;
                let capabilities = CharacteristicCapabilities {
                    readable: flags.read,
                    writable_with_response: flags.write,
                    writable_without_response: flags.write_without_response,
                    notifiable: flags.notify,
                    indicatable: flags.indicate,
                };
                debug!(
                    "  {} ({}): {:?}",
                    uuid,
                    uuids::characteristic_label(uuid).unwrap_or("?"),
                    capabilities
                );
                self.characteristics.lock().unwrap().insert(
                    CharacteristicAddress::new(service_uuid, uuid),
                    characteristic.clone(),
                );
                characteristics.push(CharacteristicInfo {
                    uuid,
                    label: uuids::characteristic_label(uuid),
                    capabilities,
                });
            }
            result.push(ServiceInfo {
                uuid: service_uuid,
                label: uuids::service_label(service_uuid),
                characteristics,
            });
        }
        Ok(result)
    }

    async fn read(&self, address: CharacteristicAddress) -> Result<Vec<u8>> {
        let characteristic = self.resolve(address).await?;
        Ok(characteristic.read().await?)
    }

    async fn write(
        &self,
        address: CharacteristicAddress,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<()> {
        let characteristic = self.resolve(address).await?;
        let op_type = match mode {
            WriteMode::WithResponse => WriteOp::Request,
            WriteMode::WithoutResponse => WriteOp::Command,
        };
        characteristic
            .write_ext(
                data,
                &CharacteristicWriteRequest {
                    op_type,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| FgError::WriteRejected(e.to_string()))
    }

    async fn subscribe(&self, address: CharacteristicAddress) -> Result<NotificationStream> {
        let characteristic = self.resolve(address).await?;
        let stream = characteristic.notify().await?;
        Ok(Box::pin(stream))
    }

    async fn disconnect(&self) -> Result<()> {
        self.device.disconnect().await?;
        Ok(())
    }
}
