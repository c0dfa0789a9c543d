//! Device session manager
//!
//! Owns the scan -> connect -> discover -> ready -> disconnect state machine
//! for the single FG peripheral. Exactly one live `Session` exists at any
//! time and the manager is its sole mutator; everything above shares it
//! read-only behind an `Arc`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::link::{
    BleTransport, CharacteristicAddress, DeviceLink, NotificationStream, ServiceInfo,
};
use crate::types::{FgError, Result, SessionState, WriteMode};
use crate::uuids;

/// Hard deadline for the first matching advertisement
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between disconnect and reconnect during a forced GATT refresh,
/// long enough for the platform to release its cached table
pub const GATT_REFRESH_BACKOFF: Duration = Duration::from_secs(1);

type SubscriptionKey = (CharacteristicAddress, String);

/// The single logical connection to one peripheral
///
/// Holds the physical link, the capability table probed during discovery,
/// a closed flag every dependent operation races against, and the GATT
/// operation lock that keeps one transaction in flight at a time.
pub struct Session {
    address: String,
    name: Option<String>,
    services: Vec<ServiceInfo>,
    link: Box<dyn DeviceLink>,
    closed: watch::Sender<bool>,
    op_lock: Mutex<()>,
    subscriptions: StdMutex<HashMap<SubscriptionKey, JoinHandle<()>>>,
}

impl Session {
    fn new(link: Box<dyn DeviceLink>, services: Vec<ServiceInfo>) -> Arc<Self> {
        let address = link.address().to_string();
        let name = link.name().map(str::to_string);
        let (closed, _) = watch::channel(false);
        Arc::new(Self {
            address,
            name,
            services,
            link,
            closed,
            op_lock: Mutex::new(()),
            subscriptions: StdMutex::new(HashMap::new()),
        })
    }

    /// Peripheral address, the session's connection identifier
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Capability table recorded during discovery. Diagnostics only;
    /// operations are issued by known address regardless of it.
    pub fn services(&self) -> &[ServiceInfo] {
        &self.services
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub(crate) fn closed_watch(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    pub(crate) async fn read(&self, address: CharacteristicAddress) -> Result<Vec<u8>> {
        let _op = self.op_lock.lock().await;
        if self.is_closed() {
            return Err(FgError::NoDevice);
        }
        let mut closed = self.closed.subscribe();
        // A disconnect must resolve pending calls, never leave them hanging
        tokio::select! {
            res = self.link.read(address) => res,
            _ = closed.wait_for(|c| *c) => Err(FgError::NoDevice),
        }
    }

    pub(crate) async fn write(
        &self,
        address: CharacteristicAddress,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<()> {
        let _op = self.op_lock.lock().await;
        if self.is_closed() {
            return Err(FgError::NoDevice);
        }
        let mut closed = self.closed.subscribe();
        tokio::select! {
            res = self.link.write(address, data, mode) => res,
            _ = closed.wait_for(|c| *c) => Err(FgError::NoDevice),
        }
    }

    pub(crate) async fn start_notify(
        &self,
        address: CharacteristicAddress,
    ) -> Result<NotificationStream> {
        // Subscription setup is a GATT transaction too
        let _op = self.op_lock.lock().await;
        if self.is_closed() {
            return Err(FgError::NoDevice);
        }
        self.link.subscribe(address).await
    }

    pub(crate) fn has_subscription(&self, address: CharacteristicAddress, consumer: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&(address, consumer.to_string()))
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub(crate) fn register_subscription(
        &self,
        address: CharacteristicAddress,
        consumer: &str,
        task: JoinHandle<()>,
    ) -> bool {
        let mut subs = self.subscriptions.lock().unwrap();
        match subs.entry((address, consumer.to_string())) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_finished() {
                    entry.insert(task);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(task);
                true
            }
        }
    }

    pub(crate) fn remove_subscription(&self, address: CharacteristicAddress, consumer: &str) {
        self.subscriptions
            .lock()
            .unwrap()
            .remove(&(address, consumer.to_string()));
    }

    /// Flip the closed flag, join every live subscription task so no
    /// callback fires after this returns, then release the physical link
    async fn close(&self) {
        self.closed.send_replace(true);
        let tasks: Vec<JoinHandle<()>> = self
            .subscriptions
            .lock()
            .unwrap()
            .drain()
            .map(|(_, task)| task)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                debug!("Subscription task ended abnormally: {}", e);
            }
        }
        if let Err(e) = self.link.disconnect().await {
            // Best effort: the session is gone either way
            warn!("Link disconnect failed: {}", e);
        }
    }
}

/// Process-wide owner of the single device session
pub struct SessionManager {
    transport: Arc<dyn BleTransport>,
    state: StdMutex<SessionState>,
    // Doubles as the lifecycle lock serializing connect/refresh/disconnect
    session: Mutex<Option<Arc<Session>>>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn BleTransport>) -> Self {
        Self {
            transport,
            state: StdMutex::new(SessionState::Idle),
            session: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    pub async fn session(&self) -> Option<Arc<Session>> {
        self.session.lock().await.clone()
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.lock().unwrap();
        if *current != state {
            debug!("Session state: {} -> {}", current, state);
            *current = state;
        }
    }

    /// Failed is per-attempt and always settles back to Idle
    fn fail(&self, what: &str, err: &FgError) {
        error!("{} failed: {}", what, err);
        self.set_state(SessionState::Failed);
        self.set_state(SessionState::Idle);
    }

    /// Scan for the first FG-named advertisement, connect, and discover
    /// capabilities. Returns the new session, or `None` with the cause
    /// logged. Refused while a session is already live.
    pub async fn connect(&self) -> Option<Arc<Session>> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            warn!("connect() refused: a session is already live, disconnect first");
            return None;
        }

        info!("🔍 Scanning for FG devices...");
        self.set_state(SessionState::Scanning);
        let mut scan = match self.transport.scan().await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail("Scan", &e);
                return None;
            }
        };

        // The deadline races the discovery stream; whichever settles first
        // wins. Dropping the stream stops the scan on both paths, so a
        // late match after the timeout is discarded, not acted upon.
        let matched = timeout(SCAN_TIMEOUT, async {
            while let Some(adv) = scan.next().await {
                match adv.name.as_deref() {
                    Some(name) if uuids::is_fg_device_name(name) => return Some(adv),
                    Some(name) => debug!("Ignoring {} ({})", name, adv.address),
                    None => debug!("Ignoring unnamed advertisement ({})", adv.address),
                }
            }
            None
        })
        .await;
        drop(scan);

        let adv = match matched {
            Ok(Some(adv)) => adv,
            Ok(None) => {
                self.fail("Scan", &FgError::Connection("advertisement stream ended".into()));
                return None;
            }
            Err(_) => {
                self.fail("Scan", &FgError::ScanTimeout);
                return None;
            }
        };
        info!(
            "✅ Found FG device: {} ({})",
            adv.name.as_deref().unwrap_or("?"),
            adv.address
        );

        match self.establish(&adv.address).await {
            Ok(session) => {
                info!("✅ Session ready: {}", session.address());
                *guard = Some(session.clone());
                self.set_state(SessionState::Ready);
                Some(session)
            }
            Err(e) => {
                self.fail("Connect", &e);
                None
            }
        }
    }

    /// Tear down the live session. Best effort, always ends in Idle.
    /// After this returns no pending call hangs and no subscription
    /// callback fires again, even if unsubscribe was never called.
    pub async fn disconnect(&self) -> bool {
        let mut guard = self.session.lock().await;
        match guard.take() {
            Some(session) => {
                info!("🔌 Disconnecting from {}...", session.address());
                self.set_state(SessionState::Disconnecting);
                session.close().await;
                self.set_state(SessionState::Idle);
                info!("✅ Disconnected");
                true
            }
            None => {
                warn!("disconnect() with no live session");
                false
            }
        }
    }

    /// Force re-acquisition of a possibly stale GATT table: disconnect,
    /// pause, reconnect by stored peripheral address, re-discover.
    /// Serialized with connect/disconnect by the lifecycle lock.
    pub async fn refresh_capabilities(&self) -> Option<Arc<Session>> {
        let mut guard = self.session.lock().await;
        let old = match guard.take() {
            Some(session) => session,
            None => {
                warn!("GATT refresh refused: no live session");
                return None;
            }
        };
        let address = old.address().to_string();

        info!("🔄 Forcing GATT refresh for {}...", address);
        self.set_state(SessionState::Disconnecting);
        old.close().await;
        self.set_state(SessionState::Idle);
        sleep(GATT_REFRESH_BACKOFF).await;

        match self.establish(&address).await {
            Ok(session) => {
                info!("✅ GATT rediscovery complete");
                *guard = Some(session.clone());
                self.set_state(SessionState::Ready);
                Some(session)
            }
            Err(e) => {
                self.fail("GATT refresh", &e);
                None
            }
        }
    }

    async fn establish(&self, address: &str) -> Result<Arc<Session>> {
        info!("🔗 Connecting to {}...", address);
        self.set_state(SessionState::Connecting);
        let link = self
            .transport
            .connect(address)
            .await
            .map_err(|e| FgError::Connection(e.to_string()))?;

        info!("🔎 Discovering services and characteristics...");
        self.set_state(SessionState::Discovering);
        let services = match link.discover_capabilities().await {
            Ok(services) => services,
            Err(e) => {
                let _ = link.disconnect().await;
                return Err(FgError::Discovery(e.to_string()));
            }
        };
        let total: usize = services.iter().map(|s| s.characteristics.len()).sum();
        info!(
            "Discovered {} services, {} characteristics",
            services.len(),
            total
        );

        Ok(Session::new(link, services))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::fake::{FakeCharacteristic, FakeTransport};
    use crate::link::Advertisement;
    use crate::uuids;

    const ALERT_STATUS: CharacteristicAddress =
        CharacteristicAddress::new(uuids::ALERT_NOTIFICATION_SERVICE, uuids::ALERT_STATUS);

    #[tokio::test(start_paused = true)]
    async fn test_scan_timeout_stops_scan_once() {
        let transport = Arc::new(FakeTransport::new(vec![]));
        let manager = SessionManager::new(transport.clone());

        assert!(manager.connect().await.is_none());
        assert_eq!(manager.state(), SessionState::Idle);
        assert_eq!(transport.scan_stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_matching_names_are_filtered() {
        let transport = Arc::new(FakeTransport::new(vec![
            FakeTransport::adv("headset-pro"),
            Advertisement {
                address: "11:22:33:44:55:66".into(),
                name: None,
                rssi: None,
            },
        ]));
        let manager = SessionManager::new(transport.clone());

        assert!(manager.connect().await.is_none());
        assert!(transport.connects.lock().unwrap().is_empty());
        assert_eq!(transport.scan_stop_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_happy_path() {
        let transport = Arc::new(FakeTransport::new(vec![FakeTransport::adv("FG-unit-7")]));
        let manager = SessionManager::new(transport.clone());

        let session = manager.connect().await.expect("should connect");
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(session.address(), "AA:BB:CC:DD:EE:FF");
        assert!(!session.is_closed());
        assert_eq!(
            transport.connects.lock().unwrap().as_slice(),
            ["AA:BB:CC:DD:EE:FF"]
        );
        assert_eq!(transport.scan_stop_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_refused_while_session_live() {
        let transport = Arc::new(FakeTransport::new(vec![FakeTransport::adv("fg-unit")]));
        let manager = SessionManager::new(transport.clone());

        assert!(manager.connect().await.is_some());
        assert!(manager.connect().await.is_none());
        // The refusal never reached the radio
        assert_eq!(transport.connects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_idle() {
        let mut transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")]);
        transport.connect_fails = true;
        let manager = SessionManager::new(Arc::new(transport));

        assert!(manager.connect().await.is_none());
        assert_eq!(manager.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_discovery_failure_releases_link() {
        let mut transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")]);
        transport.discover_fails = true;
        let transport = Arc::new(transport);
        let manager = SessionManager::new(transport.clone());

        assert!(manager.connect().await.is_none());
        assert_eq!(manager.state(), SessionState::Idle);
        assert_eq!(transport.state.lock().unwrap().disconnects, 1);
    }

    #[tokio::test]
    async fn test_disconnect_is_best_effort() {
        let transport = Arc::new(FakeTransport::new(vec![FakeTransport::adv("fg-unit")]));
        let manager = SessionManager::new(transport.clone());

        let session = manager.connect().await.unwrap();
        assert!(manager.disconnect().await);
        assert!(session.is_closed());
        assert_eq!(manager.state(), SessionState::Idle);
        // Second disconnect has nothing to do
        assert!(!manager.disconnect().await);
    }

    #[tokio::test]
    async fn test_pending_read_resolves_after_disconnect() {
        let transport = FakeTransport::new(vec![FakeTransport::adv("fg-unit")])
            .with_characteristic(
                ALERT_STATUS,
                FakeCharacteristic {
                    hang_reads: true,
                    ..Default::default()
                },
            );
        let manager = SessionManager::new(Arc::new(transport));

        let session = manager.connect().await.unwrap();
        let reader = session.clone();
        let pending = tokio::spawn(async move { reader.read(ALERT_STATUS).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(manager.disconnect().await);
        let result = pending.await.unwrap();
        assert!(matches!(result, Err(FgError::NoDevice)));
    }

    #[tokio::test]
    async fn test_read_after_close_fails_fast() {
        let transport = Arc::new(FakeTransport::new(vec![FakeTransport::adv("fg-unit")]));
        let manager = SessionManager::new(transport.clone());

        let session = manager.connect().await.unwrap();
        manager.disconnect().await;
        assert!(matches!(
            session.read(ALERT_STATUS).await,
            Err(FgError::NoDevice)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reconnects_by_stored_address() {
        let transport = Arc::new(FakeTransport::new(vec![FakeTransport::adv("fg-unit")]));
        let manager = SessionManager::new(transport.clone());

        let first = manager.connect().await.unwrap();
        let refreshed = manager.refresh_capabilities().await.expect("should refresh");
        assert!(first.is_closed());
        assert!(!refreshed.is_closed());
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(
            transport.connects.lock().unwrap().as_slice(),
            ["AA:BB:CC:DD:EE:FF", "AA:BB:CC:DD:EE:FF"]
        );
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_refused() {
        let transport = Arc::new(FakeTransport::new(vec![]));
        let manager = SessionManager::new(transport);
        assert!(manager.refresh_capabilities().await.is_none());
    }
}
