//! FG Detector BLE Protocol
//!
//! This library turns the unreliable radio link to an FG portable
//! fire/gas detector into a typed request/response and event-stream
//! interface: session lifecycle, typed characteristic access, live
//! notification subscriptions, and alert-bitmask decoding.
//!
//! # Modules
//!
//! - `session`: device session manager and connection state machine
//! - `accessor`: typed characteristic reads and writes
//! - `notify`: live-notification subscription lifecycle
//! - `alerts`: alert status word decoding and prioritization
//! - `codec`: pure wire payload encode/decode
//! - `bluez`: BlueZ transport implementation of the `link` seam

pub mod accessor;
pub mod alerts;
pub mod bluez;
pub mod codec;
pub mod device_info;
pub mod environmental;
pub mod generic_access;
pub mod link;
pub mod login;
pub mod media_control;
pub mod notify;
pub mod session;
pub mod settings;
pub mod types;
pub mod uuids;

pub use alerts::{decode_alert_status, ActiveAlert, AlertStatus};
pub use bluez::BluezTransport;
pub use link::{
    Advertisement, BleTransport, CharacteristicAddress, CharacteristicCapabilities, DeviceLink,
    ServiceInfo,
};
pub use notify::{subscribe, unsubscribe, Subscription};
pub use session::{Session, SessionManager};
pub use settings::GasType;
pub use types::{FgError, Result, SessionState, TypedValue, ValueShape, WriteMode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_imports() {
        // Smoke test to ensure all modules can be imported
        let _ = SessionState::Idle;
        let _ = ValueShape::U16Be;
        let _ = decode_alert_status(0);
    }
}
