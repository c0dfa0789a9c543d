//! Passkey login
//!
//! The detector unlocks its settings after the passkey is written to the
//! login service. The write tries with-response first and falls back to
//! without-response once; some firmware revisions only accept one of the
//! two modes.

use log::{info, warn};
use uuid::Uuid;

use crate::accessor;
use crate::codec;
use crate::link::CharacteristicAddress;
use crate::session::Session;

// Login UUIDs live with their only user, like the original firmware map
pub const LOGIN_SERVICE: Uuid = Uuid::from_u128(0xab896745_2310_cdab_8947_6f5e4d3c2b1a);
pub const PASSKEY: Uuid = Uuid::from_u128(0xab896745_2311_cdab_8947_6f5e4d3c2b1a);

const PASSKEY_ADDRESS: CharacteristicAddress = CharacteristicAddress::new(LOGIN_SERVICE, PASSKEY);

/// Write the passkey as UTF-8, with the two-step delivery policy
pub async fn write_passkey(session: &Session, passkey: &str) -> bool {
    if passkey.is_empty() {
        warn!("Refusing to write an empty passkey");
        return false;
    }
    let payload = codec::encode_string(passkey);
    let ok = accessor::write_with_fallback(session, PASSKEY_ADDRESS, &payload).await;
    if ok {
        info!("🔑 Passkey accepted");
    }
    ok
}
