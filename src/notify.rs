//! Notification subscription manager
//!
//! One live subscription per (characteristic, consumer) pair. Each
//! subscription runs a delivery task that decodes inbound payloads with
//! the same codec rules as a read of that characteristic and forwards
//! them to the consumer's sink; undecodable payloads are dropped, not
//! forwarded. Cancellation is idempotent and also happens on drop, and
//! session teardown joins every delivery task so no callback can fire
//! into a torn-down consumer.

use std::sync::{Arc, Weak};

use futures::StreamExt;
use log::{debug, error, warn};
use tokio::sync::mpsc;

use crate::codec;
use crate::link::CharacteristicAddress;
use crate::session::Session;
use crate::types::{TypedValue, ValueShape};
use crate::uuids;

/// Handle for one active live-notification registration
///
/// Owned by the consumer that created it. Cancelling more than once is
/// safe; dropping the handle cancels too, so a discarded handle never
/// leaks a live delivery task.
pub struct Subscription {
    address: CharacteristicAddress,
    consumer: String,
    session: Weak<Session>,
    cancel_tx: Option<mpsc::Sender<()>>,
}

impl Subscription {
    pub fn address(&self) -> CharacteristicAddress {
        self.address
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Stop delivery. Idempotent: later calls and double-cancels are no-ops.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.try_send(());
            if let Some(session) = self.session.upgrade() {
                session.remove_subscription(self.address, &self.consumer);
            }
            debug!(
                "Unsubscribed '{}' from {}",
                self.consumer,
                uuids::characteristic_label(self.address.characteristic)
                    .unwrap_or("characteristic")
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Cancel a subscription handle, consuming it
pub fn unsubscribe(mut subscription: Subscription) {
    subscription.cancel();
}

/// Subscribe to live updates of one characteristic
///
/// Returns `None` when the session is closed, when the transport refuses
/// the registration, or when the (characteristic, consumer) pair already
/// has a live subscription — double-subscribing is refused explicitly
/// rather than silently leaking the earlier handle.
pub async fn subscribe<F>(
    session: &Arc<Session>,
    address: CharacteristicAddress,
    shape: ValueShape,
    consumer: &str,
    on_value: F,
) -> Option<Subscription>
where
    F: Fn(TypedValue) + Send + 'static,
{
    let label =
        uuids::characteristic_label(address.characteristic).unwrap_or("characteristic");

    if session.is_closed() {
        warn!("Subscribe to {}: no active device", label);
        return None;
    }
    if session.has_subscription(address, consumer) {
        warn!(
            "Subscribe to {} refused: consumer '{}' already holds a live subscription",
            label, consumer
        );
        return None;
    }

    let mut stream = match session.start_notify(address).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to start notifications on {}: {}", label, e);
            return None;
        }
    };

    let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
    let mut closed = session.closed_watch();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(payload) => match codec::decode_value(shape, &payload) {
                        Ok(value) => on_value(value),
                        Err(e) => {
                            // Silently dropped: not forwarded, not retried
                            debug!(
                                "Dropping undecodable {} notification ({} bytes): {}",
                                shape,
                                payload.len(),
                                e
                            );
                        }
                    },
                    None => {
                        debug!("Notification stream ended by peripheral");
                        break;
                    }
                },
                _ = cancel_rx.recv() => break,
                _ = closed.wait_for(|c| *c) => break,
            }
        }
    });

    let abort = task.abort_handle();
    if !session.register_subscription(address, consumer, task) {
        // Lost a race with a concurrent subscribe for the same pair
        abort.abort();
        warn!(
            "Subscribe to {} refused: consumer '{}' already holds a live subscription",
            label, consumer
        );
        return None;
    }

    debug!("📡 Subscribed '{}' to {}", consumer, label);
    Some(Subscription {
        address,
        consumer: consumer.to_string(),
        session: Arc::downgrade(session),
        cancel_tx: Some(cancel_tx),
    })
}
