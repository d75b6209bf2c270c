//! Broadcast set of open connections.
//!
//! An explicit keyed collection, not an ambient singleton: the listener owns
//! registration/teardown, the router only reads it through a snapshot during
//! broadcast, so a connection closing mid-broadcast cannot corrupt iteration.

use parking_lot::Mutex;
use piste_core::{DeviceId, WireMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Identifies one accepted connection for the life of the process.
pub type ConnectionId = u64;

#[derive(Debug)]
struct Entry {
    device: DeviceId,
    last_activity: Instant,
    outbound: mpsc::UnboundedSender<WireMessage>,
}

#[derive(Default)]
struct Inner {
    next_id: ConnectionId,
    entries: HashMap<ConnectionId, Entry>,
}

/// Keyed collection of open connections, shared by handle.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection after its handshake completes.
    pub fn register(
        &self,
        device: DeviceId,
        outbound: mpsc::UnboundedSender<WireMessage>,
    ) -> ConnectionId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(
            id,
            Entry {
                device,
                last_activity: Instant::now(),
                outbound,
            },
        );
        id
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.inner.lock().entries.remove(&id);
    }

    /// Record inbound traffic on a connection.
    pub fn touch(&self, id: ConnectionId) {
        if let Some(entry) = self.inner.lock().entries.get_mut(&id) {
            entry.last_activity = Instant::now();
        }
    }

    /// When the connection last carried inbound traffic, while registered.
    pub fn last_activity(&self, id: ConnectionId) -> Option<Instant> {
        self.inner.lock().entries.get(&id).map(|e| e.last_activity)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Send a message to every open connection except `origin`.
    ///
    /// Iterates a snapshot taken under the lock; a send failing just means
    /// that peer is already tearing down, and its own task unregisters it.
    pub fn broadcast_from(&self, origin: Option<ConnectionId>, msg: &WireMessage) {
        let targets: Vec<(ConnectionId, DeviceId, mpsc::UnboundedSender<WireMessage>)> = {
            let inner = self.inner.lock();
            inner
                .entries
                .iter()
                .filter(|(id, _)| Some(**id) != origin)
                .map(|(id, entry)| (*id, entry.device.clone(), entry.outbound.clone()))
                .collect()
        };
        for (id, device, outbound) in targets {
            if outbound.send(msg.clone()).is_err() {
                tracing::debug!(conn = id, device = %device, "broadcast to closing connection dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn push() -> WireMessage {
        WireMessage::Push {
            topic: "officials".into(),
            payload: json!({}),
        }
    }

    #[test]
    fn broadcast_skips_the_originator() {
        let registry = Registry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(DeviceId::generate(), tx_a);
        let _b = registry.register(DeviceId::generate(), tx_b);

        registry.broadcast_from(Some(a), &push());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn broadcast_never_reaches_a_closed_connection() {
        let registry = Registry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(DeviceId::generate(), tx_a);
        let _b = registry.register(DeviceId::generate(), tx_b);

        registry.unregister(a);
        registry.broadcast_from(None, &push());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
        assert_eq!(registry.peer_count(), 1);
    }

    #[test]
    fn broadcast_without_origin_reaches_everyone() {
        let registry = Registry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register(DeviceId::generate(), tx_a);
        registry.register(DeviceId::generate(), tx_b);

        registry.broadcast_from(None, &push());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn touch_advances_last_activity_until_unregistered() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(DeviceId::generate(), tx);

        let at_register = registry.last_activity(id).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        registry.touch(id);
        assert!(registry.last_activity(id).unwrap() > at_register);

        registry.unregister(id);
        assert!(registry.last_activity(id).is_none());
    }
}
