//! Request dispatch against the authoritative store.

use crate::registry::{ConnectionId, Registry};
use piste_core::{
    Call, CacheBridge, DeviceId, OpKind, Store, SyncError, WireMessage, lookup,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Executes catalogue calls: validates the operation, authorizes mutations
/// against the roster, runs the store, and fans change notifications out to
/// every other open connection. The store lock is the serialization point for
/// conflicting writes; there is no cross-connection ordering beyond it.
pub struct RequestRouter {
    store: Mutex<Box<dyn Store>>,
    registry: Registry,
    cache: Arc<dyn CacheBridge>,
}

impl RequestRouter {
    pub fn new(
        store: impl Store + 'static,
        registry: Registry,
        cache: Arc<dyn CacheBridge>,
    ) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
            registry,
            cache,
        }
    }

    /// Handle one inbound request from a remote connection, producing the
    /// response to send back. Never panics the connection: every failure
    /// becomes a typed response error.
    pub async fn handle_request(
        &self,
        conn: ConnectionId,
        device: &DeviceId,
        id: u64,
        op: String,
        args: Value,
    ) -> WireMessage {
        let call = Call { op, args };
        match self.execute(Some((conn, device)), &call).await {
            Ok(result) => WireMessage::response_ok(id, result),
            Err(err) => {
                tracing::debug!(op = %call.op, device = %device, error = %err, "request rejected");
                WireMessage::response_err(id, &err)
            }
        }
    }

    /// Execution step for the host's own calls: same validation and
    /// broadcast, no transport, no roster check (the host operates the
    /// authoritative store).
    pub async fn execute_local(&self, call: &Call) -> Result<Value, SyncError> {
        self.execute(None, call).await
    }

    async fn execute(
        &self,
        remote: Option<(ConnectionId, &DeviceId)>,
        call: &Call,
    ) -> Result<Value, SyncError> {
        let kind =
            lookup(&call.op).ok_or_else(|| SyncError::UnknownOperation(call.op.clone()))?;

        let result = {
            let mut store = self.store.lock().await;
            if let OpKind::Mutation { .. } = kind {
                if let Some((_, device)) = remote {
                    if !store.device_may_mutate(device) {
                        return Err(SyncError::Unauthorized);
                    }
                }
            }
            store
                .execute(call)
                .map_err(|e| SyncError::DataAccess(e.to_string()))?
        };

        if let OpKind::Mutation { topic } = kind {
            let change = json!({ "op": call.op, "args": call.args });
            self.registry.broadcast_from(
                remote.map(|(conn, _)| conn),
                &WireMessage::Push {
                    topic: topic.to_string(),
                    payload: change.clone(),
                },
            );
            // The host's own cache skips the network.
            self.cache.invalidate(topic, &change);
        }

        Ok(result)
    }
}
