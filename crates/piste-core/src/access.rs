//! Traits at the boundary to the store, the roster, and the UI cache.

use crate::identity::DeviceId;
use crate::message::Call;
use serde_json::Value;
use thiserror::Error;

/// Storage-layer failure. Surfaced to callers as a typed response error,
/// never as a crashed router or a closed connection.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DataAccessError(pub String);

impl DataAccessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The authoritative local store: one entry per catalogue operation.
///
/// The same shape serves host-side execution and any non-networked local
/// fallback. Each call is atomic at this boundary; conflicting writes from
/// different connections are serialized here, last write wins.
pub trait DataAccess {
    fn execute(&mut self, call: &Call) -> Result<Value, DataAccessError>;
}

/// Officials/referees roster consulted before a mutation is applied.
pub trait Roster {
    /// Whether this device is tied to an official or referee record.
    fn device_may_mutate(&self, device: &DeviceId) -> bool;
}

/// What the router needs from the host's storage side, in one object.
pub trait Store: DataAccess + Roster + Send {}

impl<T: DataAccess + Roster + Send> Store for T {}

/// Boundary invalidating cached query results visible to the UI.
///
/// Invoked for every push a device receives, and directly (no network) on the
/// host for its own mutations.
pub trait CacheBridge: Send + Sync {
    fn invalidate(&self, topic: &str, payload: &Value);
}

/// Cache bridge for devices with nothing cached (tests, headless tools).
pub struct NoCache;

impl CacheBridge for NoCache {
    fn invalidate(&self, _topic: &str, _payload: &Value) {}
}
