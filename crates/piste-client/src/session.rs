//! Remote call surface: request/response matching over one link.
//!
//! A [`ClientSession`] is a cheap cloneable handle. Calls allocate the next
//! per-connection id, park a oneshot waiter, and suspend until the matching
//! response arrives or the timeout elapses. The supervisor attaches and
//! detaches the underlying link; an epoch counter bumped on every detach
//! keeps bookkeeping from a dead connection out of the next one.

use parking_lot::Mutex;
use piste_core::{Call, CacheBridge, Operations, SyncError, WireMessage};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

type Waiter = oneshot::Sender<Result<Value, SyncError>>;

struct State {
    epoch: u64,
    next_id: u64,
    outbound: Option<mpsc::UnboundedSender<WireMessage>>,
    waiters: HashMap<u64, Waiter>,
}

pub(crate) struct Shared {
    cache: Arc<dyn CacheBridge>,
    state: Mutex<State>,
}

impl Shared {
    pub(crate) fn new(cache: Arc<dyn CacheBridge>) -> Self {
        Self {
            cache,
            state: Mutex::new(State {
                epoch: 0,
                next_id: 0,
                outbound: None,
                waiters: HashMap::new(),
            }),
        }
    }

    /// Install the outbound half of a freshly opened link. Request ids
    /// restart per connection. Returns the epoch the link serves.
    pub(crate) fn attach(&self, outbound: mpsc::UnboundedSender<WireMessage>) -> u64 {
        let mut state = self.state.lock();
        state.outbound = Some(outbound);
        state.next_id = 0;
        state.epoch
    }

    /// Tear the link down: every pending call fails with `Disconnected`
    /// immediately rather than waiting out its timeout, and the epoch
    /// increments so stale bookkeeping cannot leak into the next link.
    pub(crate) fn detach(&self) {
        let waiters: Vec<Waiter> = {
            let mut state = self.state.lock();
            state.outbound = None;
            state.epoch += 1;
            state.waiters.drain().map(|(_, w)| w).collect()
        };
        for waiter in waiters {
            let _ = waiter.send(Err(SyncError::Disconnected));
        }
    }

    /// Process one inbound message from the link serving `epoch`. Messages
    /// from a superseded epoch are dropped whole.
    pub(crate) fn handle_message(&self, epoch: u64, msg: WireMessage) {
        match msg {
            WireMessage::Response {
                id,
                ok,
                result,
                error,
            } => {
                let waiter = {
                    let mut state = self.state.lock();
                    if state.epoch != epoch {
                        tracing::debug!(id, epoch, "response from superseded epoch dropped");
                        return;
                    }
                    state.waiters.remove(&id)
                };
                let Some(waiter) = waiter else {
                    tracing::debug!(id, "response with no waiter (timed out or cancelled)");
                    return;
                };
                let outcome = if ok {
                    Ok(result.unwrap_or(Value::Null))
                } else {
                    Err(error.map(SyncError::from_wire).unwrap_or_else(|| {
                        SyncError::Protocol("failed response carried no error".into())
                    }))
                };
                // A send failing means the caller cancelled locally; the
                // host-side effect, if any, already applied.
                let _ = waiter.send(outcome);
            }
            WireMessage::Push { topic, payload } => {
                if self.state.lock().epoch != epoch {
                    return;
                }
                self.cache.invalidate(&topic, &payload);
            }
            other => {
                tracing::warn!(message = ?other, "unexpected message from host");
            }
        }
    }

    #[cfg(test)]
    fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

#[derive(Clone)]
pub struct ClientSession {
    shared: Arc<Shared>,
    timeout: Duration,
}

impl ClientSession {
    pub(crate) fn new(shared: Arc<Shared>, timeout: Duration) -> Self {
        Self { shared, timeout }
    }

    async fn dispatch(&self, call: Call) -> Result<Value, SyncError> {
        let (tx, rx) = oneshot::channel();
        let (id, epoch) = {
            let mut state = self.shared.state.lock();
            let Some(outbound) = state.outbound.clone() else {
                return Err(SyncError::Disconnected);
            };
            let id = state.next_id;
            state.next_id += 1;
            state.waiters.insert(id, tx);
            if outbound.send(WireMessage::request(id, call)).is_err() {
                state.waiters.remove(&id);
                return Err(SyncError::Disconnected);
            }
            (id, state.epoch)
        };

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Waiter dropped without a verdict: the link died mid-teardown.
            Ok(Err(_)) => Err(SyncError::Disconnected),
            Err(_) => {
                let mut state = self.shared.state.lock();
                if state.epoch == epoch {
                    state.waiters.remove(&id);
                }
                Err(SyncError::TimedOut(self.timeout))
            }
        }
    }
}

impl Operations for ClientSession {
    async fn call(&self, call: Call) -> Result<Value, SyncError> {
        self.dispatch(call).await
    }
}
