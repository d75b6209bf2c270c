//! Accept loop and per-connection serving for the host role.

use crate::local::LocalSession;
use crate::registry::{ConnectionId, Registry};
use crate::router::RequestRouter;
use piste_core::{
    CacheBridge, ConnectionStatus, DeviceId, FrameDecoder, Store, SyncError, WireMessage,
    transport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The host role: owns the router, the broadcast registry, and the status
/// projection; accepts remote connections and serves them until they close.
pub struct Host {
    router: Arc<RequestRouter>,
    registry: Registry,
    device: DeviceId,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl Host {
    pub fn new(device: DeviceId, store: impl Store + 'static, cache: Arc<dyn CacheBridge>) -> Self {
        let registry = Registry::new();
        let router = Arc::new(RequestRouter::new(store, registry.clone(), cache));
        let (status_tx, _) = watch::channel(ConnectionStatus::idle_host());
        Self {
            router,
            registry,
            device,
            status_tx,
        }
    }

    /// Call surface for this device's own screens.
    pub fn session(&self) -> LocalSession {
        LocalSession::new(self.router.clone())
    }

    /// Connectivity projection for the UI: peer count and last error.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Accept remote connections until the listener fails. Each connection is
    /// served on its own task; the accept loop itself keeps listening.
    pub async fn listen(&self, listener: TcpListener) -> Result<(), SyncError> {
        tracing::info!(addr = %listener.local_addr()?, device = %self.device, "host listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            let router = self.router.clone();
            let registry = self.registry.clone();
            let status_tx = self.status_tx.clone();
            let host_device = self.device.clone();
            tokio::spawn(async move {
                if let Err(e) =
                    handle_connection(stream, peer, router, registry, &status_tx, host_device)
                        .await
                {
                    tracing::debug!(%peer, error = %e, "connection ended with error");
                }
            });
        }
    }
}

fn publish_status(
    status_tx: &watch::Sender<ConnectionStatus>,
    registry: &Registry,
    last_error: Option<String>,
) {
    status_tx.send_replace(ConnectionStatus::Host {
        peer_count: registry.peer_count(),
        last_error,
    });
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<RequestRouter>,
    registry: Registry,
    status_tx: &watch::Sender<ConnectionStatus>,
    host_device: DeviceId,
) -> Result<(), SyncError> {
    stream.set_nodelay(true).ok();
    let (mut read, write) = stream.into_split();
    let mut decoder = FrameDecoder::new();

    // The remote speaks first; anything but a prompt Hello closes the socket.
    let hello = tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        transport::read_message(&mut read, &mut decoder),
    )
    .await
    .map_err(|_| SyncError::Protocol("handshake timed out".into()))??;
    let device = match hello {
        Some(WireMessage::Hello { device }) => device,
        Some(_) => return Err(SyncError::Protocol("expected hello".into())),
        None => return Ok(()),
    };

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(transport::write_loop(write, outbound_rx));
    let _ = outbound_tx.send(WireMessage::Welcome {
        device: host_device,
    });

    let conn = registry.register(device.clone(), outbound_tx.clone());
    publish_status(status_tx, &registry, None);
    tracing::info!(%peer, device = %device, "remote connected");

    let served = serve(conn, &device, &mut read, &mut decoder, &router, &registry, &outbound_tx)
        .await;

    let idle = registry.last_activity(conn).map(|at| at.elapsed());
    registry.unregister(conn);
    publish_status(
        status_tx,
        &registry,
        served.as_ref().err().map(|e| e.to_string()),
    );
    writer.abort();
    tracing::info!(%peer, device = %device, idle = ?idle, "remote disconnected");
    served
}

/// Serve one open connection. Requests are handled strictly in arrival
/// order: the next frame is not read until the previous dispatch finished.
async fn serve(
    conn: ConnectionId,
    device: &DeviceId,
    read: &mut OwnedReadHalf,
    decoder: &mut FrameDecoder,
    router: &RequestRouter,
    registry: &Registry,
    outbound: &mpsc::UnboundedSender<WireMessage>,
) -> Result<(), SyncError> {
    loop {
        let Some(msg) = transport::read_message(read, decoder).await? else {
            return Ok(());
        };
        registry.touch(conn);
        match msg {
            WireMessage::Request { id, op, args } => {
                let response = router.handle_request(conn, device, id, op, args).await;
                if outbound.send(response).is_err() {
                    return Ok(());
                }
            }
            other => {
                tracing::warn!(device = %device, message = ?other, "unexpected message from remote");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use piste_core::{Call, DataAccess, DataAccessError, NoCache, Roster, ops};
    use serde_json::{Value, json};

    /// Records the order operations reach the store; the named op stalls
    /// before recording, so an overtaking dispatch would flip the order.
    struct RecordingStore {
        order: Arc<PlMutex<Vec<String>>>,
        slow_op: &'static str,
    }

    impl DataAccess for RecordingStore {
        fn execute(&mut self, call: &Call) -> Result<Value, DataAccessError> {
            if call.op == self.slow_op {
                std::thread::sleep(Duration::from_millis(50));
            }
            self.order.lock().push(call.op.clone());
            Ok(json!([]))
        }
    }

    impl Roster for RecordingStore {
        fn device_may_mutate(&self, _device: &DeviceId) -> bool {
            false
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pipelined_requests_dispatch_in_arrival_order() {
        let order = Arc::new(PlMutex::new(Vec::new()));
        let store = RecordingStore {
            order: order.clone(),
            slow_op: ops::GET_POOLS,
        };
        let host = Host::new(DeviceId::generate(), store, Arc::new(NoCache));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { host.listen(listener).await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut decoder = FrameDecoder::new();
        transport::write_message(
            &mut stream,
            &WireMessage::Hello {
                device: DeviceId::generate(),
            },
        )
        .await
        .unwrap();
        let welcome = transport::read_message(&mut stream, &mut decoder)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(welcome, WireMessage::Welcome { .. }));

        // Both frames are on the wire before the first dispatch starts; the
        // slow first request must still complete before the second runs.
        transport::write_message(
            &mut stream,
            &WireMessage::request(0, Call::new(ops::GET_POOLS, json!({"round_id": 1}))),
        )
        .await
        .unwrap();
        transport::write_message(
            &mut stream,
            &WireMessage::request(1, Call::new(ops::GET_OFFICIALS, json!({}))),
        )
        .await
        .unwrap();

        for expected in 0..2u64 {
            let msg = transport::read_message(&mut stream, &mut decoder)
                .await
                .unwrap()
                .unwrap();
            match msg {
                WireMessage::Response { id, ok, .. } => {
                    assert_eq!(id, expected);
                    assert!(ok);
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(
            *order.lock(),
            vec![ops::GET_POOLS.to_string(), ops::GET_OFFICIALS.to_string()]
        );
        server.abort();
    }
}
