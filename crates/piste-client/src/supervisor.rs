//! Connection lifecycle for the remote role.
//!
//! An explicit state machine, `Idle → Connecting → Open → Closed`, looping
//! back to `Connecting` with capped exponential backoff. The rest of the app
//! sees none of it: only the [`ConnectionStatus`] watch channel and the
//! session handle.

use crate::session::{ClientSession, Shared};
use piste_core::{
    CacheBridge, ConnectionStatus, DeviceId, FrameDecoder, SyncError, WireMessage, transport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};

/// Link lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub host_addr: SocketAddr,
    pub device: DeviceId,
    /// Per-request response timeout.
    pub request_timeout: Duration,
    pub handshake_timeout: Duration,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    /// How long a link must stay open before the backoff resets.
    pub sustained_open: Duration,
}

impl SupervisorConfig {
    pub fn new(host_addr: SocketAddr, device: DeviceId) -> Self {
        Self {
            host_addr,
            device,
            request_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
            backoff_floor: Duration::from_secs(1),
            backoff_ceiling: Duration::from_secs(30),
            sustained_open: Duration::from_secs(30),
        }
    }
}

/// Capped exponential backoff with a little jitter so a room full of tablets
/// does not reconnect in lockstep.
struct Backoff {
    floor: Duration,
    ceiling: Duration,
    next: Duration,
}

impl Backoff {
    fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            next: floor,
        }
    }

    fn reset(&mut self) {
        self.next = self.floor;
    }

    fn next_delay(&mut self) -> Duration {
        let base = self.next;
        self.next = (base * 2).min(self.ceiling);
        base.mul_f64(1.0 + fastrand::f64() * 0.1)
    }
}

/// Owns the reconnect loop for one remote device.
pub struct ConnectionSupervisor {
    session: ClientSession,
    shared: Arc<Shared>,
    status_rx: watch::Receiver<ConnectionStatus>,
    task: tokio::task::JoinHandle<()>,
}

impl ConnectionSupervisor {
    /// Start supervising a link to the host. Returns immediately; the
    /// session fails with `Disconnected` until the first handshake lands.
    pub fn spawn(config: SupervisorConfig, cache: Arc<dyn CacheBridge>) -> Self {
        let shared = Arc::new(Shared::new(cache));
        let session = ClientSession::new(shared.clone(), config.request_timeout);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::idle_remote());
        let task = tokio::spawn(run(config, shared.clone(), status_tx));
        Self {
            session,
            shared,
            status_rx,
            task,
        }
    }

    /// Call surface mirroring the host's own.
    pub fn session(&self) -> ClientSession {
        self.session.clone()
    }

    /// Connectivity projection for the UI.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Block until the host is reachable, up to `limit`.
    pub async fn wait_until_connected(&self, limit: Duration) -> Result<(), SyncError> {
        let mut status = self.status_rx.clone();
        match tokio::time::timeout(limit, status.wait_for(|s| s.connected())).await {
            Err(_) => Err(SyncError::TimedOut(limit)),
            Ok(Err(_)) => Err(SyncError::Disconnected),
            Ok(Ok(_)) => Ok(()),
        }
    }

    /// Stop reconnecting and fail anything still pending.
    pub fn shutdown(self) {
        self.task.abort();
        self.shared.detach();
    }
}

fn set_link(link: &mut LinkState, next: LinkState) {
    if *link != next {
        tracing::debug!(from = ?link, to = ?next, "link state");
        *link = next;
    }
}

async fn run(
    config: SupervisorConfig,
    shared: Arc<Shared>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    let mut backoff = Backoff::new(config.backoff_floor, config.backoff_ceiling);
    let mut link = LinkState::Idle;
    loop {
        set_link(&mut link, LinkState::Connecting);
        match open_link(&config).await {
            Err(e) => {
                set_link(&mut link, LinkState::Closed);
                tracing::debug!(host = %config.host_addr, error = %e, "connect failed");
                status_tx.send_replace(ConnectionStatus::Remote {
                    host_reachable: false,
                    last_error: Some(e.to_string()),
                });
            }
            Ok((mut read, write, mut decoder, host_device)) => {
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let writer = tokio::spawn(transport::write_loop(write, outbound_rx));
                let epoch = shared.attach(outbound_tx);
                set_link(&mut link, LinkState::Open);
                status_tx.send_replace(ConnectionStatus::Remote {
                    host_reachable: true,
                    last_error: None,
                });
                tracing::info!(host = %config.host_addr, device = %host_device, "connected to host");

                let opened = Instant::now();
                let served = serve(&mut read, &mut decoder, &shared, epoch).await;
                shared.detach();
                writer.abort();
                set_link(&mut link, LinkState::Closed);

                let reason = match served {
                    Ok(()) => "closed by host".to_string(),
                    Err(e) => e.to_string(),
                };
                status_tx.send_replace(ConnectionStatus::Remote {
                    host_reachable: false,
                    last_error: Some(reason.clone()),
                });
                tracing::info!(host = %config.host_addr, reason = %reason, "link closed");

                if opened.elapsed() >= config.sustained_open {
                    backoff.reset();
                }
            }
        }
        let delay = backoff.next_delay();
        tracing::debug!(?delay, "reconnect backoff");
        tokio::time::sleep(delay).await;
    }
}

/// Connect and handshake: send `Hello`, require `Welcome` before anything
/// else flows.
async fn open_link(
    config: &SupervisorConfig,
) -> Result<(OwnedReadHalf, OwnedWriteHalf, FrameDecoder, DeviceId), SyncError> {
    let stream = TcpStream::connect(config.host_addr).await?;
    stream.set_nodelay(true).ok();
    let (mut read, mut write) = stream.into_split();

    transport::write_message(
        &mut write,
        &WireMessage::Hello {
            device: config.device.clone(),
        },
    )
    .await?;

    let mut decoder = FrameDecoder::new();
    let welcome = tokio::time::timeout(
        config.handshake_timeout,
        transport::read_message(&mut read, &mut decoder),
    )
    .await
    .map_err(|_| SyncError::Protocol("handshake timed out".into()))??;

    match welcome {
        Some(WireMessage::Welcome { device }) => Ok((read, write, decoder, device)),
        Some(_) => Err(SyncError::Protocol("expected welcome".into())),
        None => Err(SyncError::Disconnected),
    }
}

async fn serve(
    read: &mut OwnedReadHalf,
    decoder: &mut FrameDecoder,
    shared: &Shared,
    epoch: u64,
) -> Result<(), SyncError> {
    loop {
        match transport::read_message(read, decoder).await? {
            Some(msg) => shared.handle_message(epoch, msg),
            None => return Ok(()),
        }
    }
}
