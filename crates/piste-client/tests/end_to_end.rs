//! Host and remotes talking over real localhost TCP.

use piste_client::{ConnectionSupervisor, SupervisorConfig};
use piste_core::{CacheBridge, DeviceId, NoCache, Operations, SyncError};
use piste_host::{Host, MemoryStore};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

struct ChannelCache(mpsc::UnboundedSender<(String, Value)>);

impl CacheBridge for ChannelCache {
    fn invalidate(&self, topic: &str, payload: &Value) {
        let _ = self.0.send((topic.to_string(), payload.clone()));
    }
}

fn channel_cache() -> (Arc<ChannelCache>, mpsc::UnboundedReceiver<(String, Value)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelCache(tx)), rx)
}

async fn start_host(store: MemoryStore, cache: Arc<dyn CacheBridge>) -> (SocketAddr, Arc<Host>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let host = Arc::new(Host::new(DeviceId::generate(), store, cache));
    let serving = host.clone();
    tokio::spawn(async move {
        let _ = serving.listen(listener).await;
    });
    (addr, host)
}

fn fast_config(addr: SocketAddr, device: DeviceId) -> SupervisorConfig {
    let mut config = SupervisorConfig::new(addr, device);
    config.request_timeout = Duration::from_secs(2);
    config.backoff_floor = Duration::from_millis(50);
    config
}

async fn connect(
    addr: SocketAddr,
    device: DeviceId,
    cache: Arc<dyn CacheBridge>,
) -> ConnectionSupervisor {
    let supervisor = ConnectionSupervisor::spawn(fast_config(addr, device), cache);
    supervisor
        .wait_until_connected(Duration::from_secs(5))
        .await
        .unwrap();
    supervisor
}

fn scored_store(referee_device: &DeviceId) -> (MemoryStore, u32) {
    let mut store = MemoryStore::new();
    let pool = store.seed_pool(1, 1);
    store.seed_bout_with_id(7, 1, pool, "Ada Laurent", "Bea Kovacs");
    store.seed_referee("Chris Wong", Some(referee_device.clone()));
    (store, pool)
}

#[tokio::test]
async fn score_update_pushes_to_other_remotes() {
    let referee_device = DeviceId::generate();
    let (store, pool) = scored_store(&referee_device);
    let (addr, _host) = start_host(store, Arc::new(NoCache)).await;

    let (scorer_cache, mut scorer_rx) = channel_cache();
    let scorer = connect(addr, referee_device, scorer_cache).await;
    let (cache_a, mut rx_a) = channel_cache();
    let observer_a = connect(addr, DeviceId::generate(), cache_a).await;
    let (cache_b, mut rx_b) = channel_cache();
    let observer_b = connect(addr, DeviceId::generate(), cache_b).await;

    let bout = scorer
        .session()
        .update_bout_scores(7, 5, 3)
        .await
        .unwrap();
    assert_eq!((bout.score_a, bout.score_b), (5, 3));

    for rx in [&mut rx_a, &mut rx_b] {
        let (topic, payload) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("push within deadline")
            .expect("push delivered");
        assert_eq!(topic, "bouts:pool");
        assert_eq!(payload["args"]["bout_id"], 7);
    }
    // The originator never receives its own push.
    assert!(scorer_rx.try_recv().is_err());

    // An observer re-queries and sees 5-3.
    let bouts = observer_a
        .session()
        .get_bouts_for_pool(1, pool)
        .await
        .unwrap();
    let seven = bouts.iter().find(|b| b.id == 7).unwrap();
    assert_eq!((seven.score_a, seven.score_b), (5, 3));

    scorer.shutdown();
    observer_a.shutdown();
    observer_b.shutdown();
}

#[tokio::test]
async fn unrostered_device_is_read_only() {
    let referee_device = DeviceId::generate();
    let (store, _pool) = scored_store(&referee_device);
    let (addr, _host) = start_host(store, Arc::new(NoCache)).await;

    let stranger = connect(addr, DeviceId::generate(), Arc::new(NoCache)).await;

    let err = stranger
        .session()
        .update_bout_scores(7, 1, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Unauthorized));

    let pools = stranger.session().get_pools(1).await.unwrap();
    assert_eq!(pools.len(), 1);

    stranger.shutdown();
}

#[tokio::test]
async fn host_local_mutation_reaches_remotes_and_its_own_cache() {
    let referee_device = DeviceId::generate();
    let (store, _pool) = scored_store(&referee_device);
    let (host_cache, mut host_rx) = channel_cache();
    let (addr, host) = start_host(store, host_cache).await;

    let (cache, mut rx) = channel_cache();
    let observer = connect(addr, DeviceId::generate(), cache).await;

    host.session().update_bout_scores(7, 4, 2).await.unwrap();

    let (topic, _) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("push within deadline")
        .expect("push delivered");
    assert_eq!(topic, "bouts:pool");

    // The host's cache is invalidated directly, without the network.
    let (topic, payload) = host_rx.try_recv().unwrap();
    assert_eq!(topic, "bouts:pool");
    assert_eq!(payload["args"]["score_a"], 4);

    observer.shutdown();
}

#[tokio::test]
async fn calls_against_an_unreachable_host_fail_fast() {
    // Grab an ephemeral port, then free it so nothing listens there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let supervisor =
        ConnectionSupervisor::spawn(fast_config(addr, DeviceId::generate()), Arc::new(NoCache));

    let started = Instant::now();
    let err = supervisor.session().get_pools(2).await.unwrap_err();
    assert!(matches!(err, SyncError::Disconnected));
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "failed after {:?}, not immediately",
        started.elapsed()
    );
    supervisor.shutdown();
}
