//! Tournament host daemon.
//!
//! Serves the in-memory demo store over the sync protocol. Run it, note the
//! device id it logs, seed it with `--demo`, and point `piste` clients at it:
//!
//!   piste-hostd --listen 0.0.0.0:4711 --demo
//!   piste --host 192.168.1.10:4711 pools --round 1

use clap::Parser;
use piste_core::{CacheBridge, DeviceId};
use piste_host::{Host, MemoryStore};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "piste-hostd", about = "Piste tournament host daemon")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long, env = "PISTE_CONFIG")]
    config: Option<PathBuf>,
    /// Listen address (overrides the config file).
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Where the host's device code is persisted.
    #[arg(long)]
    device_file: Option<PathBuf>,
    /// Seed a small demo tournament.
    #[arg(long)]
    demo: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    listen: SocketAddr,
    device_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ([0, 0, 0, 0], 4711).into(),
            device_file: PathBuf::from("piste-device"),
        }
    }
}

/// The daemon has no UI cache; invalidations are only logged.
struct LoggingCache;

impl CacheBridge for LoggingCache {
    fn invalidate(&self, topic: &str, payload: &serde_json::Value) {
        tracing::debug!(topic, %payload, "cache invalidated");
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(device_file) = &args.device_file {
        config.device_file = device_file.clone();
    }
    Ok(config)
}

fn demo_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let pool = store.seed_pool(1, 1);
    store.seed_bout(1, pool, "Ada Laurent", "Bea Kovacs");
    store.seed_bout(1, pool, "Ada Laurent", "Carmen Diaz");
    store.seed_bout(1, pool, "Bea Kovacs", "Carmen Diaz");
    store.seed_official("Tournament Desk", None);
    store
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let device = DeviceId::load_or_generate(&config.device_file)?;
    tracing::info!(%device, "host device code");

    let store = if args.demo {
        demo_store()
    } else {
        MemoryStore::new()
    };

    let host = Host::new(device, store, Arc::new(LoggingCache));
    let listener = TcpListener::bind(config.listen).await?;
    host.listen(listener).await?;
    Ok(())
}
