//! Remote client CLI.
//!
//! Issues one catalogue call against a running host. The device code printed
//! by `piste id` is what the tournament desk enters on an official or referee
//! record to grant this device write access.

use clap::{Parser, Subcommand};
use piste_client::{ConnectionSupervisor, SupervisorConfig};
use piste_core::{Call, DeviceId, NoCache, Operations, ops};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "piste", about = "Remote client for a piste tournament host")]
struct Args {
    /// Host address.
    #[arg(long, default_value = "127.0.0.1:4711")]
    host: SocketAddr,
    /// Where this device's code is persisted.
    #[arg(long, env = "PISTE_DEVICE_FILE", default_value = "piste-device")]
    device_file: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print this device's code.
    Id,
    /// List pools in a round.
    Pools {
        #[arg(long)]
        round: u32,
    },
    /// List bouts in a pool.
    Bouts {
        #[arg(long)]
        round: u32,
        #[arg(long)]
        pool: u32,
    },
    /// List officials.
    Officials,
    /// List referees.
    Referees,
    /// Submit bout scores (device must be on the roster).
    Score {
        #[arg(long)]
        bout: u32,
        #[arg(long)]
        a: u32,
        #[arg(long)]
        b: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let device = DeviceId::load_or_generate(&args.device_file)?;

    // `id` works offline; everything else becomes one catalogue call.
    let call = match args.command {
        Command::Id => {
            println!("{device}");
            return Ok(());
        }
        Command::Pools { round } => Call::new(ops::GET_POOLS, json!({ "round_id": round })),
        Command::Bouts { round, pool } => Call::new(
            ops::GET_BOUTS_FOR_POOL,
            json!({ "round_id": round, "pool_id": pool }),
        ),
        Command::Officials => Call::new(ops::GET_OFFICIALS, Value::Null),
        Command::Referees => Call::new(ops::GET_REFEREES, Value::Null),
        Command::Score { bout, a, b } => Call::new(
            ops::UPDATE_BOUT_SCORES,
            json!({ "bout_id": bout, "score_a": a, "score_b": b }),
        ),
    };

    let supervisor = ConnectionSupervisor::spawn(
        SupervisorConfig::new(args.host, device),
        Arc::new(NoCache),
    );
    supervisor
        .wait_until_connected(Duration::from_secs(10))
        .await
        .map_err(|e| anyhow::anyhow!("host not reachable: {e}"))?;

    let output = supervisor.session().call(call).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    supervisor.shutdown();
    Ok(())
}
