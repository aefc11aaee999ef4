//! SQL cluster service entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!   <env>.config.toml ──▶ config ──▶ observability (logging, metrics)
//!                            │
//!                            ▼
//!                     ClusterConnector ──open + ping──▶ primary, replica 1..n
//!                            │
//!                            ▼
//!                     ClusterConnection ◀── HealthMonitor (periodic ping_nodes)
//!                            │
//!                 SIGINT/SIGTERM ──▶ Shutdown ──▶ drain ──▶ close every node
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use sql_cluster::config::load_environment;
use sql_cluster::health::HealthMonitor;
use sql_cluster::lifecycle::{connect_cluster, shutdown_signal, Shutdown};
use sql_cluster::observability::{logging, metrics};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect a primary/replica SQL cluster and keep it healthy until shutdown.
#[derive(Debug, Parser)]
#[command(name = "sql-cluster", version)]
struct Cli {
    /// Environment whose `<env>.config.toml` is loaded.
    #[arg(short = 'e', long = "env", default_value = "local")]
    env: String,

    /// Directory holding the configuration files.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Connect, ping every node and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_environment(&cli.config_dir, &cli.env)?;
    logging::init(&config.observability)?;

    tracing::info!(
        env = %cli.env,
        driver = %config.sql.driver_name,
        replicas = config.sql.replicas.len(),
        max_open_connections = config.sql.pool.max_open_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let cluster = connect_cluster(&config).await?;

    if cli.check {
        let outcome = cluster.ping().await;
        cluster.close().await?;
        outcome?;
        tracing::info!(nodes = cluster.len(), "All nodes answered");
        return Ok(());
    }

    let shutdown = Shutdown::new();
    let monitor = HealthMonitor::new(cluster.clone(), config.health_check.clone());
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    shutdown_signal().await?;
    shutdown.trigger();

    if !shutdown.drain(DRAIN_TIMEOUT).await {
        monitor_task.abort();
    }
    cluster.close().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
