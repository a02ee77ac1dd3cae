//! exo-node entry point.
//!
//! ```text
//! main()
//!  ├─ Cli::parse()                 -- -l/--log, -n/--node, -c/--config
//!  ├─ NodeConfig::load_or_default()
//!  ├─ NodeConfig::identity()       -- local + peer endpoints for this node
//!  ├─ SessionLog::open() / disabled()
//!  ├─ reset_encoders_at_startup()
//!  └─ Node::bind().run(ctrl_c)     -- until Ctrl-C or a fatal fault
//! ```
//!
//! The rig is a `SimulatedActuatorDevice` unless a hardware driver is wired
//! in here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use exo_node::application::drive_joints::JointRig;
use exo_node::application::record_session::SessionRecorder;
use exo_node::infrastructure::actuators::SimulatedActuatorDevice;
use exo_node::infrastructure::session_log::SessionLog;
use exo_node::infrastructure::storage::config::NodeConfig;
use exo_node::node::{reset_encoders_at_startup, Node};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Mirrors exoskeleton joint motion between two rigs over UDP.
#[derive(Debug, Parser)]
#[command(name = "exo-node", version)]
struct Cli {
    /// Write session logs into this directory (created if missing).
    #[arg(short, long, value_name = "DIR")]
    log: Option<PathBuf>,

    /// This node's name in the `[nodes]` table.  Defaults to the host name.
    #[arg(short, long, env = "EXO_NODE")]
    node: Option<String>,

    /// TOML configuration file.  Built-in defaults apply without one.
    #[arg(short, long, value_name = "PATH", env = "EXO_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn node_name(&self) -> anyhow::Result<String> {
        if let Some(name) = &self.node {
            return Ok(name.clone());
        }
        if let Ok(name) = std::env::var("HOSTNAME") {
            return Ok(name);
        }
        let name = std::fs::read_to_string("/etc/hostname")
            .context("no --node given and the host name is unknown")?;
        Ok(name.trim().to_string())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = NodeConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let node_name = cli.node_name()?;
    let identity = config
        .identity(&node_name)
        .with_context(|| format!("cannot resolve endpoints for node {node_name:?}"))?;

    let session: Arc<dyn SessionRecorder> = match &cli.log {
        Some(dir) => Arc::new(
            SessionLog::open(dir)
                .with_context(|| format!("cannot open session log in {}", dir.display()))?,
        ),
        None => Arc::new(SessionLog::disabled()),
    };

    let rig = Arc::new(JointRig::new(Arc::new(SimulatedActuatorDevice::new())));
    reset_encoders_at_startup(&rig);

    let node = Node::bind(identity, config.timing.clone(), Arc::clone(&rig), session)
        .await
        .context("failed to start transport")?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C"),
            Err(e) => {
                error!("failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    node.run(shutdown).await.context("node stopped on a fatal fault")?;

    info!("exo-node stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
