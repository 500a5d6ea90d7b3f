//! MCP Daemon - multi-cluster placement and dispatch
//!
//! `mcpd` hosts two control loops over one resource store:
//! - `scheduler`: decides which clusters receive which resources
//! - `controller-manager`: materializes one Work per target cluster and
//!   removes them before a Deployable is deleted
//!
//! `all` runs both in one process, which is the only useful mode with the
//! in-memory store.

use clap::{Args, Parser, Subcommand};
use mcp_controller::InMemoryLeaderElector;
use mcp_daemon::config::{DaemonConfig, StoreConfig};
use mcp_daemon::error::{DaemonError, DaemonResult};
use mcp_daemon::kinds::check_kinds;
use mcp_daemon::{logging, Component, Manager, SeedFile};
use mcp_store::{InMemoryStore, ResourceStore};
use mcp_types::RecordKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// MCP Daemon CLI
#[derive(Parser)]
#[command(name = "mcpd")]
#[command(about = "MCP Daemon - Multi-cluster placement and dispatch", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MCP_CONFIG", global = true)]
    config: Option<String>,

    /// Log level or filter directives
    #[arg(long, env = "MCP_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "MCP_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the placement scheduler
    Scheduler(CommonArgs),

    /// Run the ManifestWork dispatch controller
    ControllerManager {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        dispatch: DispatchArgs,
    },

    /// Run both loops in one process
    All {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        dispatch: DispatchArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Only reconcile while holding the leader lease [default: true]
    #[arg(long, env = "MCP_LEADER_ELECT")]
    leader_elect: Option<bool>,

    /// Refuse to start unless the store serves every record kind [default: true]
    #[arg(long, alias = "enable-crd-check", env = "MCP_ENABLE_KIND_CHECK")]
    enable_kind_check: Option<bool>,

    /// JSON file with manifests and deployables to load at start
    #[arg(long, env = "MCP_SEED")]
    seed: Option<PathBuf>,
}

#[derive(Args)]
struct DispatchArgs {
    /// Concurrency of the ManifestWork controller [default: 10]
    #[arg(long, env = "MCP_CONCURRENCY_MANIFESTWORK")]
    concurrency_manifestwork: Option<usize>,
}

impl Command {
    fn components(&self) -> Vec<Component> {
        match self {
            Command::Scheduler(_) => vec![Component::Scheduler],
            Command::ControllerManager { .. } => vec![Component::ControllerManager],
            Command::All { .. } => vec![Component::Scheduler, Component::ControllerManager],
        }
    }

    fn common(&self) -> &CommonArgs {
        match self {
            Command::Scheduler(common)
            | Command::ControllerManager { common, .. }
            | Command::All { common, .. } => common,
        }
    }

    fn dispatch(&self) -> Option<&DispatchArgs> {
        match self {
            Command::Scheduler(_) => None,
            Command::ControllerManager { dispatch, .. } | Command::All { dispatch, .. } => {
                Some(dispatch)
            }
        }
    }
}

impl Cli {
    /// Flags win over the file and environment layers
    fn apply(&self, config: &mut DaemonConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json {
            config.logging.json = true;
        }

        let common = self.command.common();
        if let Some(leader_elect) = common.leader_elect {
            config.leader_election.leader_elect = leader_elect;
        }
        if let Some(enable) = common.enable_kind_check {
            config.enable_kind_check = enable;
        }
        if let Some(workers) = self
            .command
            .dispatch()
            .and_then(|d| d.concurrency_manifestwork)
        {
            config.dispatch.workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    logging::init(&config.logging)?;

    let components = cli.command.components();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        components = ?components.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        leader_elect = config.leader_election.leader_elect,
        dispatch_workers = config.dispatch.workers,
        "Starting mcpd"
    );

    let store: Arc<dyn ResourceStore> = match config.store {
        StoreConfig::Memory => Arc::new(InMemoryStore::new()),
    };

    if config.enable_kind_check {
        check_kinds(&*store, &RecordKind::ALL)?;
    }

    if let Some(path) = &cli.command.common().seed {
        SeedFile::load(path)?.apply(&*store).await?;
    }

    let elector = Arc::new(InMemoryLeaderElector::new(
        config.leader_election.lease_duration(),
    ));
    let manager = Manager::new(store, elector, config);

    let (stop, shutdown) = watch::channel(false);
    let mut running = tokio::spawn(manager.run(components, shutdown));

    tokio::select! {
        result = &mut running => return joined(result),
        _ = shutdown_signal() => {}
    }

    tracing::info!("mcpd shutting down");
    let _ = stop.send(true);
    joined(running.await)
}

fn joined(result: Result<DaemonResult<()>, tokio::task::JoinError>) -> DaemonResult<()> {
    result.map_err(|e| DaemonError::Task(e.to_string()))?
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_controller_manager_flags_override_config() {
        let cli = Cli::parse_from([
            "mcpd",
            "controller-manager",
            "--leader-elect",
            "false",
            "--concurrency-manifestwork",
            "3",
            "--enable-kind-check",
            "false",
        ]);
        let mut config = DaemonConfig::default();
        cli.apply(&mut config);

        assert_eq!(cli.command.components(), vec![Component::ControllerManager]);
        assert!(!config.leader_election.leader_elect);
        assert!(!config.enable_kind_check);
        assert_eq!(config.dispatch.workers, 3);
    }

    #[test]
    fn test_scheduler_keeps_config_defaults() {
        let cli = Cli::parse_from(["mcpd", "--log-level", "debug", "scheduler"]);
        let mut config = DaemonConfig::default();
        cli.apply(&mut config);

        assert_eq!(cli.command.components(), vec![Component::Scheduler]);
        assert!(config.leader_election.leader_elect);
        assert_eq!(config.dispatch.workers, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_crd_check_alias() {
        let cli = Cli::parse_from(["mcpd", "scheduler", "--enable-crd-check", "false"]);
        let mut config = DaemonConfig::default();
        cli.apply(&mut config);
        assert!(!config.enable_kind_check);
    }

    #[test]
    fn test_all_runs_both_components() {
        let cli = Cli::parse_from(["mcpd", "all", "--seed", "seed.json"]);
        assert_eq!(
            cli.command.components(),
            vec![Component::Scheduler, Component::ControllerManager]
        );
        assert_eq!(
            cli.command.common().seed.as_deref(),
            Some(std::path::Path::new("seed.json"))
        );
    }
}
