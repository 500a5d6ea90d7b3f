//! Leader-gated controller manager
//!
//! Each component competes for its own lease. The holder runs the
//! component's controller and keeps renewing; when the lease is lost the
//! controller is stopped and the manager goes back to standby. Standbys
//! poll for the lease and do no reconciliation work.

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use mcp_controller::{Controller, ControllerError, LeaderElector, LeadershipResult, RenewalResult};
use mcp_dispatch::DispatchController;
use mcp_scheduler::Scheduler;
use mcp_store::ResourceStore;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A control loop hosted by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Scheduler,
    ControllerManager,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Scheduler => "scheduler",
            Component::ControllerManager => "controller-manager",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a leadership term ended
enum Tenure {
    Shutdown,
    Lost,
    Exited(DaemonResult<()>),
}

#[derive(Clone)]
pub struct Manager {
    store: Arc<dyn ResourceStore>,
    elector: Arc<dyn LeaderElector>,
    config: DaemonConfig,
    identity: String,
}

impl Manager {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        elector: Arc<dyn LeaderElector>,
        config: DaemonConfig,
    ) -> Self {
        Self {
            store,
            elector,
            config,
            identity: format!("mcpd-{}", Uuid::new_v4()),
        }
    }

    /// Identity used when competing for leases
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Run the components until `shutdown` flips to `true`
    pub async fn run(
        self,
        components: Vec<Component>,
        shutdown: watch::Receiver<bool>,
    ) -> DaemonResult<()> {
        let handles: Vec<(Component, JoinHandle<DaemonResult<()>>)> = components
            .into_iter()
            .map(|component| {
                let manager = self.clone();
                let shutdown = shutdown.clone();
                (component, tokio::spawn(manager.run_component(component, shutdown)))
            })
            .collect();

        let mut first_error = None;
        for (component, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(DaemonError::Task(format!("{component}: {e}"))),
            };
            if let Err(e) = result {
                error!(component = %component, error = %e, "Component failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn run_component(
        self,
        component: Component,
        mut shutdown: watch::Receiver<bool>,
    ) -> DaemonResult<()> {
        let election = &self.config.leader_election;
        if !election.leader_elect {
            info!(component = %component, "Leader election disabled");
            return joined(self.spawn_controller(component, shutdown).await);
        }

        let lock = match component {
            Component::Scheduler => election.lock(&election.scheduler_lock),
            Component::ControllerManager => election.lock(&election.controller_manager_lock),
        };

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            match self.elector.try_acquire(&lock, &self.identity).await? {
                LeadershipResult::Acquired { lease_token, .. } => {
                    info!(
                        component = %component,
                        lock = %lock,
                        identity = %self.identity,
                        "Acquired leadership"
                    );

                    let (stop, stopped) = watch::channel(false);
                    let mut controller = self.spawn_controller(component, stopped);

                    match self
                        .hold_lease(&lock, &lease_token, &mut controller, &mut shutdown)
                        .await
                    {
                        Tenure::Exited(result) => {
                            self.release(&lock, &lease_token).await;
                            return result;
                        }
                        Tenure::Shutdown => {
                            let _ = stop.send(true);
                            let result = joined(controller.await);
                            self.release(&lock, &lease_token).await;
                            return result;
                        }
                        Tenure::Lost => {
                            let _ = stop.send(true);
                            joined(controller.await)?;
                            warn!(component = %component, lock = %lock, "Leadership lost, standing by");
                        }
                    }
                }
                LeadershipResult::NotLeader { current_leader } => {
                    debug!(
                        component = %component,
                        lock = %lock,
                        leader = current_leader.as_deref().unwrap_or("unknown"),
                        "Standing by"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(election.retry_period()) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Renew the lease until shutdown, loss, or the controller exiting
    async fn hold_lease(
        &self,
        lock: &str,
        lease_token: &str,
        controller: &mut JoinHandle<mcp_controller::Result<()>>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Tenure {
        let mut renew = tokio::time::interval(self.config.leader_election.renew_interval());
        renew.tick().await;

        loop {
            tokio::select! {
                result = &mut *controller => return Tenure::Exited(joined(result)),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Tenure::Shutdown;
                    }
                }
                _ = renew.tick() => match self.elector.renew(lock, lease_token).await {
                    Ok(RenewalResult::Renewed { .. }) => debug!(lock, "Lease renewed"),
                    Ok(rejected) => {
                        warn!(lock, result = ?rejected, "Lease renewal rejected");
                        return Tenure::Lost;
                    }
                    Err(e) => {
                        warn!(lock, error = %e, "Lease renewal failed");
                        return Tenure::Lost;
                    }
                },
            }
        }
    }

    async fn release(&self, lock: &str, lease_token: &str) {
        match self.elector.release(lock, lease_token).await {
            Ok(true) => info!(lock, "Released leadership"),
            Ok(false) => debug!(lock, "Lease already expired"),
            Err(e) => warn!(lock, error = %e, "Failed to release lease"),
        }
    }

    fn spawn_controller(
        &self,
        component: Component,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<mcp_controller::Result<()>> {
        let store = Arc::clone(&self.store);
        match component {
            Component::Scheduler => {
                let controller = Controller::new(
                    Scheduler::new(Arc::clone(&store)),
                    self.config.scheduler.controller_config(),
                );
                tokio::spawn(controller.run(store, shutdown))
            }
            Component::ControllerManager => {
                let controller = Controller::new(
                    DispatchController::new(Arc::clone(&store)),
                    self.config.dispatch.controller_config(),
                );
                tokio::spawn(controller.run(store, shutdown))
            }
        }
    }
}

fn joined(result: Result<Result<(), ControllerError>, JoinError>) -> DaemonResult<()> {
    match result {
        Ok(outcome) => outcome.map_err(DaemonError::from),
        Err(e) => Err(DaemonError::Task(e.to_string())),
    }
}
