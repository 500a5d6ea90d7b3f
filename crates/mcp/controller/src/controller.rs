//! Controller runner
//!
//! Feeds a [`WorkQueue`] from store watch events and periodic resyncs and
//! drains it with a fixed pool of workers calling the [`Reconciler`].

use crate::backoff::Backoff;
use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::queue::WorkQueue;
use crate::reconciler::{Action, Reconciler};
use mcp_store::{RecordStore, ResourceStore};
use mcp_types::{Deployable, ObjectKey, WatchEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Maps a change notification to the key that must be reconciled
pub type KeyMapper = fn(&WatchEvent) -> Option<ObjectKey>;

pub struct Controller<R: Reconciler> {
    reconciler: Arc<R>,
    config: ControllerConfig,
    queue: Arc<WorkQueue>,
    backoff: Arc<Backoff>,
    mapper: KeyMapper,
}

impl<R: Reconciler> Controller<R> {
    /// Controller keyed by Deployable, woken by Deployable and owned Work changes
    pub fn new(reconciler: R, config: ControllerConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            backoff: Arc::new(Backoff::new(config.backoff.clone())),
            queue: Arc::new(WorkQueue::new()),
            config,
            mapper: WatchEvent::deployable_key,
        }
    }

    pub fn with_mapper(mut self, mapper: KeyMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    ///
    /// Queued keys are dropped at shutdown: passes already running finish,
    /// no new pass starts. A closed watch stream is reported as an error.
    pub async fn run<S>(self, store: Arc<S>, mut shutdown: watch::Receiver<bool>) -> Result<()>
    where
        S: ResourceStore + ?Sized + 'static,
    {
        let name = self.reconciler.name();
        let mut events = store.watch();

        let workers: Vec<JoinHandle<()>> = (0..self.config.workers.max(1))
            .map(|id| {
                let worker = Worker {
                    id,
                    reconciler: Arc::clone(&self.reconciler),
                    queue: Arc::clone(&self.queue),
                    backoff: Arc::clone(&self.backoff),
                    timeout: self.config.reconcile_timeout,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        info!(
            controller = name,
            workers = workers.len(),
            "Controller started"
        );

        self.resync(&*store).await;

        let mut resync = tokio::time::interval(self.config.resync_interval);
        resync.tick().await;

        let outcome = loop {
            if *shutdown.borrow() {
                break Ok(());
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(key) = (self.mapper)(&event) {
                            debug!(controller = name, key = %key, kind = event.kind.as_str(), "Change observed");
                            self.queue.add(key);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(controller = name, missed, "Watch lagged, resyncing");
                        self.resync(&*store).await;
                    }
                    Err(RecvError::Closed) => break Err(ControllerError::WatchClosed(name)),
                },
                _ = resync.tick() => {
                    debug!(controller = name, "Periodic resync");
                    self.resync(&*store).await;
                }
            }
        };

        self.queue.shutdown();
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(controller = name, error = %e, "Worker task failed");
            }
        }

        info!(controller = name, "Controller stopped");
        outcome
    }

    /// Enqueue every Deployable
    async fn resync<S>(&self, store: &S)
    where
        S: ResourceStore + ?Sized,
    {
        match RecordStore::<Deployable>::list(store).await {
            Ok(deployables) => {
                for deployable in deployables {
                    self.queue.add(deployable.metadata.key());
                }
            }
            Err(e) => warn!(
                controller = self.reconciler.name(),
                error = %e,
                "Resync list failed"
            ),
        }
    }
}

struct Worker<R: Reconciler> {
    id: usize,
    reconciler: Arc<R>,
    queue: Arc<WorkQueue>,
    backoff: Arc<Backoff>,
    timeout: Duration,
}

impl<R: Reconciler> Worker<R> {
    async fn run(self) {
        while let Some(key) = self.queue.get().await {
            self.process(&key).await;
            self.queue.done(&key);
        }
        debug!(controller = self.reconciler.name(), worker = self.id, "Worker exiting");
    }

    async fn process(&self, key: &ObjectKey) {
        let name = self.reconciler.name();
        let failure = match tokio::time::timeout(self.timeout, self.reconciler.reconcile(key)).await
        {
            Ok(Ok(Action::Done)) => {
                self.backoff.forget(key);
                return;
            }
            Ok(Ok(Action::RequeueAfter(delay))) => {
                self.backoff.forget(key);
                self.queue.add_after(key.clone(), delay);
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("reconcile exceeded {:?}", self.timeout),
        };

        let delay = self.backoff.next_delay(key);
        warn!(
            controller = name,
            key = %key,
            error = %failure,
            retry_in_ms = delay.as_millis() as u64,
            "Reconcile failed"
        );
        self.queue.add_after(key.clone(), delay);
    }
}
