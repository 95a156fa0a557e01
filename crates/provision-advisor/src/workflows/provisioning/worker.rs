use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::domain::{Task, TaskId, TaskStatus, TransitionError};
use super::queue::DeliveryReceiver;
use super::repository::{StoreError, TaskStore};
use super::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
use super::strategy::{ProvisioningError, ProvisioningStrategy};

/// What a single delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed,
    /// No row for the delivered id; dropped.
    Missing,
    /// Already picked up by an earlier delivery.
    Skipped(TaskStatus),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("task {task_id} left PROCESSING: {source}")]
    Provisioning {
        task_id: TaskId,
        #[source]
        source: ProvisioningError,
    },
    #[error("provisioning workload panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Drives one task through QUEUED -> PROCESSING -> COMPLETED.
///
/// Each step is a conditional store transition, so concurrent deliveries of one id run
/// the workload at most once.
pub struct ProvisioningWorker<S, P> {
    store: Arc<S>,
    strategy: Arc<P>,
    shutdown: ShutdownSignal,
}

impl<S, P> ProvisioningWorker<S, P>
where
    S: TaskStore + 'static,
    P: ProvisioningStrategy,
{
    pub fn new(store: Arc<S>, strategy: Arc<P>, shutdown: ShutdownSignal) -> Self {
        Self {
            store,
            strategy,
            shutdown,
        }
    }

    /// Process one delivery. Safe to call repeatedly with the same id.
    pub async fn handle(&self, task_id: TaskId) -> Result<WorkerOutcome, WorkerError> {
        // Pre-check only; the conditional transition decides which delivery owns the task.
        let Some(mut task) = self.store.get(task_id)? else {
            warn!(%task_id, "delivered task not found, dropping");
            return Ok(WorkerOutcome::Missing);
        };

        if task.status() != TaskStatus::Queued {
            debug!(%task_id, status = %task.status(), "task already picked up, skipping redelivery");
            return Ok(WorkerOutcome::Skipped(task.status()));
        }

        if !self
            .store
            .transition(task_id, TaskStatus::Queued, TaskStatus::Processing)?
        {
            let current = self.current_status(task_id, TaskStatus::Processing)?;
            debug!(%task_id, status = %current, "another delivery claimed the task, skipping");
            return Ok(WorkerOutcome::Skipped(current));
        }
        task.advance(TaskStatus::Processing)?;
        info!(%task_id, resource = task.resource_name(), "processing task");

        self.run_workload(task).await?;
        if !self
            .store
            .transition(task_id, TaskStatus::Processing, TaskStatus::Completed)?
        {
            let current = self.current_status(task_id, TaskStatus::Completed)?;
            warn!(%task_id, status = %current, "task left PROCESSING while the workload ran");
            return Ok(WorkerOutcome::Skipped(current));
        }
        info!(%task_id, "task completed");

        Ok(WorkerOutcome::Completed)
    }

    fn current_status(
        &self,
        task_id: TaskId,
        fallback: TaskStatus,
    ) -> Result<TaskStatus, WorkerError> {
        Ok(self
            .store
            .get(task_id)?
            .map_or(fallback, |task| task.status()))
    }

    async fn run_workload(&self, task: Task) -> Result<(), WorkerError> {
        let strategy = Arc::clone(&self.strategy);
        let shutdown = self.shutdown.clone();

        tokio::task::spawn_blocking(move || {
            let result = strategy.provision(&task, &shutdown);
            (task, result)
        })
        .await
        .map_err(WorkerError::from)
        .and_then(|(task, result)| match result {
            Ok(()) => Ok(()),
            Err(source) => Err(WorkerError::Provisioning {
                task_id: task.id(),
                source,
            }),
        })
    }
}

/// A set of workers pulling from one shared delivery receiver.
pub struct WorkerPool {
    trigger: ShutdownTrigger,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn<S, P>(
        concurrency: usize,
        deliveries: DeliveryReceiver,
        store: Arc<S>,
        strategy: Arc<P>,
    ) -> Self
    where
        S: TaskStore + 'static,
        P: ProvisioningStrategy,
    {
        let (trigger, signal) = shutdown_channel();
        let worker = Arc::new(ProvisioningWorker::new(store, strategy, signal.clone()));

        let joins = (0..concurrency.max(1))
            .map(|worker_id| {
                let worker = Arc::clone(&worker);
                let deliveries = deliveries.clone();
                let signal = signal.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, worker, deliveries, signal).await;
                })
            })
            .collect();

        info!(concurrency = concurrency.max(1), "provisioning worker pool started");
        Self { trigger, joins }
    }

    pub fn worker_count(&self) -> usize {
        self.joins.len()
    }

    /// Stop taking deliveries and cancel in-flight workloads, then wait for every worker.
    pub async fn shutdown_and_join(self) {
        self.trigger.trigger();
        for join in self.joins {
            if let Err(err) = join.await {
                error!(error = %err, "worker task ended abnormally");
            }
        }
        info!("provisioning worker pool stopped");
    }
}

async fn worker_loop<S, P>(
    worker_id: usize,
    worker: Arc<ProvisioningWorker<S, P>>,
    deliveries: DeliveryReceiver,
    mut shutdown: ShutdownSignal,
) where
    S: TaskStore + 'static,
    P: ProvisioningStrategy,
{
    loop {
        if shutdown.is_triggered() {
            break;
        }

        let delivery = tokio::select! {
            _ = shutdown.triggered() => break,
            delivery = deliveries.recv() => delivery,
        };

        let Some(task_id) = delivery else {
            debug!(worker_id, "delivery channel closed");
            break;
        };

        match worker.handle(task_id).await {
            Ok(outcome) => debug!(worker_id, %task_id, ?outcome, "delivery handled"),
            Err(err) => error!(worker_id, %task_id, error = %err, "delivery failed"),
        }
    }
}
