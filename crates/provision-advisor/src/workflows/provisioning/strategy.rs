//! Pluggable provisioning workloads executed by the worker.

use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::info;

use super::domain::Task;
use super::shutdown::ShutdownSignal;

/// Performs the actual provisioning for a task. Runs on the blocking thread pool.
pub trait ProvisioningStrategy: Send + Sync + 'static {
    fn provision(&self, task: &Task, shutdown: &ShutdownSignal) -> Result<(), ProvisioningError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisioningError {
    #[error("provisioning cancelled by shutdown")]
    Cancelled,
    #[error("provisioning failed: {0}")]
    Failed(String),
}

/// Stand-in for infrastructure provisioning: burns CPU for a fixed wall-clock duration.
#[derive(Debug, Clone)]
pub struct SimulatedProvisioning {
    duration: Duration,
}

impl SimulatedProvisioning {
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(15);

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for SimulatedProvisioning {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION)
    }
}

impl ProvisioningStrategy for SimulatedProvisioning {
    fn provision(&self, task: &Task, shutdown: &ShutdownSignal) -> Result<(), ProvisioningError> {
        info!(
            task_id = %task.id(),
            resource = task.resource_name(),
            duration_ms = self.duration.as_millis() as u64,
            "simulating provisioning workload"
        );

        let Some(deadline) = Instant::now().checked_add(self.duration) else {
            return Err(ProvisioningError::Failed(format!(
                "provisioning duration of {}s is out of range",
                self.duration.as_secs()
            )));
        };
        while Instant::now() < deadline {
            if shutdown.is_triggered() {
                return Err(ProvisioningError::Cancelled);
            }
            black_box((0..10_000u64).map(|x| x * x).sum::<u64>());
        }
        Ok(())
    }
}

/// Completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantProvisioning;

impl ProvisioningStrategy for InstantProvisioning {
    fn provision(&self, _task: &Task, _shutdown: &ShutdownSignal) -> Result<(), ProvisioningError> {
        Ok(())
    }
}
