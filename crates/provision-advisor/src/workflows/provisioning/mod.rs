//! Provisioning request pipeline: compliance scoring, task persistence, and the
//! background workers that move each task from QUEUED to COMPLETED.

pub mod compliance;
pub mod domain;
pub mod queue;
pub mod repository;
pub mod router;
pub mod service;
pub mod shutdown;
pub mod strategy;
pub mod validation;
pub mod worker;

#[cfg(test)]
mod tests;

pub use compliance::{ComplianceAdvisor, ComplianceResult, ComplianceStatus, PASSING_SCORE};
pub use domain::{
    NewTask, ResourceRequest, SecurityGroup, Task, TaskId, TaskStatus, TaskSummaryView,
    TransitionError,
};
pub use queue::{task_channel, ChannelTaskQueue, DeliveryReceiver, QueueError, TaskQueue};
pub use repository::{StoreError, TaskStore};
pub use router::provisioning_router;
pub use service::{
    ProvisioningRequestService, SubmissionError, SubmissionReceipt, RECENT_TASK_LIMIT,
};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use strategy::{
    InstantProvisioning, ProvisioningError, ProvisioningStrategy, SimulatedProvisioning,
};
pub use validation::{validate_request, FieldIssue, ValidationError};
pub use worker::{ProvisioningWorker, WorkerError, WorkerOutcome, WorkerPool};
