use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::compliance::{ComplianceAdvisor, ComplianceResult};
use super::domain::{NewTask, Task, TaskId, TaskSummaryView};
use super::queue::{QueueError, TaskQueue};
use super::repository::{StoreError, TaskStore};
use super::validation::{validate_request, ValidationError};

/// Number of tasks returned by the recent-task listing.
pub const RECENT_TASK_LIMIT: usize = 10;

/// Intake for provisioning requests: score, persist, then hand off to the workers.
pub struct ProvisioningRequestService<S, Q> {
    advisor: ComplianceAdvisor,
    store: Arc<S>,
    queue: Arc<Q>,
}

/// Synchronous answer to a submission; provisioning continues in the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub task_id: TaskId,
    pub compliance: ComplianceResult,
}

impl<S, Q> ProvisioningRequestService<S, Q>
where
    S: TaskStore + 'static,
    Q: TaskQueue + 'static,
{
    pub fn new(store: Arc<S>, queue: Arc<Q>) -> Self {
        Self {
            advisor: ComplianceAdvisor::new(),
            store,
            queue,
        }
    }

    pub fn advisor(&self) -> &ComplianceAdvisor {
        &self.advisor
    }

    /// Validate and score a raw payload, persist it as QUEUED, then enqueue its id.
    ///
    /// A failing compliance score does not block submission. Nothing is enqueued unless
    /// the insert succeeded.
    pub fn submit(&self, payload: Value) -> Result<SubmissionReceipt, SubmissionError> {
        let request = validate_request(&payload)?;
        let compliance = self.advisor.evaluate(&request);

        let task = self
            .store
            .insert(NewTask::from_request(&request, compliance.clone()))?;
        let task_id = task.id();

        if let Err(err) = self.queue.enqueue(task_id) {
            error!(%task_id, error = %err, "task persisted but could not be enqueued");
            return Err(err.into());
        }

        info!(
            %task_id,
            resource = %request.resource_name,
            score = compliance.score,
            status = compliance.status.label(),
            "provisioning request queued"
        );

        Ok(SubmissionReceipt {
            task_id,
            compliance,
        })
    }

    /// Most recent tasks, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<TaskSummaryView>, SubmissionError> {
        let tasks = self.store.list_recent(limit)?;
        Ok(tasks.iter().map(Task::summary_view).collect())
    }

    pub fn get(&self, task_id: TaskId) -> Result<Task, SubmissionError> {
        let task = self
            .store
            .get(task_id)?
            .ok_or(StoreError::NotFound(task_id))?;
        Ok(task)
    }
}

/// Error raised by the provisioning request service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
