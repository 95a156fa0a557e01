use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::compliance::{ComplianceResult, ComplianceStatus};

/// Inbound description of the resource a client wants provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub resource_name: String,
    pub environment: String,
    pub instance_type: String,
    pub encrypted: bool,
    pub tags: BTreeMap<String, String>,
    pub security_group: SecurityGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub allowed_cidrs: Vec<String>,
}

/// Store-assigned identifier; monotonic within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a provisioning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Validate a move to `next`. Only QUEUED -> PROCESSING -> COMPLETED is legal.
    pub fn transition_to(self, next: TaskStatus) -> Result<TaskStatus, TransitionError> {
        match (self, next) {
            (Self::Queued, Self::Processing) | (Self::Processing, Self::Completed) => Ok(next),
            (from, to) => Err(TransitionError { from, to }),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal task transition {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Row handed to the store before an id exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub resource_name: String,
    pub environment: String,
    pub compliance: ComplianceResult,
}

impl NewTask {
    pub fn from_request(request: &ResourceRequest, compliance: ComplianceResult) -> Self {
        Self {
            resource_name: request.resource_name.clone(),
            environment: request.environment.clone(),
            compliance,
        }
    }
}

/// Persisted task. Compliance fields are fixed at creation; only the status moves.
///
/// Rows come from [`Task::queued`] and change through [`Task::advance`]; there is no
/// deserializer that could build one in an arbitrary state:
///
/// ```compile_fail
/// use provision_advisor::workflows::provisioning::Task;
///
/// let _task: Task = serde_json::from_str(r#"{"status": "COMPLETED"}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: TaskId,
    resource_name: String,
    environment: String,
    compliance_score: u8,
    compliance_status: ComplianceStatus,
    suggestions: Vec<String>,
    status: TaskStatus,
}

impl Task {
    /// Materialize a freshly inserted row. Stores call this once per insert.
    pub fn queued(id: TaskId, new_task: NewTask) -> Self {
        let NewTask {
            resource_name,
            environment,
            compliance,
        } = new_task;

        Self {
            id,
            resource_name,
            environment,
            compliance_score: compliance.score,
            compliance_status: compliance.status,
            suggestions: compliance.suggestions,
            status: TaskStatus::Queued,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn compliance_score(&self) -> u8 {
        self.compliance_score
    }

    pub fn compliance_status(&self) -> ComplianceStatus {
        self.compliance_status
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn advance(&mut self, next: TaskStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition_to(next)?;
        Ok(())
    }

    pub fn summary_view(&self) -> TaskSummaryView {
        TaskSummaryView {
            id: self.id,
            resource: self.resource_name.clone(),
            score: self.compliance_score,
            status: self.status,
            suggestions: self.suggestions.clone(),
        }
    }
}

/// Public listing shape for `GET /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummaryView {
    pub id: TaskId,
    pub resource: String,
    pub score: u8,
    pub status: TaskStatus,
    pub suggestions: Vec<String>,
}
