use super::domain::{NewTask, Task, TaskId, TaskStatus, TransitionError};

/// Storage abstraction; the single source of truth for task state.
///
/// Implementations must make each `insert` and `update` visible to subsequent `get`
/// calls before returning, since the request handler enqueues immediately after insert.
pub trait TaskStore: Send + Sync {
    /// Persist a new QUEUED task, assigning a unique monotonic id.
    fn insert(&self, task: NewTask) -> Result<Task, StoreError>;
    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;
    /// Commit the full row. Fails with `NotFound` for unknown ids.
    fn update(&self, task: &Task) -> Result<(), StoreError>;
    /// Move a row from `from` to `to` only if its stored status is still `from`.
    ///
    /// Returns `Ok(false)` when another writer got there first. The check and the write
    /// must be one atomic step so concurrent deliveries of an id cannot both win.
    fn transition(&self, id: TaskId, from: TaskStatus, to: TaskStatus) -> Result<bool, StoreError>;
    /// Most recent tasks first.
    fn list_recent(&self, limit: usize) -> Result<Vec<Task>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}
