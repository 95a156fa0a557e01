use metrics_exporter_prometheus::PrometheusHandle;
use provision_advisor::workflows::provisioning::{
    NewTask, StoreError, Task, TaskId, TaskStatus, TaskStore,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct TaskTable {
    last_id: u64,
    rows: BTreeMap<TaskId, Task>,
}

/// Process-local task table. Ids are assigned in insertion order, so the newest
/// task is always the highest key.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTaskStore {
    table: Arc<Mutex<TaskTable>>,
}

impl InMemoryTaskStore {
    fn lock(&self) -> Result<MutexGuard<'_, TaskTable>, StoreError> {
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("task table mutex poisoned".to_string()))
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut table = self.lock()?;
        table.last_id += 1;
        let task = Task::queued(TaskId(table.last_id), task);
        table.rows.insert(task.id(), task.clone());
        Ok(task)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        match table.rows.get_mut(&task.id()) {
            Some(row) => {
                *row = task.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(task.id())),
        }
    }

    fn transition(
        &self,
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, StoreError> {
        let mut table = self.lock()?;
        let row = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if row.status() != from {
            return Ok(false);
        }
        row.advance(to)?;
        Ok(true)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Task>, StoreError> {
        let table = self.lock()?;
        Ok(table.rows.values().rev().take(limit).cloned().collect())
    }
}
