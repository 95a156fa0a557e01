use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::{json, Value};

use crate::auth::Authenticator;
use crate::config::AuthConfig;
use crate::workflows::provisioning::domain::{NewTask, Task, TaskId, TaskStatus};
use crate::workflows::provisioning::queue::{QueueError, TaskQueue};
use crate::workflows::provisioning::repository::{StoreError, TaskStore};
use crate::workflows::provisioning::shutdown::ShutdownSignal;
use crate::workflows::provisioning::strategy::{ProvisioningError, ProvisioningStrategy};
use crate::workflows::provisioning::{provisioning_router, ProvisioningRequestService};

pub(super) fn failing_payload() -> Value {
    json!({
        "resource_name": "db1",
        "environment": "dev",
        "instance_type": "large",
        "encrypted": false,
        "tags": {},
        "security_group": { "allowed_cidrs": ["0.0.0.0/0"] }
    })
}

pub(super) fn compliant_payload() -> Value {
    json!({
        "resource_name": "orders-api",
        "environment": "prod",
        "instance_type": "small",
        "encrypted": true,
        "tags": { "Owner": "DevOpsTeam", "Project": "AI-Advisor" },
        "security_group": { "allowed_cidrs": ["10.0.0.1/32"] }
    })
}

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "unit-test-secret".to_string(),
        username: "admin".to_string(),
        password: "password123".to_string(),
        token_ttl_minutes: 5,
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    rows: Mutex<BTreeMap<TaskId, Task>>,
    next_id: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .map(Task::status)
    }

    pub(super) fn len(&self) -> usize {
        self.rows.lock().expect("store mutex poisoned").len()
    }
}

impl TaskStore for MemoryStore {
    fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst) as u64 + 1);
        let task = Task::queued(id, task);
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .insert(id, task.clone());
        Ok(task)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        match rows.get_mut(&task.id()) {
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
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if row.status() != from {
            return Ok(false);
        }
        row.advance(to)?;
        Ok(true)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableStore;

impl TaskStore for UnavailableStore {
    fn insert(&self, _task: NewTask) -> Result<Task, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get(&self, _id: TaskId) -> Result<Option<Task>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _task: &Task) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _id: TaskId,
        _from: TaskStatus,
        _to: TaskStatus,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list_recent(&self, _limit: usize) -> Result<Vec<Task>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Holds the first two `get` calls at a barrier so two deliveries read the same
/// QUEUED row before either writes.
pub(super) struct BarrierStore {
    inner: MemoryStore,
    barrier: Barrier,
    gets: AtomicUsize,
}

impl BarrierStore {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryStore::default(),
            barrier: Barrier::new(2),
            gets: AtomicUsize::new(0),
        }
    }

    pub(super) fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.inner.status_of(id)
    }
}

impl TaskStore for BarrierStore {
    fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        self.inner.insert(task)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let row = self.inner.get(id)?;
        if self.gets.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait();
        }
        Ok(row)
    }

    fn update(&self, task: &Task) -> Result<(), StoreError> {
        self.inner.update(task)
    }

    fn transition(
        &self,
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, StoreError> {
        self.inner.transition(id, from, to)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Task>, StoreError> {
        self.inner.list_recent(limit)
    }
}

/// Records enqueued ids along with the status the store reported at enqueue time.
pub(super) struct RecordingQueue {
    store: Arc<MemoryStore>,
    enqueued: Mutex<Vec<(TaskId, Option<TaskStatus>)>>,
}

impl RecordingQueue {
    pub(super) fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            enqueued: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn enqueued(&self) -> Vec<(TaskId, Option<TaskStatus>)> {
        self.enqueued.lock().expect("queue mutex poisoned").clone()
    }
}

impl TaskQueue for RecordingQueue {
    fn enqueue(&self, task_id: TaskId) -> Result<(), QueueError> {
        let observed = self.store.status_of(task_id);
        self.enqueued
            .lock()
            .expect("queue mutex poisoned")
            .push((task_id, observed));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct CountingQueue {
    count: AtomicUsize,
}

impl CountingQueue {
    pub(super) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl TaskQueue for CountingQueue {
    fn enqueue(&self, _task_id: TaskId) -> Result<(), QueueError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct ClosedQueue;

impl TaskQueue for ClosedQueue {
    fn enqueue(&self, _task_id: TaskId) -> Result<(), QueueError> {
        Err(QueueError::Closed)
    }
}

/// Counts workload executions and finishes immediately.
#[derive(Default)]
pub(super) struct CountingStrategy {
    runs: AtomicUsize,
}

impl CountingStrategy {
    pub(super) fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ProvisioningStrategy for CountingStrategy {
    fn provision(&self, _task: &Task, _shutdown: &ShutdownSignal) -> Result<(), ProvisioningError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct FailingStrategy;

impl ProvisioningStrategy for FailingStrategy {
    fn provision(&self, _task: &Task, _shutdown: &ShutdownSignal) -> Result<(), ProvisioningError> {
        Err(ProvisioningError::Failed("quota exceeded".to_string()))
    }
}

/// Blocks inside the workload until the test releases it.
pub(super) struct GatedStrategy {
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedStrategy {
    pub(super) fn new() -> (Self, mpsc::Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                release: Mutex::new(receiver),
            },
            sender,
        )
    }
}

impl ProvisioningStrategy for GatedStrategy {
    fn provision(&self, _task: &Task, _shutdown: &ShutdownSignal) -> Result<(), ProvisioningError> {
        self.release
            .lock()
            .expect("gate mutex poisoned")
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| ProvisioningError::Failed("gate never released".to_string()))
    }
}

pub(super) async fn wait_for_status(store: &MemoryStore, id: TaskId, expected: TaskStatus) {
    for _ in 0..200 {
        if store.status_of(id) == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "task {id} never reached {expected}, last seen {:?}",
        store.status_of(id)
    );
}

pub(super) fn build_service() -> (
    ProvisioningRequestService<MemoryStore, CountingQueue>,
    Arc<MemoryStore>,
    Arc<CountingQueue>,
) {
    let store = Arc::new(MemoryStore::default());
    let queue = Arc::new(CountingQueue::default());
    let service = ProvisioningRequestService::new(store.clone(), queue.clone());
    (service, store, queue)
}

pub(super) fn router_with_service(
    service: ProvisioningRequestService<MemoryStore, CountingQueue>,
) -> axum::Router {
    provisioning_router(
        Arc::new(service),
        Arc::new(Authenticator::from_config(&auth_config())),
    )
}

pub(super) fn bearer_token() -> String {
    let token = Authenticator::from_config(&auth_config())
        .login("admin", "password123")
        .expect("login succeeds");
    format!("Bearer {}", token.access_token)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
