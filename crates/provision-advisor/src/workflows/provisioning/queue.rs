//! Delivery of task ids from the request handler to the worker pool.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::domain::TaskId;

/// Producer side of the delivery channel.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, task_id: TaskId) -> Result<(), QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("task queue closed")]
    Closed,
    #[error("task queue unavailable: {0}")]
    Unavailable(String),
}

/// In-process queue backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelTaskQueue {
    sender: mpsc::UnboundedSender<TaskId>,
}

impl TaskQueue for ChannelTaskQueue {
    fn enqueue(&self, task_id: TaskId) -> Result<(), QueueError> {
        self.sender.send(task_id).map_err(|_| QueueError::Closed)
    }
}

/// Consumer side shared by every worker. Each `recv` hands one id to one worker.
#[derive(Debug, Clone)]
pub struct DeliveryReceiver {
    inner: Arc<Mutex<mpsc::UnboundedReceiver<TaskId>>>,
}

impl DeliveryReceiver {
    /// Wait for the next id. `None` once every queue handle is dropped and the backlog drained.
    pub async fn recv(&self) -> Option<TaskId> {
        let mut receiver = self.inner.lock().await;
        receiver.recv().await
    }
}

pub fn task_channel() -> (ChannelTaskQueue, DeliveryReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ChannelTaskQueue { sender },
        DeliveryReceiver {
            inner: Arc::new(Mutex::new(receiver)),
        },
    )
}
