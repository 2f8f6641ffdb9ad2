//! Enqueuing tasks as part of a unit of work.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use datashare_core::result::AppResult;
use datashare_core::types::TaskId;
use datashare_entity::task::Task;

use crate::store::ShareSession;

/// Producer side of the task queue.
///
/// Tasks are written through the caller's session, so they become visible
/// to workers only when the operation that produced them commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskQueue;

impl TaskQueue {
    /// Create a new task queue handle.
    pub fn new() -> Self {
        Self
    }

    /// Enqueue a pending task and return its id.
    pub async fn enqueue(
        &self,
        session: &mut dyn ShareSession,
        action: &str,
        target_uri: Uuid,
        payload: Value,
    ) -> AppResult<TaskId> {
        let task = Task::new(action, target_uri, payload);
        session.insert_task(&task).await?;
        debug!(task_id = %task.id, action, target_uri = %target_uri, "Task enqueued");
        Ok(task.id)
    }
}
