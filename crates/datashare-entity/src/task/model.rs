//! Task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use datashare_core::types::TaskId;

use super::status::TaskStatus;

/// A unit of deferred work: an action name plus a JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Resource the task acts on.
    pub target_uri: Uuid,
    /// Action name the handler is bound to (e.g. `"ecs.share.approve"`).
    pub action: String,
    /// Action-specific payload.
    pub payload: serde_json::Value,
    /// Current status.
    pub status: TaskStatus,
    /// Handler response on completion.
    pub response: Option<serde_json::Value>,
    /// Error message on failure.
    pub error_message: Option<String>,
    /// Number of execution attempts.
    pub attempts: i32,
    /// Worker that last claimed the task.
    pub worker_id: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a new pending task.
    pub fn new(action: &str, target_uri: Uuid, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            target_uri,
            action: action.to_string(),
            payload,
            status: TaskStatus::Pending,
            response: None,
            error_message: None,
            attempts: 0,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
