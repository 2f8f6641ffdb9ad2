//! Task executor: dispatches tasks to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use datashare_core::error::{AppError, ErrorKind};
use datashare_entity::task::Task;

/// Trait for task handler implementations.
///
/// Delivery is at-least-once, so handlers must tolerate running twice.
#[async_trait]
pub trait TaskHandler: Send + Sync + std::fmt::Debug {
    /// The action this handler is bound to.
    fn action(&self) -> &str;

    /// Execute the task, returning the response to record on it.
    async fn execute(&self, task: &Task) -> Result<Option<Value>, TaskExecutionError>;
}

/// Error from task execution.
#[derive(Debug, thiserror::Error)]
pub enum TaskExecutionError {
    /// Permanent failure, do not retry.
    #[error("Permanent task failure: {0}")]
    Permanent(String),

    /// Transient failure, may retry.
    #[error("Transient task failure: {0}")]
    Transient(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl TaskExecutionError {
    /// Classify a service error by whether running the task again can help.
    pub fn classify(err: AppError) -> Self {
        match err.kind {
            ErrorKind::Database | ErrorKind::ExternalService | ErrorKind::ManagerOperation => {
                Self::Transient(err.to_string())
            }
            ErrorKind::NotFound
            | ErrorKind::Validation
            | ErrorKind::Conflict
            | ErrorKind::InvalidTransition
            | ErrorKind::Authorization
            | ErrorKind::Configuration => Self::Permanent(err.to_string()),
            _ => Self::Internal(err),
        }
    }
}

/// Dispatches tasks to the handler bound to their action.
#[derive(Debug, Default)]
pub struct TaskExecutor {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskExecutor {
    /// Create an executor with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to its action, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        let action = handler.action().to_string();
        info!(action = %action, "Registered task handler");
        self.handlers.insert(action, handler);
    }

    /// Execute a task with the handler bound to its action.
    pub async fn execute(&self, task: &Task) -> Result<Option<Value>, TaskExecutionError> {
        let handler = self.handlers.get(&task.action).ok_or_else(|| {
            TaskExecutionError::Permanent(format!(
                "No handler registered for action '{}'",
                task.action
            ))
        })?;

        info!(
            task_id = %task.id,
            action = %task.action,
            target_uri = %task.target_uri,
            attempt = task.attempts,
            "Executing task"
        );
        handler.execute(task).await
    }

    /// Whether a handler is bound to `action`.
    pub fn has_handler(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Actions with a bound handler.
    pub fn registered_actions(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
