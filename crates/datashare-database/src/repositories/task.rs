//! Task queue repository implementation.

use serde_json::Value;
use sqlx::PgConnection;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_core::types::TaskId;
use datashare_entity::task::{Task, TaskStatus};

/// Repository for persisted tasks.
#[derive(Debug, Clone, Copy)]
pub struct TaskRepository;

impl TaskRepository {
    /// Insert a new task.
    pub async fn create(conn: &mut PgConnection, task: &Task) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO tasks (id, target_uri, action, payload, status, response, error_message, \
             attempts, worker_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(task.id)
        .bind(task.target_uri)
        .bind(&task.action)
        .bind(&task.payload)
        .bind(task.status)
        .bind(&task.response)
        .bind(&task.error_message)
        .bind(task.attempts)
        .bind(&task.worker_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create task", e))?;
        Ok(())
    }

    /// Find a task by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: TaskId) -> AppResult<Option<Task>> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find task", e))
    }

    /// Claim the oldest pending task (SKIP LOCKED for concurrent workers).
    pub async fn claim_next(conn: &mut PgConnection, worker_id: &str) -> AppResult<Option<Task>> {
        sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = $1, worker_id = $2, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = (\
                 SELECT id FROM tasks WHERE status = $3 \
                 ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED\
             ) RETURNING *",
        )
        .bind(TaskStatus::Running)
        .bind(worker_id)
        .bind(TaskStatus::Pending)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim task", e))
    }

    /// Claim a specific pending task.
    pub async fn claim(conn: &mut PgConnection, id: TaskId, worker_id: &str) -> AppResult<Option<Task>> {
        sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = $1, worker_id = $2, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = (\
                 SELECT id FROM tasks WHERE id = $3 AND status = $4 FOR UPDATE SKIP LOCKED\
             ) RETURNING *",
        )
        .bind(TaskStatus::Running)
        .bind(worker_id)
        .bind(id)
        .bind(TaskStatus::Pending)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim task", e))
    }

    /// Mark a task as completed.
    pub async fn complete(conn: &mut PgConnection, id: TaskId, response: Option<&Value>) -> AppResult<()> {
        sqlx::query(
            "UPDATE tasks SET status = $2, response = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(TaskStatus::Completed)
        .bind(response)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete task", e))?;
        Ok(())
    }

    /// Mark a task as failed.
    pub async fn fail(conn: &mut PgConnection, id: TaskId, error_message: &str) -> AppResult<()> {
        Self::set_error(conn, id, TaskStatus::Failed, error_message).await
    }

    /// Return a task to the pending queue.
    pub async fn release(conn: &mut PgConnection, id: TaskId, error_message: &str) -> AppResult<()> {
        Self::set_error(conn, id, TaskStatus::Pending, error_message).await
    }

    async fn set_error(
        conn: &mut PgConnection,
        id: TaskId,
        status: TaskStatus,
        error_message: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE tasks SET status = $2, error_message = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update task", e))?;
        Ok(())
    }
}
