//! Worker runner: polls the task table and executes claimed tasks.
//!
//! A claim commits before the handler runs, so handlers open their own
//! sessions and a crashed execution leaves the task `running` for an
//! operator to inspect.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use datashare_core::config::WorkerConfig;
use datashare_core::result::AppResult;
use datashare_core::types::TaskId;
use datashare_database::store::finish;
use datashare_database::ShareStore;
use datashare_entity::task::Task;

use crate::executor::{TaskExecutionError, TaskExecutor};

/// Main worker runner that polls for tasks and executes them.
pub struct WorkerRunner {
    store: Arc<dyn ShareStore>,
    executor: Arc<TaskExecutor>,
    config: WorkerConfig,
}

impl std::fmt::Debug for WorkerRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRunner")
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(store: Arc<dyn ShareStore>, executor: Arc<TaskExecutor>, config: WorkerConfig) -> Self {
        Self {
            store,
            executor,
            config,
        }
    }

    /// Poll and execute tasks until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            worker_id = %self.config.worker_id,
            concurrency = self.config.concurrency,
            poll_interval = self.config.poll_interval_seconds,
            "Worker started"
        );

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    // A dropped sender can no longer signal anything.
                    if changed.is_err() || *cancel.borrow() {
                        info!(worker_id = %self.config.worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                claimed = self.poll_and_execute(&semaphore) => {
                    if claimed {
                        continue;
                    }
                    tokio::select! {
                        changed = cancel.changed() => {
                            if changed.is_err() || *cancel.borrow() {
                                info!(worker_id = %self.config.worker_id, "Worker shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "Waiting for in-flight tasks to complete");
        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        let _ = time::timeout(Duration::from_secs(30), semaphore.acquire_many(permits)).await;
        info!(worker_id = %self.config.worker_id, "Worker shut down complete");
    }

    /// Claim and execute specific tasks now, one after the other.
    ///
    /// Tasks that are no longer pending are skipped.
    pub async fn process(&self, task_ids: &[TaskId]) -> AppResult<()> {
        for task_id in task_ids {
            let mut session = self.store.begin().await?;
            let claimed = session.claim_task(*task_id, &self.config.worker_id).await;
            let claimed = finish(session, claimed).await?;

            match claimed {
                Some(task) => {
                    Self::execute_and_record(
                        Arc::clone(&self.store),
                        Arc::clone(&self.executor),
                        task,
                        self.config.max_attempts,
                    )
                    .await
                }
                None => debug!(task_id = %task_id, "Task is not pending, skipping"),
            }
        }
        Ok(())
    }

    /// Claim one task and spawn its execution. Returns whether a task was claimed.
    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) -> bool {
        let permit = match Arc::clone(semaphore).try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                trace!("All worker slots occupied");
                return false;
            }
        };

        match self.claim_next().await {
            Ok(Some(task)) => {
                let store = Arc::clone(&self.store);
                let executor = Arc::clone(&self.executor);
                let max_attempts = self.config.max_attempts;
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::execute_and_record(store, executor, task, max_attempts).await;
                });
                true
            }
            Ok(None) => {
                trace!("No pending tasks");
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to claim task");
                false
            }
        }
    }

    async fn claim_next(&self) -> AppResult<Option<Task>> {
        let mut session = self.store.begin().await?;
        let claimed = session.claim_next_task(&self.config.worker_id).await;
        finish(session, claimed).await
    }

    async fn execute_and_record(
        store: Arc<dyn ShareStore>,
        executor: Arc<TaskExecutor>,
        task: Task,
        max_attempts: i32,
    ) {
        let task_id = task.id;
        let outcome = executor.execute(&task).await;

        let recorded: AppResult<()> = async {
            let mut session = store.begin().await?;
            let result = match &outcome {
                Ok(response) => {
                    info!(task_id = %task_id, action = %task.action, "Task completed");
                    session.complete_task(task_id, response.as_ref()).await
                }
                Err(TaskExecutionError::Transient(msg)) if task.attempts < max_attempts => {
                    warn!(
                        task_id = %task_id,
                        attempt = task.attempts,
                        max_attempts,
                        error = %msg,
                        "Task failed, will retry"
                    );
                    session.release_task(task_id, msg).await
                }
                Err(e) => {
                    error!(task_id = %task_id, action = %task.action, error = %e, "Task failed");
                    session.fail_task(task_id, &e.to_string()).await
                }
            };
            finish(session, result).await
        }
        .await;

        if let Err(e) = recorded {
            error!(task_id = %task_id, error = %e, "Failed to record task outcome");
        }
    }
}
