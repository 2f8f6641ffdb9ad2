//! Dataset table notifications.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use datashare_auth::ResourcePolicyChecker;
use datashare_auth::permissions::UPDATE_DATASET_TABLE;
use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::{TableId, TaskId};
use datashare_database::store::finish;
use datashare_database::{ShareSession, ShareStore, TaskQueue};
use datashare_entity::task::action;

use crate::context::RequestContext;

/// Operations on the tables of a dataset.
#[derive(Clone)]
pub struct DatasetTableService {
    store: Arc<dyn ShareStore>,
    checker: ResourcePolicyChecker,
    queue: TaskQueue,
}

impl std::fmt::Debug for DatasetTableService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetTableService").finish_non_exhaustive()
    }
}

impl DatasetTableService {
    /// Creates a new dataset table service.
    pub fn new(store: Arc<dyn ShareStore>) -> Self {
        Self {
            store,
            checker: ResourcePolicyChecker::new(),
            queue: TaskQueue::new(),
        }
    }

    /// Announce that a table's data changed.
    ///
    /// Queues one notification task for the dataset's environment topic;
    /// the worker publishes it to subscribers.
    pub async fn publish_table_update(&self, ctx: &RequestContext, table_id: TableId) -> AppResult<TaskId> {
        let mut session = self.store.begin().await?;
        let result = self.publish_in(session.as_mut(), ctx, table_id).await;
        finish(session, result).await
    }

    async fn publish_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        table_id: TableId,
    ) -> AppResult<TaskId> {
        let table = session
            .find_table(table_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Table {table_id} not found")))?;

        self.checker
            .check_user_resource_permission(
                session,
                &ctx.username,
                &ctx.groups,
                table.dataset_id.into_uuid(),
                UPDATE_DATASET_TABLE,
            )
            .await?;

        let dataset = session
            .find_dataset(table.dataset_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Dataset {} not found", table.dataset_id)))?;
        let environment = session
            .find_environment(dataset.environment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Environment {} not found", dataset.environment_id))
            })?;

        let has_topic = environment
            .subscriptions_producers_topic_name
            .as_deref()
            .is_some_and(|t| !t.is_empty());
        if !environment.subscriptions_enabled || !has_topic {
            return Err(AppError::configuration(format!(
                "Subscriptions are disabled for environment {}",
                environment.label
            )));
        }

        let task_id = self
            .queue
            .enqueue(
                session,
                action::DATASET_PUBLISH_UPDATE,
                dataset.id.into_uuid(),
                json!({ "s3Prefix": table.s3_prefix }),
            )
            .await?;

        info!(
            username = %ctx.username,
            dataset_id = %dataset.id,
            table_id = %table_id,
            task_id = %task_id,
            "Table update queued for publishing"
        );
        Ok(task_id)
    }
}
