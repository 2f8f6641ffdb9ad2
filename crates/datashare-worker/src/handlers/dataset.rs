//! Dataset update notifications.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use datashare_cloud::NotificationPublisher;
use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::DatasetId;
use datashare_database::store::finish;
use datashare_database::{ShareSession, ShareStore};
use datashare_entity::dataset::Dataset;
use datashare_entity::environment::Environment;
use datashare_entity::task::{Task, action};

use crate::executor::{TaskExecutionError, TaskHandler};

/// Publishes a table update to the producers topic of the dataset's environment.
pub struct DatasetUpdatePublisher {
    store: Arc<dyn ShareStore>,
    notifications: Arc<dyn NotificationPublisher>,
}

impl std::fmt::Debug for DatasetUpdatePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetUpdatePublisher")
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl DatasetUpdatePublisher {
    /// Creates a new publisher.
    pub fn new(store: Arc<dyn ShareStore>, notifications: Arc<dyn NotificationPublisher>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    async fn load(&self, dataset_id: DatasetId) -> AppResult<(Dataset, Environment)> {
        let mut session = self.store.begin().await?;
        let result = Self::load_in(session.as_mut(), dataset_id).await;
        finish(session, result).await
    }

    async fn load_in(
        session: &mut dyn ShareSession,
        dataset_id: DatasetId,
    ) -> AppResult<(Dataset, Environment)> {
        let dataset = session
            .find_dataset(dataset_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Dataset {dataset_id} not found")))?;
        let environment = session
            .find_environment(dataset.environment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Environment {} not found", dataset.environment_id))
            })?;
        Ok((dataset, environment))
    }
}

#[async_trait]
impl TaskHandler for DatasetUpdatePublisher {
    fn action(&self) -> &str {
        action::DATASET_PUBLISH_UPDATE
    }

    async fn execute(&self, task: &Task) -> Result<Option<Value>, TaskExecutionError> {
        let prefix = task
            .payload
            .get("s3Prefix")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TaskExecutionError::Permanent("Missing s3Prefix in publish payload".to_string())
            })?;

        let (dataset, environment) = self
            .load(DatasetId::from(task.target_uri))
            .await
            .map_err(TaskExecutionError::classify)?;

        let topic = environment
            .subscriptions_producers_topic_name
            .as_deref()
            .filter(|t| environment.subscriptions_enabled && !t.is_empty())
            .ok_or_else(|| {
                TaskExecutionError::Permanent(format!(
                    "Subscriptions are disabled for environment {}",
                    environment.label
                ))
            })?;

        let message = json!({
            "location": prefix,
            "owner": dataset.admin_group,
            "bucket_name": dataset.s3_bucket_name,
            "account": dataset.aws_account_id,
            "region": dataset.region,
            "source_database_name": dataset.glue_database_name,
        });

        let message_id = self
            .notifications
            .publish(&environment.aws_account_id, &environment.region, topic, &message)
            .await
            .map_err(|e| TaskExecutionError::Transient(format!("Failed to publish update: {e}")))?;

        info!(
            task_id = %task.id,
            dataset_id = %dataset.id,
            topic,
            message_id = %message_id,
            "Dataset update published"
        );
        Ok(Some(json!({ "messageId": message_id })))
    }
}
