//! PostgreSQL-backed store: one session is one database transaction.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_core::types::{
    BucketId, DatasetId, EnvironmentId, ShareId, ShareItemId, TableId, TaskId,
};
use datashare_entity::dataset::{Dataset, DatasetBucket, DatasetTable};
use datashare_entity::environment::{Environment, EnvironmentGroup};
use datashare_entity::permission::ResourcePolicy;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareObject, ShareObjectStatus};
use datashare_entity::task::Task;

use crate::connection::DatabasePool;
use crate::repositories::{
    DatasetRepository, EnvironmentRepository, ResourcePolicyRepository, ShareItemRepository,
    ShareRepository, TaskRepository,
};

use super::{ShareSession, ShareStore};

/// Store that opens a PostgreSQL transaction per session.
#[derive(Debug, Clone)]
pub struct PgShareStore {
    pool: DatabasePool,
}

impl PgShareStore {
    /// Create a store over a connection pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for PgShareStore {
    async fn begin(&self) -> AppResult<Box<dyn ShareSession>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgShareSession { tx }))
    }
}

/// A session bound to one open transaction.
pub struct PgShareSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ShareSession for PgShareSession {
    async fn find_share(&mut self, id: ShareId) -> AppResult<Option<ShareObject>> {
        ShareRepository::find_by_id(&mut self.tx, id).await
    }

    async fn find_share_for_principal(
        &mut self,
        dataset_id: DatasetId,
        environment_id: EnvironmentId,
        principal_group: &str,
    ) -> AppResult<Option<ShareObject>> {
        ShareRepository::find_for_principal(&mut self.tx, dataset_id, environment_id, principal_group)
            .await
    }

    async fn insert_share(&mut self, share: &ShareObject) -> AppResult<()> {
        ShareRepository::create(&mut self.tx, share).await
    }

    async fn update_share(&mut self, share: &ShareObject) -> AppResult<()> {
        ShareRepository::update(&mut self.tx, share).await
    }

    async fn update_share_status(&mut self, id: ShareId, status: ShareObjectStatus) -> AppResult<()> {
        ShareRepository::update_status(&mut self.tx, id, status).await
    }

    async fn find_share_item(&mut self, id: ShareItemId) -> AppResult<Option<ShareItem>> {
        ShareItemRepository::find_by_id(&mut self.tx, id).await
    }

    async fn list_share_items(&mut self, share_id: ShareId) -> AppResult<Vec<ShareItem>> {
        ShareItemRepository::find_by_share(&mut self.tx, share_id).await
    }

    async fn lock_share_items(
        &mut self,
        share_id: ShareId,
        status: ShareItemStatus,
    ) -> AppResult<Vec<ShareItem>> {
        ShareItemRepository::lock_by_status(&mut self.tx, share_id, status).await
    }

    async fn find_share_item_by_resource(
        &mut self,
        share_id: ShareId,
        item_uri: Uuid,
    ) -> AppResult<Option<ShareItem>> {
        ShareItemRepository::find_by_resource(&mut self.tx, share_id, item_uri).await
    }

    async fn list_share_items_for_resource(&mut self, item_uri: Uuid) -> AppResult<Vec<ShareItem>> {
        ShareItemRepository::find_for_resource(&mut self.tx, item_uri).await
    }

    async fn insert_share_item(&mut self, item: &ShareItem) -> AppResult<()> {
        ShareItemRepository::create(&mut self.tx, item).await
    }

    async fn update_share_item_status(
        &mut self,
        id: ShareItemId,
        status: ShareItemStatus,
        last_error: Option<&str>,
    ) -> AppResult<()> {
        ShareItemRepository::update_status(&mut self.tx, id, status, last_error).await
    }

    async fn delete_share_item(&mut self, id: ShareItemId) -> AppResult<bool> {
        ShareItemRepository::delete(&mut self.tx, id).await
    }

    async fn find_dataset(&mut self, id: DatasetId) -> AppResult<Option<Dataset>> {
        DatasetRepository::find_by_id(&mut self.tx, id).await
    }

    async fn find_table(&mut self, id: TableId) -> AppResult<Option<DatasetTable>> {
        DatasetRepository::find_table(&mut self.tx, id).await
    }

    async fn find_bucket(&mut self, id: BucketId) -> AppResult<Option<DatasetBucket>> {
        DatasetRepository::find_bucket(&mut self.tx, id).await
    }

    async fn lock_table(&mut self, id: TableId) -> AppResult<Option<DatasetTable>> {
        DatasetRepository::lock_table(&mut self.tx, id).await
    }

    async fn lock_bucket(&mut self, id: BucketId) -> AppResult<Option<DatasetBucket>> {
        DatasetRepository::lock_bucket(&mut self.tx, id).await
    }

    async fn find_environment(&mut self, id: EnvironmentId) -> AppResult<Option<Environment>> {
        EnvironmentRepository::find_by_id(&mut self.tx, id).await
    }

    async fn find_environment_group(
        &mut self,
        environment_id: EnvironmentId,
        group_name: &str,
    ) -> AppResult<Option<EnvironmentGroup>> {
        EnvironmentRepository::find_group(&mut self.tx, environment_id, group_name).await
    }

    async fn find_resource_policies(
        &mut self,
        groups: &[String],
        resource_uri: Uuid,
    ) -> AppResult<Vec<ResourcePolicy>> {
        ResourcePolicyRepository::find_for_groups(&mut self.tx, groups, resource_uri).await
    }

    async fn attach_resource_policy(&mut self, policy: &ResourcePolicy) -> AppResult<()> {
        ResourcePolicyRepository::upsert(&mut self.tx, policy).await
    }

    async fn delete_resource_policy(&mut self, group_name: &str, resource_uri: Uuid) -> AppResult<bool> {
        ResourcePolicyRepository::delete(&mut self.tx, group_name, resource_uri).await
    }

    async fn insert_task(&mut self, task: &Task) -> AppResult<()> {
        TaskRepository::create(&mut self.tx, task).await
    }

    async fn find_task(&mut self, id: TaskId) -> AppResult<Option<Task>> {
        TaskRepository::find_by_id(&mut self.tx, id).await
    }

    async fn claim_next_task(&mut self, worker_id: &str) -> AppResult<Option<Task>> {
        TaskRepository::claim_next(&mut self.tx, worker_id).await
    }

    async fn claim_task(&mut self, id: TaskId, worker_id: &str) -> AppResult<Option<Task>> {
        TaskRepository::claim(&mut self.tx, id, worker_id).await
    }

    async fn complete_task(&mut self, id: TaskId, response: Option<&Value>) -> AppResult<()> {
        TaskRepository::complete(&mut self.tx, id, response).await
    }

    async fn fail_task(&mut self, id: TaskId, error_message: &str) -> AppResult<()> {
        TaskRepository::fail(&mut self.tx, id, error_message).await
    }

    async fn release_task(&mut self, id: TaskId, error_message: &str) -> AppResult<()> {
        TaskRepository::release(&mut self.tx, id, error_message).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
        })
    }
}
