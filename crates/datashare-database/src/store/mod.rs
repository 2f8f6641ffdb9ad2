//! The transactional store boundary.
//!
//! A [`ShareStore`] opens [`ShareSession`]s. A session is one unit of work:
//! every read and write made through it becomes visible to other sessions
//! only on [`ShareSession::commit`], and [`ShareSession::rollback`] discards
//! all of them. A processing run owns exactly one session.

#[cfg(feature = "memory")]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use datashare_core::result::AppResult;
use datashare_core::types::{
    BucketId, DatasetId, EnvironmentId, ShareId, ShareItemId, TableId, TaskId,
};
use datashare_entity::dataset::{Dataset, DatasetBucket, DatasetTable};
use datashare_entity::environment::{Environment, EnvironmentGroup};
use datashare_entity::permission::ResourcePolicy;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareObject, ShareObjectStatus};
use datashare_entity::task::Task;

/// Opens units of work.
#[async_trait]
pub trait ShareStore: Send + Sync + 'static {
    /// Begin a new session.
    async fn begin(&self) -> AppResult<Box<dyn ShareSession>>;
}

/// One unit of work against the share store.
#[async_trait]
pub trait ShareSession: Send {
    // -- Share objects --

    /// Find a share object by id, including soft-deleted ones.
    async fn find_share(&mut self, id: ShareId) -> AppResult<Option<ShareObject>>;

    /// Find the live share object of a group for a dataset in an environment.
    async fn find_share_for_principal(
        &mut self,
        dataset_id: DatasetId,
        environment_id: EnvironmentId,
        principal_group: &str,
    ) -> AppResult<Option<ShareObject>>;

    /// Insert a new share object.
    async fn insert_share(&mut self, share: &ShareObject) -> AppResult<()>;

    /// Persist the editable fields of a share object: purposes, submission
    /// and deletion markers. The derived status is only written through
    /// [`update_share_status`](Self::update_share_status).
    async fn update_share(&mut self, share: &ShareObject) -> AppResult<()>;

    /// Set the derived status of a share object.
    async fn update_share_status(&mut self, id: ShareId, status: ShareObjectStatus)
    -> AppResult<()>;

    // -- Share items --

    /// Find a share item by id.
    async fn find_share_item(&mut self, id: ShareItemId) -> AppResult<Option<ShareItem>>;

    /// List all items of a share object.
    async fn list_share_items(&mut self, share_id: ShareId) -> AppResult<Vec<ShareItem>>;

    /// Select and lock the items of a share currently in `status`.
    ///
    /// Items locked by another session are skipped, never waited on.
    async fn lock_share_items(
        &mut self,
        share_id: ShareId,
        status: ShareItemStatus,
    ) -> AppResult<Vec<ShareItem>>;

    /// Find the item referring to a resource within a share.
    async fn find_share_item_by_resource(
        &mut self,
        share_id: ShareId,
        item_uri: Uuid,
    ) -> AppResult<Option<ShareItem>>;

    /// List the items of every share, deleted ones included, referring to a resource.
    async fn list_share_items_for_resource(&mut self, item_uri: Uuid) -> AppResult<Vec<ShareItem>>;

    /// Insert a new share item.
    async fn insert_share_item(&mut self, item: &ShareItem) -> AppResult<()>;

    /// Set the status of a share item and record the failure reason, if any.
    async fn update_share_item_status(
        &mut self,
        id: ShareItemId,
        status: ShareItemStatus,
        last_error: Option<&str>,
    ) -> AppResult<()>;

    /// Delete a share item. Returns `true` if it existed.
    async fn delete_share_item(&mut self, id: ShareItemId) -> AppResult<bool>;

    // -- Context records --

    /// Find a dataset.
    async fn find_dataset(&mut self, id: DatasetId) -> AppResult<Option<Dataset>>;

    /// Find a dataset table.
    async fn find_table(&mut self, id: TableId) -> AppResult<Option<DatasetTable>>;

    /// Find a dataset bucket.
    async fn find_bucket(&mut self, id: BucketId) -> AppResult<Option<DatasetBucket>>;

    /// Find a dataset table and hold a lock on it until the session ends.
    async fn lock_table(&mut self, id: TableId) -> AppResult<Option<DatasetTable>>;

    /// Find a dataset bucket and hold a lock on it until the session ends.
    ///
    /// Sessions editing access to the same bucket wait for each other here.
    async fn lock_bucket(&mut self, id: BucketId) -> AppResult<Option<DatasetBucket>>;

    /// Find an environment.
    async fn find_environment(&mut self, id: EnvironmentId) -> AppResult<Option<Environment>>;

    /// Find a group's membership in an environment.
    async fn find_environment_group(
        &mut self,
        environment_id: EnvironmentId,
        group_name: &str,
    ) -> AppResult<Option<EnvironmentGroup>>;

    // -- Resource policies --

    /// List the policies any of `groups` holds on a resource.
    async fn find_resource_policies(
        &mut self,
        groups: &[String],
        resource_uri: Uuid,
    ) -> AppResult<Vec<ResourcePolicy>>;

    /// Attach a policy, replacing any existing one for the same group and resource.
    async fn attach_resource_policy(&mut self, policy: &ResourcePolicy) -> AppResult<()>;

    /// Detach a group's policy from a resource. Returns `true` if one existed.
    async fn delete_resource_policy(&mut self, group_name: &str, resource_uri: Uuid)
    -> AppResult<bool>;

    // -- Tasks --

    /// Insert a new pending task.
    async fn insert_task(&mut self, task: &Task) -> AppResult<()>;

    /// Find a task by id.
    async fn find_task(&mut self, id: TaskId) -> AppResult<Option<Task>>;

    /// Claim the oldest pending task for a worker, marking it running.
    async fn claim_next_task(&mut self, worker_id: &str) -> AppResult<Option<Task>>;

    /// Claim a specific pending task for a worker, marking it running.
    async fn claim_task(&mut self, id: TaskId, worker_id: &str) -> AppResult<Option<Task>>;

    /// Mark a task completed.
    async fn complete_task(&mut self, id: TaskId, response: Option<&Value>) -> AppResult<()>;

    /// Mark a task failed.
    async fn fail_task(&mut self, id: TaskId, error_message: &str) -> AppResult<()>;

    /// Return a running task to pending so it is picked up again.
    async fn release_task(&mut self, id: TaskId, error_message: &str) -> AppResult<()>;

    // -- Unit of work --

    /// Make every change of this session durable.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every change of this session.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Commit the session if `result` is `Ok`, roll it back otherwise.
///
/// This is the scope boundary of a unit of work: callers run their body
/// against the session, then hand both to `finish`.
pub async fn finish<T>(session: Box<dyn ShareSession>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "Rolling back session");
            if let Err(rollback_err) = session.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
