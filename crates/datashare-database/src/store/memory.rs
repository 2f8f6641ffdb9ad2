//! In-memory store for tests and local runs.
//!
//! Sessions are serialized: a session holds the state lock for its whole
//! lifetime and rollback restores the snapshot taken when it began.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use datashare_core::result::AppResult;
use datashare_core::types::{
    BucketId, DatasetId, EnvironmentId, ShareId, ShareItemId, TableId, TaskId,
};
use datashare_entity::dataset::{Dataset, DatasetBucket, DatasetTable};
use datashare_entity::environment::{Environment, EnvironmentGroup};
use datashare_entity::permission::ResourcePolicy;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareObject, ShareObjectStatus};
use datashare_entity::task::{Task, TaskStatus};

use super::{ShareSession, ShareStore};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    shares: HashMap<ShareId, ShareObject>,
    items: Vec<ShareItem>,
    datasets: HashMap<DatasetId, Dataset>,
    tables: HashMap<TableId, DatasetTable>,
    buckets: HashMap<BucketId, DatasetBucket>,
    environments: HashMap<EnvironmentId, Environment>,
    environment_groups: Vec<EnvironmentGroup>,
    policies: Vec<ResourcePolicy>,
    tasks: Vec<Task>,
}

/// A [`ShareStore`] keeping every record in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryShareStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryShareStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a dataset.
    pub async fn insert_dataset(&self, dataset: Dataset) {
        self.state.lock().await.datasets.insert(dataset.id, dataset);
    }

    /// Seed a dataset table.
    pub async fn insert_table(&self, table: DatasetTable) {
        self.state.lock().await.tables.insert(table.id, table);
    }

    /// Seed a dataset bucket.
    pub async fn insert_bucket(&self, bucket: DatasetBucket) {
        self.state.lock().await.buckets.insert(bucket.id, bucket);
    }

    /// Seed an environment.
    pub async fn insert_environment(&self, environment: Environment) {
        self.state
            .lock()
            .await
            .environments
            .insert(environment.id, environment);
    }

    /// Seed an environment group.
    pub async fn insert_environment_group(&self, group: EnvironmentGroup) {
        self.state.lock().await.environment_groups.push(group);
    }

    /// Current committed state of a share object.
    pub async fn share(&self, id: ShareId) -> Option<ShareObject> {
        self.state.lock().await.shares.get(&id).cloned()
    }

    /// Current committed items of a share object.
    pub async fn share_items(&self, share_id: ShareId) -> Vec<ShareItem> {
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .filter(|i| i.share_id == share_id)
            .cloned()
            .collect()
    }

    /// Every committed task.
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }

    /// Every committed resource policy.
    pub async fn policies(&self) -> Vec<ResourcePolicy> {
        self.state.lock().await.policies.clone()
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn begin(&self) -> AppResult<Box<dyn ShareSession>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryShareSession { guard, snapshot }))
    }
}

/// A session holding exclusive access to the in-memory state.
pub struct MemoryShareSession {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: MemoryState,
}

impl MemoryShareSession {
    fn claim(task: &mut Task, worker_id: &str) -> Task {
        task.status = TaskStatus::Running;
        task.worker_id = Some(worker_id.to_string());
        task.attempts += 1;
        task.updated_at = Utc::now();
        task.clone()
    }

    fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.guard.tasks.iter_mut().find(|t| t.id == id)
    }
}

#[async_trait]
impl ShareSession for MemoryShareSession {
    async fn find_share(&mut self, id: ShareId) -> AppResult<Option<ShareObject>> {
        Ok(self.guard.shares.get(&id).cloned())
    }

    async fn find_share_for_principal(
        &mut self,
        dataset_id: DatasetId,
        environment_id: EnvironmentId,
        principal_group: &str,
    ) -> AppResult<Option<ShareObject>> {
        Ok(self
            .guard
            .shares
            .values()
            .find(|s| {
                s.dataset_id == dataset_id
                    && s.environment_id == environment_id
                    && s.principal_group == principal_group
                    && !s.is_deleted()
            })
            .cloned())
    }

    async fn insert_share(&mut self, share: &ShareObject) -> AppResult<()> {
        self.guard.shares.insert(share.id, share.clone());
        Ok(())
    }

    async fn update_share(&mut self, share: &ShareObject) -> AppResult<()> {
        if let Some(stored) = self.guard.shares.get_mut(&share.id) {
            stored.request_purpose = share.request_purpose.clone();
            stored.reject_purpose = share.reject_purpose.clone();
            stored.submitted_at = share.submitted_at;
            stored.deleted_at = share.deleted_at;
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_share_status(&mut self, id: ShareId, status: ShareObjectStatus) -> AppResult<()> {
        if let Some(share) = self.guard.shares.get_mut(&id) {
            share.status = status;
            share.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_share_item(&mut self, id: ShareItemId) -> AppResult<Option<ShareItem>> {
        Ok(self.guard.items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_share_items(&mut self, share_id: ShareId) -> AppResult<Vec<ShareItem>> {
        Ok(self
            .guard
            .items
            .iter()
            .filter(|i| i.share_id == share_id)
            .cloned()
            .collect())
    }

    async fn lock_share_items(
        &mut self,
        share_id: ShareId,
        status: ShareItemStatus,
    ) -> AppResult<Vec<ShareItem>> {
        Ok(self
            .guard
            .items
            .iter()
            .filter(|i| i.share_id == share_id && i.status == status)
            .cloned()
            .collect())
    }

    async fn find_share_item_by_resource(
        &mut self,
        share_id: ShareId,
        item_uri: Uuid,
    ) -> AppResult<Option<ShareItem>> {
        Ok(self
            .guard
            .items
            .iter()
            .find(|i| i.share_id == share_id && i.item_uri == item_uri)
            .cloned())
    }

    async fn list_share_items_for_resource(&mut self, item_uri: Uuid) -> AppResult<Vec<ShareItem>> {
        Ok(self
            .guard
            .items
            .iter()
            .filter(|i| i.item_uri == item_uri)
            .cloned()
            .collect())
    }

    async fn insert_share_item(&mut self, item: &ShareItem) -> AppResult<()> {
        self.guard.items.push(item.clone());
        Ok(())
    }

    async fn update_share_item_status(
        &mut self,
        id: ShareItemId,
        status: ShareItemStatus,
        last_error: Option<&str>,
    ) -> AppResult<()> {
        if let Some(item) = self.guard.items.iter_mut().find(|i| i.id == id) {
            item.status = status;
            item.last_error = last_error.map(str::to_string);
            item.status_changed_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_share_item(&mut self, id: ShareItemId) -> AppResult<bool> {
        let before = self.guard.items.len();
        self.guard.items.retain(|i| i.id != id);
        Ok(self.guard.items.len() < before)
    }

    async fn find_dataset(&mut self, id: DatasetId) -> AppResult<Option<Dataset>> {
        Ok(self.guard.datasets.get(&id).cloned())
    }

    async fn find_table(&mut self, id: TableId) -> AppResult<Option<DatasetTable>> {
        Ok(self.guard.tables.get(&id).cloned())
    }

    async fn find_bucket(&mut self, id: BucketId) -> AppResult<Option<DatasetBucket>> {
        Ok(self.guard.buckets.get(&id).cloned())
    }

    // The session already holds the whole store.
    async fn lock_table(&mut self, id: TableId) -> AppResult<Option<DatasetTable>> {
        Ok(self.guard.tables.get(&id).cloned())
    }

    async fn lock_bucket(&mut self, id: BucketId) -> AppResult<Option<DatasetBucket>> {
        Ok(self.guard.buckets.get(&id).cloned())
    }

    async fn find_environment(&mut self, id: EnvironmentId) -> AppResult<Option<Environment>> {
        Ok(self.guard.environments.get(&id).cloned())
    }

    async fn find_environment_group(
        &mut self,
        environment_id: EnvironmentId,
        group_name: &str,
    ) -> AppResult<Option<EnvironmentGroup>> {
        Ok(self
            .guard
            .environment_groups
            .iter()
            .find(|g| g.environment_id == environment_id && g.group_name == group_name)
            .cloned())
    }

    async fn find_resource_policies(
        &mut self,
        groups: &[String],
        resource_uri: Uuid,
    ) -> AppResult<Vec<ResourcePolicy>> {
        Ok(self
            .guard
            .policies
            .iter()
            .filter(|p| p.resource_uri == resource_uri && groups.contains(&p.group_name))
            .cloned()
            .collect())
    }

    async fn attach_resource_policy(&mut self, policy: &ResourcePolicy) -> AppResult<()> {
        let policies = &mut self.guard.policies;
        match policies
            .iter_mut()
            .find(|p| p.group_name == policy.group_name && p.resource_uri == policy.resource_uri)
        {
            Some(existing) => {
                existing.permissions = policy.permissions.clone();
                existing.resource_type = policy.resource_type;
            }
            None => policies.push(policy.clone()),
        }
        Ok(())
    }

    async fn delete_resource_policy(&mut self, group_name: &str, resource_uri: Uuid) -> AppResult<bool> {
        let before = self.guard.policies.len();
        self.guard
            .policies
            .retain(|p| !(p.group_name == group_name && p.resource_uri == resource_uri));
        Ok(self.guard.policies.len() < before)
    }

    async fn insert_task(&mut self, task: &Task) -> AppResult<()> {
        self.guard.tasks.push(task.clone());
        Ok(())
    }

    async fn find_task(&mut self, id: TaskId) -> AppResult<Option<Task>> {
        Ok(self.guard.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn claim_next_task(&mut self, worker_id: &str) -> AppResult<Option<Task>> {
        Ok(self
            .guard
            .tasks
            .iter_mut()
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by_key(|t| t.created_at)
            .map(|task| Self::claim(task, worker_id)))
    }

    async fn claim_task(&mut self, id: TaskId, worker_id: &str) -> AppResult<Option<Task>> {
        Ok(self
            .task_mut(id)
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|task| Self::claim(task, worker_id)))
    }

    async fn complete_task(&mut self, id: TaskId, response: Option<&Value>) -> AppResult<()> {
        if let Some(task) = self.task_mut(id) {
            task.status = TaskStatus::Completed;
            task.response = response.cloned();
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn fail_task(&mut self, id: TaskId, error_message: &str) -> AppResult<()> {
        if let Some(task) = self.task_mut(id) {
            task.status = TaskStatus::Failed;
            task.error_message = Some(error_message.to_string());
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn release_task(&mut self, id: TaskId, error_message: &str) -> AppResult<()> {
        if let Some(task) = self.task_mut(id) {
            task.status = TaskStatus::Pending;
            task.error_message = Some(error_message.to_string());
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        debug!("Memory session committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let MemoryShareSession {
            mut guard,
            snapshot,
        } = *self;
        *guard = snapshot;
        debug!("Memory session rolled back");
        Ok(())
    }
}
