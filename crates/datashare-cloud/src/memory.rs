//! In-memory cloud account for tests and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CloudError, CloudResult};
use crate::provider::{
    BucketPolicyProvider, CatalogProvider, CloudProviders, NotificationPublisher, TableGrant,
    TableRef,
};

/// A message recorded by [`InMemoryCloudAccount::publish`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    /// Account owning the topic.
    pub account_id: String,
    /// Topic name.
    pub topic: String,
    /// Message body.
    pub message: Value,
}

#[derive(Debug, Default)]
struct AccountState {
    bucket_policies: HashMap<(String, String), String>,
    policy_writes: usize,
    grants: HashSet<TableGrant>,
    databases: HashSet<(String, String)>,
    links: HashMap<TableRef, TableRef>,
    published: Vec<PublishedMessage>,
    failing: HashSet<String>,
}

impl AccountState {
    fn check(&self, resource: &str) -> CloudResult<()> {
        if self.failing.contains(resource) {
            return Err(CloudError::Service(format!("injected failure for {resource}")));
        }
        Ok(())
    }
}

/// Every cloud seam backed by process memory, shared by all clones.
///
/// Regions are ignored when keying resources. Calls touching a resource
/// registered with [`fail_resource`](Self::fail_resource) fail with a
/// service error.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCloudAccount {
    state: Arc<RwLock<AccountState>>,
}

impl InMemoryCloudAccount {
    /// Create an empty account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire every seam to this account.
    pub fn providers(&self) -> CloudProviders {
        CloudProviders {
            buckets: Arc::new(self.clone()),
            catalog: Arc::new(self.clone()),
            notifications: Arc::new(self.clone()),
        }
    }

    /// Make calls touching `resource` (bucket, table, database or topic name) fail.
    pub async fn fail_resource(&self, resource: &str) {
        self.state.write().await.failing.insert(resource.to_string());
    }

    /// Stop failing calls touching `resource`.
    pub async fn heal_resource(&self, resource: &str) {
        self.state.write().await.failing.remove(resource);
    }

    /// Number of bucket policy writes and deletes so far.
    pub async fn policy_writes(&self) -> usize {
        self.state.read().await.policy_writes
    }

    /// Stored policy of a bucket.
    pub async fn bucket_policy(&self, account_id: &str, bucket: &str) -> Option<String> {
        self.state
            .read()
            .await
            .bucket_policies
            .get(&(account_id.to_string(), bucket.to_string()))
            .cloned()
    }

    /// Whether a database exists.
    pub async fn has_database(&self, account_id: &str, database: &str) -> bool {
        self.state
            .read()
            .await
            .databases
            .contains(&(account_id.to_string(), database.to_string()))
    }

    /// Number of grants in place.
    pub async fn grant_count(&self) -> usize {
        self.state.read().await.grants.len()
    }

    /// Every published message.
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.state.read().await.published.clone()
    }
}

fn link_key(table: &TableRef) -> TableRef {
    TableRef {
        region: String::new(),
        ..table.clone()
    }
}

#[async_trait]
impl BucketPolicyProvider for InMemoryCloudAccount {
    async fn get_bucket_policy(&self, account_id: &str, bucket: &str) -> CloudResult<Option<String>> {
        let state = self.state.read().await;
        state.check(bucket)?;
        Ok(state
            .bucket_policies
            .get(&(account_id.to_string(), bucket.to_string()))
            .cloned())
    }

    async fn put_bucket_policy(&self, account_id: &str, bucket: &str, policy: &str) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(bucket)?;
        state
            .bucket_policies
            .insert((account_id.to_string(), bucket.to_string()), policy.to_string());
        state.policy_writes += 1;
        debug!(account_id, bucket, "Bucket policy stored");
        Ok(())
    }

    async fn delete_bucket_policy(&self, account_id: &str, bucket: &str) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(bucket)?;
        state
            .bucket_policies
            .remove(&(account_id.to_string(), bucket.to_string()))
            .ok_or_else(|| CloudError::NotFound(format!("bucket policy of {bucket}")))?;
        state.policy_writes += 1;
        Ok(())
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCloudAccount {
    async fn has_table_grant(&self, grant: &TableGrant) -> CloudResult<bool> {
        let state = self.state.read().await;
        state.check(&grant.table.table)?;
        Ok(state.grants.contains(grant))
    }

    async fn grant_table_permissions(&self, grant: &TableGrant) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(&grant.table.table)?;
        state.grants.insert(grant.clone());
        Ok(())
    }

    async fn revoke_table_permissions(&self, grant: &TableGrant) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(&grant.table.table)?;
        if !state.grants.remove(grant) {
            return Err(CloudError::NotFound(format!(
                "grant on {}.{}",
                grant.table.database, grant.table.table
            )));
        }
        Ok(())
    }

    async fn database_exists(&self, account_id: &str, _region: &str, database: &str) -> CloudResult<bool> {
        let state = self.state.read().await;
        state.check(database)?;
        Ok(state
            .databases
            .contains(&(account_id.to_string(), database.to_string())))
    }

    async fn create_database(&self, account_id: &str, _region: &str, database: &str) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(database)?;
        if !state
            .databases
            .insert((account_id.to_string(), database.to_string()))
        {
            return Err(CloudError::AlreadyExists(format!("database {database}")));
        }
        Ok(())
    }

    async fn delete_database(&self, account_id: &str, _region: &str, database: &str) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(database)?;
        if !state
            .databases
            .remove(&(account_id.to_string(), database.to_string()))
        {
            return Err(CloudError::NotFound(format!("database {database}")));
        }
        state
            .links
            .retain(|link, _| !(link.account_id == account_id && link.database == database));
        Ok(())
    }

    async fn get_resource_link(&self, link: &TableRef) -> CloudResult<Option<TableRef>> {
        let state = self.state.read().await;
        state.check(&link.table)?;
        Ok(state.links.get(&link_key(link)).cloned())
    }

    async fn create_resource_link(&self, link: &TableRef, target: &TableRef) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(&link.table)?;
        if !state
            .databases
            .contains(&(link.account_id.clone(), link.database.clone()))
        {
            return Err(CloudError::NotFound(format!("database {}", link.database)));
        }
        let key = link_key(link);
        if state.links.contains_key(&key) {
            return Err(CloudError::AlreadyExists(format!("table {}", link.table)));
        }
        state.links.insert(key, target.clone());
        Ok(())
    }

    async fn delete_table(&self, table: &TableRef) -> CloudResult<()> {
        let mut state = self.state.write().await;
        state.check(&table.table)?;
        state
            .links
            .remove(&link_key(table))
            .map(|_| ())
            .ok_or_else(|| CloudError::NotFound(format!("table {}.{}", table.database, table.table)))
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryCloudAccount {
    async fn publish(
        &self,
        account_id: &str,
        _region: &str,
        topic: &str,
        message: &Value,
    ) -> CloudResult<String> {
        let mut state = self.state.write().await;
        state.check(topic)?;
        state.published.push(PublishedMessage {
            account_id: account_id.to_string(),
            topic: topic.to_string(),
            message: message.clone(),
        });
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(database: &str, name: &str) -> TableRef {
        TableRef {
            account_id: "111111111111".to_string(),
            region: "eu-west-1".to_string(),
            database: database.to_string(),
            table: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_revoke_missing_grant_is_not_found() {
        let account = InMemoryCloudAccount::new();
        let grant = TableGrant {
            table: table("sales", "orders"),
            principal_account_id: "222222222222".to_string(),
            permissions: vec!["SELECT".to_string()],
        };
        account.grant_table_permissions(&grant).await.unwrap();
        account.revoke_table_permissions(&grant).await.unwrap();
        let err = account.revoke_table_permissions(&grant).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_dropping_database_drops_links() {
        let account = InMemoryCloudAccount::new();
        account
            .create_database("111111111111", "eu-west-1", "shared")
            .await
            .unwrap();
        let link = table("shared", "orders");
        account
            .create_resource_link(&link, &table("sales", "orders"))
            .await
            .unwrap();
        assert!(account.get_resource_link(&link).await.unwrap().is_some());

        account
            .delete_database("111111111111", "eu-west-1", "shared")
            .await
            .unwrap();
        assert!(account.get_resource_link(&link).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_until_healed() {
        let account = InMemoryCloudAccount::new();
        account.fail_resource("sales-data").await;
        assert!(
            account
                .put_bucket_policy("111111111111", "sales-data", "{}")
                .await
                .is_err()
        );
        account.heal_resource("sales-data").await;
        account
            .put_bucket_policy("111111111111", "sales-data", "{}")
            .await
            .unwrap();
        assert_eq!(account.policy_writes().await, 1);
    }
}
