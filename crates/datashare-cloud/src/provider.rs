//! Provider traits for the cloud seams share managers depend on.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CloudResult;

/// Reads and writes resource policies of object-storage buckets.
#[async_trait]
pub trait BucketPolicyProvider: Send + Sync + Debug + 'static {
    /// Return the bucket policy document, or `None` when the bucket has none.
    async fn get_bucket_policy(&self, account_id: &str, bucket: &str) -> CloudResult<Option<String>>;

    /// Replace the bucket policy document.
    async fn put_bucket_policy(&self, account_id: &str, bucket: &str, policy: &str) -> CloudResult<()>;

    /// Remove the bucket policy.
    async fn delete_bucket_policy(&self, account_id: &str, bucket: &str) -> CloudResult<()>;
}

/// Fully qualified catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Account owning the catalog.
    pub account_id: String,
    /// Region of the catalog.
    pub region: String,
    /// Catalog database.
    pub database: String,
    /// Table name.
    pub table: String,
}

impl TableRef {
    /// Whether both refer to the same table, whatever region they were read in.
    ///
    /// Catalogs do not report the region of a resource link target.
    pub fn same_table(&self, other: &TableRef) -> bool {
        self.account_id == other.account_id
            && self.database == other.database
            && self.table == other.table
    }
}

/// Cross-account permission grant on a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableGrant {
    /// Table the permissions apply to.
    pub table: TableRef,
    /// Account receiving the permissions.
    pub principal_account_id: String,
    /// Granted permission names.
    pub permissions: Vec<String>,
}

/// Data catalog operations: table grants, databases, and resource links.
#[async_trait]
pub trait CatalogProvider: Send + Sync + Debug + 'static {
    /// Whether the grant is in place.
    async fn has_table_grant(&self, grant: &TableGrant) -> CloudResult<bool>;

    /// Put the grant in place.
    async fn grant_table_permissions(&self, grant: &TableGrant) -> CloudResult<()>;

    /// Remove the grant. Fails with `NotFound` when it is not in place.
    async fn revoke_table_permissions(&self, grant: &TableGrant) -> CloudResult<()>;

    /// Whether a database exists in an account.
    async fn database_exists(&self, account_id: &str, region: &str, database: &str) -> CloudResult<bool>;

    /// Create a database. Fails with `AlreadyExists` when it exists.
    async fn create_database(&self, account_id: &str, region: &str, database: &str) -> CloudResult<()>;

    /// Drop a database and every table in it. Fails with `NotFound` when absent.
    async fn delete_database(&self, account_id: &str, region: &str, database: &str) -> CloudResult<()>;

    /// Return the target of a resource link, or `None` when no such table exists.
    async fn get_resource_link(&self, link: &TableRef) -> CloudResult<Option<TableRef>>;

    /// Create a table in `link` pointing at `target`.
    async fn create_resource_link(&self, link: &TableRef, target: &TableRef) -> CloudResult<()>;

    /// Delete a table. Fails with `NotFound` when absent.
    async fn delete_table(&self, table: &TableRef) -> CloudResult<()>;
}

/// Publishes messages to notification topics.
#[async_trait]
pub trait NotificationPublisher: Send + Sync + Debug + 'static {
    /// Publish a message and return its message id.
    async fn publish(
        &self,
        account_id: &str,
        region: &str,
        topic: &str,
        message: &Value,
    ) -> CloudResult<String>;
}

/// The set of providers a share run and the worker are wired with.
#[derive(Debug, Clone)]
pub struct CloudProviders {
    /// Bucket policy access.
    pub buckets: Arc<dyn BucketPolicyProvider>,
    /// Data catalog access.
    pub catalog: Arc<dyn CatalogProvider>,
    /// Notification topics.
    pub notifications: Arc<dyn NotificationPublisher>,
}
