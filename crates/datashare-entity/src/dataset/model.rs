//! Dataset, table, and bucket entity models.
//!
//! These are read-only context records for share processing.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use datashare_core::types::{BucketId, DatasetId, EnvironmentId, TableId};

/// A dataset owned by one team in one environment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dataset {
    /// Unique dataset identifier.
    pub id: DatasetId,
    /// Display label.
    pub label: String,
    /// Environment that hosts the dataset.
    pub environment_id: EnvironmentId,
    /// Admin group owning the dataset.
    pub admin_group: String,
    /// Optional stewards group that may also approve shares.
    pub stewards: Option<String>,
    /// Account hosting the dataset storage.
    pub aws_account_id: String,
    /// Region of the dataset storage.
    pub region: String,
    /// Catalog database holding the dataset tables.
    pub glue_database_name: String,
    /// Default bucket of the dataset.
    pub s3_bucket_name: String,
}

impl Dataset {
    /// Groups allowed to approve shares on this dataset.
    pub fn approver_groups(&self) -> Vec<String> {
        let mut groups = vec![self.admin_group.clone()];
        if let Some(stewards) = &self.stewards {
            if stewards != &self.admin_group {
                groups.push(stewards.clone());
            }
        }
        groups
    }
}

/// A catalog table belonging to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DatasetTable {
    /// Unique table identifier.
    pub id: TableId,
    /// Owning dataset.
    pub dataset_id: DatasetId,
    /// Display name.
    pub name: String,
    /// Catalog database name.
    pub glue_database_name: String,
    /// Catalog table name.
    pub glue_table_name: String,
    /// Storage prefix backing the table.
    pub s3_prefix: String,
    /// Account hosting the table.
    pub aws_account_id: String,
    /// Region of the table.
    pub region: String,
}

/// An object-storage bucket belonging to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DatasetBucket {
    /// Unique bucket identifier.
    pub id: BucketId,
    /// Owning dataset.
    pub dataset_id: DatasetId,
    /// Display name.
    pub name: String,
    /// Physical bucket name.
    pub bucket_name: String,
    /// Account hosting the bucket.
    pub aws_account_id: String,
    /// Region of the bucket.
    pub region: String,
}

impl DatasetBucket {
    /// ARN of the bucket itself.
    pub fn arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.bucket_name)
    }

    /// ARN matching every object in the bucket.
    pub fn objects_arn(&self) -> String {
        format!("arn:aws:s3:::{}/*", self.bucket_name)
    }
}
