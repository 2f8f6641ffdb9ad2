//! Resource policy entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use datashare_core::types::ResourcePolicyId;

/// Type of resource a policy is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_type")]
pub enum ResourceType {
    /// A share object.
    ShareObject,
    /// A dataset.
    Dataset,
    /// A dataset table.
    DatasetTable,
    /// A dataset bucket.
    DatasetBucket,
    /// An environment.
    Environment,
}

impl ResourceType {
    /// Return the type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShareObject => "ShareObject",
            Self::Dataset => "Dataset",
            Self::DatasetTable => "DatasetTable",
            Self::DatasetBucket => "DatasetBucket",
            Self::Environment => "Environment",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named permission set attached to a group for one resource.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourcePolicy {
    /// Unique policy identifier.
    pub id: ResourcePolicyId,
    /// Group the permissions are granted to.
    pub group_name: String,
    /// Resource the permissions apply to.
    pub resource_uri: Uuid,
    /// Type of the resource.
    pub resource_type: ResourceType,
    /// Permission names granted.
    pub permissions: Vec<String>,
    /// When the policy was attached.
    pub created_at: DateTime<Utc>,
}

impl ResourcePolicy {
    /// Build a new policy.
    pub fn new(
        group_name: &str,
        resource_uri: Uuid,
        resource_type: ResourceType,
        permissions: &[&str],
    ) -> Self {
        Self {
            id: ResourcePolicyId::new(),
            group_name: group_name.to_string(),
            resource_uri,
            resource_type,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    /// Whether this policy grants the named permission.
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
