//! Share object entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use datashare_core::types::{DatasetId, EnvironmentId, ShareId};

use super::status::ShareObjectStatus;

/// A request by one group for access to another group's dataset resources.
///
/// Share objects are never physically deleted; `deleted_at` marks the end of
/// their lifecycle so the audit trail is preserved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareObject {
    /// Unique share identifier.
    pub id: ShareId,
    /// Dataset being requested.
    pub dataset_id: DatasetId,
    /// Environment that owns the dataset.
    pub source_environment_id: EnvironmentId,
    /// Environment the access is granted into.
    pub environment_id: EnvironmentId,
    /// Requesting group.
    pub principal_group: String,
    /// User who created the request.
    pub owner: String,
    /// Overall status, derived from the items.
    pub status: ShareObjectStatus,
    /// Why the requester needs access.
    pub request_purpose: Option<String>,
    /// Why the approvers rejected the request.
    pub reject_purpose: Option<String>,
    /// Set by submission, cleared when the request is edited again.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ShareObject {
    /// Build a new draft share object.
    pub fn new(
        dataset_id: DatasetId,
        source_environment_id: EnvironmentId,
        environment_id: EnvironmentId,
        principal_group: &str,
        owner: &str,
        request_purpose: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ShareId::new(),
            dataset_id,
            source_environment_id,
            environment_id,
            principal_group: principal_group.to_string(),
            owner: owner.to_string(),
            status: ShareObjectStatus::Draft,
            request_purpose,
            reject_purpose: None,
            submitted_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the request has been submitted since it was last edited.
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Whether the share object has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
