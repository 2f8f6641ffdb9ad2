//! Share item entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use datashare_core::types::{ShareId, ShareItemId};

use super::status::ShareItemStatus;

/// Kind of resource a share item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_item_type")]
pub enum ShareItemType {
    /// An object-storage bucket.
    Bucket,
    /// A catalog table.
    Table,
}

impl ShareItemType {
    /// Return the kind as its persisted string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bucket => "Bucket",
            Self::Table => "Table",
        }
    }
}

impl std::fmt::Display for ShareItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sharable resource within a share object.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareItem {
    /// Unique item identifier.
    pub id: ShareItemId,
    /// Owning share object.
    pub share_id: ShareId,
    /// Kind of resource.
    pub item_type: ShareItemType,
    /// Identifier of the shared table or bucket.
    pub item_uri: Uuid,
    /// Display name of the shared resource.
    pub item_name: String,
    /// Current lifecycle status.
    pub status: ShareItemStatus,
    /// Reason for the last failed grant or revoke, kept for diagnostics.
    pub last_error: Option<String>,
    /// When the item was added.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub status_changed_at: DateTime<Utc>,
}

impl ShareItem {
    /// Build a new item in `PendingApproval`.
    pub fn new(share_id: ShareId, item_type: ShareItemType, item_uri: Uuid, item_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: ShareItemId::new(),
            share_id,
            item_type,
            item_uri,
            item_name: item_name.to_string(),
            status: ShareItemStatus::PendingApproval,
            last_error: None,
            created_at: now,
            status_changed_at: now,
        }
    }
}
