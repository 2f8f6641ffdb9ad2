//! Share item and share object status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

use datashare_core::AppError;

/// Lifecycle status of a single shared item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_item_status")]
pub enum ShareItemStatus {
    /// Requested, waiting for the dataset owners to decide.
    #[sqlx(rename = "PendingApproval")]
    #[serde(rename = "PendingApproval")]
    PendingApproval,
    /// Approved, waiting for a processor run to grant access.
    #[sqlx(rename = "Share_Approved")]
    #[serde(rename = "Share_Approved")]
    ShareApproved,
    /// Rejected by the dataset owners.
    #[sqlx(rename = "Share_Rejected")]
    #[serde(rename = "Share_Rejected")]
    ShareRejected,
    /// A processor run is granting access.
    #[sqlx(rename = "Share_In_Progress")]
    #[serde(rename = "Share_In_Progress")]
    ShareInProgress,
    /// Access granted.
    #[sqlx(rename = "Share_Succeeded")]
    #[serde(rename = "Share_Succeeded")]
    ShareSucceeded,
    /// Granting access failed.
    #[sqlx(rename = "Share_Failed")]
    #[serde(rename = "Share_Failed")]
    ShareFailed,
    /// Revocation requested, waiting for a processor run.
    #[sqlx(rename = "Revoke_Approved")]
    #[serde(rename = "Revoke_Approved")]
    RevokeApproved,
    /// A processor run is revoking access.
    #[sqlx(rename = "Revoke_In_Progress")]
    #[serde(rename = "Revoke_In_Progress")]
    RevokeInProgress,
    /// Access revoked.
    #[sqlx(rename = "Revoke_Succeeded")]
    #[serde(rename = "Revoke_Succeeded")]
    RevokeSucceeded,
    /// Revoking access failed; access may still be present.
    #[sqlx(rename = "Revoke_Failed")]
    #[serde(rename = "Revoke_Failed")]
    RevokeFailed,
}

impl ShareItemStatus {
    /// Every item status, in lifecycle order.
    pub const ALL: [ShareItemStatus; 10] = [
        Self::PendingApproval,
        Self::ShareApproved,
        Self::ShareRejected,
        Self::ShareInProgress,
        Self::ShareSucceeded,
        Self::ShareFailed,
        Self::RevokeApproved,
        Self::RevokeInProgress,
        Self::RevokeSucceeded,
        Self::RevokeFailed,
    ];

    /// Return the status as its persisted string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "PendingApproval",
            Self::ShareApproved => "Share_Approved",
            Self::ShareRejected => "Share_Rejected",
            Self::ShareInProgress => "Share_In_Progress",
            Self::ShareSucceeded => "Share_Succeeded",
            Self::ShareFailed => "Share_Failed",
            Self::RevokeApproved => "Revoke_Approved",
            Self::RevokeInProgress => "Revoke_In_Progress",
            Self::RevokeSucceeded => "Revoke_Succeeded",
            Self::RevokeFailed => "Revoke_Failed",
        }
    }

    /// Queued for a processor run.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::ShareApproved | Self::RevokeApproved)
    }

    /// Currently owned by a processor run.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::ShareInProgress | Self::RevokeInProgress)
    }

    /// A grant or revoke attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::ShareFailed | Self::RevokeFailed)
    }

    /// Cross-account access is (or may still be) in place.
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            Self::ShareSucceeded | Self::RevokeApproved | Self::RevokeInProgress | Self::RevokeFailed
        )
    }

    /// The item can be removed from its share object.
    ///
    /// Granted items must be revoked first, and queued or running items
    /// must finish processing. A failed grant may have left part of the
    /// access in place, so it is revoked before removal as well.
    pub fn is_removable(&self) -> bool {
        matches!(
            self,
            Self::PendingApproval | Self::ShareRejected | Self::RevokeSucceeded
        )
    }

    /// Access must be revoked before the item can be removed.
    pub fn needs_revoke(&self) -> bool {
        self.is_granted() || *self == Self::ShareFailed
    }
}

impl fmt::Display for ShareItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ShareItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Invalid share item status: '{s}'")))
    }
}

/// Overall status of a share object, derived from its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_object_status")]
pub enum ShareObjectStatus {
    /// Being edited by the requester.
    Draft,
    /// Waiting for approval.
    Submitted,
    /// Approved work is queued for processing.
    Approved,
    /// All items were rejected.
    Rejected,
    /// A processor run is working on at least one item.
    #[sqlx(rename = "In_Progress")]
    #[serde(rename = "In_Progress")]
    InProgress,
    /// All items reached a terminal success state.
    Completed,
    /// At least one item is in a failed state.
    Failed,
    /// All items were revoked.
    Revoked,
}

impl ShareObjectStatus {
    /// Return the status as its persisted string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::InProgress => "In_Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Revoked => "Revoked",
        }
    }
}

impl fmt::Display for ShareObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
