//! Item and aggregate share state machines.
//!
//! The item machine is a pure transition table. The aggregate status of a
//! share object is never set directly: it is recomputed from the item
//! statuses after every item transition.

use std::fmt;

use tracing::{debug, info};

use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::ShareId;
use datashare_database::ShareSession;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareObjectStatus};

/// Action applied to a single share item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareItemAction {
    /// The requester submits the share for approval.
    Submit,
    /// The dataset owners approve the item.
    Approve,
    /// The dataset owners reject the item.
    Reject,
    /// Revocation of granted access is requested.
    Revoke,
    /// A processor run picks the item up.
    Start,
    /// The manager call succeeded.
    Success,
    /// The manager call failed.
    Failure,
}

impl ShareItemAction {
    /// Every item action.
    pub const ALL: [ShareItemAction; 7] = [
        Self::Submit,
        Self::Approve,
        Self::Reject,
        Self::Revoke,
        Self::Start,
        Self::Success,
        Self::Failure,
    ];

    /// Return the action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "Submit",
            Self::Approve => "Approve",
            Self::Reject => "Reject",
            Self::Revoke => "Revoke",
            Self::Start => "Start",
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }
}

impl fmt::Display for ShareItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transition table for share items.
#[derive(Debug, Clone, Copy)]
pub struct ShareItemStateMachine;

impl ShareItemStateMachine {
    /// Return the state reached by applying `action` in `current`.
    ///
    /// Fails with an invalid-transition error for any pair outside the table.
    pub fn run_transition(
        current: ShareItemStatus,
        action: ShareItemAction,
    ) -> AppResult<ShareItemStatus> {
        use ShareItemAction as A;
        use ShareItemStatus as S;

        let next = match (current, action) {
            (S::PendingApproval | S::ShareRejected | S::RevokeSucceeded, A::Submit) => {
                S::PendingApproval
            }
            (S::PendingApproval | S::ShareFailed, A::Approve) => S::ShareApproved,
            (S::PendingApproval, A::Reject) => S::ShareRejected,
            (S::ShareSucceeded | S::ShareFailed | S::RevokeFailed, A::Revoke) => S::RevokeApproved,
            (S::ShareApproved, A::Start) => S::ShareInProgress,
            (S::ShareInProgress, A::Success) => S::ShareSucceeded,
            (S::ShareInProgress, A::Failure) => S::ShareFailed,
            (S::RevokeApproved, A::Start) => S::RevokeInProgress,
            (S::RevokeInProgress, A::Success) => S::RevokeSucceeded,
            (S::RevokeInProgress, A::Failure) => S::RevokeFailed,
            _ => {
                return Err(AppError::invalid_transition(format!(
                    "Cannot apply {action} to a share item in {current}"
                )));
            }
        };
        Ok(next)
    }

    /// Persist `new_state` for an item and refresh the aggregate of its share.
    ///
    /// Re-applying the state the item is already in is a no-op and returns
    /// `false`.
    pub async fn update_state_single_item(
        session: &mut dyn ShareSession,
        item: &mut ShareItem,
        new_state: ShareItemStatus,
        last_error: Option<&str>,
    ) -> AppResult<bool> {
        if item.status == new_state {
            debug!(item_id = %item.id, status = %new_state, "Share item already in target state");
            return Ok(false);
        }

        session
            .update_share_item_status(item.id, new_state, last_error)
            .await?;
        info!(
            share_id = %item.share_id,
            item_id = %item.id,
            from = %item.status,
            to = %new_state,
            "Share item transitioned"
        );
        item.status = new_state;
        item.last_error = last_error.map(str::to_string);

        ShareObjectStateMachine::refresh(session, item.share_id).await?;
        Ok(true)
    }

    /// Validate `action` against the item's current state, then persist the result.
    ///
    /// An invalid pair fails before anything is written.
    pub async fn apply(
        session: &mut dyn ShareSession,
        item: &mut ShareItem,
        action: ShareItemAction,
        last_error: Option<&str>,
    ) -> AppResult<ShareItemStatus> {
        let next = Self::run_transition(item.status, action)?;
        Self::update_state_single_item(session, item, next, last_error).await?;
        Ok(next)
    }
}

/// Request-level action on a share object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareObjectAction {
    /// Submit the request for approval.
    Submit,
    /// Approve the submitted request.
    Approve,
    /// Reject the submitted request.
    Reject,
    /// Revoke granted items.
    Revoke,
    /// Soft-delete the request.
    Delete,
}

impl fmt::Display for ShareObjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submit => "Submit",
            Self::Approve => "Approve",
            Self::Reject => "Reject",
            Self::Revoke => "Revoke",
            Self::Delete => "Delete",
        };
        write!(f, "{name}")
    }
}

/// Derives and guards the aggregate status of share objects.
#[derive(Debug, Clone, Copy)]
pub struct ShareObjectStateMachine;

impl ShareObjectStateMachine {
    /// Reduce item statuses to the aggregate status.
    ///
    /// `submitted` tells a submitted request from a draft when items are
    /// still pending approval.
    pub fn reduce<I>(statuses: I, submitted: bool) -> ShareObjectStatus
    where
        I: IntoIterator<Item = ShareItemStatus>,
    {
        let statuses: Vec<ShareItemStatus> = statuses.into_iter().collect();
        let any = |pred: fn(&ShareItemStatus) -> bool| statuses.iter().any(pred);
        let all = |status: ShareItemStatus| statuses.iter().all(|s| *s == status);

        if any(ShareItemStatus::is_in_progress) {
            ShareObjectStatus::InProgress
        } else if any(ShareItemStatus::is_failed) {
            ShareObjectStatus::Failed
        } else if any(ShareItemStatus::is_approved) {
            ShareObjectStatus::Approved
        } else if statuses.contains(&ShareItemStatus::PendingApproval) {
            if submitted {
                ShareObjectStatus::Submitted
            } else {
                ShareObjectStatus::Draft
            }
        } else if statuses.is_empty() {
            ShareObjectStatus::Draft
        } else if all(ShareItemStatus::ShareRejected) {
            ShareObjectStatus::Rejected
        } else if all(ShareItemStatus::RevokeSucceeded) {
            ShareObjectStatus::Revoked
        } else {
            ShareObjectStatus::Completed
        }
    }

    /// Check that `action` is allowed on a share in `status`.
    pub fn check_action(status: ShareObjectStatus, action: ShareObjectAction) -> AppResult<()> {
        use ShareObjectAction as A;
        use ShareObjectStatus as S;

        let allowed = match action {
            A::Submit => matches!(
                status,
                S::Draft | S::Rejected | S::Revoked | S::Completed | S::Failed
            ),
            A::Approve | A::Reject => status == S::Submitted,
            A::Revoke | A::Delete => status != S::InProgress,
        };
        if allowed {
            Ok(())
        } else {
            Err(AppError::invalid_transition(format!(
                "Cannot {action} a share object in {status}"
            )))
        }
    }

    /// Recompute and persist the aggregate status of a share.
    pub async fn refresh(
        session: &mut dyn ShareSession,
        share_id: ShareId,
    ) -> AppResult<ShareObjectStatus> {
        let share = session
            .find_share(share_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Share {share_id} not found")))?;
        let items = session.list_share_items(share_id).await?;
        let status = Self::reduce(items.iter().map(|i| i.status), share.is_submitted());

        if status != share.status {
            session.update_share_status(share_id, status).await?;
            debug!(share_id = %share_id, from = %share.status, to = %status, "Share status recomputed");
        }
        Ok(status)
    }
}
