//! Drives one resource kind's approved items through its share manager.
//!
//! Each eligible item is moved to in-progress, handed to the manager, and
//! moved to succeeded or failed by the outcome. A manager failure is
//! recorded on its item and never stops the sibling items. Persistence
//! failures abort the run.

use std::sync::Arc;

use tracing::{error, info, warn};

use datashare_core::error::ErrorKind;
use datashare_core::result::AppResult;
use datashare_database::ShareSession;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareItemType};

use super::context::ShareContext;
use super::manager::ShareManager;
use super::state_machine::{ShareItemAction, ShareItemStateMachine};

/// Which half of the lifecycle a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareFlow {
    /// Grant access for `Share_Approved` items.
    Share,
    /// Remove access for `Revoke_Approved` items.
    Revoke,
}

impl ShareFlow {
    /// Status an item must be in to be picked up.
    pub fn eligible_status(&self) -> ShareItemStatus {
        match self {
            Self::Share => ShareItemStatus::ShareApproved,
            Self::Revoke => ShareItemStatus::RevokeApproved,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Share => "share",
            Self::Revoke => "revoke",
        }
    }
}

/// A manager failure recorded on an item.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// State the item was left in.
    pub status: ShareItemStatus,
    /// Why the manager call failed.
    pub reason: String,
}

/// Outcome of processing a single item.
pub type ItemOutcome = Result<ShareItemStatus, ItemFailure>;

/// Processes the items of one resource kind.
#[derive(Debug, Clone)]
pub struct ShareProcessor {
    manager: Arc<dyn ShareManager>,
}

impl ShareProcessor {
    /// Creates a processor around a manager.
    pub fn new(manager: Arc<dyn ShareManager>) -> Self {
        Self { manager }
    }

    /// Kind of item this processor handles.
    pub fn kind(&self) -> ShareItemType {
        self.manager.kind()
    }

    /// Grant access for every `Share_Approved` item of this kind.
    ///
    /// Returns `true` when every item reached `Share_Succeeded`.
    pub async fn process_approved_shares(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
    ) -> AppResult<bool> {
        self.process(session, ctx, ShareFlow::Share).await
    }

    /// Remove access for every `Revoke_Approved` item of this kind, then
    /// clean up share-level resources.
    ///
    /// Returns `true` when every item reached `Revoke_Succeeded`.
    pub async fn process_revoked_shares(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
    ) -> AppResult<bool> {
        let succeeded = self.process(session, ctx, ShareFlow::Revoke).await?;
        self.clean_up_share(session, ctx).await;
        Ok(succeeded)
    }

    /// Best-effort teardown. Failures are logged, never returned.
    pub async fn clean_up_share(&self, session: &mut dyn ShareSession, ctx: &ShareContext) {
        if let Err(e) = self.manager.clean_up_share(session, ctx).await {
            warn!(
                share_id = %ctx.share.id,
                kind = %self.kind(),
                error = %e,
                "Share clean-up failed"
            );
        }
    }

    async fn process(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        flow: ShareFlow,
    ) -> AppResult<bool> {
        let kind = self.kind();
        let items: Vec<ShareItem> = session
            .lock_share_items(ctx.share.id, flow.eligible_status())
            .await?
            .into_iter()
            .filter(|i| i.item_type == kind)
            .collect();

        info!(
            share_id = %ctx.share.id,
            kind = %kind,
            flow = flow.name(),
            count = items.len(),
            "Processing share items"
        );

        let mut all_succeeded = true;
        for mut item in items {
            match self.process_item(session, ctx, &mut item, flow).await {
                Ok(Ok(_)) => {}
                Ok(Err(failure)) => {
                    all_succeeded = false;
                    warn!(
                        share_id = %ctx.share.id,
                        item_id = %item.id,
                        status = %failure.status,
                        reason = %failure.reason,
                        "Share item failed"
                    );
                }
                Err(e) if e.is(ErrorKind::InvalidTransition) => {
                    all_succeeded = false;
                    error!(
                        share_id = %ctx.share.id,
                        item_id = %item.id,
                        status = %item.status,
                        error = %e,
                        "Share item skipped"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(all_succeeded)
    }

    async fn process_item(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &mut ShareItem,
        flow: ShareFlow,
    ) -> AppResult<ItemOutcome> {
        ShareItemStateMachine::apply(session, item, ShareItemAction::Start, None).await?;

        let result = match flow {
            ShareFlow::Share => self.manager.grant(session, ctx, item).await,
            ShareFlow::Revoke => self.manager.revoke(session, ctx, item).await,
        };

        match result {
            Err(e) if e.is(ErrorKind::Database) => Err(e),
            Ok(()) => {
                let status =
                    ShareItemStateMachine::apply(session, item, ShareItemAction::Success, None)
                        .await?;
                Ok(Ok(status))
            }
            Err(e) => {
                let reason = e.to_string();
                let status = ShareItemStateMachine::apply(
                    session,
                    item,
                    ShareItemAction::Failure,
                    Some(&reason),
                )
                .await?;
                Ok(Err(ItemFailure { status, reason }))
            }
        }
    }
}
