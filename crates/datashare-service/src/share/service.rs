//! Share request lifecycle: creating requests, editing their items, and
//! the submit / approve / reject / revoke decisions.
//!
//! Every operation runs in one session and consults the permission gate
//! before writing anything, so a denied call leaves no trace.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use datashare_auth::permissions::{
    ADD_ITEM, APPROVE_SHARE_OBJECT, DELETE_SHARE_OBJECT, GET_SHARE_OBJECT, REJECT_SHARE_OBJECT,
    REMOVE_ITEM, REVOKE_ITEMS, SHARE_OBJECT_APPROVER, SHARE_OBJECT_REQUESTER, SUBMIT_SHARE_OBJECT,
    UPDATE_SHARE_OBJECT,
};
use datashare_auth::{ResourcePolicyChecker, ResourcePolicyStore};
use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::{BucketId, DatasetId, EnvironmentId, ShareId, ShareItemId, TableId};
use datashare_database::store::finish;
use datashare_database::{ShareSession, ShareStore, TaskQueue};
use datashare_entity::permission::ResourceType;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareItemType, ShareObject};
use datashare_entity::task::action;

use super::state_machine::{
    ShareItemAction, ShareItemStateMachine, ShareObjectAction, ShareObjectStateMachine,
};
use crate::context::RequestContext;

/// Manages share requests on behalf of users.
#[derive(Clone)]
pub struct ShareObjectService {
    store: Arc<dyn ShareStore>,
    checker: ResourcePolicyChecker,
    policies: ResourcePolicyStore,
    queue: TaskQueue,
}

impl std::fmt::Debug for ShareObjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareObjectService").finish_non_exhaustive()
    }
}

impl ShareObjectService {
    /// Creates a new share object service.
    pub fn new(store: Arc<dyn ShareStore>) -> Self {
        Self {
            store,
            checker: ResourcePolicyChecker::new(),
            policies: ResourcePolicyStore::new(),
            queue: TaskQueue::new(),
        }
    }

    /// Request access to a dataset for a group in a target environment.
    ///
    /// Returns the group's live request when one exists already.
    pub async fn create_share_object(
        &self,
        ctx: &RequestContext,
        dataset_id: DatasetId,
        environment_id: EnvironmentId,
        principal_group: &str,
        request_purpose: Option<String>,
    ) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self
            .create_in(
                session.as_mut(),
                ctx,
                dataset_id,
                environment_id,
                principal_group,
                request_purpose,
            )
            .await;
        finish(session, result).await
    }

    /// Add a bucket or table of the share's dataset to the request.
    pub async fn add_shared_item(
        &self,
        ctx: &RequestContext,
        share_id: ShareId,
        item_type: ShareItemType,
        item_uri: Uuid,
    ) -> AppResult<ShareItem> {
        let mut session = self.store.begin().await?;
        let result = self
            .add_item_in(session.as_mut(), ctx, share_id, item_type, item_uri)
            .await;
        finish(session, result).await
    }

    /// Remove an item that holds no access and is not being processed.
    pub async fn remove_shared_item(&self, ctx: &RequestContext, item_id: ShareItemId) -> AppResult<()> {
        let mut session = self.store.begin().await?;
        let result = self.remove_item_in(session.as_mut(), ctx, item_id).await;
        finish(session, result).await
    }

    /// Submit the request for approval.
    pub async fn submit_share_object(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self.submit_in(session.as_mut(), ctx, share_id).await;
        finish(session, result).await
    }

    /// Approve the pending items and queue the grant run.
    pub async fn approve_share_object(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self.approve_in(session.as_mut(), ctx, share_id).await;
        finish(session, result).await
    }

    /// Reject the pending items.
    pub async fn reject_share_object(
        &self,
        ctx: &RequestContext,
        share_id: ShareId,
        reject_purpose: Option<String>,
    ) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self
            .reject_in(session.as_mut(), ctx, share_id, reject_purpose)
            .await;
        finish(session, result).await
    }

    /// Request revocation of granted items and queue the revoke run.
    pub async fn revoke_items_share_object(
        &self,
        ctx: &RequestContext,
        share_id: ShareId,
        item_ids: &[ShareItemId],
    ) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self
            .revoke_items_in(session.as_mut(), ctx, share_id, item_ids)
            .await;
        finish(session, result).await
    }

    /// Queue failed grants and failed revokes for another attempt.
    pub async fn retry_failed_items(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self.retry_in(session.as_mut(), ctx, share_id).await;
        finish(session, result).await
    }

    /// Replace the request purpose.
    pub async fn update_request_purpose(
        &self,
        ctx: &RequestContext,
        share_id: ShareId,
        request_purpose: Option<String>,
    ) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self
            .update_purpose_in(session.as_mut(), ctx, share_id, |share| {
                share.request_purpose = request_purpose
            })
            .await;
        finish(session, result).await
    }

    /// Replace the reject purpose.
    pub async fn update_reject_purpose(
        &self,
        ctx: &RequestContext,
        share_id: ShareId,
        reject_purpose: Option<String>,
    ) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self
            .update_purpose_in(session.as_mut(), ctx, share_id, |share| {
                share.reject_purpose = reject_purpose
            })
            .await;
        finish(session, result).await
    }

    /// Soft-delete a request that holds no access.
    pub async fn delete_share_object(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<()> {
        let mut session = self.store.begin().await?;
        let result = self.delete_in(session.as_mut(), ctx, share_id).await;
        finish(session, result).await
    }

    /// Get a request.
    pub async fn get_share_object(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<ShareObject> {
        let mut session = self.store.begin().await?;
        let result = self
            .load_authorized(session.as_mut(), ctx, share_id, GET_SHARE_OBJECT)
            .await;
        finish(session, result).await
    }

    /// List the items of a request.
    pub async fn list_share_items(&self, ctx: &RequestContext, share_id: ShareId) -> AppResult<Vec<ShareItem>> {
        let mut session = self.store.begin().await?;
        let result = async {
            self.load_authorized(session.as_mut(), ctx, share_id, GET_SHARE_OBJECT)
                .await?;
            session.list_share_items(share_id).await
        }
        .await;
        finish(session, result).await
    }

    // -- In-session bodies --

    async fn create_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        dataset_id: DatasetId,
        environment_id: EnvironmentId,
        principal_group: &str,
        request_purpose: Option<String>,
    ) -> AppResult<ShareObject> {
        let dataset = session
            .find_dataset(dataset_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Dataset {dataset_id} not found")))?;
        let environment = session
            .find_environment(environment_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Environment {environment_id} not found")))?;

        if !environment.sharing_enabled {
            return Err(AppError::configuration(format!(
                "Sharing is disabled for environment {}",
                environment.label
            )));
        }
        if !ctx.is_member(principal_group) {
            return Err(AppError::authorization(format!(
                "User '{}' is not a member of group '{principal_group}'",
                ctx.username
            )));
        }
        if session
            .find_environment_group(environment_id, principal_group)
            .await?
            .is_none()
        {
            return Err(AppError::validation(format!(
                "Group '{principal_group}' is not invited to environment {}",
                environment.label
            )));
        }

        if let Some(existing) = session
            .find_share_for_principal(dataset_id, environment_id, principal_group)
            .await?
        {
            return Ok(existing);
        }

        let share = ShareObject::new(
            dataset.id,
            dataset.environment_id,
            environment.id,
            principal_group,
            &ctx.username,
            request_purpose,
        );
        session.insert_share(&share).await?;

        let share_uri = share.id.into_uuid();
        self.policies
            .attach_resource_policy(
                session,
                principal_group,
                share_uri,
                ResourceType::ShareObject,
                SHARE_OBJECT_REQUESTER,
            )
            .await?;
        for group in dataset.approver_groups() {
            self.policies
                .attach_resource_policy(
                    session,
                    &group,
                    share_uri,
                    ResourceType::ShareObject,
                    SHARE_OBJECT_APPROVER,
                )
                .await?;
        }

        info!(
            username = %ctx.username,
            share_id = %share.id,
            dataset_id = %dataset.id,
            group = principal_group,
            "Share request created"
        );
        Ok(share)
    }

    async fn add_item_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
        item_type: ShareItemType,
        item_uri: Uuid,
    ) -> AppResult<ShareItem> {
        let mut share = self.load_authorized(session, ctx, share_id, ADD_ITEM).await?;

        let (dataset_id, item_name) = match item_type {
            ShareItemType::Bucket => {
                let bucket = session
                    .find_bucket(BucketId::from(item_uri))
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Bucket {item_uri} not found")))?;
                (bucket.dataset_id, bucket.name)
            }
            ShareItemType::Table => {
                let table = session
                    .find_table(TableId::from(item_uri))
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Table {item_uri} not found")))?;
                (table.dataset_id, table.name)
            }
        };
        if dataset_id != share.dataset_id {
            return Err(AppError::validation(format!(
                "{item_type} {item_name} does not belong to the shared dataset"
            )));
        }
        if session
            .find_share_item_by_resource(share_id, item_uri)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "{item_type} {item_name} is already part of the share"
            )));
        }

        let item = ShareItem::new(share_id, item_type, item_uri, &item_name);
        session.insert_share_item(&item).await?;

        share.submitted_at = None;
        session.update_share(&share).await?;
        ShareObjectStateMachine::refresh(session, share_id).await?;

        info!(share_id = %share_id, item_id = %item.id, item_type = %item_type, "Share item added");
        Ok(item)
    }

    async fn remove_item_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        item_id: ShareItemId,
    ) -> AppResult<()> {
        let item = session
            .find_share_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Share item {item_id} not found")))?;
        self.load_authorized(session, ctx, item.share_id, REMOVE_ITEM)
            .await?;

        if !item.status.is_removable() {
            let hint = if item.status.needs_revoke() {
                "revoke it first"
            } else {
                "wait for processing to finish"
            };
            return Err(AppError::conflict(format!(
                "Share item in {} cannot be removed, {hint}",
                item.status
            )));
        }

        session.delete_share_item(item_id).await?;
        ShareObjectStateMachine::refresh(session, item.share_id).await?;
        info!(share_id = %item.share_id, item_id = %item_id, "Share item removed");
        Ok(())
    }

    async fn submit_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
    ) -> AppResult<ShareObject> {
        let mut share = self
            .load_authorized(session, ctx, share_id, SUBMIT_SHARE_OBJECT)
            .await?;
        ShareObjectStateMachine::check_action(share.status, ShareObjectAction::Submit)?;

        let items = session.list_share_items(share_id).await?;
        let submittable: Vec<ShareItem> = items
            .into_iter()
            .filter(|i| ShareItemStateMachine::run_transition(i.status, ShareItemAction::Submit).is_ok())
            .collect();
        if submittable.is_empty() {
            return Err(AppError::validation(
                "Share has no items to submit, add at least one item first",
            ));
        }

        share.submitted_at = Some(Utc::now());
        session.update_share(&share).await?;
        for mut item in submittable {
            ShareItemStateMachine::apply(session, &mut item, ShareItemAction::Submit, None).await?;
        }
        ShareObjectStateMachine::refresh(session, share_id).await?;

        info!(username = %ctx.username, share_id = %share_id, "Share submitted");
        self.reload(session, share_id).await
    }

    async fn approve_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
    ) -> AppResult<ShareObject> {
        let share = self
            .load_authorized(session, ctx, share_id, APPROVE_SHARE_OBJECT)
            .await?;
        ShareObjectStateMachine::check_action(share.status, ShareObjectAction::Approve)?;

        let pending = self
            .items_in(session, share_id, ShareItemStatus::PendingApproval)
            .await?;
        for mut item in pending {
            ShareItemStateMachine::apply(session, &mut item, ShareItemAction::Approve, None).await?;
        }
        self.queue
            .enqueue(session, action::SHARE_APPROVE, share_id.into_uuid(), json!({}))
            .await?;

        info!(username = %ctx.username, share_id = %share_id, "Share approved");
        self.reload(session, share_id).await
    }

    async fn reject_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
        reject_purpose: Option<String>,
    ) -> AppResult<ShareObject> {
        let mut share = self
            .load_authorized(session, ctx, share_id, REJECT_SHARE_OBJECT)
            .await?;
        ShareObjectStateMachine::check_action(share.status, ShareObjectAction::Reject)?;

        share.reject_purpose = reject_purpose;
        session.update_share(&share).await?;

        let pending = self
            .items_in(session, share_id, ShareItemStatus::PendingApproval)
            .await?;
        for mut item in pending {
            ShareItemStateMachine::apply(session, &mut item, ShareItemAction::Reject, None).await?;
        }

        info!(username = %ctx.username, share_id = %share_id, "Share rejected");
        self.reload(session, share_id).await
    }

    async fn revoke_items_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
        item_ids: &[ShareItemId],
    ) -> AppResult<ShareObject> {
        let share = self
            .load_authorized(session, ctx, share_id, REVOKE_ITEMS)
            .await?;
        ShareObjectStateMachine::check_action(share.status, ShareObjectAction::Revoke)?;
        if item_ids.is_empty() {
            return Err(AppError::validation("No items selected for revocation"));
        }

        for item_id in item_ids {
            let mut item = session
                .find_share_item(*item_id)
                .await?
                .filter(|i| i.share_id == share_id)
                .ok_or_else(|| {
                    AppError::not_found(format!("Share item {item_id} not found in share {share_id}"))
                })?;
            ShareItemStateMachine::apply(session, &mut item, ShareItemAction::Revoke, None).await?;
        }
        self.queue
            .enqueue(session, action::SHARE_REVOKE, share_id.into_uuid(), json!({}))
            .await?;

        info!(
            username = %ctx.username,
            share_id = %share_id,
            count = item_ids.len(),
            "Share items revoke requested"
        );
        self.reload(session, share_id).await
    }

    async fn retry_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
    ) -> AppResult<ShareObject> {
        let share = self.load_live(session, share_id).await?;
        let share_failed = self
            .items_in(session, share_id, ShareItemStatus::ShareFailed)
            .await?;
        let revoke_failed = self
            .items_in(session, share_id, ShareItemStatus::RevokeFailed)
            .await?;
        if share_failed.is_empty() && revoke_failed.is_empty() {
            return Err(AppError::validation("Share has no failed items to retry"));
        }

        if !share_failed.is_empty() {
            self.authorize(session, ctx, &share, APPROVE_SHARE_OBJECT).await?;
        }
        if !revoke_failed.is_empty() {
            self.authorize(session, ctx, &share, REVOKE_ITEMS).await?;
        }

        if !share_failed.is_empty() {
            for mut item in share_failed {
                ShareItemStateMachine::apply(session, &mut item, ShareItemAction::Approve, None)
                    .await?;
            }
            self.queue
                .enqueue(session, action::SHARE_APPROVE, share_id.into_uuid(), json!({}))
                .await?;
        }
        if !revoke_failed.is_empty() {
            for mut item in revoke_failed {
                ShareItemStateMachine::apply(session, &mut item, ShareItemAction::Revoke, None)
                    .await?;
            }
            self.queue
                .enqueue(session, action::SHARE_REVOKE, share_id.into_uuid(), json!({}))
                .await?;
        }

        info!(username = %ctx.username, share_id = %share_id, "Failed share items queued for retry");
        self.reload(session, share_id).await
    }

    async fn update_purpose_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
        edit: impl FnOnce(&mut ShareObject) + Send,
    ) -> AppResult<ShareObject> {
        let mut share = self
            .load_authorized(session, ctx, share_id, UPDATE_SHARE_OBJECT)
            .await?;
        edit(&mut share);
        session.update_share(&share).await?;
        self.reload(session, share_id).await
    }

    async fn delete_in(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
    ) -> AppResult<()> {
        let mut share = self
            .load_authorized(session, ctx, share_id, DELETE_SHARE_OBJECT)
            .await?;
        ShareObjectStateMachine::check_action(share.status, ShareObjectAction::Delete)?;

        let items = session.list_share_items(share_id).await?;
        if let Some(busy) = items.iter().find(|i| !i.status.is_removable()) {
            return Err(AppError::conflict(format!(
                "Share cannot be deleted while item {} is in {}",
                busy.item_name, busy.status
            )));
        }

        share.deleted_at = Some(Utc::now());
        session.update_share(&share).await?;

        let share_uri = share_id.into_uuid();
        self.policies
            .delete_resource_policy(session, &share.principal_group, share_uri)
            .await?;
        if let Some(dataset) = session.find_dataset(share.dataset_id).await? {
            for group in dataset.approver_groups() {
                self.policies
                    .delete_resource_policy(session, &group, share_uri)
                    .await?;
            }
        }

        info!(username = %ctx.username, share_id = %share_id, "Share deleted");
        Ok(())
    }

    // -- Helpers --

    async fn load_live(&self, session: &mut dyn ShareSession, share_id: ShareId) -> AppResult<ShareObject> {
        session
            .find_share(share_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| AppError::not_found(format!("Share {share_id} not found")))
    }

    async fn authorize(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share: &ShareObject,
        permission: &str,
    ) -> AppResult<()> {
        self.checker
            .check_user_resource_permission(
                session,
                &ctx.username,
                &ctx.groups,
                share.id.into_uuid(),
                permission,
            )
            .await
    }

    async fn load_authorized(
        &self,
        session: &mut dyn ShareSession,
        ctx: &RequestContext,
        share_id: ShareId,
        permission: &str,
    ) -> AppResult<ShareObject> {
        let share = self.load_live(session, share_id).await?;
        self.authorize(session, ctx, &share, permission).await?;
        Ok(share)
    }

    async fn reload(&self, session: &mut dyn ShareSession, share_id: ShareId) -> AppResult<ShareObject> {
        self.load_live(session, share_id).await
    }

    async fn items_in(
        &self,
        session: &mut dyn ShareSession,
        share_id: ShareId,
        status: ShareItemStatus,
    ) -> AppResult<Vec<ShareItem>> {
        Ok(session
            .list_share_items(share_id)
            .await?
            .into_iter()
            .filter(|i| i.status == status)
            .collect())
    }
}
