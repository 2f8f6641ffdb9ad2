//! Scenario tests for grant and revoke processing runs.

mod common;

use std::sync::Arc;

use common::{Fixture, MARKETING_GROUP, REQUESTER_GROUP, TARGET_ACCOUNT};
use datashare_core::error::ErrorKind;
use datashare_database::{ShareSession, ShareStore};
use datashare_entity::share::{ShareItemStatus, ShareItemType, ShareObjectStatus};
use datashare_service::share::{BucketShareManager, TableShareManager};
use datashare_service::{ShareContext, ShareManager, ShareProcessor, ShareProcessorDispatcher};

#[tokio::test]
async fn test_grant_run_completes_every_item() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;

    assert!(f.dispatcher.approve_share(share_id).await.unwrap());

    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::ShareSucceeded);
        assert!(item.last_error.is_none());
    }
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Completed);

    let policy = f
        .cloud
        .bucket_policy(&f.bucket.aws_account_id, &f.bucket.bucket_name)
        .await
        .unwrap();
    assert!(policy.contains(&format!("arn:aws:iam::{TARGET_ACCOUNT}:role/analysts-role")));
    assert!(f.cloud.has_database(TARGET_ACCOUNT, &f.shared_database(share_id)).await);
    assert_eq!(f.cloud.grant_count().await, 1);
}

#[tokio::test]
async fn test_failed_item_does_not_stop_its_siblings() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    f.cloud.fail_resource(&f.table.glue_table_name).await;

    assert!(!f.dispatcher.approve_share(share_id).await.unwrap());

    let table_item = f.item(share_id, ShareItemType::Table).await;
    let bucket_item = f.item(share_id, ShareItemType::Bucket).await;
    assert_eq!(table_item.status, ShareItemStatus::ShareFailed);
    assert!(table_item.last_error.is_some());
    assert_eq!(bucket_item.status, ShareItemStatus::ShareSucceeded);
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Failed);
}

#[tokio::test]
async fn test_failed_table_does_not_stop_the_next_table() {
    let f = Fixture::new().await;
    let user = f.requester();
    let share_id = f
        .share_with(
            &user,
            REQUESTER_GROUP,
            &[
                (ShareItemType::Table, f.table.id.into_uuid()),
                (ShareItemType::Table, f.second_table.id.into_uuid()),
            ],
        )
        .await;
    f.submit_and_approve(&user, share_id).await;
    f.cloud.fail_resource(&f.table.glue_table_name).await;

    assert!(!f.dispatcher.approve_share(share_id).await.unwrap());

    let items = f.store.share_items(share_id).await;
    let orders = items
        .iter()
        .find(|i| i.item_uri == f.table.id.into_uuid())
        .unwrap();
    let customers = items
        .iter()
        .find(|i| i.item_uri == f.second_table.id.into_uuid())
        .unwrap();
    assert_eq!(orders.status, ShareItemStatus::ShareFailed);
    assert!(orders.last_error.as_deref().unwrap().contains("orders"));
    assert_eq!(customers.status, ShareItemStatus::ShareSucceeded);
    assert!(customers.last_error.is_none());
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Failed);
    assert_eq!(f.cloud.grant_count().await, 1);
}

#[tokio::test]
async fn test_run_skips_items_already_in_progress() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    let table_item = f.item(share_id, ShareItemType::Table).await;
    let mut session = f.store.begin().await.unwrap();
    session
        .update_share_item_status(table_item.id, ShareItemStatus::ShareInProgress, None)
        .await
        .unwrap();
    session.commit().await.unwrap();

    assert!(f.dispatcher.approve_share(share_id).await.unwrap());

    assert_eq!(
        f.item(share_id, ShareItemType::Table).await.status,
        ShareItemStatus::ShareInProgress
    );
    assert_eq!(
        f.item(share_id, ShareItemType::Bucket).await.status,
        ShareItemStatus::ShareSucceeded
    );
    assert_eq!(f.cloud.grant_count().await, 0);
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::InProgress);
}

#[tokio::test]
async fn test_run_with_nothing_eligible_changes_nothing() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    let mut session = f.store.begin().await.unwrap();
    for item in session.list_share_items(share_id).await.unwrap() {
        session
            .update_share_item_status(item.id, ShareItemStatus::RevokeInProgress, None)
            .await
            .unwrap();
    }
    session.commit().await.unwrap();

    assert!(f.dispatcher.approve_share(share_id).await.unwrap());
    assert!(f.dispatcher.revoke_share(share_id).await.unwrap());

    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::RevokeInProgress);
    }
    assert_eq!(f.cloud.policy_writes().await, 0);
    assert_eq!(f.cloud.grant_count().await, 0);
}

#[tokio::test]
async fn test_retry_after_failure_completes_the_share() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    f.cloud.fail_resource(&f.table.glue_table_name).await;
    f.dispatcher.approve_share(share_id).await.unwrap();
    f.cloud.heal_resource(&f.table.glue_table_name).await;

    let share = f
        .shares
        .retry_failed_items(&f.approver(), share_id)
        .await
        .unwrap();
    assert_eq!(share.status, ShareObjectStatus::Approved);
    assert_eq!(
        f.item(share_id, ShareItemType::Table).await.status,
        ShareItemStatus::ShareApproved
    );

    assert!(f.dispatcher.approve_share(share_id).await.unwrap());
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Completed);
}

#[tokio::test]
async fn test_retry_without_failures_is_rejected() {
    let f = Fixture::new().await;
    let share_id = f.granted_share().await;

    let err = f
        .shares
        .retry_failed_items(&f.approver(), share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_revoke_removes_access_and_drops_shared_database() {
    let f = Fixture::new().await;
    let share_id = f.granted_share().await;
    let item_ids: Vec<_> = f
        .store
        .share_items(share_id)
        .await
        .into_iter()
        .map(|i| i.id)
        .collect();

    let share = f
        .shares
        .revoke_items_share_object(&f.requester(), share_id, &item_ids)
        .await
        .unwrap();
    assert_eq!(share.status, ShareObjectStatus::Approved);

    assert!(f.dispatcher.revoke_share(share_id).await.unwrap());

    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::RevokeSucceeded);
    }
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Revoked);
    assert!(
        f.cloud
            .bucket_policy(&f.bucket.aws_account_id, &f.bucket.bucket_name)
            .await
            .is_none()
    );
    assert!(!f.cloud.has_database(TARGET_ACCOUNT, &f.shared_database(share_id)).await);
    assert_eq!(f.cloud.grant_count().await, 0);
}

#[tokio::test]
async fn test_table_grant_outlives_one_of_two_shares() {
    let f = Fixture::new().await;
    let analysts = f.granted_share().await;
    let marketer = f.marketer();
    let marketing = f
        .share_with(
            &marketer,
            MARKETING_GROUP,
            &[(ShareItemType::Table, f.table.id.into_uuid())],
        )
        .await;
    f.submit_and_approve(&marketer, marketing).await;
    assert!(f.dispatcher.approve_share(marketing).await.unwrap());
    assert_eq!(f.cloud.grant_count().await, 1);

    let analysts_table = f.item(analysts, ShareItemType::Table).await;
    f.shares
        .revoke_items_share_object(&f.requester(), analysts, &[analysts_table.id])
        .await
        .unwrap();
    assert!(f.dispatcher.revoke_share(analysts).await.unwrap());

    assert_eq!(f.cloud.grant_count().await, 1);
    assert_eq!(
        f.item(marketing, ShareItemType::Table).await.status,
        ShareItemStatus::ShareSucceeded
    );
    assert!(f.cloud.has_database(TARGET_ACCOUNT, &f.shared_database(marketing)).await);
    assert!(!f.cloud.has_database(TARGET_ACCOUNT, &f.shared_database(analysts)).await);

    let marketing_table = f.item(marketing, ShareItemType::Table).await;
    f.shares
        .revoke_items_share_object(&marketer, marketing, &[marketing_table.id])
        .await
        .unwrap();
    assert!(f.dispatcher.revoke_share(marketing).await.unwrap());
    assert_eq!(f.cloud.grant_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_runs_on_one_bucket_keep_both_statements() {
    let f = Fixture::new().await;
    let analysts = f.approved_share().await;
    let marketer = f.marketer();
    let marketing = f
        .share_with(
            &marketer,
            MARKETING_GROUP,
            &[(ShareItemType::Bucket, f.bucket.id.into_uuid())],
        )
        .await;
    f.submit_and_approve(&marketer, marketing).await;

    let (a, m) = tokio::join!(
        f.dispatcher.approve_share(analysts),
        f.dispatcher.approve_share(marketing)
    );
    assert!(a.unwrap());
    assert!(m.unwrap());

    let policy = f
        .cloud
        .bucket_policy(&f.bucket.aws_account_id, &f.bucket.bucket_name)
        .await
        .unwrap();
    assert!(policy.contains(&format!("arn:aws:iam::{TARGET_ACCOUNT}:role/analysts-role")));
    assert!(policy.contains(&format!("arn:aws:iam::{TARGET_ACCOUNT}:role/marketing-role")));
    assert_eq!(
        f.item(marketing, ShareItemType::Bucket).await.status,
        ShareItemStatus::ShareSucceeded
    );
}

#[tokio::test]
async fn test_partial_grant_is_revoked_before_the_item_is_removed() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    let database = f.shared_database(share_id);
    f.cloud.fail_resource(&database).await;
    assert!(!f.dispatcher.approve_share(share_id).await.unwrap());
    f.cloud.heal_resource(&database).await;

    let table_item = f.item(share_id, ShareItemType::Table).await;
    assert_eq!(table_item.status, ShareItemStatus::ShareFailed);
    assert_eq!(f.cloud.grant_count().await, 1);

    let err = f
        .shares
        .remove_shared_item(&f.requester(), table_item.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    let err = f
        .shares
        .delete_share_object(&f.requester(), share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    f.shares
        .revoke_items_share_object(&f.requester(), share_id, &[table_item.id])
        .await
        .unwrap();
    assert!(f.dispatcher.revoke_share(share_id).await.unwrap());
    assert_eq!(f.cloud.grant_count().await, 0);

    f.shares
        .remove_shared_item(&f.requester(), table_item.id)
        .await
        .unwrap();
    let items = f.store.share_items(share_id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_type, ShareItemType::Bucket);
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Completed);
}

#[tokio::test]
async fn test_second_revoke_run_is_a_no_op() {
    let f = Fixture::new().await;
    let share_id = f.granted_share().await;
    let table_item = f.item(share_id, ShareItemType::Table).await;
    f.shares
        .revoke_items_share_object(&f.requester(), share_id, &[table_item.id])
        .await
        .unwrap();
    assert!(f.dispatcher.revoke_share(share_id).await.unwrap());
    let writes = f.cloud.policy_writes().await;

    assert!(f.dispatcher.revoke_share(share_id).await.unwrap());

    assert_eq!(
        f.item(share_id, ShareItemType::Table).await.status,
        ShareItemStatus::RevokeSucceeded
    );
    assert_eq!(
        f.item(share_id, ShareItemType::Bucket).await.status,
        ShareItemStatus::ShareSucceeded
    );
    assert_eq!(f.cloud.policy_writes().await, writes);
    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Completed);
}

#[tokio::test]
async fn test_managers_are_idempotent() {
    let f = Fixture::new().await;
    let share_id = f.granted_share().await;
    let providers = f.cloud.providers();
    let buckets = BucketShareManager::new(providers.buckets.clone(), f.config.clone());
    let tables = TableShareManager::new(providers.catalog.clone(), f.config.clone());
    let bucket_item = f.item(share_id, ShareItemType::Bucket).await;
    let table_item = f.item(share_id, ShareItemType::Table).await;
    let writes = f.cloud.policy_writes().await;

    let mut session = f.store.begin().await.unwrap();
    let ctx = ShareContext::load(session.as_mut(), share_id).await.unwrap();

    buckets.grant(session.as_mut(), &ctx, &bucket_item).await.unwrap();
    assert_eq!(f.cloud.policy_writes().await, writes);
    tables.grant(session.as_mut(), &ctx, &table_item).await.unwrap();
    assert_eq!(f.cloud.grant_count().await, 1);

    tables.revoke(session.as_mut(), &ctx, &table_item).await.unwrap();
    tables.revoke(session.as_mut(), &ctx, &table_item).await.unwrap();
    buckets.revoke(session.as_mut(), &ctx, &bucket_item).await.unwrap();
    buckets.revoke(session.as_mut(), &ctx, &bucket_item).await.unwrap();
    assert_eq!(f.cloud.grant_count().await, 0);

    session.rollback().await.unwrap();
}

#[tokio::test]
async fn test_disabled_sharing_fails_the_run_without_transitions() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    let mut target = f.target_env.clone();
    target.sharing_enabled = false;
    f.update_environment(target).await;

    let err = f.dispatcher.approve_share(share_id).await.unwrap_err();
    assert!(err.is(ErrorKind::Configuration));
    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::ShareApproved);
    }
}

#[tokio::test]
async fn test_missing_processor_fails_the_run_without_transitions() {
    let f = Fixture::new().await;
    let share_id = f.approved_share().await;
    let store: Arc<dyn ShareStore> = f.store.clone();
    let buckets_only = ShareProcessorDispatcher::with_processors(
        store,
        vec![ShareProcessor::new(Arc::new(BucketShareManager::new(
            f.cloud.providers().buckets,
            f.config.clone(),
        )))],
    );

    let err = buckets_only.approve_share(share_id).await.unwrap_err();
    assert!(err.is(ErrorKind::Configuration));
    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::ShareApproved);
    }
    assert_eq!(f.cloud.policy_writes().await, 0);
}

#[tokio::test]
async fn test_unknown_share_is_not_found() {
    let f = Fixture::new().await;
    let err = f
        .dispatcher
        .approve_share(datashare_core::types::ShareId::new())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}
