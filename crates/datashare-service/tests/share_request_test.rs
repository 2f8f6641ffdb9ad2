//! Scenario tests for the share request lifecycle.

mod common;

use serde_json::json;

use common::{ADMIN_GROUP, Fixture, REQUESTER_GROUP, STEWARDS_GROUP};
use datashare_core::error::ErrorKind;
use datashare_core::types::{DatasetId, TableId};
use datashare_entity::dataset::DatasetTable;
use datashare_entity::share::{ShareItemStatus, ShareItemType, ShareObjectStatus};
use datashare_entity::task::action;
use datashare_service::RequestContext;

#[tokio::test]
async fn test_create_share_attaches_policies_and_is_reused() {
    let f = Fixture::new().await;
    let first = f
        .shares
        .create_share_object(&f.requester(), f.dataset.id, f.target_env.id, REQUESTER_GROUP, None)
        .await
        .unwrap();
    let second = f
        .shares
        .create_share_object(&f.requester(), f.dataset.id, f.target_env.id, REQUESTER_GROUP, None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.status, ShareObjectStatus::Draft);

    let mut groups: Vec<String> = f
        .store
        .policies()
        .await
        .into_iter()
        .filter(|p| p.resource_uri == first.id.into_uuid())
        .map(|p| p.group_name)
        .collect();
    groups.sort();
    assert_eq!(groups, vec![REQUESTER_GROUP, ADMIN_GROUP, STEWARDS_GROUP]);
}

#[tokio::test]
async fn test_create_share_requires_group_membership() {
    let f = Fixture::new().await;
    let outsider = RequestContext::new("mallory", &["outsiders"]);
    let err = f
        .shares
        .create_share_object(&outsider, f.dataset.id, f.target_env.id, REQUESTER_GROUP, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authorization));
    assert!(f.store.policies().await.is_empty());
}

#[tokio::test]
async fn test_create_share_into_disabled_environment_is_configuration_error() {
    let f = Fixture::new().await;
    let mut target = f.target_env.clone();
    target.sharing_enabled = false;
    f.update_environment(target).await;

    let err = f
        .shares
        .create_share_object(&f.requester(), f.dataset.id, f.target_env.id, REQUESTER_GROUP, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Configuration));
}

#[tokio::test]
async fn test_submit_then_approve_queues_one_grant_task() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;

    let submitted = f
        .shares
        .submit_share_object(&f.requester(), share_id)
        .await
        .unwrap();
    assert_eq!(submitted.status, ShareObjectStatus::Submitted);
    assert!(submitted.submitted_at.is_some());

    let approved = f
        .shares
        .approve_share_object(&f.approver(), share_id)
        .await
        .unwrap();
    assert_eq!(approved.status, ShareObjectStatus::Approved);

    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::ShareApproved);
    }
    let tasks = f.store.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].action, action::SHARE_APPROVE);
    assert_eq!(tasks[0].target_uri, share_id.into_uuid());
}

#[tokio::test]
async fn test_submit_without_items_is_rejected() {
    let f = Fixture::new().await;
    let share = f
        .shares
        .create_share_object(&f.requester(), f.dataset.id, f.target_env.id, REQUESTER_GROUP, None)
        .await
        .unwrap();

    let err = f
        .shares
        .submit_share_object(&f.requester(), share.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
    assert!(f.store.share(share.id).await.unwrap().submitted_at.is_none());
}

#[tokio::test]
async fn test_approving_a_draft_is_invalid_and_changes_nothing() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;

    let err = f
        .shares
        .approve_share_object(&f.approver(), share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidTransition));

    assert_eq!(f.store.share(share_id).await.unwrap().status, ShareObjectStatus::Draft);
    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::PendingApproval);
    }
    assert!(f.store.tasks().await.is_empty());
}

#[tokio::test]
async fn test_denied_caller_mutates_nothing() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;
    let outsider = RequestContext::new("mallory", &["outsiders"]);

    let err = f
        .shares
        .submit_share_object(&outsider, share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authorization));

    // Requesters cannot decide on their own share.
    let err = f
        .shares
        .approve_share_object(&f.requester(), share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authorization));

    let share = f.store.share(share_id).await.unwrap();
    assert_eq!(share.status, ShareObjectStatus::Draft);
    assert!(share.submitted_at.is_none());
    assert!(f.store.tasks().await.is_empty());
}

#[tokio::test]
async fn test_add_item_rejects_duplicates_and_foreign_resources() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;

    let err = f
        .shares
        .add_shared_item(&f.requester(), share_id, ShareItemType::Table, f.table.id.into_uuid())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let foreign = DatasetTable {
        id: TableId::new(),
        dataset_id: DatasetId::new(),
        ..f.table.clone()
    };
    f.store.insert_table(foreign.clone()).await;
    let err = f
        .shares
        .add_shared_item(&f.requester(), share_id, ShareItemType::Table, foreign.id.into_uuid())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    assert_eq!(f.store.share_items(share_id).await.len(), 2);
}

#[tokio::test]
async fn test_adding_an_item_returns_the_share_to_draft() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;
    f.shares
        .submit_share_object(&f.requester(), share_id)
        .await
        .unwrap();

    let second_table = DatasetTable {
        id: TableId::new(),
        name: "Customers".to_string(),
        glue_table_name: "customers".to_string(),
        ..f.table.clone()
    };
    f.store.insert_table(second_table.clone()).await;
    f.shares
        .add_shared_item(
            &f.requester(),
            share_id,
            ShareItemType::Table,
            second_table.id.into_uuid(),
        )
        .await
        .unwrap();

    let share = f.store.share(share_id).await.unwrap();
    assert_eq!(share.status, ShareObjectStatus::Draft);
    assert!(share.submitted_at.is_none());
}

#[tokio::test]
async fn test_reject_records_purpose_and_allows_resubmission() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;
    f.shares
        .submit_share_object(&f.requester(), share_id)
        .await
        .unwrap();

    let rejected = f
        .shares
        .reject_share_object(&f.approver(), share_id, Some("missing purpose".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.status, ShareObjectStatus::Rejected);
    assert_eq!(rejected.reject_purpose.as_deref(), Some("missing purpose"));

    let resubmitted = f
        .shares
        .submit_share_object(&f.requester(), share_id)
        .await
        .unwrap();
    assert_eq!(resubmitted.status, ShareObjectStatus::Submitted);
    for item in f.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::PendingApproval);
    }
}

#[tokio::test]
async fn test_granted_item_cannot_be_removed() {
    let f = Fixture::new().await;
    let share_id = f.granted_share().await;
    let table_item = f.item(share_id, ShareItemType::Table).await;

    let err = f
        .shares
        .remove_shared_item(&f.requester(), table_item.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(f.store.share_items(share_id).await.len(), 2);
}

#[tokio::test]
async fn test_pending_item_can_be_removed() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;
    let bucket_item = f.item(share_id, ShareItemType::Bucket).await;

    f.shares
        .remove_shared_item(&f.requester(), bucket_item.id)
        .await
        .unwrap();

    let items = f.store.share_items(share_id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_type, ShareItemType::Table);
}

#[tokio::test]
async fn test_revoking_an_ungranted_item_is_invalid() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;
    let table_item = f.item(share_id, ShareItemType::Table).await;

    let err = f
        .shares
        .revoke_items_share_object(&f.requester(), share_id, &[table_item.id])
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidTransition));
    assert!(f.store.tasks().await.is_empty());
}

#[tokio::test]
async fn test_delete_refused_while_access_is_granted() {
    let f = Fixture::new().await;
    let share_id = f.granted_share().await;

    let err = f
        .shares
        .delete_share_object(&f.requester(), share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    assert!(f.store.share(share_id).await.unwrap().deleted_at.is_none());
}

#[tokio::test]
async fn test_delete_draft_soft_deletes_and_detaches_policies() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;

    f.shares
        .delete_share_object(&f.requester(), share_id)
        .await
        .unwrap();

    assert!(f.store.share(share_id).await.unwrap().deleted_at.is_some());
    assert!(f.store.policies().await.is_empty());

    let err = f
        .shares
        .get_share_object(&f.requester(), share_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_update_purposes() {
    let f = Fixture::new().await;
    let share_id = f.draft_share().await;

    let share = f
        .shares
        .update_request_purpose(&f.requester(), share_id, Some("audit".to_string()))
        .await
        .unwrap();
    assert_eq!(share.request_purpose.as_deref(), Some("audit"));

    let share = f
        .shares
        .update_reject_purpose(&f.approver(), share_id, Some("too broad".to_string()))
        .await
        .unwrap();
    assert_eq!(share.reject_purpose.as_deref(), Some("too broad"));
    assert_eq!(share.request_purpose.as_deref(), Some("audit"));
}

#[tokio::test]
async fn test_publish_table_update_enqueues_one_task() {
    let f = Fixture::new().await;
    f.grant_dataset_owner().await;

    let task_id = f
        .tables
        .publish_table_update(&f.approver(), f.table.id)
        .await
        .unwrap();

    let tasks = f.store.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert_eq!(tasks[0].action, action::DATASET_PUBLISH_UPDATE);
    assert_eq!(tasks[0].target_uri, f.dataset.id.into_uuid());
    assert_eq!(tasks[0].payload, json!({ "s3Prefix": "s3://sales-data/orders/" }));
}

#[tokio::test]
async fn test_publish_table_update_requires_subscriptions() {
    let f = Fixture::new().await;
    f.grant_dataset_owner().await;
    let mut source = f.source_env.clone();
    source.subscriptions_enabled = false;
    f.update_environment(source).await;

    let err = f
        .tables
        .publish_table_update(&f.approver(), f.table.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Configuration));
    assert!(f.store.tasks().await.is_empty());
}

#[tokio::test]
async fn test_publish_table_update_requires_permission() {
    let f = Fixture::new().await;

    let err = f
        .tables
        .publish_table_update(&f.requester(), f.table.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authorization));
    assert!(f.store.tasks().await.is_empty());
}
