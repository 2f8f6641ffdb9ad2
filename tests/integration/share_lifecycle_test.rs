//! End-to-end share lifecycle through the worker.

mod helpers;

use std::time::Duration;

use tokio::sync::watch;

use datashare_entity::share::{ShareItemStatus, ShareItemType, ShareObjectStatus};
use datashare_entity::task::TaskStatus;
use helpers::{CONSUMER_ACCOUNT, CONSUMERS, TestApp};

async fn requested_share(app: &TestApp) -> datashare_core::types::ShareId {
    let user = app.consumer_user();
    let share = app
        .shares
        .create_share_object(&user, app.dataset.id, app.consumer.id, CONSUMERS, None)
        .await
        .expect("create share");
    app.shares
        .add_shared_item(&user, share.id, ShareItemType::Table, app.table.id.into_uuid())
        .await
        .expect("add table");
    app.shares
        .add_shared_item(&user, share.id, ShareItemType::Bucket, app.bucket.id.into_uuid())
        .await
        .expect("add bucket");
    app.shares
        .submit_share_object(&user, share.id)
        .await
        .expect("submit share");
    share.id
}

#[tokio::test]
async fn test_share_request_is_granted_then_revoked_by_the_worker() {
    let app = TestApp::new().await;
    let share_id = requested_share(&app).await;

    app.shares
        .approve_share_object(&app.owner_user(), share_id)
        .await
        .expect("approve share");
    app.drain().await;

    let share = app.store.share(share_id).await.expect("share exists");
    assert_eq!(share.status, ShareObjectStatus::Completed);
    let tasks = app.store.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Completed);
    assert_eq!(tasks[0].response.as_ref().unwrap()["succeeded"], true);
    assert!(
        app.cloud
            .bucket_policy(&app.bucket.aws_account_id, &app.bucket.bucket_name)
            .await
            .is_some()
    );

    let item_ids: Vec<_> = app
        .store
        .share_items(share_id)
        .await
        .into_iter()
        .map(|i| i.id)
        .collect();
    app.shares
        .revoke_items_share_object(&app.consumer_user(), share_id, &item_ids)
        .await
        .expect("revoke items");
    app.drain().await;

    let share = app.store.share(share_id).await.expect("share exists");
    assert_eq!(share.status, ShareObjectStatus::Revoked);
    assert_eq!(app.cloud.grant_count().await, 0);
    assert!(
        app.cloud
            .bucket_policy(&app.bucket.aws_account_id, &app.bucket.bucket_name)
            .await
            .is_none()
    );

    app.shares
        .delete_share_object(&app.consumer_user(), share_id)
        .await
        .expect("delete share");
    assert!(app.store.share(share_id).await.unwrap().deleted_at.is_some());
}

#[tokio::test]
async fn test_item_failure_completes_the_task_and_is_retryable() {
    let app = TestApp::new().await;
    let share_id = requested_share(&app).await;
    app.cloud.fail_resource(&app.bucket.bucket_name).await;

    app.shares
        .approve_share_object(&app.owner_user(), share_id)
        .await
        .expect("approve share");
    app.drain().await;

    let items = app.store.share_items(share_id).await;
    let bucket = items.iter().find(|i| i.item_type == ShareItemType::Bucket).unwrap();
    let table = items.iter().find(|i| i.item_type == ShareItemType::Table).unwrap();
    assert_eq!(bucket.status, ShareItemStatus::ShareFailed);
    assert!(bucket.last_error.as_deref().unwrap().contains("telemetry-exports"));
    assert_eq!(table.status, ShareItemStatus::ShareSucceeded);
    assert_eq!(app.store.share(share_id).await.unwrap().status, ShareObjectStatus::Failed);

    let task = app.store.tasks().await.remove(0);
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.response.unwrap()["succeeded"], false);

    app.cloud.heal_resource(&app.bucket.bucket_name).await;
    app.shares
        .retry_failed_items(&app.owner_user(), share_id)
        .await
        .expect("retry failed items");
    app.drain().await;

    assert_eq!(app.store.share(share_id).await.unwrap().status, ShareObjectStatus::Completed);
    assert!(
        app.cloud
            .has_database(CONSUMER_ACCOUNT, &format!("telemetry_shared_{}", share_id.as_uuid().simple()))
            .await
    );
}

#[tokio::test]
async fn test_disabled_target_environment_fails_the_task() {
    let app = TestApp::new().await;
    let share_id = requested_share(&app).await;
    app.shares
        .approve_share_object(&app.owner_user(), share_id)
        .await
        .expect("approve share");

    let mut consumer = app.consumer.clone();
    consumer.sharing_enabled = false;
    app.store.insert_environment(consumer).await;
    app.drain().await;

    let task = app.store.tasks().await.remove(0);
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.unwrap().contains("Sharing is disabled"));
    for item in app.store.share_items(share_id).await {
        assert_eq!(item.status, ShareItemStatus::ShareApproved);
    }
}

#[tokio::test]
async fn test_polling_worker_processes_queued_work() {
    let app = TestApp::new().await;
    let share_id = requested_share(&app).await;
    app.shares
        .approve_share_object(&app.owner_user(), share_id)
        .await
        .expect("approve share");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = app.worker.clone();
    let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let completed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let tasks = app.store.tasks().await;
            if tasks.iter().all(|t| t.status.is_terminal()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(completed.is_ok(), "worker did not finish the queued task");

    shutdown_tx.send(true).expect("send shutdown");
    handle.await.expect("worker task");

    assert_eq!(app.store.share(share_id).await.unwrap().status, ShareObjectStatus::Completed);
}
