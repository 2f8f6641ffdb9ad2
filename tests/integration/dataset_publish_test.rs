//! Dataset table updates published through the worker.

mod helpers;

use datashare_core::error::ErrorKind;
use datashare_entity::task::TaskStatus;
use helpers::{PRODUCER_ACCOUNT, TOPIC, TestApp};

#[tokio::test]
async fn test_table_update_is_published_to_the_producers_topic() {
    let app = TestApp::new().await;

    let task_id = app
        .tables
        .publish_table_update(&app.owner_user(), app.table.id)
        .await
        .expect("publish update");
    app.worker.process(&[task_id]).await.expect("process task");

    let published = app.cloud.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].account_id, PRODUCER_ACCOUNT);
    assert_eq!(published[0].topic, TOPIC);
    assert_eq!(published[0].message["location"], "s3://telemetry-data/events/");
    assert_eq!(published[0].message["source_database_name"], "telemetry");

    let task = app.store.tasks().await.remove(0);
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_topic_failure_is_retried_until_it_succeeds() {
    let app = TestApp::new().await;
    app.cloud.fail_resource(TOPIC).await;

    let task_id = app
        .tables
        .publish_table_update(&app.owner_user(), app.table.id)
        .await
        .expect("publish update");
    app.worker.process(&[task_id]).await.expect("process task");

    let task = app.store.tasks().await.remove(0);
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(app.cloud.published().await.is_empty());

    app.cloud.heal_resource(TOPIC).await;
    app.worker.process(&[task_id]).await.expect("process task");

    assert_eq!(app.cloud.published().await.len(), 1);
    let task = app.store.tasks().await.remove(0);
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.attempts, 2);
}

#[tokio::test]
async fn test_consumers_cannot_publish_updates() {
    let app = TestApp::new().await;

    let err = app
        .tables
        .publish_table_update(&app.consumer_user(), app.table.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authorization));
    assert!(app.store.tasks().await.is_empty());
}
