//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use datashare_auth::ResourcePolicyStore;
use datashare_auth::permissions::DATASET_OWNER;
use datashare_cloud::InMemoryCloudAccount;
use datashare_core::config::{SharingConfig, WorkerConfig};
use datashare_core::types::{BucketId, DatasetId, EnvironmentId, TableId, TaskId};
use datashare_database::{MemoryShareStore, ShareSession, ShareStore};
use datashare_entity::dataset::{Dataset, DatasetBucket, DatasetTable};
use datashare_entity::environment::{Environment, EnvironmentGroup};
use datashare_entity::permission::ResourceType;
use datashare_entity::task::TaskStatus;
use datashare_service::{
    DatasetTableService, RequestContext, ShareObjectService, ShareProcessorDispatcher,
};
use datashare_worker::WorkerRunner;
use datashare_worker::handlers::default_executor;

pub const PRODUCER_ACCOUNT: &str = "111111111111";
pub const CONSUMER_ACCOUNT: &str = "222222222222";
pub const CONSUMERS: &str = "consumers";
pub const OWNERS: &str = "owners";
pub const TOPIC: &str = "producer-updates";

/// Test application: services and a worker over the in-memory store and
/// cloud account, seeded with one dataset in a producer environment.
pub struct TestApp {
    pub store: Arc<MemoryShareStore>,
    pub cloud: InMemoryCloudAccount,
    pub shares: ShareObjectService,
    pub tables: DatasetTableService,
    pub worker: Arc<WorkerRunner>,
    pub producer: Environment,
    pub consumer: Environment,
    pub dataset: Dataset,
    pub table: DatasetTable,
    pub bucket: DatasetBucket,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_worker_config(WorkerConfig {
            poll_interval_seconds: 0,
            ..WorkerConfig::default()
        })
        .await
    }

    pub async fn with_worker_config(worker_config: WorkerConfig) -> Self {
        let store = Arc::new(MemoryShareStore::new());
        let cloud = InMemoryCloudAccount::new();
        let providers = cloud.providers();
        let dyn_store: Arc<dyn ShareStore> = store.clone();

        let dispatcher =
            ShareProcessorDispatcher::new(Arc::clone(&dyn_store), &providers, &SharingConfig::default());
        let executor = default_executor(Arc::clone(&dyn_store), dispatcher, &providers);
        let worker = WorkerRunner::new(Arc::clone(&dyn_store), Arc::new(executor), worker_config);

        let producer = environment("producer", PRODUCER_ACCOUNT);
        let consumer = environment("consumer", CONSUMER_ACCOUNT);
        let dataset = Dataset {
            id: DatasetId::new(),
            label: "Telemetry".to_string(),
            environment_id: producer.id,
            admin_group: OWNERS.to_string(),
            stewards: None,
            aws_account_id: PRODUCER_ACCOUNT.to_string(),
            region: "us-east-1".to_string(),
            glue_database_name: "telemetry".to_string(),
            s3_bucket_name: "telemetry-data".to_string(),
        };
        let table = DatasetTable {
            id: TableId::new(),
            dataset_id: dataset.id,
            name: "Events".to_string(),
            glue_database_name: "telemetry".to_string(),
            glue_table_name: "events".to_string(),
            s3_prefix: "s3://telemetry-data/events/".to_string(),
            aws_account_id: PRODUCER_ACCOUNT.to_string(),
            region: "us-east-1".to_string(),
        };
        let bucket = DatasetBucket {
            id: BucketId::new(),
            dataset_id: dataset.id,
            name: "Telemetry exports".to_string(),
            bucket_name: "telemetry-exports".to_string(),
            aws_account_id: PRODUCER_ACCOUNT.to_string(),
            region: "us-east-1".to_string(),
        };

        store.insert_environment(producer.clone()).await;
        store.insert_environment(consumer.clone()).await;
        store
            .insert_environment_group(EnvironmentGroup {
                environment_id: consumer.id,
                group_name: CONSUMERS.to_string(),
                iam_role_name: "consumers".to_string(),
                iam_role_arn: format!("arn:aws:iam::{CONSUMER_ACCOUNT}:role/consumers"),
            })
            .await;
        store.insert_dataset(dataset.clone()).await;
        store.insert_table(table.clone()).await;
        store.insert_bucket(bucket.clone()).await;

        let mut session = store.begin().await.expect("begin session");
        ResourcePolicyStore::new()
            .attach_resource_policy(
                session.as_mut(),
                OWNERS,
                dataset.id.into_uuid(),
                ResourceType::Dataset,
                DATASET_OWNER,
            )
            .await
            .expect("attach dataset owner policy");
        session.commit().await.expect("commit session");

        Self {
            shares: ShareObjectService::new(Arc::clone(&dyn_store)),
            tables: DatasetTableService::new(dyn_store),
            worker: Arc::new(worker),
            store,
            cloud,
            producer,
            consumer,
            dataset,
            table,
            bucket,
        }
    }

    pub fn consumer_user(&self) -> RequestContext {
        RequestContext::new("carol", &[CONSUMERS])
    }

    pub fn owner_user(&self) -> RequestContext {
        RequestContext::new("oscar", &[OWNERS])
    }

    /// Ids of every task still pending.
    pub async fn pending_tasks(&self) -> Vec<TaskId> {
        self.store
            .tasks()
            .await
            .into_iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.id)
            .collect()
    }

    /// Run every pending task through the worker.
    pub async fn drain(&self) {
        let pending = self.pending_tasks().await;
        self.worker.process(&pending).await.expect("process tasks");
    }
}

fn environment(label: &str, account: &str) -> Environment {
    Environment {
        id: EnvironmentId::new(),
        label: label.to_string(),
        aws_account_id: account.to_string(),
        region: "us-east-1".to_string(),
        sharing_enabled: true,
        subscriptions_enabled: true,
        subscriptions_producers_topic_name: Some(TOPIC.to_string()),
    }
}
